//! Read-only view over a decoded response.
//!
//! # Design
//! A response body is an ordered multimap of named values. Names may repeat:
//! the protocol has no array construct, so a list result is a run of fields
//! sharing one name. `Value` is a closed variant, so every consumer has to
//! handle the scalar, nested and absent cases explicitly.

/// A single field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Scalar(String),
    Tree(Tree),
    /// Explicit nil on the wire.
    Absent,
}

impl Value {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            Value::Tree(t) => Some(t),
            _ => None,
        }
    }

    /// Short tag used in trace output.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Scalar(_) => "scalar",
            Value::Tree(_) => "tree",
            Value::Absent => "absent",
        }
    }
}

/// Ordered list of `(name, value)` entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: Vec<(String, Value)>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, keeping any earlier entry of the same name.
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.entries.push((name.into(), value));
    }

    /// Builder-style `push`.
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.push(name, value);
        self
    }

    /// Builder-style `push` of a scalar.
    pub fn with_scalar(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(name, Value::Scalar(value.into()))
    }

    pub fn property_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|(name, _)| name.as_str())
    }

    pub fn value_at(&self, index: usize) -> Option<&Value> {
        self.entries.get(index).map(|(_, value)| value)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn first_value_by_name(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Every value stored under `name`, in document order. The values
    /// borrow from the tree only, so they outlive `name`.
    pub fn values_named<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a Value> + 'n
    where
        'a: 'n,
    {
        self.entries
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Like `values_named` but ignoring ASCII case in the name.
    pub fn values_named_ignore_case<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a Value> + 'n
    where
        'a: 'n,
    {
        self.entries
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn has_property_ignore_case(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// First scalar under `name`, with blank strings treated as missing.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.first_value_by_name(name)
            .and_then(Value::as_scalar)
            .filter(|s| !s.trim().is_empty())
    }

    /// First nested tree under `name`.
    pub fn child(&self, name: &str) -> Option<&Tree> {
        self.first_value_by_name(name).and_then(Value::as_tree)
    }
}
