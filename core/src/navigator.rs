//! Locating the fault or the payload inside a decoded response.
//!
//! # Design
//! The service wraps results inconsistently across methods and server
//! versions: a record may sit under a `return` field, a list may be a run of
//! repeated `return` fields, or the response element may itself be the
//! record. The functions here try those layouts from most to least specific
//! and return the first concrete node found. A step that finds nothing
//! yields nothing; no value is ever synthesized.
//!
//! A fault is always checked first, at the top level and one hop down
//! through a `return` field. Field-name probes for the fault and the result
//! wrapper ignore ASCII case, since casing differs between endpoints.

use crate::error::RpcError;
use crate::tree::{Tree, Value};

/// Name of the field that wraps a method's result.
pub const RESULT_FIELD: &str = "return";

const FAULT_CODE_FIELD: &str = "faultcode";
const FAULT_MESSAGE_FIELDS: &[&str] = &["faultstring", "message"];
const UNKNOWN_FAULT: &str = "unknown remote fault";

/// Minimal field probe deciding whether a node looks like a given record.
#[derive(Debug, Clone, Copy)]
pub struct RecordShape {
    pub id_field: &'static str,
    /// At least one of these must be present as well.
    pub any_of: &'static [&'static str],
}

impl RecordShape {
    pub fn matches(&self, node: &Tree) -> bool {
        node.has_property(self.id_field) && self.any_of.iter().any(|f| node.has_property(f))
    }
}

/// The payload of a single-result call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload<'a> {
    Node(&'a Tree),
    Scalar(&'a str),
    Nothing,
}

/// Return the fault message if `tree` carries a fault, either directly or
/// under a result field.
pub fn find_fault(tree: &Tree) -> Option<String> {
    fault_message(tree).or_else(|| {
        tree.values_named_ignore_case(RESULT_FIELD)
            .filter_map(Value::as_tree)
            .find_map(fault_message)
    })
}

fn fault_message(node: &Tree) -> Option<String> {
    if !node.has_property_ignore_case(FAULT_CODE_FIELD) {
        return None;
    }
    let message = FAULT_MESSAGE_FIELDS
        .iter()
        .find_map(|field| {
            node.values_named_ignore_case(field)
                .filter_map(Value::as_scalar)
                .map(str::trim)
                .find(|s| !s.is_empty())
        })
        .unwrap_or(UNKNOWN_FAULT);
    Some(message.to_string())
}

fn check_fault(tree: &Tree) -> Result<(), RpcError> {
    match find_fault(tree) {
        Some(message) => {
            tracing::warn!(stage = "navigate.fault", message = %message, "server signaled a fault");
            Err(RpcError::RemoteFault(message))
        }
        None => Ok(()),
    }
}

/// Locate the single payload of an object-returning call.
pub fn locate_single<'a>(tree: &'a Tree, shape: &RecordShape) -> Result<Payload<'a>, RpcError> {
    check_fault(tree)?;

    let mut results = tree.values_named_ignore_case(RESULT_FIELD);
    let Some(first) = results.next() else {
        if shape.matches(tree) {
            tracing::debug!(stage = "navigate.single", "response element is the record itself");
            return Ok(Payload::Node(tree));
        }
        tracing::debug!(
            stage = "navigate.single",
            fields = ?tree.names(),
            "no result field and no record shape"
        );
        return Ok(Payload::Nothing);
    };

    let extra = results.count();
    if extra > 0 {
        tracing::debug!(stage = "navigate.single", extra, "several result fields; using the first");
    }

    Ok(match first {
        Value::Tree(node) => {
            tracing::debug!(stage = "navigate.single", "payload is the wrapped result tree");
            Payload::Node(node)
        }
        Value::Scalar(s) => Payload::Scalar(s),
        Value::Absent => Payload::Nothing,
    })
}

/// Collect every record of a list-returning call, in document order.
///
/// Records `map` rejects are dropped and logged; they never fail the call.
pub fn collect_records<T>(
    tree: &Tree,
    shape: &RecordShape,
    mut map: impl FnMut(&Tree) -> Option<T>,
) -> Result<Vec<T>, RpcError> {
    check_fault(tree)?;

    let mut records = Vec::new();
    let mut saw_result = false;
    for (index, (name, value)) in tree.entries().enumerate() {
        if !name.eq_ignore_ascii_case(RESULT_FIELD) {
            continue;
        }
        saw_result = true;
        match value {
            Value::Tree(node) => match map(node) {
                Some(record) => records.push(record),
                None => tracing::debug!(stage = "navigate.list", index, "dropped unusable record"),
            },
            other => tracing::debug!(
                stage = "navigate.list",
                index,
                kind = other.kind(),
                "skipping non-tree result entry"
            ),
        }
    }

    if !saw_result && shape.matches(tree) {
        tracing::debug!(stage = "navigate.list", "response element is a single record");
        records.extend(map(tree));
    }

    if records.is_empty() {
        for (index, (name, value)) in tree.entries().enumerate() {
            if name.eq_ignore_ascii_case(RESULT_FIELD) {
                continue;
            }
            if let Value::Tree(node) = value {
                if shape.matches(node) {
                    tracing::debug!(stage = "navigate.list", index, field = name, "adopting record-shaped child");
                    records.extend(map(node));
                }
            }
        }
    }

    tracing::debug!(
        stage = "navigate.list",
        fields = tree.property_count(),
        records = records.len(),
        "collected records"
    );
    Ok(records)
}

/// Locate the bare truth value of a delete-style call: a `return` scalar,
/// or failing that a leading scalar field.
pub fn locate_truth(tree: &Tree) -> Result<Option<&str>, RpcError> {
    check_fault(tree)?;
    let wrapped = tree
        .values_named_ignore_case(RESULT_FIELD)
        .find_map(Value::as_scalar);
    Ok(wrapped.or_else(|| tree.value_at(0).and_then(Value::as_scalar)))
}
