//! SOAP 1.1 envelope encoding and decoding.
//!
//! # Design
//! Outbound calls are document/literal: the body holds one element named
//! after the method, qualified by the service namespace, with one child per
//! parameter in declared order. Some server methods bind parameters by
//! position, so order is preserved exactly and null parameters can be sent
//! as an explicit `xsi:nil` marker instead of being dropped.
//!
//! Inbound, the first element under `Body` becomes the response tree.
//! Namespace prefixes are stripped from every name. Faults are not special
//! here: a `Fault` element decodes like any other tree and the navigator
//! classifies it.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::RpcError;
use crate::tree::{Tree, Value};

pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// A parameter value as it goes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Text(String),
    Int(i64),
    /// Sent as `<name xsi:nil="true"/>`.
    Null,
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub value: ParamValue,
}

/// An outbound method call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub namespace: String,
    pub method: String,
    pub params: Vec<Param>,
}

impl Call {
    pub fn new(namespace: &str, method: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            method: method.to_string(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.params.push(Param {
            name: name.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn null_param(self, name: &str) -> Self {
        self.param(name, ParamValue::Null)
    }

    /// The `SOAPAction` header value: namespace followed by method name.
    pub fn action(&self) -> String {
        format!("{}{}", self.namespace, self.method)
    }
}

/// What a response body decoded to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Tree(Tree),
    Scalar(String),
    /// No element under `Body` (a void method).
    Empty,
}

fn encoding_error(err: impl std::fmt::Display) -> RpcError {
    RpcError::Encoding(err.to_string())
}

/// Element names must start with a letter or `_` and hold only
/// alphanumerics, `_`, `-` and `.`; the method name gets a `n0:` prefix.
fn check_element_name(name: &str) -> Result<(), RpcError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(RpcError::Encoding(format!("invalid element name {name:?}")))
    }
}

pub fn encode(call: &Call) -> Result<String, RpcError> {
    check_element_name(&call.method)?;
    for param in &call.params {
        check_element_name(&param.name)?;
    }

    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(encoding_error)?;

    let mut envelope = BytesStart::new("soap:Envelope");
    envelope.push_attribute(("xmlns:soap", SOAP_ENV_NS));
    envelope.push_attribute(("xmlns:xsi", XSI_NS));
    writer.write_event(Event::Start(envelope)).map_err(encoding_error)?;
    writer
        .write_event(Event::Start(BytesStart::new("soap:Body")))
        .map_err(encoding_error)?;

    let method_tag = format!("n0:{}", call.method);
    let mut method = BytesStart::new(method_tag.as_str());
    method.push_attribute(("xmlns:n0", call.namespace.as_str()));
    writer.write_event(Event::Start(method)).map_err(encoding_error)?;

    for param in &call.params {
        let name = param.name.as_str();
        let text = match &param.value {
            ParamValue::Null => {
                let mut nil = BytesStart::new(name);
                nil.push_attribute(("xsi:nil", "true"));
                writer.write_event(Event::Empty(nil)).map_err(encoding_error)?;
                continue;
            }
            ParamValue::Text(text) => text.clone(),
            ParamValue::Int(n) => n.to_string(),
        };
        writer
            .write_event(Event::Start(BytesStart::new(name)))
            .map_err(encoding_error)?;
        writer
            .write_event(Event::Text(BytesText::new(&text)))
            .map_err(encoding_error)?;
        writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(encoding_error)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(method_tag.as_str())))
        .map_err(encoding_error)?;
    writer
        .write_event(Event::End(BytesEnd::new("soap:Body")))
        .map_err(encoding_error)?;
    writer
        .write_event(Event::End(BytesEnd::new("soap:Envelope")))
        .map_err(encoding_error)?;

    String::from_utf8(writer.into_inner()).map_err(encoding_error)
}

/// Generic element parsed from the response document.
#[derive(Debug, Default)]
struct Element {
    name: String,
    nil: bool,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Result<Self, RpcError> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut nil = false;
        for attr in start.attributes() {
            let attr = attr.map_err(|e| RpcError::protocol(format!("bad attribute on <{name}>: {e}")))?;
            if attr.key.local_name().as_ref() == b"nil" {
                let value = attr
                    .unescape_value()
                    .map_err(|e| RpcError::protocol(e.to_string()))?;
                nil = matches!(value.trim(), "true" | "1");
            }
        }
        Ok(Self {
            name,
            nil,
            ..Self::default()
        })
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    fn to_value(&self) -> Value {
        if self.nil {
            Value::Absent
        } else if self.children.is_empty() {
            Value::Scalar(self.text.clone())
        } else {
            Value::Tree(self.to_tree())
        }
    }

    fn to_tree(&self) -> Tree {
        let mut tree = Tree::new();
        for child in &self.children {
            tree.push(child.name.clone(), child.to_value());
        }
        tree
    }
}

fn parse_document(xml: &str) -> Result<Element, RpcError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    fn attach(
        stack: &mut [Element],
        root: &mut Option<Element>,
        element: Element,
    ) -> Result<(), RpcError> {
        if let Some(parent) = stack.last_mut() {
            parent.children.push(element);
            Ok(())
        } else if root.is_none() {
            *root = Some(element);
            Ok(())
        } else {
            Err(RpcError::protocol("more than one document element"))
        }
    }

    loop {
        let event = reader.read_event().map_err(|e| {
            RpcError::protocol(format!("xml error at byte {}: {e}", reader.buffer_position()))
        })?;
        match event {
            Event::Start(start) => stack.push(Element::open(&start)?),
            Event::Empty(start) => {
                let element = Element::open(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| RpcError::protocol("unbalanced end tag"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    let text = text.unescape().map_err(|e| RpcError::protocol(e.to_string()))?;
                    top.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(RpcError::protocol("document ended inside an element"));
    }
    root.ok_or_else(|| RpcError::protocol("no document element"))
}

/// Decode a response document into a tree, a bare scalar, or nothing.
pub fn decode(xml: &str) -> Result<Decoded, RpcError> {
    let envelope = parse_document(xml)?;
    if envelope.name != "Envelope" {
        return Err(RpcError::protocol(format!(
            "expected Envelope, found <{}>",
            envelope.name
        )));
    }
    let body = envelope
        .child("Body")
        .ok_or_else(|| RpcError::protocol("envelope has no Body"))?;

    if body.children.len() > 1 {
        tracing::debug!(
            stage = "decode",
            entries = body.children.len(),
            "body has several entries; using the first"
        );
    }

    let Some(first) = body.children.first() else {
        let text = body.text.trim();
        return Ok(if text.is_empty() {
            Decoded::Empty
        } else {
            Decoded::Scalar(text.to_string())
        });
    };

    if first.nil {
        return Ok(Decoded::Empty);
    }
    if first.children.is_empty() && !first.text.trim().is_empty() {
        return Ok(Decoded::Scalar(first.text.clone()));
    }
    Ok(Decoded::Tree(first.to_tree()))
}
