//! Minimal SOAP 1.1 request reading and response writing for the mock.

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// A decoded request: the body element's name and its child parameters.
/// `None` marks an `xsi:nil` parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapCall {
    pub method: String,
    pub params: Vec<(String, Option<String>)>,
}

impl SoapCall {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(|v| v.trim().parse().ok())
    }
}

fn local_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

fn is_nil(start: &BytesStart<'_>) -> bool {
    start.attributes().flatten().any(|attr| {
        attr.key.local_name().as_ref() == b"nil" && attr.value.as_ref() == b"true"
    })
}

#[derive(Default)]
struct CallReader {
    depth: usize,
    in_body: bool,
    method: Option<String>,
    params: Vec<(String, Option<String>)>,
    current: Option<(String, Option<String>)>,
}

impl CallReader {
    fn open(&mut self, start: &BytesStart<'_>) -> Result<(), String> {
        self.depth += 1;
        let name = local_name(start);
        match self.depth {
            1 if name != "Envelope" => return Err(format!("expected Envelope, got {name}")),
            2 => self.in_body = name == "Body",
            3 if self.in_body && self.method.is_none() => self.method = Some(name),
            4 if self.in_body => {
                let value = if is_nil(start) { None } else { Some(String::new()) };
                self.current = Some((name, value));
            }
            _ => {}
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        if self.depth == 4 {
            if let Some((_, Some(value))) = self.current.as_mut() {
                value.push_str(text);
            }
        }
    }

    fn close(&mut self) {
        if self.depth == 4 {
            if let Some(param) = self.current.take() {
                self.params.push(param);
            }
        }
        self.depth = self.depth.saturating_sub(1);
    }
}

/// Read the operation name and flat parameter list out of a request envelope.
pub fn parse_call(xml: &str) -> Result<SoapCall, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut state = CallReader::default();

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(start) => state.open(&start)?,
            Event::Empty(start) => {
                state.open(&start)?;
                state.close();
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| e.to_string())?;
                state.text(&text);
            }
            Event::End(_) => state.close(),
            Event::Eof => break,
            _ => {}
        }
    }

    let method = state.method.ok_or("request has no body element")?;
    Ok(SoapCall {
        method,
        params: state.params,
    })
}

/// Child content of a response element, written as nested elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String, String),
    Group(String, Vec<Node>),
    Nil(String),
}

impl Node {
    pub fn text(name: &str, value: impl ToString) -> Self {
        Node::Text(name.to_string(), value.to_string())
    }

    pub fn group(name: &str, children: Vec<Node>) -> Self {
        Node::Group(name.to_string(), children)
    }

    fn write(&self, out: &mut String) {
        match self {
            Node::Text(name, value) => {
                out.push_str(&format!("<{name}>{}</{name}>", escape(value.as_str())));
            }
            Node::Group(name, children) => {
                out.push_str(&format!("<{name}>"));
                for child in children {
                    child.write(out);
                }
                out.push_str(&format!("</{name}>"));
            }
            Node::Nil(name) => {
                out.push_str(&format!(
                    "<{name} xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" xsi:nil=\"true\"/>"
                ));
            }
        }
    }
}

fn envelope(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" ?><S:Envelope xmlns:S=\"{SOAP_ENV_NS}\"><S:Body>{body}</S:Body></S:Envelope>"
    )
}

/// `<ns2:{method}Response>` wrapping the given children.
pub fn response(namespace: &str, method: &str, children: &[Node]) -> String {
    let mut inner = String::new();
    for child in children {
        child.write(&mut inner);
    }
    envelope(&format!(
        "<ns2:{method}Response xmlns:ns2=\"{}\">{inner}</ns2:{method}Response>",
        escape(namespace)
    ))
}

pub fn fault(code: &str, message: &str) -> String {
    envelope(&format!(
        "<S:Fault><faultcode>S:{code}</faultcode><faultstring>{}</faultstring></S:Fault>",
        escape(message)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_method_and_params() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
            <soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"
                           xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
              <soap:Header/>
              <soap:Body>
                <n0:updateTask xmlns:n0="urn:test">
                  <taskId>4</taskId>
                  <title>Fish &amp; chips</title>
                  <description></description>
                  <dueDate xsi:nil="true"/>
                </n0:updateTask>
              </soap:Body>
            </soap:Envelope>"#;
        let call = parse_call(xml).unwrap();
        assert_eq!(call.method, "updateTask");
        assert_eq!(call.get_i64("taskId"), Some(4));
        assert_eq!(call.get("title"), Some("Fish & chips"));
        assert_eq!(call.get("description"), Some(""));
        assert_eq!(call.get("dueDate"), None);
        assert_eq!(call.params.len(), 4);
    }

    #[test]
    fn rejects_non_envelope() {
        assert!(parse_call("<html/>").is_err());
        assert!(parse_call("<Envelope><Body/></Envelope>").is_err());
    }

    #[test]
    fn writes_response_and_fault() {
        let xml = response(
            "urn:test",
            "loginUser",
            &[Node::group("return", vec![Node::text("userId", 1), Node::Nil("email".into())])],
        );
        assert!(xml.contains("<ns2:loginUserResponse xmlns:ns2=\"urn:test\">"));
        assert!(xml.contains("<return><userId>1</userId><email "));

        let xml = fault("Server", "a < b");
        assert!(xml.contains("<faultcode>S:Server</faultcode>"));
        assert!(xml.contains("<faultstring>a &lt; b</faultstring>"));
    }
}
