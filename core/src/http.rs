//! HTTP exchange types for the host-does-IO pattern.
//!
//! # Design
//! Every remote method is a single POST, so a request is just a target URL,
//! headers and an XML body. `NimbleClient` builds `HttpRequest` values and
//! parses `HttpResponse` values without touching the network; a `Transport`
//! (or the host itself) performs the exchange in between.

/// An HTTP POST described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
///
/// The status is informational: SOAP faults arrive with HTTP 500 and are
/// still decoded from the body.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
