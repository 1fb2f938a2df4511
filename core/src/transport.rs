//! Network exchange for one `HttpRequest`.
//!
//! # Design
//! `Transport` is the seam between the sans-IO client and the network. The
//! default implementation drives a blocking `ureq` agent on tokio's blocking
//! pool, so an awaiting caller never blocks its own thread. The agent's
//! global timeout bounds each call. Non-2xx statuses are returned as data,
//! since SOAP faults travel with HTTP 500. No retries happen here.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::RpcError;
use crate::http::{HttpRequest, HttpResponse};

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, RpcError>;
}

/// `ureq`-backed transport.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }

    /// Perform the exchange on the current thread.
    pub fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, RpcError> {
        let mut builder = self.agent.post(request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let mut response = builder
            .send(request.body.as_bytes())
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let bytes = response
            .body_mut()
            .read_to_vec()
            .map_err(transport_error)?;
        let body = String::from_utf8(bytes).map_err(|e| RpcError::Protocol {
            message: format!("response body is not valid UTF-8: {e}"),
            status: Some(status),
        })?;

        tracing::trace!(stage = "transport", status, body = %body, "raw response");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl Transport for UreqTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, RpcError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| RpcError::Transport {
            message: "no tokio runtime to run the request on".to_string(),
            timed_out: false,
        })?;
        let transport = self.clone();
        handle
            .spawn_blocking(move || transport.execute(&request))
            .await
            .map_err(|e| RpcError::Transport {
                message: format!("transport task did not complete: {e}"),
                timed_out: false,
            })?
    }
}

fn transport_error(err: ureq::Error) -> RpcError {
    let timed_out = matches!(err, ureq::Error::Timeout(_));
    RpcError::Transport {
        message: err.to_string(),
        timed_out,
    }
}
