//! Service endpoints and call timeout.
//!
//! # Environment Variables
//!
//! - `NIMBLE_USER_URL`: user service endpoint
//! - `NIMBLE_TASK_URL`: task service endpoint
//! - `NIMBLE_NAMESPACE`: namespace shared by both services
//! - `NIMBLE_TIMEOUT_MS`: per-call timeout in milliseconds (default: 60000)
//!
//! Unset variables keep the defaults.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_NAMESPACE: &str = "http://ws.nimblev5.nicoceron.com/";
pub const DEFAULT_USER_URL: &str = "http://10.0.2.2:8080/nimblev5-1.0-SNAPSHOT/UserService";
pub const DEFAULT_TASK_URL: &str = "http://10.0.2.2:8080/nimblev5-1.0-SNAPSHOT/TaskService";
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// One remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub url: String,
    pub namespace: String,
}

impl Endpoint {
    pub fn new(url: &str, namespace: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            namespace: namespace.to_string(),
        }
    }
}

/// Read-only configuration shared by every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub user: Endpoint,
    pub task: Endpoint,
    pub timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            user: Endpoint::new(DEFAULT_USER_URL, DEFAULT_NAMESPACE),
            task: Endpoint::new(DEFAULT_TASK_URL, DEFAULT_NAMESPACE),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl ServiceConfig {
    /// Both services under one base URL, as `{base}/UserService` and
    /// `{base}/TaskService`.
    pub fn with_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            user: Endpoint::new(&format!("{base}/UserService"), DEFAULT_NAMESPACE),
            task: Endpoint::new(&format!("{base}/TaskService"), DEFAULT_NAMESPACE),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Loads overrides from environment variables on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if `NIMBLE_TIMEOUT_MS` is not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(namespace) = lookup("NIMBLE_NAMESPACE") {
            config.user.namespace = namespace.clone();
            config.task.namespace = namespace;
        }
        if let Some(url) = lookup("NIMBLE_USER_URL") {
            config.user.url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = lookup("NIMBLE_TASK_URL") {
            config.task.url = url.trim_end_matches('/').to_string();
        }
        if let Some(raw) = lookup("NIMBLE_TIMEOUT_MS") {
            config.timeout_ms = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or(ConfigError::InvalidValue {
                    var: "NIMBLE_TIMEOUT_MS",
                    value: raw,
                })?;
        }
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
