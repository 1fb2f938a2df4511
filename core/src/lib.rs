//! Client core for the Nimble user and task SOAP services.
//!
//! # Overview
//! Bridges typed operations (`login`, `register`, `list_tasks_for_user`,
//! `create_task`, `delete_task`, `update_task_status`) to a remote service
//! whose responses are loosely shaped XML trees. Responses are decoded into
//! a `Tree`, searched for a fault or payload by the `navigator`, and turned
//! into `User` / `Task` values by the `mapper`.
//!
//! # Design
//! - `NimbleClient` is sans-IO: `build_*` produces an `HttpRequest`,
//!   `parse_*` consumes an `HttpResponse`.
//! - `ServiceAdapter` pairs it with a `Transport` and exposes async methods.
//! - Every failure is an `RpcError` value; bad records inside a list are
//!   dropped and traced rather than failing the call.
//! - The library emits `tracing` events and never installs a subscriber.

pub mod adapter;
pub mod client;
pub mod coerce;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod mapper;
pub mod navigator;
pub mod transport;
pub mod tree;
pub mod types;

pub use adapter::ServiceAdapter;
pub use client::NimbleClient;
pub use config::{Endpoint, ServiceConfig};
pub use error::{ConfigError, FailureKind, RpcError};
pub use http::{HttpRequest, HttpResponse};
pub use transport::{Transport, UreqTransport};
pub use tree::{Tree, Value};
pub use types::{Task, TaskPriority, TaskStatus, User};
