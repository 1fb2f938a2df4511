//! Async façade: one method per remote operation.
//!
//! # Design
//! Each call walks encoding, sent, decoding, navigating and mapping, and
//! ends in success or a classified `RpcError`. Stages are emitted as
//! `stage` fields inside an `rpc` span named after the method, so a trace
//! shows exactly where a call stopped. Calls share nothing mutable: the
//! adapter holds read-only configuration and a transport, and can be cloned
//! into as many concurrent tasks as needed. There is no retry and no
//! caching. Dropping a returned future abandons the call; a create, update
//! or delete abandoned that way may or may not have reached the server.

use tracing::Instrument;

use crate::client::{
    NimbleClient, CREATE_TASK, DELETE_TASK, GET_TASKS_FOR_USER, LOGIN_USER, REGISTER_USER,
    UPDATE_TASK,
};
use crate::config::ServiceConfig;
use crate::error::RpcError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{Task, TaskPriority, TaskStatus, User};

#[derive(Debug, Clone)]
pub struct ServiceAdapter<T> {
    client: NimbleClient,
    transport: T,
}

impl ServiceAdapter<UreqTransport> {
    /// Adapter over HTTP with the configured timeout.
    pub fn new(config: ServiceConfig) -> Self {
        let transport = UreqTransport::new(config.timeout());
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> ServiceAdapter<T> {
    pub fn with_transport(config: ServiceConfig, transport: T) -> Self {
        Self {
            client: NimbleClient::new(config),
            transport,
        }
    }

    pub fn client(&self) -> &NimbleClient {
        &self.client
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<User, RpcError> {
        self.call(
            LOGIN_USER,
            |c| c.build_login(username, password),
            |c, r| c.parse_login(r),
        )
        .await
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, RpcError> {
        self.call(
            REGISTER_USER,
            |c| c.build_register(username, email, password),
            |c, r| c.parse_register(r),
        )
        .await
    }

    pub async fn list_tasks_for_user(&self, user_id: i64) -> Result<Vec<Task>, RpcError> {
        self.call(
            GET_TASKS_FOR_USER,
            |c| c.build_list_tasks(user_id),
            |c, r| c.parse_list_tasks(r),
        )
        .await
    }

    pub async fn create_task(
        &self,
        user_id: i64,
        title: &str,
        description: Option<&str>,
        priority: TaskPriority,
    ) -> Result<Task, RpcError> {
        self.call(
            CREATE_TASK,
            |c| c.build_create_task(user_id, title, description, priority),
            |c, r| c.parse_create_task(r),
        )
        .await
    }

    pub async fn delete_task(&self, task_id: i64) -> Result<bool, RpcError> {
        self.call(
            DELETE_TASK,
            |c| c.build_delete_task(task_id),
            |c, r| c.parse_delete_task(r),
        )
        .await
    }

    /// Callers are expected to request forward transitions only
    /// (see `TaskStatus::next`); the adapter sends whatever it is given.
    pub async fn update_task_status(
        &self,
        task: &Task,
        new_status: TaskStatus,
    ) -> Result<Task, RpcError> {
        self.call(
            UPDATE_TASK,
            |c| c.build_update_task_status(task, new_status),
            |c, r| c.parse_update_task_status(r),
        )
        .await
    }

    async fn call<R>(
        &self,
        method: &'static str,
        build: impl FnOnce(&NimbleClient) -> Result<HttpRequest, RpcError>,
        parse: impl FnOnce(&NimbleClient, HttpResponse) -> Result<R, RpcError>,
    ) -> Result<R, RpcError> {
        let span = tracing::debug_span!("rpc", method);
        async move {
            let result = self.exchange(build, parse).await;
            match &result {
                Ok(_) => tracing::debug!(stage = "success"),
                Err(err) => tracing::warn!(stage = "failed", kind = ?err.kind(), error = %err),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn exchange<R>(
        &self,
        build: impl FnOnce(&NimbleClient) -> Result<HttpRequest, RpcError>,
        parse: impl FnOnce(&NimbleClient, HttpResponse) -> Result<R, RpcError>,
    ) -> Result<R, RpcError> {
        let request = build(&self.client)?;
        tracing::debug!(stage = "sent", url = %request.url);
        let response = self.transport.send(request).await?;
        tracing::debug!(stage = "received", status = response.status, bytes = response.body.len());
        parse(&self.client, response)
    }
}
