//! Stateless request builder and response parser for the user and task
//! services.
//!
//! # Design
//! `NimbleClient` holds only read-only configuration. Each remote method is
//! split into a `build_*` method that encodes an `HttpRequest` and a
//! `parse_*` method that consumes the `HttpResponse`. The caller (or
//! `ServiceAdapter` with a `Transport`) executes the round trip in between,
//! so everything here is deterministic and testable without a network.
//!
//! Parsing runs decode, then navigate, then map. Faults and undecodable
//! bodies fail the whole call; a bad record inside a list only drops that
//! record.

use crate::coerce::to_truth;
use crate::config::{Endpoint, ServiceConfig};
use crate::envelope::{self, Call, Decoded};
use crate::error::RpcError;
use crate::http::{HttpRequest, HttpResponse};
use crate::mapper::{map_task, map_user, TASK_SHAPE, USER_SHAPE};
use crate::navigator::{self, Payload, RecordShape};
use crate::tree::Tree;
use crate::types::{Task, TaskPriority, TaskStatus, User};

pub const LOGIN_USER: &str = "loginUser";
pub const REGISTER_USER: &str = "registerUser";
pub const GET_TASKS_FOR_USER: &str = "getTasksForUser";
pub const CREATE_TASK: &str = "createTaskWithoutDate";
pub const DELETE_TASK: &str = "deleteTask";
pub const UPDATE_TASK: &str = "updateTask";

#[derive(Debug, Clone)]
pub struct NimbleClient {
    config: ServiceConfig,
}

impl NimbleClient {
    pub fn new(config: ServiceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn build_login(&self, username: &str, password: &str) -> Result<HttpRequest, RpcError> {
        let call = Call::new(&self.config.user.namespace, LOGIN_USER)
            .param("username", username)
            .param("plainPassword", password);
        build_request(&self.config.user, &call)
    }

    pub fn build_register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<HttpRequest, RpcError> {
        let call = Call::new(&self.config.user.namespace, REGISTER_USER)
            .param("username", username)
            .param("email", email)
            .param("plainPassword", password);
        build_request(&self.config.user, &call)
    }

    pub fn build_list_tasks(&self, user_id: i64) -> Result<HttpRequest, RpcError> {
        let call = Call::new(&self.config.task.namespace, GET_TASKS_FOR_USER).param("userId", user_id);
        build_request(&self.config.task, &call)
    }

    /// An absent description is sent as an empty string.
    pub fn build_create_task(
        &self,
        user_id: i64,
        title: &str,
        description: Option<&str>,
        priority: TaskPriority,
    ) -> Result<HttpRequest, RpcError> {
        let call = Call::new(&self.config.task.namespace, CREATE_TASK)
            .param("userId", user_id)
            .param("title", title)
            .param("description", description.unwrap_or_default())
            .param("priority", priority.as_wire());
        build_request(&self.config.task, &call)
    }

    pub fn build_delete_task(&self, task_id: i64) -> Result<HttpRequest, RpcError> {
        let call = Call::new(&self.config.task.namespace, DELETE_TASK).param("taskId", task_id);
        build_request(&self.config.task, &call)
    }

    /// Resends the task's other fields unchanged. `dueDate` is always sent
    /// as an explicit nil: the server binds these parameters by position.
    pub fn build_update_task_status(
        &self,
        task: &Task,
        new_status: TaskStatus,
    ) -> Result<HttpRequest, RpcError> {
        let call = Call::new(&self.config.task.namespace, UPDATE_TASK)
            .param("taskId", task.task_id)
            .param("title", task.title.as_deref().unwrap_or_default())
            .param("description", task.description.as_deref().unwrap_or_default())
            .null_param("dueDate")
            .param("priority", task.priority_or_default().as_wire())
            .param("status", new_status.as_wire());
        build_request(&self.config.task, &call)
    }

    pub fn parse_login(&self, response: HttpResponse) -> Result<User, RpcError> {
        parse_record(&response, &USER_SHAPE, map_user, "user")
    }

    pub fn parse_register(&self, response: HttpResponse) -> Result<User, RpcError> {
        parse_record(&response, &USER_SHAPE, map_user, "user")
    }

    pub fn parse_list_tasks(&self, response: HttpResponse) -> Result<Vec<Task>, RpcError> {
        match decode_response(&response)? {
            Decoded::Tree(tree) => {
                tracing::debug!(stage = "navigating", record = "task", list = true);
                let tasks = navigator::collect_records(&tree, &TASK_SHAPE, map_task)?;
                tracing::debug!(stage = "mapping", record = "task", count = tasks.len());
                Ok(tasks)
            }
            Decoded::Empty => Ok(Vec::new()),
            Decoded::Scalar(value) => Err(RpcError::Mapping(format!(
                "expected task records, found scalar {value:?}"
            ))),
        }
    }

    pub fn parse_create_task(&self, response: HttpResponse) -> Result<Task, RpcError> {
        parse_record(&response, &TASK_SHAPE, map_task, "task")
    }

    pub fn parse_update_task_status(&self, response: HttpResponse) -> Result<Task, RpcError> {
        parse_record(&response, &TASK_SHAPE, map_task, "task")
    }

    pub fn parse_delete_task(&self, response: HttpResponse) -> Result<bool, RpcError> {
        let raw = match decode_response(&response)? {
            Decoded::Scalar(value) => Some(value),
            Decoded::Tree(tree) => {
                tracing::debug!(stage = "navigating", record = "truth");
                navigator::locate_truth(&tree)?.map(str::to_string)
            }
            Decoded::Empty => None,
        };
        tracing::debug!(stage = "mapping", record = "truth");
        to_truth(raw.as_deref()).ok_or_else(|| {
            RpcError::Mapping(format!("expected a truth value, found {raw:?}"))
        })
    }
}

fn build_request(endpoint: &Endpoint, call: &Call) -> Result<HttpRequest, RpcError> {
    tracing::debug!(stage = "encoding", method = %call.method, url = %endpoint.url);
    let body = envelope::encode(call)?;
    Ok(HttpRequest {
        url: endpoint.url.clone(),
        headers: vec![
            (
                "content-type".to_string(),
                "text/xml; charset=utf-8".to_string(),
            ),
            ("SOAPAction".to_string(), format!("\"{}\"", call.action())),
        ],
        body,
    })
}

fn decode_response(response: &HttpResponse) -> Result<Decoded, RpcError> {
    let decoded = envelope::decode(&response.body).map_err(|err| match err {
        RpcError::Protocol { message, .. } => RpcError::Protocol {
            message,
            status: Some(response.status),
        },
        other => other,
    })?;
    if !response.is_success() {
        tracing::debug!(stage = "decoding", status = response.status, "non-success status with decodable body");
    }
    tracing::debug!(stage = "decoding", shape = %describe(&decoded));
    Ok(decoded)
}

fn describe(decoded: &Decoded) -> String {
    match decoded {
        Decoded::Tree(tree) => format!("tree{:?}", tree.names()),
        Decoded::Scalar(_) => "scalar".to_string(),
        Decoded::Empty => "empty".to_string(),
    }
}

fn parse_record<T>(
    response: &HttpResponse,
    shape: &RecordShape,
    map: fn(&Tree) -> Option<T>,
    what: &str,
) -> Result<T, RpcError> {
    let tree = match decode_response(response)? {
        Decoded::Tree(tree) => tree,
        Decoded::Scalar(value) => {
            return Err(RpcError::Mapping(format!(
                "expected a {what} record, found scalar {value:?}"
            )))
        }
        Decoded::Empty => return Err(RpcError::Mapping(format!("expected a {what} record, body is empty"))),
    };
    tracing::debug!(stage = "navigating", record = what);
    match navigator::locate_single(&tree, shape)? {
        Payload::Node(node) => {
            tracing::debug!(stage = "mapping", record = what);
            map(node).ok_or_else(|| RpcError::Mapping(format!("{what} record is missing required fields")))
        }
        Payload::Scalar(value) => Err(RpcError::Mapping(format!(
            "expected a {what} record, found scalar {value:?}"
        ))),
        Payload::Nothing => Err(RpcError::Mapping(format!("no {what} record in response"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::SOAP_ENV_NS;

    fn client() -> NimbleClient {
        NimbleClient::new(ServiceConfig::with_base_url("http://localhost:3000"))
    }

    fn soap(body: &str, status: u16) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: format!(
                r#"<S:Envelope xmlns:S="{SOAP_ENV_NS}"><S:Body>{body}</S:Body></S:Envelope>"#
            ),
        }
    }

    fn sample_task() -> Task {
        Task {
            task_id: 7,
            user_id: 3,
            title: Some("Buy milk".to_string()),
            description: None,
            due_date: None,
            priority: None,
            status: Some(TaskStatus::Pending),
            created_date: None,
            last_modified_date: None,
        }
    }

    #[test]
    fn build_login_targets_user_service() {
        let req = client().build_login("ann", "pw").unwrap();
        assert_eq!(req.url, "http://localhost:3000/UserService");
        assert_eq!(
            req.header("SOAPAction"),
            Some("\"http://ws.nimblev5.nicoceron.com/loginUser\"")
        );
        assert_eq!(req.header("Content-Type"), Some("text/xml; charset=utf-8"));
        assert!(req.body.contains("<username>ann</username><plainPassword>pw</plainPassword>"));
    }

    #[test]
    fn build_create_task_sends_empty_description() {
        let req = client()
            .build_create_task(3, "Buy milk", None, TaskPriority::High)
            .unwrap();
        assert_eq!(req.url, "http://localhost:3000/TaskService");
        assert!(req.body.contains(
            "<userId>3</userId><title>Buy milk</title><description></description><priority>HIGH</priority>"
        ));
    }

    #[test]
    fn build_update_sends_nil_due_date_and_default_priority() {
        let req = client()
            .build_update_task_status(&sample_task(), TaskStatus::InProgress)
            .unwrap();
        assert!(req.body.contains(
            r#"<taskId>7</taskId><title>Buy milk</title><description></description><dueDate xsi:nil="true"/><priority>MEDIUM</priority><status>IN_PROGRESS</status>"#
        ));
    }

    #[test]
    fn parse_login_wrapped_user() {
        let resp = soap(
            "<ns2:loginUserResponse xmlns:ns2=\"urn:x\"><return><userId>1</userId><username>ann</username><email>a@x.io</email></return></ns2:loginUserResponse>",
            200,
        );
        let user = client().parse_login(resp).unwrap();
        assert_eq!(user.user_id, 1);
        assert_eq!(user.email, "a@x.io");
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn parse_login_traces_navigating_and_mapping() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let resp = soap(
            "<ns2:loginUserResponse xmlns:ns2=\"urn:x\"><return><userId>1</userId><username>ann</username><email>a@x.io</email></return></ns2:loginUserResponse>",
            200,
        );
        tracing::subscriber::with_default(subscriber, || {
            client().parse_login(resp).unwrap();
        });

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let decoding = logs.find("stage=\"decoding\"").expect("decoding logged");
        let navigating = logs.find("stage=\"navigating\"").expect("navigating logged");
        let mapping = logs.find("stage=\"mapping\"").expect("mapping logged");
        assert!(decoding < navigating && navigating < mapping, "{logs}");
    }

    #[test]
    fn parse_login_fault() {
        let resp = soap(
            "<S:Fault><faultcode>S:Server</faultcode><faultstring>Invalid credentials</faultstring></S:Fault>",
            500,
        );
        let err = client().parse_login(resp).unwrap_err();
        assert!(matches!(err, RpcError::RemoteFault(ref m) if m == "Invalid credentials"));
    }

    #[test]
    fn parse_login_empty_response_is_mapping_error() {
        let err = client()
            .parse_login(soap("<loginUserResponse/>", 200))
            .unwrap_err();
        assert!(matches!(err, RpcError::Mapping(_)));
    }

    #[test]
    fn parse_garbage_is_protocol_error_with_status() {
        let resp = HttpResponse {
            status: 502,
            headers: Vec::new(),
            body: "Bad Gateway".to_string(),
        };
        let err = client().parse_create_task(resp).unwrap_err();
        assert!(matches!(err, RpcError::Protocol { status: Some(502), .. }));
    }

    #[test]
    fn parse_list_tasks_in_order() {
        let resp = soap(
            "<r>\
               <return><taskId>1</taskId><title>a</title><user><userId>3</userId></user></return>\
               <return><taskId>bad</taskId><title>b</title></return>\
               <return><taskId>2</taskId><title>c</title><userId>3</userId></return>\
             </r>",
            200,
        );
        let tasks = client().parse_list_tasks(resp).unwrap();
        let ids: Vec<i64> = tasks.iter().map(|t| t.task_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn parse_list_tasks_empty_body() {
        assert!(client().parse_list_tasks(soap("", 200)).unwrap().is_empty());
        assert!(client()
            .parse_list_tasks(soap("<getTasksForUserResponse/>", 200))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn parse_delete_variants() {
        let c = client();
        assert!(c
            .parse_delete_task(soap("<r><return>true</return></r>", 200))
            .unwrap());
        assert!(!c
            .parse_delete_task(soap("<r><return>false</return></r>", 200))
            .unwrap());
        assert!(c.parse_delete_task(soap("<r>true</r>", 200)).unwrap());
        assert!(matches!(
            c.parse_delete_task(soap("<r/>", 200)),
            Err(RpcError::Mapping(_))
        ));
        assert!(matches!(c.parse_delete_task(soap("", 200)), Err(RpcError::Mapping(_))));
        assert!(matches!(
            c.parse_delete_task(soap("<r><return>maybe</return></r>", 200)),
            Err(RpcError::Mapping(_))
        ));
    }
}
