//! In-memory stand-in for the Nimble UserService and TaskService.
//!
//! Speaks SOAP 1.1 over `POST /UserService` and `POST /TaskService`.
//! Faults go out with HTTP 500, like a JAX-WS endpoint.

pub mod soap;

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use chrono::{SecondsFormat, Utc};
use tokio::{net::TcpListener, sync::RwLock};

use soap::{Node, SoapCall};

pub const NAMESPACE: &str = "http://ws.nimblev5.nicoceron.com/";

/// How records are laid out inside a response element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// JAX-WS style: every record under `<return>`, task owner as `<user><userId>`.
    #[default]
    Wrapped,
    /// Fields directly under the response element, lists as `<task>` children,
    /// task owner as a flat `<userId>`.
    Flat,
}

impl Layout {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "wrapped" => Some(Layout::Wrapped),
            "flat" => Some(Layout::Flat),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_date: String,
}

#[derive(Clone, Debug)]
pub struct Task {
    pub task_id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub due_date: Option<String>,
    pub priority: String,
    pub status: String,
    pub created_date: String,
    pub last_modified_date: String,
}

#[derive(Debug, Default)]
pub struct Store {
    users: BTreeMap<i64, User>,
    tasks: BTreeMap<i64, Task>,
    last_user_id: i64,
    last_task_id: i64,
}

pub struct AppState {
    layout: Layout,
    store: RwLock<Store>,
}

pub type Db = Arc<AppState>;

/// A SOAP fault: `faultcode` suffix and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub code: &'static str,
    pub message: String,
}

impl Fault {
    fn client(message: impl Into<String>) -> Self {
        Self {
            code: "Client",
            message: message.into(),
        }
    }

    fn server(message: impl Into<String>) -> Self {
        Self {
            code: "Server",
            message: message.into(),
        }
    }
}

type Reply = Result<Vec<Node>, Fault>;

pub fn app() -> Router {
    app_with(Layout::default())
}

pub fn app_with(layout: Layout) -> Router {
    let db: Db = Arc::new(AppState {
        layout,
        store: RwLock::new(Store::default()),
    });
    Router::new()
        .route("/UserService", post(user_service))
        .route("/TaskService", post(task_service))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, layout: Layout) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(layout)).await
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, false)
}

fn required<'a>(call: &'a SoapCall, name: &str) -> Result<&'a str, Fault> {
    match call.get(name) {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Fault::client(format!("missing parameter: {name}"))),
    }
}

fn required_id(call: &SoapCall, name: &str) -> Result<i64, Fault> {
    call.get_i64(name)
        .ok_or_else(|| Fault::client(format!("missing or invalid parameter: {name}")))
}

fn user_fields(user: &User) -> Vec<Node> {
    vec![
        Node::text("userId", user.user_id),
        Node::text("username", &user.username),
        Node::text("email", &user.email),
        Node::text("createdDate", &user.created_date),
    ]
}

fn task_fields(task: &Task, owner: Option<&User>, layout: Layout) -> Vec<Node> {
    let mut fields = vec![Node::text("taskId", task.task_id)];
    match (layout, owner) {
        (Layout::Wrapped, Some(owner)) => fields.push(Node::group(
            "user",
            vec![
                Node::text("userId", owner.user_id),
                Node::text("username", &owner.username),
            ],
        )),
        _ => fields.push(Node::text("userId", task.user_id)),
    }
    fields.push(Node::text("title", &task.title));
    fields.push(Node::text("description", &task.description));
    match &task.due_date {
        Some(due) => fields.push(Node::text("dueDate", due)),
        None => fields.push(Node::Nil("dueDate".to_string())),
    }
    fields.push(Node::text("priority", &task.priority));
    fields.push(Node::text("status", &task.status));
    fields.push(Node::text("createdDate", &task.created_date));
    fields.push(Node::text("lastModifiedDate", &task.last_modified_date));
    fields
}

/// One record in the configured layout.
fn single(layout: Layout, fields: Vec<Node>) -> Vec<Node> {
    match layout {
        Layout::Wrapped => vec![Node::group("return", fields)],
        Layout::Flat => fields,
    }
}

fn reply(method: &str, result: Reply) -> Response {
    let xml_header = [(header::CONTENT_TYPE, "text/xml; charset=utf-8")];
    match result {
        Ok(children) => (
            StatusCode::OK,
            xml_header,
            soap::response(NAMESPACE, method, &children),
        )
            .into_response(),
        Err(fault) => {
            tracing::info!(method, code = fault.code, message = %fault.message, "fault");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                xml_header,
                soap::fault(fault.code, &fault.message),
            )
                .into_response()
        }
    }
}

fn read_call(body: &Bytes) -> Result<SoapCall, Fault> {
    let text = std::str::from_utf8(body).map_err(|_| Fault::client("request is not UTF-8"))?;
    soap::parse_call(text).map_err(|e| Fault::client(format!("malformed envelope: {e}")))
}

async fn user_service(State(db): State<Db>, body: Bytes) -> Response {
    let call = match read_call(&body) {
        Ok(call) => call,
        Err(fault) => return reply("unknown", Err(fault)),
    };
    tracing::debug!(service = "user", method = %call.method, "request");
    let result = match call.method.as_str() {
        "loginUser" => login_user(&db, &call).await,
        "registerUser" => register_user(&db, &call).await,
        other => Err(Fault::client(format!("unknown operation: {other}"))),
    };
    reply(&call.method, result)
}

async fn task_service(State(db): State<Db>, body: Bytes) -> Response {
    let call = match read_call(&body) {
        Ok(call) => call,
        Err(fault) => return reply("unknown", Err(fault)),
    };
    tracing::debug!(service = "task", method = %call.method, "request");
    let result = match call.method.as_str() {
        "getTasksForUser" => tasks_for_user(&db, &call).await,
        "createTaskWithoutDate" => create_task(&db, &call).await,
        "deleteTask" => delete_task(&db, &call).await,
        "updateTask" => update_task(&db, &call).await,
        other => Err(Fault::client(format!("unknown operation: {other}"))),
    };
    reply(&call.method, result)
}

async fn login_user(db: &Db, call: &SoapCall) -> Reply {
    let username = required(call, "username")?;
    let password = required(call, "plainPassword")?;
    let store = db.store.read().await;
    let user = store
        .users
        .values()
        .find(|u| u.username == username && u.password == password)
        .ok_or_else(|| Fault::server("Invalid credentials"))?;
    Ok(single(db.layout, user_fields(user)))
}

async fn register_user(db: &Db, call: &SoapCall) -> Reply {
    let username = required(call, "username")?.trim().to_string();
    let email = required(call, "email")?.trim().to_string();
    let password = required(call, "plainPassword")?.to_string();

    let mut store = db.store.write().await;
    if store
        .users
        .values()
        .any(|u| u.username == username || u.email == email)
    {
        return Err(Fault::server("Username or email already exists"));
    }
    store.last_user_id += 1;
    let user = User {
        user_id: store.last_user_id,
        username,
        email,
        password,
        created_date: now(),
    };
    let fields = user_fields(&user);
    store.users.insert(user.user_id, user);
    Ok(single(db.layout, fields))
}

async fn tasks_for_user(db: &Db, call: &SoapCall) -> Reply {
    let user_id = required_id(call, "userId")?;
    let store = db.store.read().await;
    let owner = store.users.get(&user_id);
    let element = match db.layout {
        Layout::Wrapped => "return",
        Layout::Flat => "task",
    };
    Ok(store
        .tasks
        .values()
        .filter(|t| t.user_id == user_id)
        .map(|t| Node::group(element, task_fields(t, owner, db.layout)))
        .collect())
}

async fn create_task(db: &Db, call: &SoapCall) -> Reply {
    let user_id = required_id(call, "userId")?;
    let title = required(call, "title")?.to_string();
    let description = call.get("description").unwrap_or_default().to_string();
    let priority = call.get("priority").unwrap_or("MEDIUM").to_string();

    let mut store = db.store.write().await;
    if !store.users.contains_key(&user_id) {
        return Err(Fault::server(format!("User not found: {user_id}")));
    }
    store.last_task_id += 1;
    let stamp = now();
    let task = Task {
        task_id: store.last_task_id,
        user_id,
        title,
        description,
        due_date: None,
        priority,
        status: "PENDING".to_string(),
        created_date: stamp.clone(),
        last_modified_date: stamp,
    };
    let fields = task_fields(&task, store.users.get(&user_id), db.layout);
    store.tasks.insert(task.task_id, task);
    Ok(single(db.layout, fields))
}

async fn delete_task(db: &Db, call: &SoapCall) -> Reply {
    let task_id = required_id(call, "taskId")?;
    let removed = db.store.write().await.tasks.remove(&task_id).is_some();
    Ok(vec![Node::text("return", removed)])
}

async fn update_task(db: &Db, call: &SoapCall) -> Reply {
    let task_id = required_id(call, "taskId")?;
    let mut store = db.store.write().await;
    let task = store
        .tasks
        .get_mut(&task_id)
        .ok_or_else(|| Fault::server(format!("Task not found: {task_id}")))?;

    if let Some(title) = call.get("title").filter(|t| !t.trim().is_empty()) {
        task.title = title.to_string();
    }
    if let Some(description) = call.get("description") {
        task.description = description.to_string();
    }
    task.due_date = call.get("dueDate").map(str::to_string);
    if let Some(priority) = call.get("priority") {
        task.priority = priority.to_string();
    }
    if let Some(status) = call.get("status") {
        task.status = status.to_string();
    }
    task.last_modified_date = now();

    let task = task.clone();
    Ok(single(
        db.layout,
        task_fields(&task, store.users.get(&task.user_id), db.layout),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(method: &str, params: &[(&str, Option<&str>)]) -> SoapCall {
        SoapCall {
            method: method.to_string(),
            params: params
                .iter()
                .map(|(n, v)| (n.to_string(), v.map(str::to_string)))
                .collect(),
        }
    }

    fn state(layout: Layout) -> Db {
        Arc::new(AppState {
            layout,
            store: RwLock::new(Store::default()),
        })
    }

    async fn seed_user(db: &Db) {
        register_user(
            db,
            &call(
                "registerUser",
                &[
                    ("username", Some("ana")),
                    ("email", Some("ana@example.com")),
                    ("plainPassword", Some("pw")),
                ],
            ),
        )
        .await
        .unwrap();
    }

    #[test]
    fn layout_names() {
        assert_eq!(Layout::from_name("Flat"), Some(Layout::Flat));
        assert_eq!(Layout::from_name(" wrapped "), Some(Layout::Wrapped));
        assert_eq!(Layout::from_name("other"), None);
    }

    #[tokio::test]
    async fn register_assigns_increasing_ids_and_rejects_duplicates() {
        let db = state(Layout::Wrapped);
        seed_user(&db).await;
        let again = register_user(
            &db,
            &call(
                "registerUser",
                &[
                    ("username", Some("ana")),
                    ("email", Some("other@example.com")),
                    ("plainPassword", Some("pw")),
                ],
            ),
        )
        .await
        .unwrap_err();
        assert_eq!(again.code, "Server");

        register_user(
            &db,
            &call(
                "registerUser",
                &[
                    ("username", Some("bo")),
                    ("email", Some("bo@example.com")),
                    ("plainPassword", Some("pw")),
                ],
            ),
        )
        .await
        .unwrap();
        let ids: Vec<i64> = db.store.read().await.users.keys().copied().collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn login_checks_password() {
        let db = state(Layout::Wrapped);
        seed_user(&db).await;
        let ok = login_user(
            &db,
            &call(
                "loginUser",
                &[("username", Some("ana")), ("plainPassword", Some("pw"))],
            ),
        )
        .await
        .unwrap();
        assert!(matches!(&ok[0], Node::Group(name, _) if name == "return"));

        let bad = login_user(
            &db,
            &call(
                "loginUser",
                &[("username", Some("ana")), ("plainPassword", Some("nope"))],
            ),
        )
        .await
        .unwrap_err();
        assert_eq!(bad.message, "Invalid credentials");
    }

    #[tokio::test]
    async fn create_defaults_and_update_replaces_fields() {
        let db = state(Layout::Flat);
        seed_user(&db).await;
        let created = create_task(
            &db,
            &call(
                "createTaskWithoutDate",
                &[("userId", Some("1")), ("title", Some("Buy milk"))],
            ),
        )
        .await
        .unwrap();
        assert!(created.contains(&Node::text("priority", "MEDIUM")));
        assert!(created.contains(&Node::text("userId", 1)));

        let updated = update_task(
            &db,
            &call(
                "updateTask",
                &[
                    ("taskId", Some("1")),
                    ("title", Some("Buy oat milk")),
                    ("dueDate", None),
                    ("status", Some("IN_PROGRESS")),
                ],
            ),
        )
        .await
        .unwrap();
        assert!(updated.contains(&Node::text("title", "Buy oat milk")));
        assert!(updated.contains(&Node::text("status", "IN_PROGRESS")));
        assert!(updated.contains(&Node::Nil("dueDate".to_string())));
    }

    #[tokio::test]
    async fn create_for_unknown_user_faults() {
        let db = state(Layout::Wrapped);
        let fault = create_task(
            &db,
            &call(
                "createTaskWithoutDate",
                &[("userId", Some("9")), ("title", Some("x"))],
            ),
        )
        .await
        .unwrap_err();
        assert_eq!(fault.message, "User not found: 9");
    }

    #[tokio::test]
    async fn delete_reports_whether_anything_was_removed() {
        let db = state(Layout::Wrapped);
        let result = delete_task(&db, &call("deleteTask", &[("taskId", Some("3"))]))
            .await
            .unwrap();
        assert_eq!(result, vec![Node::text("return", false)]);
    }
}
