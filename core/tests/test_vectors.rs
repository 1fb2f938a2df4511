//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! `requests.json` pins the outbound envelope of every operation;
//! `responses.json` pairs simulated server bodies with the value or failure
//! kind each parse method must produce. Results are compared as JSON values
//! so the vectors stay readable.

use nimble_core::{HttpResponse, NimbleClient, RpcError, ServiceConfig, Task, TaskPriority, TaskStatus};
use serde_json::Value;

const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

fn client(base_url: &str) -> NimbleClient {
    NimbleClient::new(ServiceConfig::with_base_url(base_url))
}

fn str_arg<'a>(args: &'a Value, key: &str) -> &'a str {
    args[key].as_str().unwrap_or_else(|| panic!("missing string arg {key}"))
}

fn i64_arg(args: &Value, key: &str) -> i64 {
    args[key].as_i64().unwrap_or_else(|| panic!("missing integer arg {key}"))
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[test]
fn request_vectors() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let base_url = vectors["base_url"].as_str().unwrap();
    let c = client(base_url);

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let args = &case["args"];
        let req = match case["operation"].as_str().unwrap() {
            "login" => c.build_login(str_arg(args, "username"), str_arg(args, "password")),
            "register" => c.build_register(
                str_arg(args, "username"),
                str_arg(args, "email"),
                str_arg(args, "password"),
            ),
            "list_tasks_for_user" => c.build_list_tasks(i64_arg(args, "user_id")),
            "create_task" => {
                let priority: TaskPriority =
                    serde_json::from_value(args["priority"].clone()).unwrap();
                c.build_create_task(
                    i64_arg(args, "user_id"),
                    str_arg(args, "title"),
                    args["description"].as_str(),
                    priority,
                )
            }
            "delete_task" => c.build_delete_task(i64_arg(args, "task_id")),
            "update_task_status" => {
                let task: Task = serde_json::from_value(args["task"].clone()).unwrap();
                let status: TaskStatus = serde_json::from_value(args["status"].clone()).unwrap();
                c.build_update_task_status(&task, status)
            }
            other => panic!("{name}: unknown operation {other}"),
        }
        .unwrap_or_else(|e| panic!("{name}: build failed: {e}"));

        let expected = &case["expected"];
        assert_eq!(
            req.url,
            format!("{base_url}{}", expected["path"].as_str().unwrap()),
            "{name}: url"
        );
        assert_eq!(
            req.header("SOAPAction"),
            expected["soap_action"].as_str(),
            "{name}: SOAPAction"
        );
        assert_eq!(
            req.header("content-type"),
            Some("text/xml; charset=utf-8"),
            "{name}: content-type"
        );
        assert!(
            req.body.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"),
            "{name}: declaration"
        );
        for fragment in expected["body_contains"].as_array().unwrap() {
            let fragment = fragment.as_str().unwrap();
            assert!(
                req.body.contains(fragment),
                "{name}: body lacks {fragment}\n{}",
                req.body
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

fn response_for(case: &Value) -> HttpResponse {
    let body = match case["raw"].as_str() {
        Some(raw) => raw.to_string(),
        None => format!(
            r#"<?xml version="1.0" ?><S:Envelope xmlns:S="{SOAP_ENV_NS}"><S:Body>{}</S:Body></S:Envelope>"#,
            case["body"].as_str().unwrap()
        ),
    };
    HttpResponse {
        status: case["status"].as_u64().unwrap() as u16,
        headers: vec![(
            "content-type".to_string(),
            "text/xml; charset=utf-8".to_string(),
        )],
        body,
    }
}

fn to_json<T: serde::Serialize>(result: Result<T, RpcError>) -> Result<Value, RpcError> {
    result.map(|v| serde_json::to_value(v).unwrap())
}

fn parse(c: &NimbleClient, operation: &str, resp: HttpResponse) -> Result<Value, RpcError> {
    match operation {
        "login" => to_json(c.parse_login(resp)),
        "register" => to_json(c.parse_register(resp)),
        "list_tasks_for_user" => to_json(c.parse_list_tasks(resp)),
        "create_task" => to_json(c.parse_create_task(resp)),
        "update_task_status" => to_json(c.parse_update_task_status(resp)),
        "delete_task" => to_json(c.parse_delete_task(resp)),
        other => panic!("unknown operation {other}"),
    }
}

#[test]
fn response_vectors() {
    let raw = include_str!("../../test-vectors/responses.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let c = client("http://localhost:3000");

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let operation = case["operation"].as_str().unwrap();
        let expect = &case["expect"];
        let result = parse(&c, operation, response_for(case));

        if let Some(kind) = expect["error"].as_str() {
            let err = match result {
                Ok(value) => panic!("{name}: expected {kind}, got {value}"),
                Err(err) => err,
            };
            assert_eq!(format!("{:?}", err.kind()), kind, "{name}: kind ({err})");
            if let Some(message) = expect["message"].as_str() {
                assert!(
                    matches!(&err, RpcError::RemoteFault(m) if m == message),
                    "{name}: fault message {err}"
                );
            }
            continue;
        }

        let value = result.unwrap_or_else(|e| panic!("{name}: unexpected error {e}"));
        if let Some(ids) = expect["ok_ids"].as_array() {
            let got: Vec<&Value> = value
                .as_array()
                .unwrap()
                .iter()
                .map(|task| &task["task_id"])
                .collect();
            let want: Vec<&Value> = ids.iter().collect();
            assert_eq!(got, want, "{name}: ids");
        } else {
            assert_eq!(value, expect["ok"], "{name}: value");
        }
    }
}
