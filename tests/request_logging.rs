//! Every request produces exactly one info record, whatever its outcome.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use rest_server::{ErrorKind, Fault, RestServer};
use serde_json::{json, Value};
use tower::ServiceExt;
use tracing_test::traced_test;

mod common;

fn app() -> RestServer {
    let server = RestServer::new(common::test_config());
    server.list().descend("pets").value(["dog", "cat"]);
    server.create().descend("people").handle_sync(|_, person: Value, _| Ok::<_, Fault>(person));
    server
        .invoke()
        .descend("err")
        .handle_sync(|_, _: Value, _| Err::<Value, _>(Fault::msg("Some error")));
    server.intercept().descend("guarded").handle(|_, _next| async {
        Err::<(), _>(ErrorKind::Unauthorized.error())
    });
    server.intercept().descend("halted").handle(|_, _next| async { Ok::<_, Fault>(()) });
    server.get().descend("guarded").value("secret");
    server.get().descend("halted").value("unreachable");
    server
}

async fn send(request: Request<Body>) -> StatusCode {
    app().router().oneshot(request).await.unwrap().status()
}

fn get(path: &str) -> Request<Body> {
    Request::get(path).body(Body::empty()).unwrap()
}

fn post(path: &str, body: &str) -> Request<Body> {
    Request::post(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn one_info_record(lines: &[&str]) -> Result<(), String> {
    let records: Vec<&&str> = lines
        .iter()
        .filter(|line| line.contains("INFO") && line.contains("rest_server"))
        .collect();
    match records.len() {
        1 => Ok(()),
        n => Err(format!("expected 1 info record, found {}: {:#?}", n, records)),
    }
}

#[tokio::test]
#[traced_test]
async fn success_is_logged_once() {
    assert_eq!(send(get("/pets")).await, StatusCode::OK);
    logs_assert(one_info_record);
}

#[tokio::test]
#[traced_test]
async fn handler_fault_is_logged_once() {
    assert_eq!(
        send(post("/err", &json!({ "a": 1 }).to_string())).await,
        StatusCode::INTERNAL_SERVER_ERROR
    );
    logs_assert(one_info_record);
}

#[tokio::test]
#[traced_test]
async fn malformed_body_is_logged_once() {
    assert_eq!(send(post("/people", r#"{hello:"world"}"#)).await, StatusCode::BAD_REQUEST);
    logs_assert(one_info_record);
}

#[tokio::test]
#[traced_test]
async fn unknown_path_is_logged_once() {
    assert_eq!(send(get("/nowhere")).await, StatusCode::NOT_FOUND);
    logs_assert(one_info_record);
}

#[tokio::test]
#[traced_test]
async fn wrong_verb_is_logged_once() {
    let request = Request::delete("/pets").body(Body::empty()).unwrap();
    assert_eq!(send(request).await, StatusCode::METHOD_NOT_ALLOWED);
    logs_assert(one_info_record);
}

#[tokio::test]
#[traced_test]
async fn interceptor_failure_is_logged_once() {
    assert_eq!(send(get("/guarded")).await, StatusCode::UNAUTHORIZED);
    logs_assert(one_info_record);
}

#[tokio::test]
#[traced_test]
async fn interceptor_stop_is_logged_once() {
    assert_eq!(send(get("/halted")).await, StatusCode::NO_CONTENT);
    logs_assert(one_info_record);
}
