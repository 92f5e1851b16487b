//! Static directory mounts served over real sockets.

use reqwest::StatusCode;
use serde_json::{json, Value};

mod common;

async fn static_app() -> common::TestServer {
    common::start_server(|server| {
        server.invoke().descend("method").value(json!({ "foo": "bar" }));
        server.static_files().descend("html").dir(common::fixtures("static/html"));
        server.static_files().descend("js").dir(common::fixtures("static/js"));
    })
    .await
}

async fn text(app: &common::TestServer, path: &str) -> (StatusCode, String) {
    let response = app.client.get(app.url(path)).send().await.unwrap();
    (response.status(), response.text().await.unwrap())
}

#[tokio::test]
async fn test_explicit_file() {
    let app = static_app().await;
    let (status, body) = text(&app, "/html/test.html").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("TEST HTML"));
    app.close().await;
}

#[tokio::test]
async fn test_implicit_extension() {
    let app = static_app().await;
    let (status, body) = text(&app, "/html/test").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("TEST HTML"));
    app.close().await;
}

#[tokio::test]
async fn test_implicit_index() {
    let app = static_app().await;
    let (status, body) = text(&app, "/html").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("INDEX"));
    app.close().await;
}

#[tokio::test]
async fn test_js_file() {
    let app = static_app().await;
    let response = app.client.get(app.url("/js/test.js")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.contains("javascript"));
    assert!(response.text().await.unwrap().contains("hello: 'world'"));
    app.close().await;
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let app = static_app().await;
    let response = app.client.get(app.url("/html/nope.html")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "notFound");
    app.close().await;
}

#[tokio::test]
async fn test_mount_only_serves_reads() {
    let app = static_app().await;
    let response = app.client.post(app.url("/html/test.html")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    app.close().await;
}

#[tokio::test]
async fn test_routes_coexist_with_mounts() {
    let app = static_app().await;
    let response = app.client.post(app.url("/method")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "data": { "foo": "bar" } }));
    app.close().await;
}

#[tokio::test]
async fn test_mount_added_while_listening() {
    let app = common::start_server(|_| {}).await;

    let (status, _) = text(&app, "/late/test.js").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.server.static_files().descend("late").dir(common::fixtures("static/js"));
    let (status, body) = text(&app, "/late/test.js").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("hello"));

    app.close().await;
}
