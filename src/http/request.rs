//! Request handling and preparation.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4) unless the client sent one
//! - Enforce the body size limit
//! - Parse JSON bodies for handlers
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Declared body size checked before the body is read
//! - Non-JSON or empty bodies read as `{}`; malformed JSON is a 400 fault

use std::fmt;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::{HeaderName, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, Request, Response};
use futures_util::future::BoxFuture;
use serde_json::{Map, Value};
use tower::{Layer, Service};
use uuid::Uuid;

use crate::error::{ErrorKind, Fault};

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Correlation id of one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extension helpers for reading the request id.
pub trait RequestIdExt {
    fn request_id(&self) -> Option<&RequestId>;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> Option<&RequestId> {
        self.extensions().get::<RequestId>()
    }
}

/// Layer that tags every request with an `x-request-id` and echoes it on
/// the response.
#[derive(Debug, Clone, Default)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestIdService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<ReqBody>) -> Self::Future {
        let request_id = request
            .headers()
            .get(&X_REQUEST_ID)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(RequestId::new)
            .unwrap_or_else(RequestId::generate);

        request.extensions_mut().insert(request_id.clone());

        // Take the service that was driven to readiness.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let mut response = inner.call(request).await?;
            if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
                response.headers_mut().insert(X_REQUEST_ID.clone(), value);
            }
            Ok(response)
        })
    }
}

/// Read and parse a request body as JSON.
pub async fn read_json_body(headers: &HeaderMap, body: Body, limit: usize) -> Result<Value, Fault> {
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok());
    if declared.is_some_and(|length| length > limit) {
        return Err(too_large(limit).into());
    }

    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| Fault::from(too_large(limit).with_cause(e)))?;

    if bytes.is_empty() || !is_json(headers) {
        return Ok(Value::Object(Map::new()));
    }

    serde_json::from_slice(&bytes).map_err(|e| Fault::with_status(e, 400))
}

fn too_large(limit: usize) -> crate::error::ServerError {
    ErrorKind::PayloadTooLarge.with_info(serde_json::json!({ "limit": limit }))
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_ascii_lowercase().contains("json"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorTranslator;
    use serde_json::json;

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    #[test]
    fn test_request_id_generation() {
        let a = RequestId::generate();
        let b = RequestId::generate();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
        assert_eq!(RequestId::new("abc").to_string(), "abc");
    }

    #[tokio::test]
    async fn test_parses_json_body() {
        let body = Body::from(r#"{"name":"John"}"#);
        let value = read_json_body(&json_headers(), body, 1024).await.unwrap();
        assert_eq!(value, json!({ "name": "John" }));
    }

    #[tokio::test]
    async fn test_empty_or_foreign_body_is_empty_object() {
        let value = read_json_body(&json_headers(), Body::empty(), 1024).await.unwrap();
        assert_eq!(value, json!({}));

        let value = read_json_body(&HeaderMap::new(), Body::from("plain"), 1024)
            .await
            .unwrap();
        assert_eq!(value, json!({}));
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let fault = read_json_body(&json_headers(), Body::from(r#"{hello:"world"}"#), 1024)
            .await
            .unwrap_err();
        assert_eq!(ErrorTranslator::classify(fault).status(), 400);
    }

    #[tokio::test]
    async fn test_body_limit() {
        let mut headers = json_headers();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("4096"));
        let fault = read_json_body(&headers, Body::from("{}"), 16).await.unwrap_err();
        assert_eq!(ErrorTranslator::classify(fault).status(), 413);

        let fault = read_json_body(&json_headers(), Body::from(vec![b' '; 64]), 16)
            .await
            .unwrap_err();
        assert!(ErrorTranslator::classify(fault).is(ErrorKind::PayloadTooLarge));
    }
}
