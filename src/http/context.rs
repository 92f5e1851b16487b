//! Per-request execution context handed to every handler.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri, Version};
use axum::response::Response;
use serde_json::{Map, Value};

use crate::http::request::RequestId;

/// Request line and headers, without the body.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
    pub request_id: Option<RequestId>,
}

#[derive(Debug, Default)]
struct ResponseState {
    headers: HeaderMap,
    status: Option<StatusCode>,
}

/// Writable side of the response for handlers.
///
/// Headers added here are merged into whatever response the request ends
/// with. The status is only used when an interceptor stops the chain.
#[derive(Debug, Clone, Default)]
pub struct ResponseHandle {
    state: Arc<Mutex<ResponseState>>,
}

impl ResponseHandle {
    fn lock(&self) -> MutexGuard<'_, ResponseState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert_header(&self, name: HeaderName, value: HeaderValue) {
        self.lock().headers.insert(name, value);
    }

    pub fn append_header(&self, name: HeaderName, value: HeaderValue) {
        self.lock().headers.append(name, value);
    }

    /// Append a `Set-Cookie` header. Invalid header text is ignored and
    /// reported as `false`.
    pub fn set_cookie(&self, name: &str, value: &str) -> bool {
        match HeaderValue::from_str(&format!("{}={}; Path=/", name, value)) {
            Ok(header) => {
                self.append_header(SET_COOKIE, header);
                true
            }
            Err(_) => false,
        }
    }

    pub fn set_status(&self, status: StatusCode) {
        self.lock().status = Some(status);
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.lock().status
    }

    /// Merge recorded headers into `response`.
    pub(crate) fn apply(&self, response: &mut Response) {
        let state = self.lock();
        let mut last: Option<HeaderName> = None;
        for (name, value) in state.headers.iter() {
            // `append` keeps repeated names such as Set-Cookie; the first
            // occurrence of a name replaces what the response already had.
            if last.as_ref() != Some(name) {
                response.headers_mut().remove(name);
                last = Some(name.clone());
            }
            response.headers_mut().append(name.clone(), value.clone());
        }
    }
}

/// Execution environment of one handler call.
///
/// Created once per inbound request and cloned into each handler of that
/// request; never shared with another request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request: Arc<RequestHead>,
    response: ResponseHandle,
    args: Arc<Map<String, Value>>,
    cookies: Arc<HashMap<String, String>>,
}

impl RequestContext {
    pub fn new(head: RequestHead) -> Self {
        let args = parse_args(head.uri.query());
        let cookies = parse_cookies(&head.headers);
        Self {
            request: Arc::new(head),
            response: ResponseHandle::default(),
            args: Arc::new(args),
            cookies: Arc::new(cookies),
        }
    }

    pub fn request(&self) -> &RequestHead {
        &self.request
    }

    pub fn response(&self) -> &ResponseHandle {
        &self.response
    }

    /// Query arguments. A repeated key maps to an array of strings.
    pub fn args(&self) -> &Map<String, Value> {
        &self.args
    }

    /// A single-valued query argument.
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args.get(name).and_then(Value::as_str)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.request.headers
    }

    pub fn cookies(&self) -> &HashMap<String, String> {
        &self.cookies
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request.request_id.as_ref()
    }
}

fn parse_args(query: Option<&str>) -> Map<String, Value> {
    let mut args = Map::new();
    let Some(query) = query else {
        return args;
    };
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        let value = Value::String(value.into_owned());
        match args.get_mut(key.as_ref()) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                args.insert(key.into_owned(), value);
            }
        }
    }
    args
}

fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = value.trim().trim_matches('"');
            let value = percent_encoding::percent_decode_str(value)
                .decode_utf8_lossy()
                .into_owned();
            Some((name.to_string(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn head(uri: &str, headers: HeaderMap) -> RequestHead {
        RequestHead {
            method: Method::GET,
            uri: uri.parse().unwrap(),
            version: Version::HTTP_11,
            headers,
            request_id: None,
        }
    }

    #[test]
    fn test_args_from_query() {
        let ctx = RequestContext::new(head("/people?type=pretty&age=25&tag=a&tag=b", HeaderMap::new()));
        assert_eq!(ctx.arg("type"), Some("pretty"));
        assert_eq!(ctx.arg("age"), Some("25"));
        assert_eq!(ctx.args()["tag"], json!(["a", "b"]));
        assert_eq!(ctx.arg("tag"), None);
        assert_eq!(ctx.arg("missing"), None);
    }

    #[test]
    fn test_no_query_no_args() {
        let ctx = RequestContext::new(head("/people", HeaderMap::new()));
        assert!(ctx.args().is_empty());
    }

    #[test]
    fn test_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("session=abc; theme=\"dark\"; note=a%20b"));
        let ctx = RequestContext::new(head("/", headers));
        assert_eq!(ctx.cookie("session"), Some("abc"));
        assert_eq!(ctx.cookie("theme"), Some("dark"));
        assert_eq!(ctx.cookie("note"), Some("a b"));
        assert_eq!(ctx.cookies().len(), 3);
    }

    #[test]
    fn test_response_handle_merges_headers() {
        let ctx = RequestContext::new(head("/", HeaderMap::new()));
        let clone = ctx.clone();
        clone.response().set_cookie("a", "1");
        clone.response().set_cookie("b", "2");
        clone
            .response()
            .insert_header(HeaderName::from_static("x-extra"), HeaderValue::from_static("yes"));

        let mut response = Response::new(axum::body::Body::empty());
        response
            .headers_mut()
            .insert(HeaderName::from_static("x-extra"), HeaderValue::from_static("no"));
        ctx.response().apply(&mut response);

        assert_eq!(response.headers().get_all(SET_COOKIE).iter().count(), 2);
        assert_eq!(response.headers()["x-extra"], "yes");
    }
}
