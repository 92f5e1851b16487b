//! Binds finalized paths to operations and dispatches requests.
//!
//! # Responsibilities
//! - Compile accumulated segments into patterns and record them
//! - Keep the ordered binding stack (intercepts, routes, static mounts)
//! - Build the request context, run bindings in order, await handlers
//! - Write the success envelope or hand the fault to the translator
//!
//! # Design Decisions
//! - The stack is swapped atomically on registration; a request works on
//!   the snapshot it started with, so bindings added while serving apply
//!   to later requests only
//! - Handlers always run as futures; panics count as raised faults

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::header::ALLOW;
use axum::http::{HeaderValue, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::future::{BoxFuture, FutureExt};
use serde_json::{json, Value};

use crate::config::ServerConfig;
use crate::error::translator::to_log_string;
use crate::error::{ErrorKind, ErrorTranslator, Fault};
use crate::http::context::{RequestContext, RequestHead};
use crate::http::handler::{InterceptHandler, Next, RouteHandler};
use crate::http::operation::Operation;
use crate::http::request::{read_json_body, RequestIdExt};
use crate::http::static_files::StaticMount;
use crate::observability::metrics;
use crate::routing::matcher::PathPattern;
use crate::routing::path::{Params, PathSegment};
use crate::routing::registry::{RouteRegistry, Verb};

/// What a stack entry does once its pattern matches.
#[derive(Debug)]
pub enum Binding {
    Route {
        operation: Operation,
        handler: RouteHandler,
    },
    Intercept(InterceptHandler),
    Static(StaticMount),
}

/// One entry of the binding stack.
#[derive(Debug)]
pub struct Layer {
    pattern: PathPattern,
    binding: Binding,
}

impl Layer {
    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }
}

/// Per-request facts shared by every stage.
struct Exchange {
    ctx: RequestContext,
    /// Path plus query, as logged.
    original: String,
    path: String,
    body: Value,
}

pub struct Dispatcher {
    layers: ArcSwap<Vec<Arc<Layer>>>,
    registry: Arc<RouteRegistry>,
    config: Arc<ServerConfig>,
}

impl Dispatcher {
    pub fn new(config: Arc<ServerConfig>, registry: Arc<RouteRegistry>) -> Self {
        Self {
            layers: ArcSwap::from_pointee(Vec::new()),
            registry,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<RouteRegistry> {
        &self.registry
    }

    /// Bindings in registration order.
    pub fn layers(&self) -> Arc<Vec<Arc<Layer>>> {
        self.layers.load_full()
    }

    /// Bind a handler for one of the route operation kinds.
    pub fn bind_route(&self, operation: Operation, segments: Vec<PathSegment>, handler: RouteHandler) {
        let pattern = PathPattern::new(segments);
        let verb = operation.verb();
        tracing::debug!(
            operation = %operation,
            "Handler({}, \"{}\")",
            verb,
            pattern.transport_path()
        );
        self.registry.record(&pattern, verb);
        self.push(Layer {
            pattern,
            binding: Binding::Route { operation, handler },
        });
    }

    pub fn bind_interceptor(&self, segments: Vec<PathSegment>, handler: InterceptHandler) {
        let pattern = PathPattern::new(segments);
        tracing::debug!("Interceptor(\"{}\")", pattern.transport_path());
        self.registry.record(&pattern, Verb::Use);
        self.push(Layer {
            pattern,
            binding: Binding::Intercept(handler),
        });
    }

    pub fn bind_static(&self, segments: Vec<PathSegment>, root: PathBuf) {
        let pattern = PathPattern::new(segments);
        tracing::debug!(root = %root.display(), "Static(\"{}\")", pattern.transport_path());
        self.registry.record(&pattern, Verb::Static);
        let mount = StaticMount::new(root, &self.config.statics);
        self.push(Layer {
            pattern,
            binding: Binding::Static(mount),
        });
    }

    fn push(&self, layer: Layer) {
        let layer = Arc::new(layer);
        self.layers.rcu(|layers| {
            let mut next = Vec::with_capacity(layers.len() + 1);
            next.extend(layers.iter().cloned());
            next.push(layer.clone());
            next
        });
    }

    /// Handle one inbound request end to end.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let request_id = request.request_id().cloned();
        let (parts, body) = request.into_parts();
        let method = parts.method.clone();
        let path = parts.uri.path().to_string();
        let original = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| path.clone());

        let ctx = RequestContext::new(RequestHead {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            request_id,
            headers: parts.headers,
        });

        let mut response =
            match read_json_body(ctx.headers(), body, self.config.limits.body_limit_bytes).await {
                Ok(body) => {
                    let exchange = Exchange {
                        ctx: ctx.clone(),
                        original,
                        path,
                        body,
                    };
                    self.run(&exchange).await
                }
                Err(fault) => ErrorTranslator::respond(&original, &Value::Null, fault),
            };

        ctx.response().apply(&mut response);
        metrics::record_request(method.as_str(), response.status().as_u16(), start);
        response
    }

    async fn run(&self, exchange: &Exchange) -> Response {
        let layers = self.layers.load_full();
        let method = &exchange.ctx.request().method;

        for layer in layers.iter() {
            match &layer.binding {
                Binding::Intercept(handler) => {
                    if layer.pattern.match_prefix(&exchange.path).is_none() {
                        continue;
                    }
                    let (next, proceeded) = Next::new();
                    let ctx = exchange.ctx.clone();
                    match guarded(move || handler.call(ctx, next)).await {
                        Ok(()) if proceeded.load(Ordering::Acquire) => continue,
                        Ok(()) => return stopped(exchange),
                        Err(fault) => return self.fail(exchange, fault),
                    }
                }
                Binding::Route { operation, handler } => {
                    if !answers(operation.verb(), method) {
                        continue;
                    }
                    if let Some(params) = layer.pattern.match_exact(&exchange.path) {
                        return self.invoke(exchange, *operation, handler, params).await;
                    }
                }
                Binding::Static(mount) => {
                    let Some((_, rest)) = layer.pattern.match_prefix(&exchange.path) else {
                        continue;
                    };
                    if method != Method::GET && method != Method::HEAD {
                        return self.method_not_allowed(exchange, &[Method::GET, Method::HEAD]);
                    }
                    return match mount.serve(exchange.ctx.request(), &rest).await {
                        Ok(response) => response,
                        Err(error) => self.fail(exchange, error.into()),
                    };
                }
            }
        }

        self.not_found(exchange)
    }

    async fn invoke(
        &self,
        exchange: &Exchange,
        operation: Operation,
        handler: &RouteHandler,
        params: Params,
    ) -> Response {
        let ctx = exchange.ctx.clone();
        let body = exchange.body.clone();
        match guarded(move || handler.call(ctx, body, params)).await {
            Ok(result) => {
                let status = operation.success_status().unwrap_or(StatusCode::OK);
                tracing::info!(
                    path = %exchange.original,
                    body = %to_log_string(&exchange.body),
                    status = status.as_u16(),
                    response = %to_log_string(&result),
                    "Request handled"
                );
                if status == StatusCode::NO_CONTENT {
                    status.into_response()
                } else {
                    (status, Json(json!({ "data": result }))).into_response()
                }
            }
            Err(fault) => self.fail(exchange, fault),
        }
    }

    fn fail(&self, exchange: &Exchange, fault: Fault) -> Response {
        ErrorTranslator::respond(&exchange.original, &exchange.body, fault)
    }

    fn not_found(&self, exchange: &Exchange) -> Response {
        let allowed = self.registry.allowed_methods(&exchange.path);
        if allowed.is_empty() {
            let error = ErrorKind::NotFound.with_info(json!({ "path": exchange.path }));
            self.fail(exchange, error.into())
        } else {
            self.method_not_allowed(exchange, &allowed)
        }
    }

    fn method_not_allowed(&self, exchange: &Exchange, allowed: &[Method]) -> Response {
        let names: Vec<&str> = allowed.iter().map(Method::as_str).collect();
        let error = ErrorKind::MethodNotAllowed.with_info(json!({
            "path": exchange.path,
            "allowed": names,
        }));
        let mut response = self.fail(exchange, error.into());
        if let Ok(value) = HeaderValue::from_str(&names.join(", ")) {
            response.headers_mut().insert(ALLOW, value);
        }
        response
    }
}

/// GET bindings also answer HEAD.
fn answers(verb: Verb, method: &Method) -> bool {
    match verb.method() {
        Some(Method::GET) => method == Method::GET || method == Method::HEAD,
        Some(expected) => expected == method,
        None => false,
    }
}

/// An interceptor ended the request without proceeding.
fn stopped(exchange: &Exchange) -> Response {
    let status = exchange
        .ctx
        .response()
        .status()
        .unwrap_or(StatusCode::NO_CONTENT);
    tracing::info!(
        path = %exchange.original,
        status = status.as_u16(),
        "Request stopped by interceptor"
    );
    status.into_response()
}

/// Run a handler call, turning a panic (while building or polling the
/// future) into a fault.
async fn guarded<T, F>(call: F) -> Result<T, Fault>
where
    F: FnOnce() -> BoxFuture<'static, Result<T, Fault>>,
{
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(pending) => AssertUnwindSafe(pending)
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(Fault::panicked(payload))),
        Err(payload) => Err(Fault::panicked(payload)),
    }
}
