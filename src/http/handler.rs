//! Handler normalization and the typed terminal calls of each operation kind.
//!
//! Every route payload becomes a [`RouteHandler`]: an async function of
//! `(context, body, params)` producing a JSON value. Literal payloads are
//! wrapped as constant handlers.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::{self, BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::Fault;
use crate::http::context::RequestContext;
use crate::routing::path::{Params, PathAccumulator, Terminal};

type RouteFn = dyn Fn(RequestContext, Value, Params) -> BoxFuture<'static, Result<Value, Fault>>
    + Send
    + Sync;

type InterceptFn =
    dyn Fn(RequestContext, Next) -> BoxFuture<'static, Result<(), Fault>> + Send + Sync;

/// Normalized route handler.
#[derive(Clone)]
pub struct RouteHandler(Arc<RouteFn>);

impl RouteHandler {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(RequestContext, Value, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, Fault>> + Send + 'static,
    {
        Self(Arc::new(move |ctx, body, params| f(ctx, body, params).boxed()))
    }

    /// Handler that ignores its arguments and always yields `value`.
    pub fn constant<T: Serialize>(value: T) -> Self {
        let value = serde_json::to_value(value).map_err(|e| e.to_string());
        Self::new(move |_, _, _| future::ready(value.clone().map_err(Fault::msg)))
    }

    pub(crate) fn call(
        &self,
        ctx: RequestContext,
        body: Value,
        params: Params,
    ) -> BoxFuture<'static, Result<Value, Fault>> {
        (self.0)(ctx, body, params)
    }
}

impl fmt::Debug for RouteHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RouteHandler")
    }
}

/// Normalized interceptor.
#[derive(Clone)]
pub struct InterceptHandler(Arc<InterceptFn>);

impl InterceptHandler {
    pub fn new<F, Fut, E>(f: F) -> Self
    where
        F: Fn(RequestContext, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<Fault> + 'static,
    {
        Self(Arc::new(move |ctx, next| {
            f(ctx, next)
                .map(|result: Result<(), E>| -> Result<(), Fault> { result.map_err(Into::into) })
                .boxed()
        }))
    }

    pub(crate) fn call(&self, ctx: RequestContext, next: Next) -> BoxFuture<'static, Result<(), Fault>> {
        (self.0)(ctx, next)
    }
}

impl fmt::Debug for InterceptHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InterceptHandler")
    }
}

/// Continuation handed to an interceptor. Calling [`Next::proceed`] lets
/// the request continue to later bindings.
#[derive(Debug)]
pub struct Next {
    proceeded: Arc<AtomicBool>,
}

impl Next {
    pub(crate) fn new() -> (Self, Arc<AtomicBool>) {
        let proceeded = Arc::new(AtomicBool::new(false));
        (
            Self {
                proceeded: proceeded.clone(),
            },
            proceeded,
        )
    }

    pub fn proceed(self) {
        self.proceeded.store(true, Ordering::Release);
    }
}

/// `list`, `get`, `remove`: handlers receive `(context, params)`.
#[derive(Debug)]
pub struct Bodiless;

/// `create`, `replace`, `update`, `invoke`: handlers receive
/// `(context, body, params)`.
#[derive(Debug)]
pub struct WithBody;

/// `intercept`: middleware receiving `(context, next)`.
#[derive(Debug)]
pub struct Intercept;

/// `static`: a local directory.
#[derive(Debug)]
pub struct Mount;

impl Terminal for Bodiless {
    type Payload = RouteHandler;
}

impl Terminal for WithBody {
    type Payload = RouteHandler;
}

impl Terminal for Intercept {
    type Payload = InterceptHandler;
}

impl Terminal for Mount {
    type Payload = PathBuf;
}

fn to_json<T: Serialize, E: Into<Fault>>(result: Result<T, E>) -> Result<Value, Fault> {
    let value = result.map_err(Into::into)?;
    Ok(serde_json::to_value(value)?)
}

impl PathAccumulator<Bodiless> {
    /// Bind an async handler.
    pub fn handle<F, Fut, T, E>(self, handler: F)
    where
        F: Fn(RequestContext, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Serialize + 'static,
        E: Into<Fault> + 'static,
    {
        self.finalize(RouteHandler::new(move |ctx, _body, params| {
            handler(ctx, params).map(to_json)
        }))
    }

    /// Bind a handler that completes synchronously.
    pub fn handle_sync<F, T, E>(self, handler: F)
    where
        F: Fn(RequestContext, Params) -> Result<T, E> + Send + Sync + 'static,
        T: Serialize,
        E: Into<Fault>,
    {
        self.finalize(RouteHandler::new(move |ctx, _body, params| {
            future::ready(to_json(handler(ctx, params)))
        }))
    }

    /// Bind a fixed response.
    pub fn value<T: Serialize>(self, value: T) {
        self.finalize(RouteHandler::constant(value))
    }
}

impl PathAccumulator<WithBody> {
    /// Bind an async handler. The JSON body is decoded into `B`; a body
    /// that does not fit is a 400 fault.
    pub fn handle<F, Fut, B, T, E>(self, handler: F)
    where
        F: Fn(RequestContext, B, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        B: DeserializeOwned,
        T: Serialize + 'static,
        E: Into<Fault> + 'static,
    {
        self.finalize(RouteHandler::new(move |ctx, body, params| {
            let call = serde_json::from_value::<B>(body).map(|body| handler(ctx, body, params));
            async move {
                let pending = call.map_err(|e| Fault::with_status(e, 400))?;
                to_json(pending.await)
            }
        }))
    }

    /// Bind a handler that completes synchronously.
    pub fn handle_sync<F, B, T, E>(self, handler: F)
    where
        F: Fn(RequestContext, B, Params) -> Result<T, E> + Send + Sync + 'static,
        B: DeserializeOwned,
        T: Serialize,
        E: Into<Fault>,
    {
        self.finalize(RouteHandler::new(move |ctx, body, params| {
            let result = match serde_json::from_value::<B>(body) {
                Ok(body) => to_json(handler(ctx, body, params)),
                Err(e) => Err(Fault::with_status(e, 400)),
            };
            future::ready(result)
        }))
    }

    /// Bind a fixed response.
    pub fn value<T: Serialize>(self, value: T) {
        self.finalize(RouteHandler::constant(value))
    }
}

impl PathAccumulator<Intercept> {
    /// Bind an interceptor for this path and everything below it.
    pub fn handle<F, Fut, E>(self, interceptor: F)
    where
        F: Fn(RequestContext, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<Fault> + 'static,
    {
        self.finalize(InterceptHandler::new(interceptor))
    }
}

impl PathAccumulator<Mount> {
    /// Serve files from `root` under this path.
    pub fn dir(self, root: impl Into<PathBuf>) {
        self.finalize(root.into())
    }
}
