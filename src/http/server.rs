//! Server facade: the registration surface plus listen/ready/close.
//!
//! # Responsibilities
//! - Hand out one root accumulator per operation kind
//! - Route every finalized chain into the shared [`Dispatcher`]
//! - Assemble the transport middleware around the dispatcher
//! - Delegate socket ownership to the [`LifecycleController`]
//!
//! The axum router carries a single fallback into the dispatcher, so
//! bindings added after `listen` are served without rebuilding it.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderName, HeaderValue, Request};
use axum::response::Response;
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::http::dispatcher::Dispatcher;
use crate::http::handler::{Bodiless, InterceptHandler, Intercept, Mount, RouteHandler, WithBody};
use crate::http::operation::Operation;
use crate::http::request::RequestIdLayer;
use crate::lifecycle::{LifecycleController, LifecycleError, LifecycleState};
use crate::routing::path::{PathAccumulator, PathSegment};
use crate::routing::registry::RouteRegistry;

/// REST server with declarative endpoint registration.
///
/// ```rust,ignore
/// let server = RestServer::new(config);
/// server.get().descend("people").param("id").handle(get_person);
/// server.create().descend("people").handle(create_person);
/// let addr = server.listen(Some(0)).await?;
/// ```
pub struct RestServer {
    config: Arc<ServerConfig>,
    dispatcher: Arc<Dispatcher>,
    lifecycle: LifecycleController,
}

impl RestServer {
    pub fn new(config: ServerConfig) -> Self {
        let config = Arc::new(config);
        let registry = Arc::new(RouteRegistry::new());
        let dispatcher = Arc::new(Dispatcher::new(config.clone(), registry));
        Self {
            config,
            dispatcher,
            lifecycle: LifecycleController::new(),
        }
    }

    fn route<K>(&self, operation: Operation) -> PathAccumulator<K>
    where
        K: crate::routing::path::Terminal<Payload = RouteHandler>,
    {
        let dispatcher = self.dispatcher.clone();
        PathAccumulator::root(move |segments: Vec<PathSegment>, handler: RouteHandler| {
            dispatcher.bind_route(operation, segments, handler)
        })
    }

    /// Collection read, answers `GET`.
    pub fn list(&self) -> PathAccumulator<Bodiless> {
        self.route(Operation::List)
    }

    /// Single resource read, answers `GET`.
    pub fn get(&self) -> PathAccumulator<Bodiless> {
        self.route(Operation::Get)
    }

    /// Answers `POST` with 201.
    pub fn create(&self) -> PathAccumulator<WithBody> {
        self.route(Operation::Create)
    }

    /// Answers `PUT`.
    pub fn replace(&self) -> PathAccumulator<WithBody> {
        self.route(Operation::Replace)
    }

    /// Answers `PATCH`.
    pub fn update(&self) -> PathAccumulator<WithBody> {
        self.route(Operation::Update)
    }

    /// Answers `DELETE` with 204 and no body.
    pub fn remove(&self) -> PathAccumulator<Bodiless> {
        self.route(Operation::Remove)
    }

    /// RPC-style action, answers `POST` with 200.
    pub fn invoke(&self) -> PathAccumulator<WithBody> {
        self.route(Operation::Invoke)
    }

    /// Interceptor for a path prefix, every method.
    pub fn intercept(&self) -> PathAccumulator<Intercept> {
        let dispatcher = self.dispatcher.clone();
        PathAccumulator::root(move |segments: Vec<PathSegment>, handler: InterceptHandler| {
            dispatcher.bind_interceptor(segments, handler)
        })
    }

    /// Static directory mount.
    pub fn static_files(&self) -> PathAccumulator<Mount> {
        let dispatcher = self.dispatcher.clone();
        PathAccumulator::root(move |segments: Vec<PathSegment>, root: PathBuf| {
            dispatcher.bind_static(segments, root)
        })
    }

    pub fn registry(&self) -> &Arc<RouteRegistry> {
        self.dispatcher.registry()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// The assembled axum application, for embedding or in-process tests.
    pub fn router(&self) -> Router {
        Self::build_router(&self.config, self.dispatcher.clone())
    }

    /// Build the axum router with all middleware layers.
    fn build_router(config: &ServerConfig, dispatcher: Arc<Dispatcher>) -> Router {
        let mut router = Router::new().fallback(dispatch_handler).with_state(dispatcher);

        for (name, value) in &config.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    router = router.layer(SetResponseHeaderLayer::if_not_present(name, value));
                }
                _ => tracing::warn!(header = %name, "Skipping invalid default header"),
            }
        }

        if config.http.cors {
            router = router.layer(CorsLayer::permissive());
        }
        if config.http.compression {
            router = router.layer(CompressionLayer::new());
        }

        router
            .layer(TraceLayer::new_for_http())
            .layer(RequestIdLayer)
    }

    /// Bind and start serving. `None` uses the configured port; `Some(0)`
    /// picks an ephemeral one. Resolves with the bound address.
    pub async fn listen(&self, port: Option<u16>) -> Result<SocketAddr, LifecycleError> {
        let port = port.unwrap_or(self.config.listener.port);
        let app = self.router();
        self.lifecycle
            .listen(&self.config.listener.host, port, app)
            .await
    }

    /// Resolves once the server is listening.
    pub async fn ready(&self) -> Result<SocketAddr, LifecycleError> {
        self.lifecycle.ready().await
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn close(&self) -> Result<(), LifecycleError> {
        self.lifecycle.close().await
    }
}

impl Default for RestServer {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

/// Server with default configuration.
pub fn create_server() -> RestServer {
    RestServer::default()
}

async fn dispatch_handler(State(dispatcher): State<Arc<Dispatcher>>, request: Request<Body>) -> Response {
    dispatcher.dispatch(request).await
}
