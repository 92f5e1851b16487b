//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum router, transport middleware, lifecycle)
//!     → request.rs (request ID, JSON body decoding)
//!     → dispatcher.rs (ordered bindings: intercepts, routes, static mounts)
//!     → context.rs (per-request context handed to handlers)
//!     → handler.rs (normalized handler invocation)
//!     → success envelope, or error translation
//! ```

pub mod context;
pub mod dispatcher;
pub mod handler;
pub mod operation;
pub mod request;
pub mod server;
pub mod static_files;

pub use context::{RequestContext, RequestHead, ResponseHandle};
pub use dispatcher::Dispatcher;
pub use handler::{InterceptHandler, Next, RouteHandler};
pub use operation::Operation;
pub use request::{RequestId, RequestIdExt, RequestIdLayer, X_REQUEST_ID};
pub use server::{create_server, RestServer};
pub use static_files::StaticMount;
