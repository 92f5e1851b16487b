//! Declarative REST endpoint server.
//!
//! Endpoints are described by walking a path per operation kind and ending
//! the walk with a handler, a literal value or a directory:
//!
//! ```rust,ignore
//! let server = rest_server::create_server();
//! server.list().descend("pets").value(["dog", "cat"]);
//! server.get().descend("people").param("id").handle(get_person);
//! server.static_files().descend("assets").dir("./public");
//! server.listen(Some(7000)).await?;
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::ServerConfig;
pub use error::{ErrorKind, Fault, ServerError};
pub use http::{create_server, Next, RequestContext, RestServer};
pub use lifecycle::{LifecycleError, Shutdown};
pub use routing::{Params, PathAccumulator};
