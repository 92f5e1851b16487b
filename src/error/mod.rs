//! Error handling subsystem.
//!
//! # Data Flow
//! ```text
//! handler / interceptor / pipeline failure
//!     → fault.rs (Fault: any error or raised value)
//!     → translator.rs (classify, resolve status, log once)
//!     → server_error.rs (ServerError serialized as the response body)
//!     → taxonomy.rs (ordered kind table, prefix resolution)
//! ```
//!
//! # Design Decisions
//! - One normalization point; handlers never answer errors themselves
//! - Callers only see code, status and info; the native cause is reduced to
//!   its message
//! - Translation cannot fail: serialization problems degrade the log record,
//!   never the response

pub mod fault;
pub mod server_error;
pub mod taxonomy;
pub mod translator;

pub use fault::Fault;
pub use server_error::ServerError;
pub use taxonomy::ErrorKind;
pub use translator::ErrorTranslator;
