//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration:
//!     server.create().descend("people") ...
//!     → path.rs (accumulate segments, terminal call)
//!     → matcher.rs (compile PathPattern, transport path `/people/{var1}`)
//!     → registry.rs (record path + verb for diagnostics)
//!
//! Request:
//!     request path
//!     → matcher.rs (exact or prefix match, extract params in order)
//!     → Return: Params or NoMatch
//! ```
//!
//! # Design Decisions
//! - Patterns are immutable once compiled
//! - No regex in hot path (segment comparison only)
//! - Deterministic: same input always matches same binding
//! - First match wins (registration order)

pub mod matcher;
pub mod path;
pub mod registry;

pub use matcher::PathPattern;
pub use path::{Params, PathAccumulator, PathSegment, Terminal, PARAM_MARKER};
pub use registry::{RouteRegistry, Verb};
