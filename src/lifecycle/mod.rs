//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! controller.rs:
//!     Created → listen() → Listening → close() → Closed
//!
//! shutdown.rs:
//!     close() → broadcast → serving task drains and exits
//!
//! signals.rs:
//!     SIGTERM/SIGINT → resolve shutdown future (binary only)
//! ```
//!
//! # Design Decisions
//! - Linear state machine, no restart
//! - Bindings may still be added while listening
//! - Close waits for in-flight requests

pub mod controller;
pub mod shutdown;
pub mod signals;

pub use controller::{LifecycleController, LifecycleError, LifecycleState};
pub use shutdown::Shutdown;
