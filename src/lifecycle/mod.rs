//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() or signal → stop accepting → drain in-flight requests → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT (Ctrl+C) → graceful shutdown
//! ```
//!
//! # Design Decisions
//! - In-flight captures finish and publish before the server exits
//! - Tests trigger shutdown through the same channel as signals

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
