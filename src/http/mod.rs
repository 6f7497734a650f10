//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, trace span)
//!     → handlers.rs
//!         POST /deaddrop      → storage create → wire serialize → publish
//!         GET  /deaddrop/{id} → storage open → wire parse → stream body
//!         GET  /*             → static web UI
//!     → error.rs (404 for unknown drops, 500 otherwise)
//! ```

pub mod error;
pub mod handlers;
pub mod request;
pub mod server;

pub use error::DropError;
pub use handlers::CaptureResponse;
pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
