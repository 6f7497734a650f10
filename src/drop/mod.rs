//! Drop identity and download naming.
//!
//! # Data Flow
//! ```text
//! Capture:
//!     id.rs (DropId::generate) → storage key + public handle
//!
//! Replay:
//!     path segment → id.rs (DropId::from_path_segment, strips ".ext")
//!     → storage open → wire parse
//!     → naming.rs (Content-Disposition filename or <id>.<ext>)
//! ```
//!
//! # Design Decisions
//! - IDs are time-ordered UUIDs in simple hex form: URL-safe, never contain '.'
//! - Lookup keys are validated before touching the store, so a path segment
//!   can never name anything outside the storage root

pub mod id;
pub mod naming;

pub use id::{DropId, InvalidDropId};
pub use naming::{DownloadName, FALLBACK_EXTENSION};
