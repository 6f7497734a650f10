//! Dead drop server library.
//!
//! A client POSTs any HTTP request to `/deaddrop`; the whole request is stored
//! verbatim under a generated ID. `GET /deaddrop/{id}` later replays it: the
//! stored message is parsed again and its body streamed back as a download,
//! with the original content type and a derived filename.

pub mod config;
pub mod drop;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod storage;
pub mod wire;

pub use config::schema::DeadDropConfig;
pub use drop::DropId;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use storage::{open_store, DropStore, FsStore, MemoryStore};
