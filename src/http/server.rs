//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the capture and replay handlers
//! - Serve the bundled web UI as the fallback
//! - Wire up middleware (tracing, request ID, replay timeout)
//! - Bind server to listener and shut down gracefully

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::{DeadDropConfig, StaticFilesConfig};
use crate::http::handlers::{capture_drop, replay_drop};
use crate::http::request::{assign_request_id, request_span};
use crate::lifecycle::shutdown_signal;
use crate::storage::DropStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DropStore>,
}

/// HTTP server for the dead drop.
pub struct HttpServer {
    router: Router,
    config: DeadDropConfig,
}

impl HttpServer {
    /// Create a new HTTP server over `store`.
    pub fn new(config: DeadDropConfig, store: Arc<dyn DropStore>) -> Self {
        let state = AppState { store };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The request timeout covers replay only: a capture runs for as long
    /// as the upload keeps streaming.
    #[allow(deprecated)]
    fn build_router(config: &DeadDropConfig, state: AppState) -> Router {
        let mut replay = Router::new().route("/deaddrop/{id}", get(replay_drop));
        if config.timeouts.request_secs > 0 {
            replay = replay.route_layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )));
        }

        let mut router = Router::new()
            .route("/deaddrop", post(capture_drop))
            .merge(replay)
            .with_state(state);

        if let Some(assets) = static_assets(&config.static_files) {
            router = router.fallback_service(assets);
        }

        // drops have no size limit
        router
            .layer(DefaultBodyLimit::disable())
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(middleware::from_fn(assign_request_id))
    }

    /// The route table, for driving the server without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until a
    /// signal or `shutdown` fires. In-flight requests are drained first.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &DeadDropConfig {
        &self.config
    }
}

fn static_assets(config: &StaticFilesConfig) -> Option<ServeDir> {
    if !config.enabled {
        return None;
    }

    if !Path::new(&config.dir).is_dir() {
        tracing::warn!(
            dir = %config.dir.display(),
            "Static asset directory missing; web UI disabled"
        );
        return None;
    }

    tracing::info!(dir = %config.dir.display(), "Serving web UI");
    Some(ServeDir::new(&config.dir).append_index_html_on_directories(true))
}
