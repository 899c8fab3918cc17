//! Admin API server.

mod handlers;

pub use handlers::*;

use crate::config::ServerConfig;
use crate::logging::ConsoleBuffer;
use crate::scheduler::Scheduler;
use crate::store::TargetStore;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub store: Arc<TargetStore>,
    pub scheduler: Arc<Scheduler>,
    pub console: ConsoleBuffer,
}

/// Web server for the admin API.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a new server with the given dependencies.
    pub fn new(
        config: ServerConfig,
        store: Arc<TargetStore>,
        scheduler: Arc<Scheduler>,
        console: ConsoleBuffer,
    ) -> Self {
        Self {
            state: AppState {
                config,
                store,
                scheduler,
                console,
            },
        }
    }

    /// Build the router with all routes.
    fn routes(&self) -> Router {
        router(self.state.clone())
    }

    /// Start the server on the configured port.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.http_port));
        let router = self.routes();

        tracing::info!("Admin API listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

    Router::new()
        // Runtime views
        .route("/api/status", get(handlers::handle_status))
        .route("/api/logs", get(handlers::handle_logs))
        .route("/api/groups", get(handlers::handle_groups))
        // Configuration
        .route("/api/settings", post(handlers::handle_settings))
        .route("/api/server/add", post(handlers::handle_add_server))
        .route("/api/server/update", post(handlers::handle_update_server))
        .route("/api/server/delete", post(handlers::handle_delete_server))
        .route("/api/group/rename", post(handlers::handle_rename_group))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(64 * 1024))
        .with_state(state)
}
