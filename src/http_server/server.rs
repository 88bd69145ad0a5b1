//! # HTTP Server
//!
//! Combines the prescription, medical details and observability routers.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::data_service::DataService;
use crate::observability::Logger;

use super::config::HttpServerConfig;
use super::medical_routes::medical_routes;
use super::middleware::observe_request;
use super::observability_routes::observability_routes;
use super::prescription_routes::prescription_routes;
use super::state::AppState;

/// HTTP server of the prescription API
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    /// Create a server over `data` with default settings
    pub fn new(data: Arc<dyn DataService>) -> Self {
        Self::with_state(HttpServerConfig::default(), AppState::new(data))
    }

    pub fn with_state(config: HttpServerConfig, state: AppState) -> Self {
        let router = build_router(&config, state);
        Self { config, router }
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Serve until ctrl-c
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self.config.socket_addr().parse().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid socket address '{}': {}", self.config.socket_addr(), e),
            )
        })?;

        let listener = TcpListener::bind(addr).await?;
        Logger::info("SERVER_STARTED", &[("addr", addr.to_string().as_str())]);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Logger::info("SERVER_STOPPED", &[]);
        Ok(())
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler: run until the process is killed
        std::future::pending::<()>().await;
    }
}

fn cors_layer(config: &HttpServerConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the full application router
pub fn build_router(config: &HttpServerConfig, state: AppState) -> Router {
    let metrics = state.metrics.clone();

    Router::new()
        .merge(observability_routes())
        .merge(prescription_routes())
        .merge(medical_routes())
        .with_state(state)
        .layer(middleware::from_fn_with_state(metrics, observe_request))
        .layer(cors_layer(config))
}
