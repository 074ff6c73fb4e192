//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the mock as fallback service
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener and shut down gracefully

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::http::uri::InvalidUri;
use axum::http::StatusCode;
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::schema::ServerConfig;
use crate::dispatch::ApiMock;
use crate::http::layer::MockLayer;
use crate::http::upstream::Upstream;

/// Standalone HTTP server exposing an [`ApiMock`].
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server for `mock`. Passthrough requests go to
    /// `config.upstream` when set.
    pub fn new(mock: Arc<ApiMock>, config: &ServerConfig) -> Result<Self, InvalidUri> {
        let upstream = Upstream::new(config.upstream.as_deref())?;
        let router = Self::build_router(mock, upstream, config);
        Ok(Self { router })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(mock: Arc<ApiMock>, upstream: Upstream, config: &ServerConfig) -> Router {
        let service = ServiceBuilder::new()
            .layer(MockLayer::new(mock).body_limit(config.max_body_bytes))
            .service(upstream);

        Router::new().fallback_service(service).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    Duration::from_secs(config.request_timeout_secs),
                )),
        )
    }

    /// The router, for embedding or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Wait for shutdown signal (Ctrl+C).
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    tracing::info!("Shutdown signal received");
}
