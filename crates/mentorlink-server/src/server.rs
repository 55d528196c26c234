//! Server startup and lifecycle

use std::net::SocketAddr;

use mentorlink_core::ServiceConfig;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::signal;

use crate::error::{Result, ServerError};
use crate::routes::create_router;
use crate::state::{create_shared_state, SharedState};

/// The matchmaking HTTP server
pub struct Server {
    state: SharedState,
    addr: SocketAddr,
}

impl Server {
    /// Run the server until ctrl-c or SIGTERM
    pub async fn run(self) -> Result<()> {
        let router = create_router(self.state.clone());

        tracing::info!("Starting mentorlink server on {}", self.addr);

        let listener = TcpListener::bind(self.addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        Ok(())
    }

    /// Get the server state for testing
    pub fn state(&self) -> SharedState {
        self.state.clone()
    }
}

/// Builder for [`Server`]
pub struct ServerBuilder {
    config: ServiceConfig,
    addr: SocketAddr,
    secret: String,
    initial_rebuild: bool,
    metrics_handle: Option<PrometheusHandle>,
}

impl ServerBuilder {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            addr: ([127, 0, 0, 1], 4000).into(),
            secret: "mentorlink-dev-secret".to_string(),
            initial_rebuild: true,
            metrics_handle: None,
        }
    }

    pub fn addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.addr = ([0, 0, 0, 0], port).into();
        self
    }

    /// Token signing secret; the binary feeds this from the
    /// environment
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = secret.into();
        self
    }

    pub fn metrics_handle(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    /// Skip the initial index build (useful for testing the
    /// not-yet-built query path)
    pub fn skip_rebuild(mut self) -> Self {
        self.initial_rebuild = false;
        self
    }

    /// Build the server.
    ///
    /// Startup is two-phase: the suggestion indexes are rebuilt before
    /// the listener binds, so the query surface never serves without a
    /// published snapshot.
    pub async fn build(self) -> Result<Server> {
        let state = create_shared_state(self.config, &self.secret, self.metrics_handle);

        if self.initial_rebuild {
            state.indexes.rebuild_all(&state.store).await?;
        }

        Ok(Server {
            state,
            addr: self.addr,
        })
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
        tracing::info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
