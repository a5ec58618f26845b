//! # idp-server
//!
//! HTTP service for the SAML identity provider.
//!
//! Endpoints:
//! - `GET /idp` - authentication request landing page
//! - `GET|POST /idp/confirm` - confirmation step, answers with the signed
//!   response form
//! - `GET /idp/metadata` - IdP metadata
//! - `GET /health`, `GET /health/live` - health checks
//!
//! Users are authenticated by the host in front of this service; see
//! [`host`].
//!
//! ## Usage
//!
//! ```ignore
//! use idp_server::{Server, ServerConfig};
//!
//! let config = ServerConfig::from_env()?;
//! let server = Server::new(config);
//! server.run().await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod host;
pub mod router;
pub mod saml_handlers;
pub mod saml_ui;
pub mod state;

pub use config::ServerConfig;
pub use router::create_router;
pub use state::AppState;

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;

/// The identity provider server.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Creates a new server instance.
    ///
    /// Signing keys are loaded eagerly so configuration problems show up in
    /// the log at start-up; a missing key is not fatal here, but every
    /// confirmation fails until one is configured.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let state = AppState::from_config(config);

        match state.flow.signing_keys() {
            Ok(keys) => tracing::info!(
                modulus_bits = keys.modulus_bits(),
                issuer = state.flow.issuer_name(),
                "IdP signing keys loaded"
            ),
            Err(e) => tracing::warn!("IdP signing keys unavailable: {}", e),
        }

        Self { state }
    }

    /// Runs the server.
    ///
    /// This starts the HTTP server and blocks until it receives a shutdown signal.
    pub async fn run(self) -> anyhow::Result<()> {
        let config = self.state.config().clone();
        let app = create_router(self.state);

        // Bind to address
        let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on http://{}", addr);

        // Run server with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Returns the application state.
    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// Creates a test router without starting the server.
    ///
    /// This is useful for integration testing.
    pub fn test_router(&self) -> Router {
        create_router(self.state.clone())
    }
}

/// Waits for a shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
