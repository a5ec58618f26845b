//! # SAML IdP server
//!
//! Main entry point for the identity provider.

#![forbid(unsafe_code)]

use idp_server::{Server, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(base_url = %config.base_url, "SAML IdP starting...");

    Server::new(config).run().await
}
