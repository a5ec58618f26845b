//! Application state management.
//!
//! This module defines the shared state that is passed to all request handlers.

use std::sync::Arc;

use idp_protocol_saml::builder::AssertionBuilder;
use idp_protocol_saml::config::{
    ConfigOverrides, ConfigStore, IdpSettings, MemoryConfigStore, TRUSTED_SPS_KEY,
};
use idp_protocol_saml::flow::{FlowController, IdpUrls};
use idp_protocol_saml::host::RedirectLogin;
use idp_protocol_saml::token::ConfirmationTokens;

use crate::config::ServerConfig;
use crate::host::{HeaderIdentity, IdentitySource};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// The prompt/confirm flow.
    pub flow: Arc<FlowController>,

    /// Who is logged in.
    pub identity: Arc<dyn IdentitySource>,
}

impl AppState {
    /// Builds the IdP from configuration.
    ///
    /// Trusted Service Providers from the environment seed the settings
    /// store; certificate and key from the environment are fixed overrides.
    #[must_use]
    pub fn from_config(config: ServerConfig) -> Self {
        let store = Arc::new(MemoryConfigStore::new());
        if !config.trusted_sps.trim().is_empty() {
            store.set(TRUSTED_SPS_KEY, &config.trusted_sps);
        }
        let overrides = ConfigOverrides {
            certificate_pem: config.certificate_pem.clone(),
            private_key_pem: config.private_key_pem.clone(),
            sp_callback: None,
        };

        let mut tokens = match &config.token_secret {
            Some(secret) => {
                ConfirmationTokens::new(secret.as_bytes().to_vec(), config.token_lifetime())
            }
            None => {
                tracing::warn!(
                    "IDP_TOKEN_SECRET not set, confirmation tokens will not survive a restart"
                );
                ConfirmationTokens::with_random_secret(config.token_lifetime())
            }
        };
        if config.single_use_tokens {
            tokens = tokens.single_use();
        }

        let mut urls = IdpUrls::new(config.base_url.as_str());
        if let Some(home_url) = &config.home_url {
            urls = urls.with_home_url(home_url.as_str());
        }

        let flow = FlowController::new(
            IdpSettings::new(store, overrides),
            AssertionBuilder::new(config.issuer_name())
                .with_validity_window(config.validity_window()),
            tokens,
            urls,
            Arc::new(RedirectLogin::new(
                config.login_url.as_str(),
                config.logout_url.as_str(),
            )),
        );

        let identity = Arc::new(HeaderIdentity::from_config(&config));

        Self {
            config: Arc::new(config),
            flow: Arc::new(flow),
            identity,
        }
    }

    /// Replaces the identity source.
    #[must_use]
    pub fn with_identity(mut self, identity: Arc<dyn IdentitySource>) -> Self {
        self.identity = identity;
        self
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the flow controller.
    #[must_use]
    pub fn flow(&self) -> &FlowController {
        &self.flow
    }
}
