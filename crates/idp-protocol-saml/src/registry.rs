//! Trust registry of Service Providers.
//!
//! Providers come from an [`SpSource`]: either a static list (normally read
//! from the config store) or a host callback. The source is chosen when the
//! IdP is configured; a configured callback always wins.
//!
//! Each request takes one [`TrustRegistry`] snapshot and uses it for both
//! validation and assertion building, so a registry change mid-request can
//! not split the two.

use std::fmt;
use std::sync::Arc;

use crate::host::{UserAttributes, UserIdentity};

/// Maps a user to the attributes released to one Service Provider.
pub type AttributeResolver = Arc<dyn Fn(&UserIdentity) -> UserAttributes + Send + Sync>;

/// Host callback listing trusted Service Providers.
pub type SpCallback = Arc<dyn Fn() -> Vec<TrustedServiceProvider> + Send + Sync>;

/// A Service Provider allowed to receive assertions.
#[derive(Clone)]
pub struct TrustedServiceProvider {
    /// Entity ID; the unique lookup key.
    pub entity_id: String,
    /// Pinned ACS URL. When absent, the URL declared in the request is
    /// trusted as-is.
    pub assertion_consumer_service_url: Option<String>,
    /// Display name; defaults to the entity ID.
    pub friendly_name: Option<String>,
    /// Attribute resolver; defaults to username and email only.
    pub user_attribute_resolver: Option<AttributeResolver>,
}

impl TrustedServiceProvider {
    /// Creates an unpinned provider.
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            assertion_consumer_service_url: None,
            friendly_name: None,
            user_attribute_resolver: None,
        }
    }

    /// Pins the ACS URL. An empty URL leaves the provider unpinned.
    #[must_use]
    pub fn with_acs_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.assertion_consumer_service_url = (!url.is_empty()).then_some(url);
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }

    /// Sets the attribute resolver.
    #[must_use]
    pub fn with_attribute_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&UserIdentity) -> UserAttributes + Send + Sync + 'static,
    {
        self.user_attribute_resolver = Some(Arc::new(resolver));
        self
    }

    /// Pinned ACS URL, ignoring empty values.
    #[must_use]
    pub fn pinned_acs_url(&self) -> Option<&str> {
        self.assertion_consumer_service_url
            .as_deref()
            .filter(|url| !url.is_empty())
    }

    /// Display name, falling back to the entity ID.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.friendly_name.as_deref().unwrap_or(&self.entity_id)
    }
}

impl fmt::Debug for TrustedServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustedServiceProvider")
            .field("entity_id", &self.entity_id)
            .field(
                "assertion_consumer_service_url",
                &self.assertion_consumer_service_url,
            )
            .field("friendly_name", &self.friendly_name)
            .field(
                "user_attribute_resolver",
                &self.user_attribute_resolver.is_some(),
            )
            .finish()
    }
}

/// Where trusted Service Providers come from.
#[derive(Clone)]
pub enum SpSource {
    /// A fixed list.
    Static(Vec<TrustedServiceProvider>),
    /// A host callback, consulted once per request.
    Callback(SpCallback),
}

impl SpSource {
    /// Takes the per-request snapshot.
    #[must_use]
    pub fn snapshot(&self) -> TrustRegistry {
        match self {
            Self::Static(providers) => TrustRegistry::new(providers.iter().cloned()),
            Self::Callback(callback) => TrustRegistry::new(callback()),
        }
    }

    /// Whether providers come from a host callback.
    #[must_use]
    pub const fn is_dynamic(&self) -> bool {
        matches!(self, Self::Callback(_))
    }
}

impl fmt::Debug for SpSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(providers) => f.debug_tuple("Static").field(providers).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// An immutable set of trusted Service Providers keyed by entity ID.
#[derive(Debug, Clone, Default)]
pub struct TrustRegistry {
    providers: Vec<TrustedServiceProvider>,
}

impl TrustRegistry {
    /// Builds a registry. A repeated entity ID replaces the earlier entry
    /// in its original position.
    pub fn new(providers: impl IntoIterator<Item = TrustedServiceProvider>) -> Self {
        let mut unique: Vec<TrustedServiceProvider> = Vec::new();
        for provider in providers {
            match unique
                .iter_mut()
                .find(|p| p.entity_id == provider.entity_id)
            {
                Some(slot) => *slot = provider,
                None => unique.push(provider),
            }
        }
        Self { providers: unique }
    }

    /// Looks up a provider by entity ID.
    #[must_use]
    pub fn lookup(&self, entity_id: &str) -> Option<&TrustedServiceProvider> {
        self.providers.iter().find(|p| p.entity_id == entity_id)
    }

    /// All providers, in registration order.
    #[must_use]
    pub fn list_all(&self) -> &[TrustedServiceProvider] {
        &self.providers
    }
}
