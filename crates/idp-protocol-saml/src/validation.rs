//! Request Validator.
//!
//! Checks a request's issuer and declared ACS URL against one
//! [`TrustRegistry`] snapshot.

use crate::error::{SamlError, SamlResult};
use crate::registry::{AttributeResolver, TrustRegistry, TrustedServiceProvider};

/// A Service Provider that passed validation, merged with its registry entry.
#[derive(Clone)]
pub struct ValidatedClient {
    /// Entity ID; the assertion audience.
    pub entity_id: String,
    /// Display name, defaulting to the entity ID.
    pub friendly_name: String,
    /// ACS URL the response will be posted to, when one is known.
    pub assertion_consumer_service_url: Option<String>,
    /// Attribute resolver from the registry entry.
    pub user_attribute_resolver: Option<AttributeResolver>,
}

impl std::fmt::Debug for ValidatedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatedClient")
            .field("entity_id", &self.entity_id)
            .field("friendly_name", &self.friendly_name)
            .field(
                "assertion_consumer_service_url",
                &self.assertion_consumer_service_url,
            )
            .finish_non_exhaustive()
    }
}

impl ValidatedClient {
    fn merge(provider: &TrustedServiceProvider, requested_acs: Option<&str>) -> Self {
        Self {
            entity_id: provider.entity_id.clone(),
            friendly_name: provider.display_name().to_string(),
            assertion_consumer_service_url: provider
                .pinned_acs_url()
                .or(requested_acs)
                .map(String::from),
            user_attribute_resolver: provider.user_attribute_resolver.clone(),
        }
    }

    /// The ACS URL to post to. Fails when neither the request nor the
    /// registry supplied one.
    pub fn destination(&self) -> SamlResult<&str> {
        self.assertion_consumer_service_url
            .as_deref()
            .ok_or_else(|| SamlError::MissingCallback {
                issuer: self.entity_id.clone(),
            })
    }
}

/// Validates `issuer` and its declared ACS URL.
///
/// A pinned ACS URL must match the declared one exactly. An unpinned entry
/// accepts whatever the request declares; that is a trust trade-off chosen
/// by whoever registered the provider.
pub fn validate(
    registry: &TrustRegistry,
    issuer: &str,
    requested_acs: Option<&str>,
) -> SamlResult<ValidatedClient> {
    let requested_acs = requested_acs.filter(|url| !url.is_empty());

    let Some(provider) = registry.lookup(issuer) else {
        tracing::warn!(issuer, "rejected request from unknown service provider");
        return Err(SamlError::InvalidClient {
            issuer: issuer.to_string(),
        });
    };

    if let (Some(pinned), Some(requested)) = (provider.pinned_acs_url(), requested_acs) {
        if pinned != requested {
            tracing::warn!(
                issuer,
                expected = pinned,
                actual = requested,
                "rejected request with mismatched ACS URL"
            );
            return Err(SamlError::InvalidCallback {
                issuer: issuer.to_string(),
                expected: pinned.to_string(),
                actual: requested.to_string(),
            });
        }
    }

    Ok(ValidatedClient::merge(provider, requested_acs))
}
