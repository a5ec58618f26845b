//! Host identity from trusted request headers.
//!
//! The server does not authenticate users. An authenticating reverse proxy
//! in front of it sets identity headers; requests without them are
//! anonymous and get sent to the host login page.

use axum::http::HeaderMap;
use idp_protocol_saml::host::UserIdentity;

use crate::config::ServerConfig;

/// Resolves the user behind a request.
pub trait IdentitySource: Send + Sync {
    /// The authenticated user, if any.
    fn current_user(&self, headers: &HeaderMap) -> Option<UserIdentity>;
}

/// Reads the identity from proxy-set headers.
#[derive(Debug, Clone)]
pub struct HeaderIdentity {
    user_header: String,
    email_header: String,
    display_name_header: String,
}

impl HeaderIdentity {
    /// Creates a source reading the configured headers.
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            user_header: config.user_header.clone(),
            email_header: config.email_header.clone(),
            display_name_header: config.display_name_header.clone(),
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

impl IdentitySource for HeaderIdentity {
    fn current_user(&self, headers: &HeaderMap) -> Option<UserIdentity> {
        let username = header(headers, &self.user_header)?;
        let email = header(headers, &self.email_header).unwrap_or_default();
        let identity = UserIdentity::new(username, email);
        Some(match header(headers, &self.display_name_header) {
            Some(name) => identity.with_display_name(name),
            None => identity,
        })
    }
}
