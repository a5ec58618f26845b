//! Confirmation tokens.
//!
//! A token authorizes the confirm step for one user and one issuer or
//! service. It is self-verifying: `{expiry}.{nonce}.{tag}` where the tag is
//! an HMAC-SHA256 over scope, username, expiry and nonce. Nothing is stored
//! when a token is issued.
//!
//! By default a token stays valid until it expires, even after use. Attach a
//! [`ConsumedTokenStore`] to make tokens single-use.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::{SamlError, SamlResult};

/// Default token lifetime.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(600);

const NONCE_LENGTH: usize = 16;
const SECRET_LENGTH: usize = 32;

/// What a token authorizes: confirming a login to one issuer or service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenScope(String);

impl TokenScope {
    /// Scope for an issuer entity ID or a service identifier.
    #[must_use]
    pub fn for_service(service: &str) -> Self {
        Self(format!("saml_confirm_{service}"))
    }

    /// The scope string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Issues and checks confirmation tokens.
#[derive(Clone)]
pub struct ConfirmationTokens {
    secret: Vec<u8>,
    lifetime: Duration,
    consumed: Option<Arc<ConsumedTokenStore>>,
}

impl std::fmt::Debug for ConfirmationTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationTokens")
            .field("lifetime", &self.lifetime)
            .field("single_use", &self.consumed.is_some())
            .finish_non_exhaustive()
    }
}

impl ConfirmationTokens {
    /// Creates a token service with a fixed secret.
    pub fn new(secret: impl Into<Vec<u8>>, lifetime: Duration) -> Self {
        Self {
            secret: secret.into(),
            lifetime,
            consumed: None,
        }
    }

    /// Creates a token service with a random per-process secret. Tokens do
    /// not survive a restart.
    #[must_use]
    pub fn with_random_secret(lifetime: Duration) -> Self {
        Self::new(idp_crypto::random_bytes(SECRET_LENGTH), lifetime)
    }

    /// Rejects a token after its first successful use.
    #[must_use]
    pub fn single_use(mut self) -> Self {
        self.consumed = Some(Arc::new(ConsumedTokenStore::new()));
        self
    }

    /// Whether tokens are single-use.
    #[must_use]
    pub const fn is_single_use(&self) -> bool {
        self.consumed.is_some()
    }

    /// Token lifetime.
    #[must_use]
    pub const fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issues a token for `username` in `scope`.
    #[must_use]
    pub fn issue(&self, scope: &TokenScope, username: &str) -> String {
        self.issue_at(scope, username, Utc::now())
    }

    /// Issues a token as of `now`.
    #[must_use]
    pub fn issue_at(&self, scope: &TokenScope, username: &str, now: DateTime<Utc>) -> String {
        let lifetime = i64::try_from(self.lifetime.as_secs()).unwrap_or(i64::MAX);
        let expires = now.timestamp().saturating_add(lifetime);
        let nonce = idp_crypto::random_alphanumeric(NONCE_LENGTH);
        let tag = self.tag(scope, username, expires, &nonce);
        format!("{expires}.{nonce}.{}", URL_SAFE_NO_PAD.encode(tag))
    }

    /// Checks a token without consuming it.
    pub fn verify(&self, token: &str, scope: &TokenScope, username: &str) -> SamlResult<()> {
        self.verify_at(token, scope, username, Utc::now()).map(|_| ())
    }

    /// Checks a token as of `now`, returning its expiry.
    pub fn verify_at(
        &self,
        token: &str,
        scope: &TokenScope,
        username: &str,
        now: DateTime<Utc>,
    ) -> SamlResult<i64> {
        let mut parts = token.splitn(3, '.');
        let (Some(expires), Some(nonce), Some(tag)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(rejected("malformed token"));
        };
        let expires: i64 = expires.parse().map_err(|_| rejected("malformed token"))?;
        let tag = URL_SAFE_NO_PAD
            .decode(tag)
            .map_err(|_| rejected("malformed token"))?;

        let expected = Self::tag_input(scope, username, expires, nonce);
        if !idp_crypto::hmac_sha256_verify(&self.secret, expected.as_bytes(), &tag) {
            return Err(rejected("token does not match user or scope"));
        }
        if now.timestamp() >= expires {
            return Err(rejected("token expired"));
        }
        Ok(expires)
    }

    /// Checks a token and, for single-use tokens, marks it used.
    pub fn consume(&self, token: &str, scope: &TokenScope, username: &str) -> SamlResult<()> {
        self.consume_at(token, scope, username, Utc::now())
    }

    /// [`Self::consume`] as of `now`.
    pub fn consume_at(
        &self,
        token: &str,
        scope: &TokenScope,
        username: &str,
        now: DateTime<Utc>,
    ) -> SamlResult<()> {
        let expires = self.verify_at(token, scope, username, now)?;
        if let Some(consumed) = &self.consumed {
            if !consumed.mark_used(token, expires, now.timestamp()) {
                tracing::warn!(scope = scope.as_str(), username, "confirmation token replayed");
                return Err(rejected("token already used"));
            }
        }
        Ok(())
    }

    fn tag(&self, scope: &TokenScope, username: &str, expires: i64, nonce: &str) -> Vec<u8> {
        idp_crypto::hmac_sha256(
            &self.secret,
            Self::tag_input(scope, username, expires, nonce).as_bytes(),
        )
    }

    fn tag_input(scope: &TokenScope, username: &str, expires: i64, nonce: &str) -> String {
        // Length prefixes keep `|` inside a scope or username from shifting fields.
        let scope = scope.as_str();
        format!(
            "{}:{scope}|{}:{username}|{expires}|{nonce}",
            scope.len(),
            username.len()
        )
    }
}

fn rejected(reason: &str) -> SamlError {
    SamlError::ConfirmationTokenInvalid(reason.to_string())
}

/// Tokens already used, kept until they expire.
#[derive(Debug, Default)]
pub struct ConsumedTokenStore {
    used: Mutex<HashMap<String, i64>>,
}

impl ConsumedTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a use. Returns false if the token was already used.
    pub fn mark_used(&self, token: &str, expires: i64, now: i64) -> bool {
        let mut used = self.used.lock();
        used.retain(|_, expiry| *expiry > now);
        if used.contains_key(token) {
            return false;
        }
        used.insert(token.to_string(), expires);
        true
    }

    /// Number of tracked tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.used.lock().len()
    }

    /// Whether no tokens are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.used.lock().is_empty()
    }
}
