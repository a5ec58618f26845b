//! SAML error types.
//!
//! Every failure ends the HTTP exchange; no error here is retried. The
//! [`SamlError::user_message`] strings are what a browser sees, the
//! `Display` output is what gets logged.

use idp_crypto::CryptoError;
use thiserror::Error;

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML identity provider errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// Malformed wire payload: bad base64, bad DEFLATE stream, bad XML or a
    /// missing mandatory field.
    #[error("decode error: {0}")]
    Decode(String),

    /// The issuer is not a trusted Service Provider.
    #[error("unknown service provider: {issuer}")]
    InvalidClient {
        /// The issuer or service that was looked up.
        issuer: String,
    },

    /// The requested Assertion Consumer Service URL differs from the pinned one.
    #[error("assertion consumer service mismatch for {issuer}: expected {expected}, got {actual}")]
    InvalidCallback {
        /// The Service Provider entity ID.
        issuer: String,
        /// The registered ACS URL (empty when none could be resolved).
        expected: String,
        /// The ACS URL carried by the request.
        actual: String,
    },

    /// Neither the request nor the registry entry supplies an Assertion
    /// Consumer Service URL to post the response to.
    #[error("no assertion consumer service URL known for {issuer}")]
    MissingCallback {
        /// The Service Provider entity ID.
        issuer: String,
    },

    /// Required request correlation is missing.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The confirmation token is expired, forged, out of scope or already used.
    #[error("confirmation token rejected: {0}")]
    ConfirmationTokenInvalid(String),

    /// No usable signing key pair is configured.
    #[error("signing configuration missing: {0}")]
    SigningConfigurationMissing(String),

    /// XML signature creation failed.
    #[error("signature creation failed: {0}")]
    Signing(String),

    /// XML signature validation failed.
    #[error("signature validation failed: {0}")]
    SignatureInvalid(String),

    /// Cryptographic operation error.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl SamlError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::Decode(_)
            | Self::InvalidClient { .. }
            | Self::InvalidCallback { .. }
            | Self::MissingCallback { .. }
            | Self::InvalidRequest(_)
            | Self::ConfirmationTokenInvalid(_)
            | Self::SignatureInvalid(_) => 400,
            Self::SigningConfigurationMissing(_) | Self::Signing(_) | Self::Crypto(_) => 500,
        }
    }

    /// Returns true if the error was caused by the request rather than the IdP.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.http_status() < 500
    }

    /// Short machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode_error",
            Self::InvalidClient { .. } => "invalid_client",
            Self::InvalidCallback { .. } => "invalid_acs",
            Self::MissingCallback { .. } => "missing_acs",
            Self::InvalidRequest(_) => "invalid_request",
            Self::ConfirmationTokenInvalid(_) => "invalid_token",
            Self::SigningConfigurationMissing(_) => "signing_not_configured",
            Self::Signing(_) | Self::Crypto(_) => "signing_failed",
            Self::SignatureInvalid(_) => "invalid_signature",
        }
    }

    /// Message shown to the user. Never includes request-supplied values.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidClient { .. } => "Invalid Authentication Client",
            Self::InvalidCallback { .. } => "Invalid Authentication Client Service URL",
            Self::MissingCallback { .. } => "No Service URL is registered for this Authentication Client",
            Self::SigningConfigurationMissing(_) | Self::Signing(_) | Self::Crypto(_) => {
                "The identity provider is not configured to sign responses"
            }
            Self::Decode(_)
            | Self::InvalidRequest(_)
            | Self::ConfirmationTokenInvalid(_)
            | Self::SignatureInvalid(_) => "Invalid request",
        }
    }
}

impl From<quick_xml::Error> for SamlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Decode(format!("malformed XML: {err}"))
    }
}

impl From<quick_xml::events::attributes::AttrError> for SamlError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::Decode(format!("malformed XML attribute: {err}"))
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Decode(format!("invalid base64: {err}"))
    }
}

impl From<std::io::Error> for SamlError {
    fn from(err: std::io::Error) -> Self {
        Self::Decode(format!("invalid DEFLATE stream: {err}"))
    }
}
