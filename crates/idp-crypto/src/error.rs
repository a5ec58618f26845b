//! Error type for cryptographic operations.

use thiserror::Error;

/// Error type for key handling, signing and verification.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The PEM input could not be decoded.
    #[error("invalid PEM: {0}")]
    InvalidPem(String),

    /// The private key could not be parsed or was rejected.
    #[error("invalid key format: {0}")]
    InvalidKey(String),

    /// The X.509 certificate could not be parsed.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// The private key does not belong to the certificate.
    #[error("private key does not match certificate public key")]
    KeyMismatch,

    /// Signing failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Verification failed.
    #[error("signature verification failed")]
    Verification,
}
