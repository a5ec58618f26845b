//! # idp-crypto
//!
//! Cryptographic operations for the SAML identity provider using aws-lc-rs.
//!
//! ## Algorithms
//!
//! SAML 2.0 service providers expect XML signatures made with RSA PKCS#1 v1.5
//! over SHA-256, so this crate provides exactly that set:
//! - RSA-SHA256 signing and verification
//! - SHA-256 digests for signature references
//! - HMAC-SHA256 tags for self-verifying confirmation tokens
//!
//! Signing keys are loaded from PEM (PKCS#8 or PKCS#1) and must match the
//! X.509 certificate they are published with.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod hash;
pub mod keys;
pub mod pem;
pub mod random;
pub mod rsa;

pub use error::CryptoError;
pub use hash::{hmac_sha256, hmac_sha256_verify, sha256};
pub use keys::{certificate_public_key, SigningKeyPair};
pub use random::{random_alphanumeric, random_bytes};
pub use rsa::{rsa_sha256_sign, rsa_sha256_verify, RSA_SHA256_URI};
