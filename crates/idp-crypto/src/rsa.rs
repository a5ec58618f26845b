//! RSA PKCS#1 v1.5 with SHA-256.
//!
//! This is the signature algorithm SAML 2.0 peers support universally; the
//! XML-DSig identifier is [`RSA_SHA256_URI`].

use aws_lc_rs::{
    rand::SystemRandom,
    signature::{self, RsaKeyPair, UnparsedPublicKey, RSA_PKCS1_2048_8192_SHA256},
};

use crate::error::CryptoError;

/// XML-DSig algorithm URI for RSA-SHA256.
pub const RSA_SHA256_URI: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";

/// Signs data with RSA-SHA256.
///
/// # Errors
///
/// Returns an error if signing fails.
pub fn rsa_sha256_sign(key_pair: &RsaKeyPair, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let rng = SystemRandom::new();
    let mut signature = vec![0u8; key_pair.public_modulus_len()];

    key_pair
        .sign(&signature::RSA_PKCS1_SHA256, &rng, data, &mut signature)
        .map_err(|e| CryptoError::Signing(format!("RSA signing failed: {e}")))?;

    Ok(signature)
}

/// Verifies an RSA-SHA256 signature.
///
/// `public_key_der` is the DER `RSAPublicKey` carried in a certificate's
/// subject public key bit string (see [`crate::certificate_public_key`]).
#[must_use]
pub fn rsa_sha256_verify(public_key_der: &[u8], data: &[u8], sig: &[u8]) -> bool {
    UnparsedPublicKey::new(&RSA_PKCS1_2048_8192_SHA256, public_key_der)
        .verify(data, sig)
        .is_ok()
}
