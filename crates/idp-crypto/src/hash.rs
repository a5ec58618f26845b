//! Digest and MAC functions.

use aws_lc_rs::{digest, hmac};

/// Computes a SHA-256 digest of the input data.
///
/// Used for XML-DSig reference digests, where SAML peers expect
/// `http://www.w3.org/2001/04/xmlenc#sha256`.
#[must_use]
pub fn sha256(data: &[u8]) -> Vec<u8> {
    digest::digest(&digest::SHA256, data).as_ref().to_vec()
}

/// Computes an HMAC-SHA256 tag.
#[must_use]
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let key = hmac::Key::new(hmac::HMAC_SHA256, key);
    hmac::sign(&key, data).as_ref().to_vec()
}

/// Verifies an HMAC-SHA256 tag in constant time.
#[must_use]
pub fn hmac_sha256_verify(key: &[u8], data: &[u8], tag: &[u8]) -> bool {
    let key = hmac::Key::new(hmac::HMAC_SHA256, key);
    hmac::verify(&key, data, tag).is_ok()
}
