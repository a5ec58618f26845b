//! IdP signing key pair.
//!
//! A [`SigningKeyPair`] bundles the RSA private key with the X.509 certificate
//! published to service providers. Construction fails unless the key belongs
//! to the certificate, so a loaded pair can always produce signatures that
//! verify against the published certificate.

use std::fmt;

use aws_lc_rs::signature::{KeyPair, RsaKeyPair};
use base64::Engine;
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::error::CryptoError;
use crate::pem::{self, PrivateKeyFormat};
use crate::rsa::rsa_sha256_sign;

/// RSA signing key together with its certificate.
pub struct SigningKeyPair {
    key_pair: RsaKeyPair,
    certificate_der: Vec<u8>,
    public_key_der: Vec<u8>,
}

impl SigningKeyPair {
    /// Loads a key pair from a PEM certificate and an unencrypted PEM private key.
    ///
    /// # Errors
    ///
    /// Returns an error if either input cannot be parsed or if the private key
    /// does not correspond to the certificate's public key.
    pub fn from_pem(certificate_pem: &str, private_key_pem: &str) -> Result<Self, CryptoError> {
        let certificate_der = pem::pem_to_der(certificate_pem, "CERTIFICATE")?;
        let public_key_der = certificate_public_key(&certificate_der)?;

        let (key_der, format) = pem::private_key_der(private_key_pem)?;
        let key_pair = match format {
            PrivateKeyFormat::Pkcs8 => RsaKeyPair::from_pkcs8(&key_der),
            PrivateKeyFormat::Pkcs1 => RsaKeyPair::from_der(&key_der),
        }
        .map_err(|e| CryptoError::InvalidKey(format!("Invalid RSA key: {e}")))?;

        if key_pair.public_key().as_ref() != public_key_der.as_slice() {
            return Err(CryptoError::KeyMismatch);
        }

        Ok(Self {
            key_pair,
            certificate_der,
            public_key_der,
        })
    }

    /// Signs data with RSA-SHA256.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        rsa_sha256_sign(&self.key_pair, data)
    }

    /// DER-encoded certificate.
    #[must_use]
    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate_der
    }

    /// Base64 certificate body, as placed in `ds:X509Certificate`.
    #[must_use]
    pub fn certificate_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.certificate_der)
    }

    /// DER `RSAPublicKey` of the certificate.
    #[must_use]
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }

    /// Modulus size in bits.
    #[must_use]
    pub fn modulus_bits(&self) -> usize {
        self.key_pair.public_modulus_len() * 8
    }
}

impl fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("modulus_bits", &self.modulus_bits())
            .finish_non_exhaustive()
    }
}

/// Extracts the DER `RSAPublicKey` from a DER certificate.
///
/// # Errors
///
/// Returns an error if the certificate cannot be parsed.
pub fn certificate_public_key(certificate_der: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let (_, cert) = X509Certificate::from_der(certificate_der)
        .map_err(|e| CryptoError::InvalidCertificate(format!("Failed to parse certificate: {e}")))?;
    Ok(cert.public_key().subject_public_key.data.to_vec())
}
