//! XML Signature creation.
//!
//! Produces enveloped RSA-SHA256 signatures over [`XmlElement`] trees.

use std::sync::Arc;

use base64::Engine;
use idp_crypto::SigningKeyPair;

use crate::error::{SamlError, SamlResult};
use crate::types::dsig_algorithms;

use super::xml::{Namespace, XmlElement};

/// XML element signer.
///
/// Signs with the IdP key pair and embeds the certificate in `KeyInfo`.
#[derive(Debug, Clone)]
pub struct XmlSigner {
    keys: Arc<SigningKeyPair>,
}

impl XmlSigner {
    /// Creates a signer for the given key pair.
    #[must_use]
    pub const fn new(keys: Arc<SigningKeyPair>) -> Self {
        Self { keys }
    }

    /// Signs an element in place.
    ///
    /// The element must carry an `ID` attribute and must not already contain
    /// a signature. The `ds:Signature` is inserted directly after the
    /// element's `saml:Issuer`, or first when there is no issuer.
    pub fn sign(&self, element: &mut XmlElement) -> SamlResult<()> {
        let reference_id = element
            .attribute("ID")
            .ok_or_else(|| {
                SamlError::Signing(format!("<{}> has no ID attribute", element.name()))
            })?
            .to_string();

        if element.position_of(Namespace::XmlDsig, "Signature").is_some() {
            return Err(SamlError::Signing(format!(
                "<{}> is already signed",
                element.name()
            )));
        }

        // With the signature not yet present the enveloped-signature
        // transform is the identity, so the digest covers the element as is.
        let canonical_element = element.to_canonical_string();
        let digest = idp_crypto::sha256(canonical_element.as_bytes());
        let digest_b64 = base64::engine::general_purpose::STANDARD.encode(digest);

        let signed_info = build_signed_info(&reference_id, &digest_b64);
        let signature_value = self
            .keys
            .sign(signed_info.to_canonical_string().as_bytes())?;
        let signature_b64 = base64::engine::general_purpose::STANDARD.encode(signature_value);

        let signature =
            build_signature_element(signed_info, &signature_b64, &self.keys.certificate_base64());

        let index = element
            .position_of(Namespace::Assertion, "Issuer")
            .map_or(0, |i| i + 1);
        element.insert_child(index, signature);

        tracing::debug!(element = element.name(), id = %reference_id, "signed element");
        Ok(())
    }
}

/// Builds the `ds:SignedInfo` element for a reference.
#[must_use]
pub fn build_signed_info(reference_id: &str, digest_b64: &str) -> XmlElement {
    XmlElement::new(Namespace::XmlDsig, "SignedInfo")
        .child(
            XmlElement::new(Namespace::XmlDsig, "CanonicalizationMethod")
                .attr("Algorithm", dsig_algorithms::EXCLUSIVE_C14N),
        )
        .child(
            XmlElement::new(Namespace::XmlDsig, "SignatureMethod")
                .attr("Algorithm", dsig_algorithms::RSA_SHA256),
        )
        .child(
            XmlElement::new(Namespace::XmlDsig, "Reference")
                .attr("URI", format!("#{reference_id}"))
                .child(
                    XmlElement::new(Namespace::XmlDsig, "Transforms")
                        .child(
                            XmlElement::new(Namespace::XmlDsig, "Transform")
                                .attr("Algorithm", dsig_algorithms::ENVELOPED_SIGNATURE),
                        )
                        .child(
                            XmlElement::new(Namespace::XmlDsig, "Transform")
                                .attr("Algorithm", dsig_algorithms::EXCLUSIVE_C14N),
                        ),
                )
                .child(
                    XmlElement::new(Namespace::XmlDsig, "DigestMethod")
                        .attr("Algorithm", dsig_algorithms::SHA256),
                )
                .child(XmlElement::new(Namespace::XmlDsig, "DigestValue").text(digest_b64)),
        )
}

/// Builds `ds:KeyInfo` carrying a base64 certificate.
#[must_use]
pub fn build_key_info(certificate_b64: &str) -> XmlElement {
    XmlElement::new(Namespace::XmlDsig, "KeyInfo").child(
        XmlElement::new(Namespace::XmlDsig, "X509Data").child(
            XmlElement::new(Namespace::XmlDsig, "X509Certificate").text(certificate_b64),
        ),
    )
}

fn build_signature_element(
    signed_info: XmlElement,
    signature_b64: &str,
    certificate_b64: &str,
) -> XmlElement {
    XmlElement::new(Namespace::XmlDsig, "Signature")
        .child(signed_info)
        .child(XmlElement::new(Namespace::XmlDsig, "SignatureValue").text(signature_b64))
        .child(build_key_info(certificate_b64))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CERT: &str = include_str!("../../../../testdata/idp.crt");
    const KEY: &str = include_str!("../../../../testdata/idp.pem");

    fn signer() -> XmlSigner {
        XmlSigner::new(Arc::new(SigningKeyPair::from_pem(CERT, KEY).unwrap()))
    }

    fn assertion() -> XmlElement {
        XmlElement::new(Namespace::Assertion, "Assertion")
            .attr("ID", "_a1")
            .child(XmlElement::new(Namespace::Assertion, "Issuer").text("https://idp.example"))
            .child(XmlElement::new(Namespace::Assertion, "Subject"))
    }

    #[test]
    fn signature_is_inserted_after_issuer() {
        let mut element = assertion();
        signer().sign(&mut element).unwrap();
        let names: Vec<_> = element.child_elements().map(XmlElement::name).collect();
        assert_eq!(names, ["Issuer", "Signature", "Subject"]);

        let xml = element.to_canonical_string();
        assert!(xml.contains(r##"<ds:Reference URI="#_a1">"##));
        assert!(xml.contains(dsig_algorithms::RSA_SHA256));
        assert!(xml.contains("<ds:X509Certificate>MII"));
    }

    #[test]
    fn digest_covers_unsigned_element() {
        let unsigned = assertion();
        let expected = base64::engine::general_purpose::STANDARD
            .encode(idp_crypto::sha256(unsigned.to_canonical_string().as_bytes()));

        let mut element = unsigned;
        signer().sign(&mut element).unwrap();
        assert!(element
            .to_canonical_string()
            .contains(&format!("<ds:DigestValue>{expected}</ds:DigestValue>")));
    }

    #[test]
    fn requires_id_attribute() {
        let mut element = XmlElement::new(Namespace::Assertion, "Assertion");
        assert!(matches!(
            signer().sign(&mut element),
            Err(SamlError::Signing(_))
        ));
    }

    #[test]
    fn refuses_to_sign_twice() {
        let mut element = assertion();
        signer().sign(&mut element).unwrap();
        assert!(signer().sign(&mut element).is_err());
    }
}
