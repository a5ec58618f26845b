//! IdP metadata document.

use idp_crypto::SigningKeyPair;

use crate::signature::{build_key_info, Namespace, XmlElement};
use crate::types::{NameIdFormat, SamlBinding, SAMLP_NS};

/// Builds the IdP `md:EntityDescriptor`: the signing certificate and the
/// HTTP-Redirect single sign-on endpoint.
#[must_use]
pub fn idp_metadata_xml(entity_id: &str, sso_url: &str, keys: &SigningKeyPair) -> String {
    XmlElement::new(Namespace::Metadata, "EntityDescriptor")
        .attr("entityID", entity_id)
        .child(
            XmlElement::new(Namespace::Metadata, "IDPSSODescriptor")
                .attr("protocolSupportEnumeration", SAMLP_NS)
                .attr("WantAuthnRequestsSigned", "false")
                .child(
                    XmlElement::new(Namespace::Metadata, "KeyDescriptor")
                        .attr("use", "signing")
                        .child(build_key_info(&keys.certificate_base64())),
                )
                .child(
                    XmlElement::new(Namespace::Metadata, "NameIDFormat")
                        .text(NameIdFormat::Unspecified.uri()),
                )
                .child(
                    XmlElement::new(Namespace::Metadata, "SingleSignOnService")
                        .attr("Binding", SamlBinding::HttpRedirect.uri())
                        .attr("Location", sso_url),
                ),
        )
        .to_document()
}
