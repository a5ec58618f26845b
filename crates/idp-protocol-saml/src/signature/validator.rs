//! XML Signature validation.
//!
//! Checks the enveloped signatures this crate emits. Input is expected in the
//! canonical layout produced by [`super::XmlElement`]; documents that were
//! re-serialized with different whitespace or namespace placement will fail
//! the digest check and need a general-purpose C14N validator instead.

use base64::Engine;
use idp_crypto::SigningKeyPair;

use crate::error::{SamlError, SamlResult};
use crate::types::XMLDSIG_NS;

const SIGNATURE_OPEN: &str = "<ds:Signature";
const SIGNATURE_CLOSE: &str = "</ds:Signature>";

/// Validates enveloped XML signatures against a trusted RSA key.
#[derive(Debug, Clone)]
pub struct SignatureValidator {
    public_key_der: Vec<u8>,
}

impl SignatureValidator {
    /// Trusts the public key of a PEM certificate.
    pub fn from_certificate_pem(pem: &str) -> SamlResult<Self> {
        let der = idp_crypto::pem::pem_to_der(pem, "CERTIFICATE")?;
        Self::from_certificate_der(&der)
    }

    /// Trusts the public key of a DER certificate.
    pub fn from_certificate_der(der: &[u8]) -> SamlResult<Self> {
        Ok(Self {
            public_key_der: idp_crypto::certificate_public_key(der)?,
        })
    }

    /// Trusts the certificate of a loaded key pair.
    #[must_use]
    pub fn from_key_pair(keys: &SigningKeyPair) -> Self {
        Self {
            public_key_der: keys.public_key_der().to_vec(),
        }
    }

    /// Validates the signature enveloped in the element whose `ID` is
    /// `reference_id`.
    pub fn validate(&self, xml: &str, reference_id: &str) -> SamlResult<()> {
        let element = extract_referenced_element(xml, reference_id)?;
        let (signature, unsigned) = split_own_signature(element)?;

        let reference_uri = extract_attribute(signature, "ds:Reference", "URI")
            .ok_or_else(|| invalid("no Reference URI found"))?;
        if reference_uri != format!("#{reference_id}") {
            return Err(invalid("signature references another element"));
        }

        let digest_value = extract_element_content(signature, "ds:DigestValue")
            .ok_or_else(|| invalid("no DigestValue found"))?;
        let computed = base64::engine::general_purpose::STANDARD
            .encode(idp_crypto::sha256(unsigned.as_bytes()));
        if strip_whitespace(digest_value) != computed {
            return Err(invalid("digest mismatch"));
        }

        let signed_info = extract_element(signature, "ds:SignedInfo")
            .ok_or_else(|| invalid("no SignedInfo found"))?;
        let canonical_signed_info = as_apex(signed_info);

        let signature_value = extract_element_content(signature, "ds:SignatureValue")
            .ok_or_else(|| invalid("no SignatureValue found"))?;
        let signature_bytes = base64::engine::general_purpose::STANDARD
            .decode(strip_whitespace(signature_value))
            .map_err(|e| invalid(&format!("invalid SignatureValue encoding: {e}")))?;

        if idp_crypto::rsa_sha256_verify(
            &self.public_key_der,
            canonical_signed_info.as_bytes(),
            &signature_bytes,
        ) {
            Ok(())
        } else {
            Err(invalid("RSA signature does not verify"))
        }
    }
}

/// Returns the base64 certificate embedded in the first signature, if any.
#[must_use]
pub fn embedded_certificate(xml: &str) -> Option<String> {
    extract_element_content(xml, "ds:X509Certificate").map(strip_whitespace)
}

fn invalid(reason: &str) -> SamlError {
    SamlError::SignatureInvalid(reason.to_string())
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Finds the element carrying `ID="{reference_id}"` and returns it up to and
/// including its matching end tag.
fn extract_referenced_element<'a>(xml: &'a str, reference_id: &str) -> SamlResult<&'a str> {
    let id_pattern = format!(" ID=\"{reference_id}\"");
    let pos = xml
        .find(&id_pattern)
        .ok_or_else(|| invalid(&format!("referenced element '{reference_id}' not found")))?;

    let start = xml[..pos]
        .rfind('<')
        .ok_or_else(|| invalid("referenced element has no start tag"))?;
    let name_end = xml[start + 1..]
        .find(|c: char| c.is_whitespace() || c == '>')
        .map(|i| start + 1 + i)
        .ok_or_else(|| invalid("referenced element is truncated"))?;
    let tag_name = &xml[start + 1..name_end];

    let open = format!("<{tag_name}");
    let close = format!("</{tag_name}>");
    let mut depth = 0usize;
    let mut cursor = start;
    loop {
        let next_open = xml[cursor..].find(&open).map(|i| cursor + i);
        let next_close = xml[cursor..]
            .find(&close)
            .map(|i| cursor + i)
            .ok_or_else(|| invalid("referenced element is not properly closed"))?;

        match next_open {
            Some(o) if o < next_close && is_tag_boundary(xml, o + open.len()) => {
                depth += 1;
                cursor = o + open.len();
            }
            Some(o) if o < next_close => cursor = o + open.len(),
            _ => {
                depth = depth.saturating_sub(1);
                cursor = next_close + close.len();
                if depth == 0 {
                    return Ok(&xml[start..cursor]);
                }
            }
        }
    }
}

fn is_tag_boundary(xml: &str, index: usize) -> bool {
    matches!(xml.as_bytes().get(index), Some(b' ' | b'>' | b'/'))
}

/// Splits off the element's own signature. It is the first `ds:Signature`
/// in the element since it directly follows the element's `Issuer`, ahead of
/// any nested signed content.
fn split_own_signature(element: &str) -> SamlResult<(&str, String)> {
    let start = element
        .find(SIGNATURE_OPEN)
        .ok_or_else(|| invalid("no Signature element found"))?;
    let end = element[start..]
        .find(SIGNATURE_CLOSE)
        .map(|i| start + i + SIGNATURE_CLOSE.len())
        .ok_or_else(|| invalid("Signature element is not closed"))?;

    let unsigned = format!("{}{}", &element[..start], &element[end..]);
    Ok((&element[start..end], unsigned))
}

/// Gives an in-document `ds:` element the namespace declaration it carries
/// when canonicalized as its own apex.
fn as_apex(element: &str) -> String {
    let declaration = format!(" xmlns:ds=\"{XMLDSIG_NS}\"");
    if element.contains(&declaration) {
        return element.to_string();
    }
    match element.find(['>', ' ']) {
        Some(i) => format!("{}{}{}", &element[..i], declaration, &element[i..]),
        None => element.to_string(),
    }
}

fn extract_element<'a>(xml: &'a str, qname: &str) -> Option<&'a str> {
    let open = format!("<{qname}");
    let close = format!("</{qname}>");
    let start = xml.find(&open)?;
    let end = xml[start..].find(&close)? + start + close.len();
    Some(&xml[start..end])
}

fn extract_element_content<'a>(xml: &'a str, qname: &str) -> Option<&'a str> {
    let element = extract_element(xml, qname)?;
    let content_start = element.find('>')? + 1;
    let content_end = element.len() - qname.len() - 3;
    element.get(content_start..content_end)
}

fn extract_attribute<'a>(xml: &'a str, qname: &str, attribute: &str) -> Option<&'a str> {
    let start = xml.find(&format!("<{qname}"))?;
    let tag_end = xml[start..].find('>')? + start;
    let tag = &xml[start..tag_end];
    let pattern = format!(" {attribute}=\"");
    let value_start = tag.find(&pattern)? + pattern.len();
    let value_end = tag[value_start..].find('"')? + value_start;
    Some(&tag[value_start..value_end])
}
