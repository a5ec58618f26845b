//! HTTP-Redirect Binding implementation.
//!
//! Decodes the `SAMLRequest` query parameter: base64, then raw DEFLATE
//! (RFC 1951, no zlib header), then XML.

use std::io::{Read, Write};

use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::error::{SamlError, SamlResult};
use crate::types::IncomingAuthnRequest;

use super::SamlMessageType;

/// Largest accepted encoded `SAMLRequest` value.
pub const MAX_ENCODED_SIZE: usize = 128 * 1024;

/// Largest accepted inflated XML document.
pub const MAX_INFLATED_SIZE: usize = 64 * 1024;

/// HTTP-Redirect binding encoder/decoder.
pub struct HttpRedirectBinding;

impl HttpRedirectBinding {
    /// Decodes a `SAMLRequest` parameter into an [`IncomingAuthnRequest`].
    ///
    /// `relay_state` is carried through untouched.
    pub fn decode_authn_request(
        saml_request: &str,
        relay_state: Option<&str>,
    ) -> SamlResult<IncomingAuthnRequest> {
        let xml = Self::decode_message(saml_request)?;
        let request = IncomingAuthnRequest::parse_xml(&xml)?
            .with_relay_state(relay_state.map(String::from));

        tracing::debug!(
            issuer = %request.issuer,
            id = %request.id,
            acs = ?request.assertion_consumer_service_url,
            "decoded AuthnRequest"
        );
        Ok(request)
    }

    /// Decodes a `SAMLRequest` parameter into its XML text.
    pub fn decode_message(encoded: &str) -> SamlResult<String> {
        if encoded.len() > MAX_ENCODED_SIZE {
            return Err(SamlError::Decode(format!(
                "SAMLRequest exceeds {MAX_ENCODED_SIZE} bytes"
            )));
        }

        // URL decode (may already be done by the web framework)
        let url_decoded = if encoded.contains('%') {
            urlencoding::decode(encoded)
                .map_err(|e| SamlError::Decode(format!("URL decode error: {e}")))?
                .into_owned()
        } else {
            encoded.to_string()
        };

        // A '+' that went through form decoding arrives as a space; line
        // breaks come from clients that wrap base64 output.
        let normalized: String = url_decoded
            .chars()
            .filter(|c| !matches!(c, '\r' | '\n' | '\t'))
            .map(|c| if c == ' ' { '+' } else { c })
            .collect();

        let compressed = base64::engine::general_purpose::STANDARD.decode(normalized)?;
        let xml_bytes = deflate_decompress(&compressed)?;

        String::from_utf8(xml_bytes)
            .map_err(|e| SamlError::Decode(format!("invalid UTF-8 in message: {e}")))
    }

    /// Encodes a request for the HTTP-Redirect binding.
    ///
    /// This is what a Service Provider sends; the IdP uses it for
    /// IdP-side tooling and tests.
    pub fn encode_request(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
    ) -> SamlResult<String> {
        let encoded = Self::encode_message(xml)?;
        let param_name = SamlMessageType::Request.form_param();
        let separator = if destination.contains('?') { '&' } else { '?' };

        let mut url = format!(
            "{destination}{separator}{param_name}={}",
            urlencoding::encode(&encoded)
        );
        if let Some(rs) = relay_state {
            url.push_str("&RelayState=");
            url.push_str(&urlencoding::encode(rs));
        }
        Ok(url)
    }

    /// Deflates and base64-encodes a message, without URL encoding.
    pub fn encode_message(xml: &str) -> SamlResult<String> {
        let compressed = deflate_compress(xml.as_bytes())?;
        Ok(base64::engine::general_purpose::STANDARD.encode(compressed))
    }
}

/// Compresses data with raw DEFLATE.
pub fn deflate_compress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| SamlError::Decode(format!("deflate error: {e}")))?;
    encoder
        .finish()
        .map_err(|e| SamlError::Decode(format!("deflate error: {e}")))
}

/// Decompresses raw DEFLATE data, bounded by [`MAX_INFLATED_SIZE`].
pub fn deflate_decompress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let limit = u64::try_from(MAX_INFLATED_SIZE).unwrap_or(u64::MAX) + 1;
    let mut decompressed = Vec::new();
    DeflateDecoder::new(data)
        .take(limit)
        .read_to_end(&mut decompressed)?;

    if decompressed.len() > MAX_INFLATED_SIZE {
        return Err(SamlError::Decode(format!(
            "inflated message exceeds {MAX_INFLATED_SIZE} bytes"
        )));
    }
    Ok(decompressed)
}
