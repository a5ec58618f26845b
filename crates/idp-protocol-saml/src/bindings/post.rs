//! HTTP-POST Binding implementation.
//!
//! Sends a SAML response through the browser as an auto-submitting HTML form.

use base64::Engine;
use html_escape::encode_double_quoted_attribute as escape_attr;

use crate::error::{SamlError, SamlResult};

use super::SamlMessageType;

/// HTTP-POST binding encoder/decoder.
pub struct HttpPostBinding;

impl HttpPostBinding {
    /// Encodes a SAML response for the HTTP-POST binding.
    ///
    /// Returns an HTML page whose form posts `SAMLResponse` and, when
    /// present, `RelayState` to `destination` as soon as it loads.
    #[must_use]
    pub fn encode_response(xml: &str, destination: &str, relay_state: Option<&str>) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(xml);
        let param_name = SamlMessageType::Response.form_param();

        let relay_state_input = relay_state
            .map(|rs| {
                format!(
                    r#"<input type="hidden" name="RelayState" value="{}"/>"#,
                    escape_attr(rs)
                )
            })
            .unwrap_or_default();

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>SAML POST Binding</title>
</head>
<body onload="document.forms[0].submit()">
    <noscript>
        <p>JavaScript is disabled. Click the button below to continue.</p>
    </noscript>
    <form method="post" action="{}">
        <input type="hidden" name="{}" value="{}"/>
        {}
        <noscript>
            <input type="submit" value="Continue"/>
        </noscript>
    </form>
</body>
</html>"#,
            escape_attr(destination),
            param_name,
            encoded,
            relay_state_input
        )
    }

    /// Decodes a posted `SAMLResponse` value back to XML.
    pub fn decode_response(saml_response: &str) -> SamlResult<String> {
        let decoded = base64::engine::general_purpose::STANDARD.decode(saml_response.trim())?;
        String::from_utf8(decoded)
            .map_err(|e| SamlError::Decode(format!("invalid UTF-8 in message: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field<'a>(html: &'a str, name: &str) -> Option<&'a str> {
        let marker = format!("name=\"{name}\" value=\"");
        let start = html.find(&marker)? + marker.len();
        let end = html[start..].find('"')?;
        Some(&html[start..start + end])
    }

    #[test]
    fn encode_response_round_trip() {
        let xml = r#"<samlp:Response>test</samlp:Response>"#;
        let html = HttpPostBinding::encode_response(xml, "https://sp.example/acs", Some("xyz123"));

        assert!(html.contains(r#"action="https://sp.example/acs""#));
        assert!(html.contains("document.forms[0].submit()"));
        assert_eq!(field(&html, "RelayState"), Some("xyz123"));

        let encoded = field(&html, "SAMLResponse").unwrap();
        assert_eq!(HttpPostBinding::decode_response(encoded).unwrap(), xml);
    }

    #[test]
    fn relay_state_is_omitted_when_absent() {
        let html = HttpPostBinding::encode_response("<x/>", "https://sp.example/acs", None);
        assert!(!html.contains("RelayState"));
    }

    #[test]
    fn attribute_values_are_escaped() {
        let html = HttpPostBinding::encode_response(
            "<x/>",
            "https://sp.example/acs?a=1&b=\"2\"",
            Some(r#""><script>alert(1)</script>"#),
        );
        assert!(!html.contains("<script>"));
        assert!(html.contains("&quot;"));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(HttpPostBinding::decode_response("%%%").is_err());
    }
}
