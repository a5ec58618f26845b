//! Incoming SAML AuthnRequest.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

use crate::error::{SamlError, SamlResult};

/// Maximum accepted length of the request ID and issuer values.
const MAX_IDENTIFIER_LENGTH: usize = 1024;

/// An authentication request received from a Service Provider.
///
/// Built once per HTTP exchange from the wire payload; nothing is kept
/// server-side between the prompt and the confirmation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingAuthnRequest {
    /// Protocol message ID, echoed as `InResponseTo`.
    pub id: String,
    /// The requesting Service Provider's entity ID.
    pub issuer: String,
    /// ACS URL declared on the `AuthnRequest` element.
    pub assertion_consumer_service_url: Option<String>,
    /// Human-readable SP name, if the SP sent one.
    pub provider_name: Option<String>,
    /// Opaque pass-through value.
    pub relay_state: Option<String>,
}

impl IncomingAuthnRequest {
    /// Parses an `AuthnRequest` XML document.
    ///
    /// Only the attributes of the root element and its direct `Issuer` child
    /// are read; everything else in the request is ignored.
    pub fn parse_xml(xml: &str) -> SamlResult<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut root: Option<RootAttributes> = None;
        let mut issuer: Option<String> = None;
        let mut in_issuer = false;
        let mut depth = 0usize;

        loop {
            match reader.read_event()? {
                Event::DocType(_) => {
                    return Err(SamlError::Decode(
                        "DOCTYPE declarations are not allowed".to_string(),
                    ));
                }
                Event::Start(e) => {
                    if depth == 0 {
                        root = Some(RootAttributes::read(&e)?);
                    } else if depth == 1 && e.local_name().as_ref() == b"Issuer" && issuer.is_none()
                    {
                        in_issuer = true;
                        issuer = Some(String::new());
                    }
                    depth += 1;
                }
                Event::Empty(e) => {
                    if depth == 0 {
                        root = Some(RootAttributes::read(&e)?);
                    }
                }
                Event::Text(t) => {
                    if in_issuer {
                        if let Some(value) = issuer.as_mut() {
                            value.push_str(&t.unescape()?);
                        }
                    }
                }
                Event::End(_) => {
                    depth = depth.saturating_sub(1);
                    if in_issuer && depth == 1 {
                        in_issuer = false;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        let root = root.ok_or_else(|| SamlError::Decode("empty document".to_string()))?;

        let id = root
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SamlError::Decode("missing ID attribute".to_string()))?;

        let issuer = issuer
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| SamlError::Decode("missing Issuer element".to_string()))?;

        if id.len() > MAX_IDENTIFIER_LENGTH || issuer.len() > MAX_IDENTIFIER_LENGTH {
            return Err(SamlError::Decode("identifier too long".to_string()));
        }

        Ok(Self {
            id,
            issuer,
            assertion_consumer_service_url: root.acs_url.filter(|url| !url.is_empty()),
            provider_name: root.provider_name.filter(|name| !name.is_empty()),
            relay_state: None,
        })
    }

    /// Attaches the RelayState that accompanied the request.
    #[must_use]
    pub fn with_relay_state(mut self, relay_state: Option<String>) -> Self {
        self.relay_state = relay_state;
        self
    }

    /// Name shown to the user for the destination: `ProviderName` if present,
    /// otherwise the issuer, without a leading `http://` or `https://`.
    #[must_use]
    pub fn destination_name(&self) -> &str {
        display_name(self.provider_name.as_deref().unwrap_or(&self.issuer))
    }
}

/// Strips a leading `http://` or `https://` from a name.
#[must_use]
pub fn display_name(name: &str) -> &str {
    name.strip_prefix("https://")
        .or_else(|| name.strip_prefix("http://"))
        .unwrap_or(name)
}

struct RootAttributes {
    id: Option<String>,
    acs_url: Option<String>,
    provider_name: Option<String>,
}

impl RootAttributes {
    fn read(element: &BytesStart<'_>) -> SamlResult<Self> {
        if element.local_name().as_ref() != b"AuthnRequest" {
            return Err(SamlError::Decode(format!(
                "expected AuthnRequest, found {}",
                String::from_utf8_lossy(element.local_name().as_ref())
            )));
        }

        let mut attributes = Self {
            id: None,
            acs_url: None,
            provider_name: None,
        };

        for attr in element.attributes() {
            let attr = attr?;
            let value = attr.unescape_value()?.into_owned();
            match attr.key.local_name().as_ref() {
                b"ID" => attributes.id = Some(value),
                b"AssertionConsumerServiceURL" => attributes.acs_url = Some(value),
                b"ProviderName" => attributes.provider_name = Some(value),
                _ => {}
            }
        }

        Ok(attributes)
    }
}
