//! SAML Response types.

use base64::Engine;
use chrono::{DateTime, Utc};

use crate::bindings::HttpPostBinding;
use crate::signature::{Namespace, XmlElement};

use super::assertion::{saml_instant, Assertion};
use super::constants::{status_codes, SAML_VERSION};

/// Top-level `samlp:Response` envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Response ID.
    pub id: String,
    /// Issue instant.
    pub issue_instant: DateTime<Utc>,
    /// ACS URL the response is posted to.
    pub destination: String,
    /// ID of the request being answered, for SP-initiated logins.
    pub in_response_to: Option<String>,
    /// IdP issuer name.
    pub issuer: String,
    /// Status code URI.
    pub status: &'static str,
}

impl Response {
    /// Creates a successful response envelope.
    #[must_use]
    pub fn success(
        id: String,
        issue_instant: DateTime<Utc>,
        destination: String,
        in_response_to: Option<String>,
        issuer: String,
    ) -> Self {
        Self {
            id,
            issue_instant,
            destination,
            in_response_to,
            issuer,
            status: status_codes::SUCCESS,
        }
    }

    /// Builds the unsigned `samlp:Response` element around an assertion element.
    #[must_use]
    pub fn to_xml(&self, assertion: XmlElement) -> XmlElement {
        XmlElement::new(Namespace::Protocol, "Response")
            .attr("ID", self.id.as_str())
            .attr("Version", SAML_VERSION)
            .attr("IssueInstant", saml_instant(self.issue_instant))
            .attr("Destination", self.destination.as_str())
            .attr_opt("InResponseTo", self.in_response_to.as_deref())
            .child(XmlElement::new(Namespace::Assertion, "Issuer").text(self.issuer.as_str()))
            .child(
                XmlElement::new(Namespace::Protocol, "Status").child(
                    XmlElement::new(Namespace::Protocol, "StatusCode").attr("Value", self.status),
                ),
            )
            .child(assertion)
    }
}

/// A signed Response containing exactly one signed Assertion.
///
/// Built fresh for each confirmed login and never stored.
#[derive(Debug, Clone)]
pub struct SignedAssertionResponse {
    /// The response envelope.
    pub response: Response,
    /// The assertion.
    pub assertion: Assertion,
    xml: String,
}

impl SignedAssertionResponse {
    pub(crate) const fn new(response: Response, assertion: Assertion, xml: String) -> Self {
        Self {
            response,
            assertion,
            xml,
        }
    }

    /// The signed XML document.
    #[must_use]
    pub fn xml(&self) -> &str {
        &self.xml
    }

    /// ACS URL the response must be posted to.
    #[must_use]
    pub fn destination(&self) -> &str {
        &self.response.destination
    }

    /// Base64 `SAMLResponse` form value.
    #[must_use]
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.xml)
    }

    /// Renders the HTTP-POST binding page for this response.
    #[must_use]
    pub fn to_post_form(&self, relay_state: Option<&str>) -> String {
        HttpPostBinding::encode_response(&self.xml, self.destination(), relay_state)
    }
}
