//! SAML Assertion types.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::signature::{Namespace, XmlElement};

use super::constants::{confirmation_methods, AuthnContextClass, NameIdFormat, SAML_VERSION};

/// Generates a protocol message ID (an XML NCName).
#[must_use]
pub fn generate_id() -> String {
    format!("_id{}", uuid::Uuid::new_v4())
}

/// Formats an instant as `xs:dateTime` in UTC with second precision.
#[must_use]
pub fn saml_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// A SAML 2.0 Assertion about the authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assertion {
    /// Assertion ID; also used as the session index.
    pub id: String,
    /// Issue instant.
    pub issue_instant: DateTime<Utc>,
    /// IdP issuer name.
    pub issuer: String,
    /// Subject.
    pub subject: Subject,
    /// Validity conditions.
    pub conditions: Conditions,
    /// Authentication statement.
    pub authn_statement: AuthnStatement,
    /// Attributes, each emitted in its own `AttributeStatement`.
    pub attributes: Vec<Attribute>,
}

/// Assertion subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    /// Name identifier.
    pub name_id: NameId,
    /// Bearer confirmation.
    pub confirmation: SubjectConfirmation,
}

/// Name identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameId {
    /// Value (the username).
    pub value: String,
    /// Format.
    pub format: NameIdFormat,
}

/// Subject confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectConfirmation {
    /// Confirmation method URI.
    pub method: &'static str,
    /// Confirmation data.
    pub data: SubjectConfirmationData,
}

impl SubjectConfirmation {
    /// Bearer confirmation with the given data.
    #[must_use]
    pub const fn bearer(data: SubjectConfirmationData) -> Self {
        Self {
            method: confirmation_methods::BEARER,
            data,
        }
    }
}

/// Subject confirmation data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectConfirmationData {
    /// ACS URL the assertion may be delivered to.
    pub recipient: String,
    /// ID of the request being answered, for SP-initiated logins.
    pub in_response_to: Option<String>,
    /// Delivery deadline.
    pub not_on_or_after: DateTime<Utc>,
}

/// Validity window and audience.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conditions {
    /// Start of validity.
    pub not_before: DateTime<Utc>,
    /// End of validity.
    pub not_on_or_after: DateTime<Utc>,
    /// The only audience: the requesting Service Provider.
    pub audience: String,
}

/// Authentication statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthnStatement {
    /// Authentication instant.
    pub authn_instant: DateTime<Utc>,
    /// Session index.
    pub session_index: String,
    /// Authentication context class.
    pub class: AuthnContextClass,
}

/// A single-valued attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name (claim URI or literal key).
    pub name: String,
    /// Attribute value.
    pub value: String,
}

impl Attribute {
    /// Creates an attribute.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Assertion {
    /// Builds the unsigned `saml:Assertion` element.
    #[must_use]
    pub fn to_xml(&self) -> XmlElement {
        let confirmation_data = &self.subject.confirmation.data;

        let subject = XmlElement::new(Namespace::Assertion, "Subject")
            .child(
                XmlElement::new(Namespace::Assertion, "NameID")
                    .attr("Format", self.subject.name_id.format.uri())
                    .text(self.subject.name_id.value.as_str()),
            )
            .child(
                XmlElement::new(Namespace::Assertion, "SubjectConfirmation")
                    .attr("Method", self.subject.confirmation.method)
                    .child(
                        XmlElement::new(Namespace::Assertion, "SubjectConfirmationData")
                            .attr_opt("InResponseTo", confirmation_data.in_response_to.as_deref())
                            .attr("NotOnOrAfter", saml_instant(confirmation_data.not_on_or_after))
                            .attr("Recipient", confirmation_data.recipient.as_str()),
                    ),
            );

        let conditions = XmlElement::new(Namespace::Assertion, "Conditions")
            .attr("NotBefore", saml_instant(self.conditions.not_before))
            .attr("NotOnOrAfter", saml_instant(self.conditions.not_on_or_after))
            .child(
                XmlElement::new(Namespace::Assertion, "AudienceRestriction").child(
                    XmlElement::new(Namespace::Assertion, "Audience")
                        .text(self.conditions.audience.as_str()),
                ),
            );

        let authn_statement = XmlElement::new(Namespace::Assertion, "AuthnStatement")
            .attr("AuthnInstant", saml_instant(self.authn_statement.authn_instant))
            .attr("SessionIndex", self.authn_statement.session_index.as_str())
            .child(
                XmlElement::new(Namespace::Assertion, "AuthnContext").child(
                    XmlElement::new(Namespace::Assertion, "AuthnContextClassRef")
                        .text(self.authn_statement.class.uri()),
                ),
            );

        let mut assertion = XmlElement::new(Namespace::Assertion, "Assertion")
            .attr("ID", self.id.as_str())
            .attr("Version", SAML_VERSION)
            .attr("IssueInstant", saml_instant(self.issue_instant))
            .child(XmlElement::new(Namespace::Assertion, "Issuer").text(self.issuer.as_str()))
            .child(subject)
            .child(conditions)
            .child(authn_statement);

        for attribute in &self.attributes {
            assertion = assertion.child(
                XmlElement::new(Namespace::Assertion, "AttributeStatement").child(
                    XmlElement::new(Namespace::Assertion, "Attribute")
                        .attr("Name", attribute.name.as_str())
                        .child(
                            XmlElement::new(Namespace::Assertion, "AttributeValue")
                                .text(attribute.value.as_str()),
                        ),
                ),
            );
        }

        assertion
    }
}
