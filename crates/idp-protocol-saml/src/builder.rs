//! Assertion Builder.
//!
//! Produces the signed Response for a confirmed login. The assertion is
//! signed first, embedded, and then the whole response is signed with the
//! same key, so Service Providers checking either level succeed.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use idp_crypto::SigningKeyPair;

use crate::error::SamlResult;
use crate::host::{UserAttributes, UserIdentity};
use crate::registry::AttributeResolver;
use crate::signature::XmlSigner;
use crate::types::{
    attribute_name, generate_id, Assertion, Attribute, AuthnContextClass, AuthnStatement,
    Conditions, NameId, NameIdFormat, Response, SignedAssertionResponse, Subject,
    SubjectConfirmation, SubjectConfirmationData, CLAIM_EMAIL_ADDRESS, CLAIM_NAME,
};
use crate::validation::ValidatedClient;

/// Default validity window in seconds, applied forward for expiry and
/// backward for the authentication instant.
pub const DEFAULT_VALIDITY_WINDOW_SECS: i64 = 60;

/// Resolver key of the username.
pub const USERNAME_KEY: &str = "username";
/// Resolver key of the e-mail address.
pub const EMAIL_KEY: &str = "email";

/// Everything the builder needs to know about one login.
#[derive(Clone, Copy)]
pub struct AssertionRequest<'a> {
    /// Requesting Service Provider; the audience.
    pub audience: &'a str,
    /// ACS URL; the response destination and confirmation recipient.
    pub destination: &'a str,
    /// ID of the AuthnRequest being answered.
    pub in_response_to: Option<&'a str>,
    /// The authenticated user.
    pub user: &'a UserIdentity,
    /// Attribute resolver of the Service Provider.
    pub resolver: Option<&'a AttributeResolver>,
}

impl<'a> AssertionRequest<'a> {
    /// Builds a request for a validated client.
    pub fn for_client(
        client: &'a ValidatedClient,
        in_response_to: Option<&'a str>,
        user: &'a UserIdentity,
    ) -> SamlResult<Self> {
        Ok(Self {
            audience: &client.entity_id,
            destination: client.destination()?,
            in_response_to,
            user,
            resolver: client.user_attribute_resolver.as_ref(),
        })
    }
}

/// Builds signed assertion responses.
#[derive(Debug, Clone)]
pub struct AssertionBuilder {
    issuer_name: String,
    validity_window: Duration,
    name_id_format: NameIdFormat,
    authn_context: AuthnContextClass,
}

impl AssertionBuilder {
    /// Creates a builder issuing as `issuer_name` with the default window.
    pub fn new(issuer_name: impl Into<String>) -> Self {
        Self {
            issuer_name: issuer_name.into(),
            validity_window: Duration::seconds(DEFAULT_VALIDITY_WINDOW_SECS),
            name_id_format: NameIdFormat::default(),
            authn_context: AuthnContextClass::default(),
        }
    }

    /// Sets the validity window.
    #[must_use]
    pub const fn with_validity_window(mut self, window: Duration) -> Self {
        self.validity_window = window;
        self
    }

    /// The IdP issuer name.
    #[must_use]
    pub fn issuer_name(&self) -> &str {
        &self.issuer_name
    }

    /// The validity window.
    #[must_use]
    pub const fn validity_window(&self) -> Duration {
        self.validity_window
    }

    /// Builds and signs a response issued now.
    pub fn build(
        &self,
        request: &AssertionRequest<'_>,
        keys: Arc<SigningKeyPair>,
    ) -> SamlResult<SignedAssertionResponse> {
        self.build_at(request, keys, Utc::now())
    }

    /// Builds and signs a response issued at `now`.
    pub fn build_at(
        &self,
        request: &AssertionRequest<'_>,
        keys: Arc<SigningKeyPair>,
        now: DateTime<Utc>,
    ) -> SamlResult<SignedAssertionResponse> {
        let resolved = resolve_attributes(request.user, request.resolver);
        let username = resolved
            .get(USERNAME_KEY)
            .unwrap_or(&request.user.username)
            .to_string();
        let email = resolved
            .get(EMAIL_KEY)
            .unwrap_or(&request.user.email)
            .to_string();

        let mut attributes = vec![
            Attribute::new(CLAIM_EMAIL_ADDRESS, email),
            Attribute::new(CLAIM_NAME, username.as_str()),
        ];
        attributes.extend(
            resolved
                .iter()
                .map(|(key, value)| Attribute::new(attribute_name(key), value)),
        );

        let expires = now + self.validity_window;
        let assertion_id = generate_id();
        let assertion = Assertion {
            id: assertion_id.clone(),
            issue_instant: now,
            issuer: self.issuer_name.clone(),
            subject: Subject {
                name_id: NameId {
                    value: username,
                    format: self.name_id_format,
                },
                confirmation: SubjectConfirmation::bearer(SubjectConfirmationData {
                    recipient: request.destination.to_string(),
                    in_response_to: request.in_response_to.map(String::from),
                    not_on_or_after: expires,
                }),
            },
            conditions: Conditions {
                not_before: now,
                not_on_or_after: expires,
                audience: request.audience.to_string(),
            },
            authn_statement: AuthnStatement {
                authn_instant: now - self.validity_window,
                session_index: assertion_id,
                class: self.authn_context,
            },
            attributes,
        };

        let response = Response::success(
            generate_id(),
            now,
            request.destination.to_string(),
            request.in_response_to.map(String::from),
            self.issuer_name.clone(),
        );

        let signer = XmlSigner::new(keys);
        let mut assertion_el = assertion.to_xml();
        signer.sign(&mut assertion_el)?;
        let mut response_el = response.to_xml(assertion_el);
        signer.sign(&mut response_el)?;
        let xml = response_el.to_document();

        tracing::debug!(
            response_id = %response.id,
            assertion_id = %assertion.id,
            audience = request.audience,
            destination = request.destination,
            attributes = assertion.attributes.len(),
            "built signed SAML response"
        );

        Ok(SignedAssertionResponse::new(response, assertion, xml))
    }
}

/// Resolves the attributes released for `user`: the resolver's output, with
/// `username` and `email` filled from the identity when missing.
#[must_use]
pub fn resolve_attributes(
    user: &UserIdentity,
    resolver: Option<&AttributeResolver>,
) -> UserAttributes {
    let mut attributes = resolver.map(|resolve| resolve(user)).unwrap_or_default();
    attributes.insert_if_absent(USERNAME_KEY, user.username.as_str());
    attributes.insert_if_absent(EMAIL_KEY, user.email.as_str());
    attributes
}
