//! Shared fixtures.

use std::sync::Arc;
use std::time::Duration;

use idp_protocol_saml::bindings::{HttpPostBinding, HttpRedirectBinding};
use idp_protocol_saml::builder::AssertionBuilder;
use idp_protocol_saml::config::{
    ConfigOverrides, ConfigStore, IdpSettings, MemoryConfigStore, CERTIFICATE_KEY,
    PRIVATE_KEY_KEY, TRUSTED_SPS_KEY,
};
use idp_protocol_saml::flow::{
    ConfirmationPrompt, FlowController, FlowOutcome, FlowParams, IdpUrls, PostResponse,
};
use idp_protocol_saml::host::{RedirectLogin, UserIdentity};
use idp_protocol_saml::registry::SpCallback;
use idp_protocol_saml::token::ConfirmationTokens;

pub const CERT: &str = include_str!("../../../../testdata/idp.crt");
pub const KEY: &str = include_str!("../../../../testdata/idp.pem");

pub const IDP_BASE: &str = "https://idp.example";
pub const LOGIN_URL: &str = "https://idp.example/login";
pub const LOGOUT_URL: &str = "https://idp.example/logout";

/// Trusted Service Providers of the default fixture.
pub const TRUSTED_SPS: &str = "https://sp.example|https://sp.example/acs\nhttps://open.example";

/// Builder for a [`FlowController`] over an in-memory store.
pub struct TestIdp {
    trusted_sps: String,
    callback: Option<SpCallback>,
    single_use: bool,
}

impl TestIdp {
    pub fn new() -> Self {
        Self {
            trusted_sps: TRUSTED_SPS.to_string(),
            callback: None,
            single_use: false,
        }
    }

    pub fn with_callback(mut self, callback: SpCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn single_use(mut self) -> Self {
        self.single_use = true;
        self
    }

    pub fn build(self) -> FlowController {
        let store = Arc::new(MemoryConfigStore::new());
        store.set(CERTIFICATE_KEY, CERT);
        store.set(PRIVATE_KEY_KEY, KEY);
        store.set(TRUSTED_SPS_KEY, &self.trusted_sps);

        let overrides = ConfigOverrides {
            sp_callback: self.callback,
            ..ConfigOverrides::default()
        };
        let mut tokens = ConfirmationTokens::new(b"scenario-secret".to_vec(), Duration::from_secs(600));
        if self.single_use {
            tokens = tokens.single_use();
        }

        FlowController::new(
            IdpSettings::new(store, overrides),
            AssertionBuilder::new(IDP_BASE),
            tokens,
            IdpUrls::new(IDP_BASE),
            Arc::new(RedirectLogin::new(LOGIN_URL, LOGOUT_URL)),
        )
    }
}

pub fn alice() -> Option<UserIdentity> {
    Some(UserIdentity::new("alice", "alice@example.com").with_display_name("Alice Example"))
}

pub fn anonymous() -> Option<UserIdentity> {
    None
}

/// An `AuthnRequest` as a Service Provider would send it.
pub fn authn_request_xml(id: &str, issuer: &str, acs: Option<&str>) -> String {
    let acs = acs
        .map(|url| format!(r#" AssertionConsumerServiceURL="{url}""#))
        .unwrap_or_default();
    format!(
        r#"<samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="{id}" Version="2.0" IssueInstant="2024-05-01T12:00:00Z"{acs} ProtocolBinding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST"><saml:Issuer>{issuer}</saml:Issuer><samlp:NameIDPolicy AllowCreate="true"/></samlp:AuthnRequest>"#
    )
}

/// Authn step parameters for a redirect-bound request.
pub fn request_params(xml: &str, relay_state: Option<&str>) -> FlowParams {
    FlowParams {
        saml_request: Some(HttpRedirectBinding::encode_message(xml).unwrap()),
        relay_state: relay_state.map(String::from),
        ..FlowParams::default()
    }
}

/// Turns a prompt into the parameters its form submits.
pub fn submit(prompt: &ConfirmationPrompt) -> FlowParams {
    FlowParams {
        saml_request: prompt.saml_request.clone(),
        relay_state: prompt.relay_state.clone(),
        service: prompt.service.clone(),
        token: prompt.token.clone(),
        idp_confirm: Some(prompt.confirm_label()),
    }
}

pub fn expect_prompt(outcome: FlowOutcome) -> ConfirmationPrompt {
    match outcome {
        FlowOutcome::AwaitingConfirmation(prompt) => prompt,
        other => panic!("expected confirmation prompt, got {other:?}"),
    }
}

pub fn expect_response(outcome: FlowOutcome) -> PostResponse {
    match outcome {
        FlowOutcome::Respond(post) => post,
        other => panic!("expected POST response, got {other:?}"),
    }
}

/// Value of a hidden form field.
pub fn form_field<'a>(html: &'a str, name: &str) -> Option<&'a str> {
    let marker = format!("name=\"{name}\" value=\"");
    let start = html.find(&marker)? + marker.len();
    let end = html[start..].find('"')?;
    Some(&html[start..start + end])
}

/// The signed XML inside a POST form.
pub fn response_xml(post: &PostResponse) -> String {
    let encoded = form_field(&post.html, "SAMLResponse").expect("SAMLResponse field");
    HttpPostBinding::decode_response(encoded).unwrap()
}

/// Value of the first `name="value"` attribute in `xml`.
pub fn xml_attribute<'a>(xml: &'a str, element: &str, attribute: &str) -> Option<&'a str> {
    let start = xml.find(&format!("<{element} "))?;
    let tag_end = start + xml[start..].find('>')?;
    let tag = &xml[start..tag_end];
    let marker = format!(" {attribute}=\"");
    let value_start = tag.find(&marker)? + marker.len();
    let value_end = value_start + tag[value_start..].find('"')?;
    Some(&xml[start + value_start..start + value_end])
}
