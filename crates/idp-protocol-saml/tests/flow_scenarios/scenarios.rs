//! The five reference login scenarios.

use std::sync::Arc;

use idp_protocol_saml::flow::{FlowOutcome, FlowParams};
use idp_protocol_saml::registry::TrustedServiceProvider;
use idp_protocol_saml::signature::SignatureValidator;
use idp_protocol_saml::token::TokenScope;
use idp_protocol_saml::{SamlError, CLAIM_EMAIL_ADDRESS, CLAIM_NAME};

use crate::common::*;

#[test]
fn anonymous_user_is_sent_to_login_and_back() {
    let idp = TestIdp::new().build();
    let xml = authn_request_xml("_reqA", "https://sp.example", Some("https://sp.example/acs"));
    let params = request_params(&xml, Some("state-a"));

    let location = match idp.authn(&params, &anonymous()).unwrap() {
        FlowOutcome::RedirectToLogin { location } => location,
        other => panic!("expected login redirect, got {other:?}"),
    };

    let prefix = format!("{LOGIN_URL}?redirect_to=");
    assert!(location.starts_with(&prefix), "{location}");
    let return_url = urlencoding::decode(&location[prefix.len()..])
        .unwrap()
        .into_owned();
    let (endpoint, query) = return_url.split_once('?').unwrap();
    assert_eq!(endpoint, "https://idp.example/idp");

    // Coming back after login lands on the same request.
    let returned = FlowParams::from_query(query);
    assert_eq!(returned.saml_request(), params.saml_request());
    assert_eq!(returned.relay_state(), Some("state-a"));

    let prompt = expect_prompt(idp.authn(&returned, &alice()).unwrap());
    assert!(prompt.can_confirm());
}

#[test]
fn confirmed_login_to_pinned_sp_is_signed() {
    let idp = TestIdp::new().build();
    let xml = authn_request_xml("_reqB", "https://sp.example", Some("https://sp.example/acs"));

    let prompt = expect_prompt(idp.authn(&request_params(&xml, None), &alice()).unwrap());
    let post = expect_response(idp.confirm(&submit(&prompt), &alice()).unwrap());
    assert_eq!(post.destination, "https://sp.example/acs");

    let signed = response_xml(&post);
    assert_eq!(
        xml_attribute(&signed, "samlp:Response", "Destination"),
        Some("https://sp.example/acs")
    );
    assert_eq!(
        xml_attribute(&signed, "samlp:Response", "InResponseTo"),
        Some("_reqB")
    );
    assert_eq!(
        xml_attribute(&signed, "saml:SubjectConfirmationData", "InResponseTo"),
        Some("_reqB")
    );

    let validator = SignatureValidator::from_certificate_pem(CERT).unwrap();
    validator.validate(&signed, &post.response_id).unwrap();
    let assertion_id = xml_attribute(&signed, "saml:Assertion", "ID").unwrap();
    validator.validate(&signed, assertion_id).unwrap();

    assert!(signed.contains(&format!(
        r#"<saml:Attribute Name="{CLAIM_EMAIL_ADDRESS}"><saml:AttributeValue>alice@example.com</saml:AttributeValue>"#
    )));
    assert!(signed.contains(&format!(
        r#"<saml:Attribute Name="{CLAIM_NAME}"><saml:AttributeValue>alice</saml:AttributeValue>"#
    )));
    assert!(signed.contains("<saml:Audience>https://sp.example</saml:Audience>"));
}

#[test]
fn unregistered_issuer_is_rejected_at_confirm() {
    let idp = TestIdp::new().build();
    let xml = authn_request_xml("_reqC", "https://evil.example", Some("https://evil.example/acs"));

    // The prompt shows the error and offers no way to confirm.
    let prompt = expect_prompt(idp.authn(&request_params(&xml, None), &alice()).unwrap());
    assert!(!prompt.can_confirm());
    assert_eq!(prompt.error.as_deref(), Some("Invalid Authentication Client"));

    // A hand-crafted confirmation with a well-formed token still fails.
    let mut params = request_params(&xml, None);
    params.token = Some(
        idp.tokens()
            .issue(&TokenScope::for_service("https://evil.example"), "alice"),
    );
    params.idp_confirm = Some("Log in".into());
    let err = idp.confirm(&params, &alice()).unwrap_err();
    assert!(
        matches!(err, SamlError::InvalidClient { ref issuer } if issuer == "https://evil.example")
    );
    assert_eq!(err.http_status(), 400);
}

#[test]
fn idp_initiated_login_uses_registry_acs() {
    let idp = TestIdp::new()
        .with_callback(Arc::new(|| {
            vec![TrustedServiceProvider::new("sp123")
                .with_acs_url("https://sp123.example/saml/acs")
                .with_friendly_name("https://Service 123")]
        }))
        .build();

    let prompt = expect_prompt(idp.authn(&FlowParams::for_service("sp123"), &alice()).unwrap());
    assert_eq!(prompt.destination, "Service 123");
    assert_eq!(prompt.service.as_deref(), Some("sp123"));
    assert!(prompt.saml_request.is_none());

    let post = expect_response(idp.confirm(&submit(&prompt), &alice()).unwrap());
    assert_eq!(post.destination, "https://sp123.example/saml/acs");

    let signed = response_xml(&post);
    assert!(xml_attribute(&signed, "samlp:Response", "InResponseTo").is_none());
    assert!(signed.contains("<saml:Audience>sp123</saml:Audience>"));
}

#[test]
fn relay_state_is_passed_through_verbatim() {
    let idp = TestIdp::new().build();
    let xml = authn_request_xml("_reqE", "https://sp.example", None);

    let prompt = expect_prompt(
        idp.authn(&request_params(&xml, Some("xyz123")), &alice())
            .unwrap(),
    );
    assert_eq!(prompt.relay_state.as_deref(), Some("xyz123"));

    let post = expect_response(idp.confirm(&submit(&prompt), &alice()).unwrap());
    assert_eq!(form_field(&post.html, "RelayState"), Some("xyz123"));
}
