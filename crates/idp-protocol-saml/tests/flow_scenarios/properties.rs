//! Validation, timing and replay properties.

use chrono::{DateTime, Duration, Utc};
use idp_protocol_saml::bindings::HttpRedirectBinding;
use idp_protocol_saml::flow::FlowParams;
use idp_protocol_saml::registry::{TrustRegistry, TrustedServiceProvider};
use idp_protocol_saml::validation::validate;
use idp_protocol_saml::SamlError;

use crate::common::*;

#[test]
fn pinned_acs_rejects_every_other_url() {
    let registry = TrustRegistry::new([
        TrustedServiceProvider::new("https://sp.example").with_acs_url("https://sp.example/acs"),
        TrustedServiceProvider::new("https://open.example"),
    ]);

    for acs in [
        "https://sp.example/acs/",
        "https://sp.example/ACS",
        "http://sp.example/acs",
        "https://attacker.example/acs",
    ] {
        assert!(matches!(
            validate(&registry, "https://sp.example", Some(acs)),
            Err(SamlError::InvalidCallback { .. })
        ));
        let client = validate(&registry, "https://open.example", Some(acs)).unwrap();
        assert_eq!(client.destination().unwrap(), acs);
    }
}

#[test]
fn mismatched_acs_is_fatal_at_confirm() {
    let idp = TestIdp::new().build();
    let good = authn_request_xml("_req", "https://sp.example", Some("https://sp.example/acs"));
    let prompt = expect_prompt(idp.authn(&request_params(&good, None), &alice()).unwrap());

    let forged = authn_request_xml("_req", "https://sp.example", Some("https://attacker.example/acs"));
    let mut params = submit(&prompt);
    params.saml_request = request_params(&forged, None).saml_request;
    assert!(matches!(
        idp.confirm(&params, &alice()),
        Err(SamlError::InvalidCallback { .. })
    ));
}

#[test]
fn unpinned_provider_without_acs_offers_no_confirmation() {
    let idp = TestIdp::new().build();
    let xml = authn_request_xml("_req", "https://open.example", None);
    let prompt = expect_prompt(idp.authn(&request_params(&xml, None), &alice()).unwrap());
    assert!(!prompt.can_confirm());
    assert!(prompt.token.is_none());
    assert_eq!(
        prompt.error.as_deref(),
        Some("No Service URL is registered for this Authentication Client")
    );

    assert!(matches!(
        idp.authn(&FlowParams::for_service("https://open.example"), &alice()),
        Err(SamlError::MissingCallback { ref issuer }) if issuer == "https://open.example"
    ));
}

fn instant(xml: &str, element: &str, attribute: &str) -> DateTime<Utc> {
    let value = xml_attribute(xml, element, attribute).unwrap();
    DateTime::parse_from_rfc3339(value).unwrap().with_timezone(&Utc)
}

#[test]
fn conditions_bracket_issue_instant_by_window() {
    let idp = TestIdp::new().build();
    let xml = authn_request_xml("_req", "https://open.example", Some("https://open.example/acs"));
    let prompt = expect_prompt(idp.authn(&request_params(&xml, None), &alice()).unwrap());
    let signed = response_xml(&expect_response(
        idp.confirm(&submit(&prompt), &alice()).unwrap(),
    ));

    let issued = instant(&signed, "saml:Assertion", "IssueInstant");
    assert_eq!(instant(&signed, "saml:Conditions", "NotBefore"), issued);
    assert_eq!(
        instant(&signed, "saml:Conditions", "NotOnOrAfter"),
        issued + Duration::minutes(1)
    );
    assert_eq!(
        instant(&signed, "saml:SubjectConfirmationData", "NotOnOrAfter"),
        issued + Duration::minutes(1)
    );
    assert_eq!(
        instant(&signed, "saml:AuthnStatement", "AuthnInstant"),
        issued - Duration::minutes(1)
    );
    assert!(signed.contains("<saml:Audience>https://open.example</saml:Audience>"));
}

#[test]
fn redirect_payload_round_trips() {
    let xml = authn_request_xml("_rt1", "https://sp.example", Some("https://sp.example/acs"));
    let url = HttpRedirectBinding::encode_request(&xml, "https://idp.example/idp", Some("rs"))
        .unwrap();
    let (_, query) = url.split_once('?').unwrap();
    let params = FlowParams::from_query(query);

    let request =
        HttpRedirectBinding::decode_authn_request(params.saml_request().unwrap(), params.relay_state())
            .unwrap();
    assert_eq!(request.id, "_rt1");
    assert_eq!(request.issuer, "https://sp.example");
    assert_eq!(
        request.assertion_consumer_service_url.as_deref(),
        Some("https://sp.example/acs")
    );
    assert_eq!(request.relay_state.as_deref(), Some("rs"));
}

#[test]
fn confirmation_token_replay_is_allowed_by_default() {
    // Tokens are scope- and time-bound only; a second use within the
    // lifetime yields a second response.
    let idp = TestIdp::new().build();
    let xml = authn_request_xml("_req", "https://sp.example", None);
    let prompt = expect_prompt(idp.authn(&request_params(&xml, None), &alice()).unwrap());
    let params = submit(&prompt);

    let first = expect_response(idp.confirm(&params, &alice()).unwrap());
    let second = expect_response(idp.confirm(&params, &alice()).unwrap());
    assert_ne!(first.response_id, second.response_id);
}

#[test]
fn single_use_tokens_reject_replay() {
    let idp = TestIdp::new().single_use().build();
    let xml = authn_request_xml("_req", "https://sp.example", None);
    let prompt = expect_prompt(idp.authn(&request_params(&xml, None), &alice()).unwrap());
    let params = submit(&prompt);

    expect_response(idp.confirm(&params, &alice()).unwrap());
    assert!(matches!(
        idp.confirm(&params, &alice()),
        Err(SamlError::ConfirmationTokenInvalid(_))
    ));
}

#[test]
fn token_is_bound_to_the_user() {
    let idp = TestIdp::new().build();
    let xml = authn_request_xml("_req", "https://sp.example", None);
    let prompt = expect_prompt(idp.authn(&request_params(&xml, None), &alice()).unwrap());

    let mallory = Some(idp_protocol_saml::host::UserIdentity::new(
        "mallory",
        "mallory@example.com",
    ));
    assert!(matches!(
        idp.confirm(&submit(&prompt), &mallory),
        Err(SamlError::ConfirmationTokenInvalid(_))
    ));
}

#[test]
fn missing_signing_keys_never_produce_unsigned_responses() {
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    use idp_protocol_saml::builder::AssertionBuilder;
    use idp_protocol_saml::config::{
        ConfigOverrides, ConfigStore, IdpSettings, MemoryConfigStore, TRUSTED_SPS_KEY,
    };
    use idp_protocol_saml::flow::{FlowController, IdpUrls};
    use idp_protocol_saml::host::RedirectLogin;
    use idp_protocol_saml::token::ConfirmationTokens;

    let store = Arc::new(MemoryConfigStore::new());
    store.set(TRUSTED_SPS_KEY, TRUSTED_SPS);
    let idp = FlowController::new(
        IdpSettings::new(store, ConfigOverrides::default()),
        AssertionBuilder::new(IDP_BASE),
        ConfirmationTokens::new(b"k".to_vec(), StdDuration::from_secs(60)),
        IdpUrls::new(IDP_BASE),
        Arc::new(RedirectLogin::new(LOGIN_URL, LOGOUT_URL)),
    );

    let xml = authn_request_xml("_req", "https://sp.example", None);
    let prompt = expect_prompt(idp.authn(&request_params(&xml, None), &alice()).unwrap());
    let err = idp.confirm(&submit(&prompt), &alice()).unwrap_err();
    assert!(matches!(err, SamlError::SigningConfigurationMissing(_)));
    assert_eq!(err.http_status(), 500);
}
