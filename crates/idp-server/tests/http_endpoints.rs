//! HTTP-level tests for the IdP endpoints.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::Engine;
use idp_protocol_saml::bindings::HttpRedirectBinding;
use idp_server::{Server, ServerConfig};
use tower::ServiceExt;

const CERT: &str = include_str!("../../../testdata/idp.crt");
const KEY: &str = include_str!("../../../testdata/idp.pem");

fn config() -> ServerConfig {
    ServerConfig {
        certificate_pem: Some(CERT.to_string()),
        private_key_pem: Some(KEY.to_string()),
        trusted_sps: "https://sp.example|https://sp.example/acs\nportal|https://portal.example/acs"
            .to_string(),
        ..ServerConfig::for_testing()
    }
}

fn router(config: ServerConfig) -> Router {
    Server::new(config).test_router()
}

fn saml_request(id: &str) -> String {
    let xml = format!(
        r#"<samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="{id}" Version="2.0" IssueInstant="2024-05-01T12:00:00Z" AssertionConsumerServiceURL="https://sp.example/acs"><saml:Issuer>https://sp.example</saml:Issuer></samlp:AuthnRequest>"#
    );
    HttpRedirectBinding::encode_message(&xml).unwrap()
}

fn get(uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(user) = user {
        builder = builder
            .header("x-remote-user", user)
            .header("x-remote-email", format!("{user}@example.com"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn form_field<'a>(html: &'a str, name: &str) -> Option<&'a str> {
    let marker = format!("name=\"{name}\" value=\"");
    let start = html.find(&marker)? + marker.len();
    let end = html[start..].find('"')?;
    Some(&html[start..start + end])
}

#[tokio::test]
async fn health_reports_healthy() {
    let response = router(config()).oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "healthy");

    let response = router(config())
        .oneshot(get("/health/live", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn anonymous_user_is_sent_to_login() {
    let uri = format!(
        "/idp?SAMLRequest={}",
        urlencoding::encode(&saml_request("_anon"))
    );
    let response = router(config()).oneshot(get(&uri, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(location.starts_with("http://localhost:8080/login?redirect_to="));
    assert!(location.contains("SAMLRequest"));
}

#[tokio::test]
async fn prompt_then_confirm_posts_signed_response() {
    let app = router(config());
    let request = saml_request("_req1");
    let uri = format!(
        "/idp?SAMLRequest={}&RelayState=xyz123",
        urlencoding::encode(&request)
    );

    let response = app.clone().oneshot(get(&uri, Some("alice"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("Do you wish to proceed to sp.example as alice?"));
    let token = form_field(&page, "token").unwrap().to_string();

    let uri = format!(
        "/idp/confirm?SAMLRequest={}&RelayState=xyz123&token={}&idp_confirm=Log+in",
        urlencoding::encode(&request),
        urlencoding::encode(&token)
    );
    let response = app.oneshot(get(&uri, Some("alice"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "no-store"
    );

    let html = body_text(response).await;
    assert!(html.contains(r#"action="https://sp.example/acs""#));
    assert_eq!(form_field(&html, "RelayState"), Some("xyz123"));

    let encoded = form_field(&html, "SAMLResponse").unwrap();
    let xml = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map(|bytes| String::from_utf8(bytes).unwrap())
        .unwrap();
    assert!(xml.contains(r#"InResponseTo="_req1""#));
    assert!(xml.contains("<saml:NameID"));
    assert!(xml.contains(">alice</saml:NameID>"));
    assert!(xml.contains("<ds:SignatureValue>"));
}

#[tokio::test]
async fn confirm_post_is_accepted() {
    let app = router(config());
    let response = app
        .clone()
        .oneshot(get("/idp?service=portal", Some("alice")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    let token = form_field(&page, "token").unwrap().to_string();

    let body = format!(
        "service=portal&token={}&idp_confirm=Log+in",
        urlencoding::encode(&token)
    );
    let request = Request::builder()
        .method("POST")
        .uri("/idp/confirm")
        .header("x-remote-user", "alice")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains(r#"action="https://portal.example/acs""#));
    assert!(form_field(&html, "SAMLResponse").is_some());
}

#[tokio::test]
async fn unknown_service_is_rejected() {
    let response = router(config())
        .oneshot(get("/idp?service=nope", Some("alice")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn confirm_without_token_is_rejected() {
    let uri = format!(
        "/idp/confirm?SAMLRequest={}&idp_confirm=Log+in",
        urlencoding::encode(&saml_request("_req2"))
    );
    let response = router(config())
        .oneshot(get(&uri, Some("alice")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn metadata_describes_signing_key() {
    let response = router(config())
        .oneshot(get("/idp/metadata", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/samlmetadata+xml"
    );

    let xml = body_text(response).await;
    assert!(xml.contains("IDPSSODescriptor"));
    assert!(xml.contains("http://localhost:8080/idp"));
    assert!(xml.contains("<ds:X509Certificate>"));
}

#[tokio::test]
async fn missing_signing_keys_is_server_error() {
    let config = ServerConfig {
        certificate_pem: None,
        private_key_pem: None,
        ..config()
    };
    let response = router(config)
        .oneshot(get("/idp/metadata", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
