//! SAML endpoint handlers.
//!
//! Thin adapters from HTTP to the protocol crate's flow controller: the
//! identity comes from the request headers, the outcome becomes a redirect,
//! a confirmation page or the auto-submitting response form.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};

use idp_protocol_saml::flow::{FlowOutcome, FlowParams};
use idp_protocol_saml::SamlError;

use crate::saml_ui::{saml_error_page, show_confirmation};
use crate::state::AppState;

/// GET handler for the authn endpoint.
pub async fn authn(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<FlowParams>,
) -> Response {
    let user = state.identity.current_user(&headers);
    match state.flow.authn(&params, &user) {
        Ok(outcome) => handle_outcome(outcome),
        Err(e) => error_response(&e),
    }
}

/// GET handler for the confirm endpoint; the confirmation form submits here.
pub async fn confirm_redirect(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<FlowParams>,
) -> Response {
    confirm(&state, &headers, &params)
}

/// POST handler for the confirm endpoint.
pub async fn confirm_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(params): Form<FlowParams>,
) -> Response {
    confirm(&state, &headers, &params)
}

fn confirm(state: &AppState, headers: &HeaderMap, params: &FlowParams) -> Response {
    let user = state.identity.current_user(headers);
    match state.flow.confirm(params, &user) {
        Ok(outcome) => handle_outcome(outcome),
        Err(e) => error_response(&e),
    }
}

/// GET handler for the IdP metadata document.
pub async fn idp_metadata(State(state): State<AppState>) -> Response {
    match state.flow.metadata_xml() {
        Ok(metadata) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/samlmetadata+xml")],
            metadata,
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// Turns a flow outcome into an HTTP response.
fn handle_outcome(outcome: FlowOutcome) -> Response {
    match outcome {
        FlowOutcome::RedirectToLogin { location } => Redirect::to(&location).into_response(),
        FlowOutcome::AwaitingConfirmation(prompt) => show_confirmation(&prompt),
        FlowOutcome::Respond(post) => {
            ([(header::CACHE_CONTROL, "no-store")], Html(post.html)).into_response()
        }
    }
}

/// Creates an error response for SAML errors.
fn error_response(err: &SamlError) -> Response {
    if err.is_client_error() {
        tracing::warn!(code = err.code(), "SAML request rejected: {}", err);
    } else {
        tracing::error!(code = err.code(), "SAML request failed: {}", err);
    }
    saml_error_page(err)
}
