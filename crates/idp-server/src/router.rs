//! Router configuration.
//!
//! This module creates the main Axum router that combines all endpoints.

use axum::{http::StatusCode, response::Json, routing::get, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use idp_protocol_saml::flow::IdpEndpoint;

use crate::saml_handlers::{authn, confirm_post, confirm_redirect, idp_metadata};
use crate::state::AppState;

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    let saml = Router::new()
        .route(IdpEndpoint::Authn.path(), get(authn))
        .route(
            IdpEndpoint::Confirm.path(),
            get(confirm_redirect).post(confirm_post),
        )
        .route(IdpEndpoint::Metadata.path(), get(idp_metadata))
        .with_state(state);

    let health = Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness_check));

    Router::new()
        .merge(saml)
        .merge(health)
        .layer(TraceLayer::new_for_http())
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

/// Basic health check.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    })
}

/// Liveness probe.
async fn liveness_check() -> StatusCode {
    StatusCode::OK
}
