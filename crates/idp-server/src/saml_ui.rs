//! SAML confirmation and error pages.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use idp_protocol_saml::flow::ConfirmationPrompt;
use idp_protocol_saml::SamlError;

/// Confirmation page template.
#[derive(Template)]
#[template(path = "confirm.html")]
pub struct ConfirmTemplate<'a> {
    /// Page title.
    pub title: String,
    /// "Do you wish to proceed..." question.
    pub question: String,
    /// Submit button label.
    pub confirm_label: String,
    /// The prompt being rendered.
    pub prompt: &'a ConfirmationPrompt,
}

/// Error page template.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate<'a> {
    /// Message shown to the user.
    pub message: &'a str,
}

/// Renders the confirmation page.
pub fn show_confirmation(prompt: &ConfirmationPrompt) -> Response {
    let template = ConfirmTemplate {
        title: prompt.title(),
        question: prompt.question(),
        confirm_label: prompt.confirm_label(),
        prompt,
    };

    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Template render error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
        }
    }
}

/// Renders the error page for a failed request.
pub fn saml_error_page(err: &SamlError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let template = ErrorTemplate {
        message: err.user_message(),
    };

    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Template render error: {}", e);
            (status, err.user_message()).into_response()
        }
    }
}
