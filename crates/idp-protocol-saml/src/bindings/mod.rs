//! SAML bindings implementation.
//!
//! - **HTTP-Redirect Binding** - inbound `AuthnRequest`s arrive deflated,
//!   base64-encoded and URL-encoded in the `SAMLRequest` query parameter
//! - **HTTP-POST Binding** - outbound responses are base64-encoded into an
//!   auto-submitting HTML form
//!
//! # Usage
//!
//! ```rust,ignore
//! use idp_protocol_saml::bindings::{HttpPostBinding, HttpRedirectBinding};
//!
//! let request = HttpRedirectBinding::decode_authn_request(&saml_request, relay_state)?;
//! let html = HttpPostBinding::encode_response(&xml, &acs_url, relay_state);
//! ```

mod post;
mod redirect;

pub use post::*;
pub use redirect::*;

/// SAML message type for binding operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamlMessageType {
    /// AuthnRequest message.
    Request,
    /// Response message.
    Response,
}

impl SamlMessageType {
    /// Returns the form parameter name for this message type.
    #[must_use]
    pub const fn form_param(&self) -> &'static str {
        match self {
            Self::Request => "SAMLRequest",
            Self::Response => "SAMLResponse",
        }
    }
}
