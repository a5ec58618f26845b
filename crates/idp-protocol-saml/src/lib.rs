//! SAML 2.0 Identity Provider core.
//!
//! This crate turns an authenticated user and a Service Provider's
//! authentication request into a signed SAML response:
//!
//! - **AuthnRequest decoding** - HTTP-Redirect binding (base64 + raw DEFLATE)
//! - **Trust registry** - static or callback-sourced trusted Service Providers
//! - **Request validation** - issuer and Assertion Consumer Service URL checks
//! - **Assertion building** - signed Assertion inside a signed Response
//! - **Confirmation flow** - two-step prompt/confirm state machine guarded by
//!   scoped, expiring confirmation tokens
//! - **HTTP-POST binding** - auto-submitting form carrying `SAMLResponse`
//!
//! # Architecture
//!
//! - [`types`] - SAML data structures and constants
//! - [`bindings`] - Redirect and POST binding codecs
//! - [`signature`] - canonical XML writer, XML-DSig signer and validator
//! - [`registry`] / [`validation`] - trusted Service Providers
//! - [`builder`] - assertion and response construction
//! - [`token`] / [`flow`] - the interactive confirmation step
//! - [`config`] / [`keys`] - configuration store and signing key cache
//! - [`host`] - collaborator traits implemented by the hosting application
//!
//! HTTP handling lives in the server crate; nothing here performs I/O.
//!
//! # Example
//!
//! ```rust,ignore
//! use idp_protocol_saml::flow::{FlowController, FlowParams};
//!
//! let outcome = controller.authn(&FlowParams::from_query(&query), &current_user)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bindings;
pub mod builder;
pub mod config;
pub mod error;
pub mod flow;
pub mod host;
pub mod keys;
pub mod metadata;
pub mod registry;
pub mod signature;
pub mod token;
pub mod types;
pub mod validation;

pub use error::{SamlError, SamlResult};
pub use types::*;
