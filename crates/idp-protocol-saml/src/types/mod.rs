//! SAML 2.0 types.
//!
//! Core data structures for the messages this identity provider reads and
//! writes, plus the URIs they are built from.

mod assertion;
mod authn_request;
mod claims;
mod constants;
mod response;

pub use assertion::*;
pub use authn_request::*;
pub use claims::*;
pub use constants::*;
pub use response::*;
