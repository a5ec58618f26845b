//! XML signature support.
//!
//! Responses and assertions are built as [`XmlElement`] trees and written
//! directly in exclusive canonical form (`http://www.w3.org/2001/10/xml-exc-c14n#`),
//! so the serialized document is byte-identical to what a Service Provider
//! computes when it canonicalizes the signed element. That makes the
//! enveloped signatures produced by [`XmlSigner`] verifiable without a
//! general-purpose canonicalizer.
//!
//! # Signature layout
//!
//! ```text
//! <ds:Signature>
//!   <ds:SignedInfo>
//!     <ds:CanonicalizationMethod Algorithm="...xml-exc-c14n#"/>
//!     <ds:SignatureMethod Algorithm="...rsa-sha256"/>
//!     <ds:Reference URI="#_id...">
//!       <ds:Transforms> enveloped-signature, exc-c14n </ds:Transforms>
//!       <ds:DigestMethod Algorithm="...xmlenc#sha256"/>
//!       <ds:DigestValue>...</ds:DigestValue>
//!     </ds:Reference>
//!   </ds:SignedInfo>
//!   <ds:SignatureValue>...</ds:SignatureValue>
//!   <ds:KeyInfo><ds:X509Data><ds:X509Certificate>...</ds:X509Certificate></ds:X509Data></ds:KeyInfo>
//! </ds:Signature>
//! ```

mod signer;
mod validator;
mod xml;

pub use signer::*;
pub use validator::*;
pub use xml::*;
