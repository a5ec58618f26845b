//! Claim-type URIs for attribute names.
//!
//! Resolver keys that match a well-known claim name (case-insensitively) are
//! emitted under the claim's URI; any other key is used as the attribute name
//! verbatim.

/// E-mail address claim; always emitted.
pub const CLAIM_EMAIL_ADDRESS: &str =
    "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress";

/// Name claim; always emitted with the username.
pub const CLAIM_NAME: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/name";

static WELL_KNOWN_CLAIMS: &[(&str, &str)] = &[
    ("COMMON_NAME", "http://schemas.xmlsoap.org/claims/CommonName"),
    (
        "GIVEN_NAME",
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/givenname",
    ),
    (
        "SURNAME",
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/surname",
    ),
    ("UPN", "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/upn"),
    (
        "ROLE",
        "http://schemas.microsoft.com/ws/2008/06/identity/claims/role",
    ),
    (
        "PPID",
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/privatepersonalidentifier",
    ),
    (
        "NAME_ID",
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier",
    ),
    (
        "AUTHENTICATION_TIMESTAMP",
        "http://schemas.microsoft.com/ws/2008/06/identity/claims/authenticationinstant",
    ),
    (
        "AUTHENTICATION_METHOD",
        "http://schemas.microsoft.com/ws/2008/06/identity/claims/authenticationmethod",
    ),
];

/// Returns the claim-type URI for a well-known key name.
#[must_use]
pub fn claim_type_uri(key: &str) -> Option<&'static str> {
    WELL_KNOWN_CLAIMS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .map(|(_, uri)| *uri)
}

/// Returns the attribute name to emit for a resolver key.
#[must_use]
pub fn attribute_name(key: &str) -> &str {
    claim_type_uri(key).unwrap_or(key)
}
