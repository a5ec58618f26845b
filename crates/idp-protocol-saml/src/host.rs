//! Collaborators supplied by the hosting application.
//!
//! Authentication itself happens in the host; this crate only asks who the
//! current user is and where to send them to log in or switch accounts.

use serde::{Deserialize, Serialize};

/// An authenticated user as known to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Login name; becomes the assertion's `NameID`.
    pub username: String,
    /// E-mail address.
    pub email: String,
    /// Name to show on the confirmation prompt.
    #[serde(default)]
    pub display_name: Option<String>,
}

impl UserIdentity {
    /// Creates an identity without a display name.
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            display_name: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

/// The user behind the current request.
pub trait CurrentUser {
    /// The identity, when someone is logged in.
    fn identity(&self) -> Option<&UserIdentity>;

    /// Whether someone is logged in.
    fn is_authenticated(&self) -> bool {
        self.identity().is_some()
    }

    /// Name to show on the confirmation prompt.
    fn display_name(&self) -> Option<&str> {
        self.identity()
            .map(|user| user.display_name.as_deref().unwrap_or(&user.username))
    }
}

impl CurrentUser for Option<UserIdentity> {
    fn identity(&self) -> Option<&UserIdentity> {
        self.as_ref()
    }
}

impl CurrentUser for UserIdentity {
    fn identity(&self) -> Option<&UserIdentity> {
        Some(self)
    }
}

/// Host login and logout pages.
pub trait HostLogin: Send + Sync {
    /// URL of the login page that returns to `return_url` afterwards.
    fn login_url(&self, return_url: &str) -> String;

    /// URL that logs the user out and returns to `return_url`.
    fn logout_url(&self, return_url: &str) -> String;
}

/// [`HostLogin`] for hosts whose login and logout pages take the return
/// address in a query parameter.
#[derive(Debug, Clone)]
pub struct RedirectLogin {
    login_url: String,
    logout_url: String,
    return_param: String,
}

impl RedirectLogin {
    /// Creates redirect URLs using the `redirect_to` parameter.
    pub fn new(login_url: impl Into<String>, logout_url: impl Into<String>) -> Self {
        Self {
            login_url: login_url.into(),
            logout_url: logout_url.into(),
            return_param: "redirect_to".to_string(),
        }
    }

    /// Uses a different return parameter name.
    #[must_use]
    pub fn with_return_param(mut self, name: impl Into<String>) -> Self {
        self.return_param = name.into();
        self
    }

    fn with_return(&self, base: &str, return_url: &str) -> String {
        let separator = if base.contains('?') { '&' } else { '?' };
        format!(
            "{base}{separator}{}={}",
            self.return_param,
            urlencoding::encode(return_url)
        )
    }
}

impl HostLogin for RedirectLogin {
    fn login_url(&self, return_url: &str) -> String {
        self.with_return(&self.login_url, return_url)
    }

    fn logout_url(&self, return_url: &str) -> String {
        self.with_return(&self.logout_url, return_url)
    }
}

/// Resolved attributes for one user, in insertion order.
///
/// Keys are unique; inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAttributes(Vec<(String, String)>);

impl UserAttributes {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Sets a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Sets a value unless the key is already present.
    pub fn insert_if_absent(&mut self, key: &str, value: impl Into<String>) {
        if self.get(key).is_none() {
            self.0.push((key.to_string(), value.into()));
        }
    }

    /// Returns a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates over `(key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for UserAttributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Self::new();
        for (k, v) in iter {
            attributes.insert(k, v);
        }
        attributes
    }
}
