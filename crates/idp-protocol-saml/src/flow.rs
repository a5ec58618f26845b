//! Confirmation Flow Controller.
//!
//! Two HTTP round trips, no server-side state between them:
//!
//! 1. `authn` decodes the request, sends anonymous users to the host login
//!    page and otherwise renders a [`ConfirmationPrompt`] carrying the
//!    original parameters plus a fresh confirmation token.
//! 2. `confirm` checks the token, validates the Service Provider again and
//!    returns the signed response as an auto-submitting POST form.
//!
//! An authenticated user arriving at `authn` with a `service` and a valid
//! token for that service skips the prompt.

use std::sync::Arc;

use idp_crypto::SigningKeyPair;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::bindings::HttpRedirectBinding;
use crate::builder::{AssertionBuilder, AssertionRequest};
use crate::config::IdpSettings;
use crate::error::{SamlError, SamlResult};
use crate::host::{CurrentUser, HostLogin, UserIdentity};
use crate::keys::KeyPairCache;
use crate::metadata::idp_metadata_xml;
use crate::token::{ConfirmationTokens, TokenScope};
use crate::types::{display_name, IncomingAuthnRequest};
use crate::validation::{validate, ValidatedClient};

/// Query parameter carrying the confirmation token.
pub const TOKEN_PARAM: &str = "token";
/// Submit button name signalling the confirm intent.
pub const CONFIRM_PARAM: &str = "idp_confirm";

/// Parameters of the authn and confirm endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowParams {
    /// Redirect-bound `AuthnRequest`.
    #[serde(rename = "SAMLRequest", default)]
    pub saml_request: Option<String>,
    /// Opaque pass-through value.
    #[serde(rename = "RelayState", default)]
    pub relay_state: Option<String>,
    /// Registered service for IdP-initiated login.
    #[serde(default)]
    pub service: Option<String>,
    /// Confirmation token.
    #[serde(default)]
    pub token: Option<String>,
    /// Present when the user pressed the confirm button.
    #[serde(rename = "idp_confirm", default)]
    pub idp_confirm: Option<String>,
}

impl FlowParams {
    /// Parses a raw query string.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for (name, value) in form_urlencoded::parse(query.as_bytes()) {
            let value = Some(value.into_owned());
            match name.as_ref() {
                "SAMLRequest" => params.saml_request = value,
                "RelayState" => params.relay_state = value,
                "service" => params.service = value,
                TOKEN_PARAM => params.token = value,
                CONFIRM_PARAM => params.idp_confirm = value,
                _ => {}
            }
        }
        params
    }

    /// Parameters for an IdP-initiated login.
    pub fn for_service(service: impl Into<String>) -> Self {
        Self {
            service: Some(service.into()),
            ..Self::default()
        }
    }

    /// Non-empty `SAMLRequest`.
    #[must_use]
    pub fn saml_request(&self) -> Option<&str> {
        non_empty(self.saml_request.as_deref())
    }

    /// Non-empty `RelayState`.
    #[must_use]
    pub fn relay_state(&self) -> Option<&str> {
        non_empty(self.relay_state.as_deref())
    }

    /// Non-empty `service`.
    #[must_use]
    pub fn service(&self) -> Option<&str> {
        non_empty(self.service.as_deref())
    }

    /// Non-empty token.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        non_empty(self.token.as_deref())
    }

    /// Whether the confirm intent is present.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        self.idp_confirm.is_some()
    }

    /// The parameters carried from the prompt to the next step, encoded as a
    /// query string.
    fn forwarded_query(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if let Some(saml_request) = self.saml_request() {
            query.append_pair("SAMLRequest", saml_request);
        }
        if let Some(relay_state) = self.relay_state() {
            query.append_pair("RelayState", relay_state);
        }
        if let Some(service) = self.service() {
            query.append_pair("service", service);
        }
        query.finish()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// IdP endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdpEndpoint {
    /// Authentication request landing page.
    Authn,
    /// Confirmation step.
    Confirm,
    /// Metadata document.
    Metadata,
}

impl IdpEndpoint {
    /// Path below the base URL.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Authn => "/idp",
            Self::Confirm => "/idp/confirm",
            Self::Metadata => "/idp/metadata",
        }
    }
}

/// Public URLs of the IdP.
#[derive(Debug, Clone)]
pub struct IdpUrls {
    base_url: String,
    home_url: String,
}

impl IdpUrls {
    /// Creates URLs below `base_url`; the home URL defaults to `{base}/`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let home_url = format!("{base_url}/");
        Self { base_url, home_url }
    }

    /// Overrides the home URL.
    #[must_use]
    pub fn with_home_url(mut self, home_url: impl Into<String>) -> Self {
        self.home_url = home_url.into();
        self
    }

    /// Absolute URL of an endpoint.
    #[must_use]
    pub fn idp_url(&self, endpoint: IdpEndpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    /// The base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Where "No, take me home" leads.
    #[must_use]
    pub fn home_url(&self) -> &str {
        &self.home_url
    }

    fn with_query(&self, endpoint: IdpEndpoint, query: &str) -> String {
        let url = self.idp_url(endpoint);
        if query.is_empty() {
            url
        } else {
            format!("{url}?{query}")
        }
    }
}

/// The confirmation page model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmationPrompt {
    /// Destination name shown to the user.
    pub destination: String,
    /// Login name of the current user.
    pub username: String,
    /// Display name of the current user.
    pub user_display_name: String,
    /// `SAMLRequest` to carry forward.
    pub saml_request: Option<String>,
    /// `RelayState` to carry forward.
    pub relay_state: Option<String>,
    /// `service` to carry forward.
    pub service: Option<String>,
    /// Confirmation token; absent when the request failed validation.
    pub token: Option<String>,
    /// Form action.
    pub confirm_url: String,
    /// "Not you? Switch user." link.
    pub switch_user_url: String,
    /// "No, take me home" link.
    pub home_url: String,
    /// Validation error shown instead of the confirm button.
    pub error: Option<String>,
}

impl ConfirmationPrompt {
    /// Whether the confirm button is offered.
    #[must_use]
    pub const fn can_confirm(&self) -> bool {
        self.token.is_some() && self.error.is_none()
    }

    /// Page title.
    #[must_use]
    pub fn title(&self) -> String {
        format!("Login to {}", self.destination)
    }

    /// The confirmation question.
    #[must_use]
    pub fn question(&self) -> String {
        format!(
            "Do you wish to proceed to {} as {}?",
            self.destination, self.username
        )
    }

    /// Confirm button label.
    #[must_use]
    pub fn confirm_label(&self) -> String {
        format!("Log in to {}", self.destination)
    }
}

/// A signed response ready to be posted to the Service Provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostResponse {
    /// ACS URL the form posts to.
    pub destination: String,
    /// ID of the signed response.
    pub response_id: String,
    /// The auto-submitting HTML form.
    pub html: String,
}

/// Result of one flow step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// The user must log in first.
    RedirectToLogin {
        /// Host login URL returning to the same authn request.
        location: String,
    },
    /// Show the confirmation page.
    AwaitingConfirmation(ConfirmationPrompt),
    /// Send the signed response.
    Respond(PostResponse),
}

/// What a flow step is about: an SP-initiated request or a registered
/// service.
enum Target {
    Request(IncomingAuthnRequest),
    Service(String),
}

impl Target {
    fn from_params(params: &FlowParams) -> SamlResult<Self> {
        if let Some(saml_request) = params.saml_request() {
            let request =
                HttpRedirectBinding::decode_authn_request(saml_request, params.relay_state())?;
            Ok(Self::Request(request))
        } else if let Some(service) = params.service() {
            Ok(Self::Service(service.to_string()))
        } else {
            Err(SamlError::InvalidRequest(
                "neither SAMLRequest nor service present".into(),
            ))
        }
    }

    fn issuer(&self) -> &str {
        match self {
            Self::Request(request) => &request.issuer,
            Self::Service(service) => service,
        }
    }

    fn requested_acs(&self) -> Option<&str> {
        match self {
            Self::Request(request) => request.assertion_consumer_service_url.as_deref(),
            Self::Service(_) => None,
        }
    }

    fn in_response_to(&self) -> Option<&str> {
        match self {
            Self::Request(request) => Some(&request.id),
            Self::Service(_) => None,
        }
    }

    fn scope(&self) -> TokenScope {
        TokenScope::for_service(self.issuer())
    }
}

/// Drives the prompt and confirm steps.
#[derive(Clone)]
pub struct FlowController {
    settings: IdpSettings,
    keys: Arc<KeyPairCache>,
    tokens: ConfirmationTokens,
    builder: AssertionBuilder,
    urls: IdpUrls,
    login: Arc<dyn HostLogin>,
}

impl std::fmt::Debug for FlowController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowController")
            .field("settings", &self.settings)
            .field("tokens", &self.tokens)
            .field("builder", &self.builder)
            .field("urls", &self.urls)
            .finish_non_exhaustive()
    }
}

impl FlowController {
    /// Creates a controller with its own key cache.
    pub fn new(
        settings: IdpSettings,
        builder: AssertionBuilder,
        tokens: ConfirmationTokens,
        urls: IdpUrls,
        login: Arc<dyn HostLogin>,
    ) -> Self {
        Self {
            settings,
            keys: Arc::new(KeyPairCache::new()),
            tokens,
            builder,
            urls,
            login,
        }
    }

    /// Shares a key cache, so settings updates elsewhere invalidate it.
    #[must_use]
    pub fn with_key_cache(mut self, keys: Arc<KeyPairCache>) -> Self {
        self.keys = keys;
        self
    }

    /// The settings view.
    #[must_use]
    pub const fn settings(&self) -> &IdpSettings {
        &self.settings
    }

    /// The signing key cache.
    #[must_use]
    pub const fn key_cache(&self) -> &Arc<KeyPairCache> {
        &self.keys
    }

    /// The IdP URLs.
    #[must_use]
    pub const fn urls(&self) -> &IdpUrls {
        &self.urls
    }

    /// The token service.
    #[must_use]
    pub const fn tokens(&self) -> &ConfirmationTokens {
        &self.tokens
    }

    /// The IdP issuer name.
    #[must_use]
    pub fn issuer_name(&self) -> &str {
        self.builder.issuer_name()
    }

    /// The signing key pair, loaded on first use.
    pub fn signing_keys(&self) -> SamlResult<Arc<SigningKeyPair>> {
        self.keys.get_or_load(|| self.settings.load_signing_keys())
    }

    /// The IdP metadata document.
    pub fn metadata_xml(&self) -> SamlResult<String> {
        let keys = self.signing_keys()?;
        Ok(idp_metadata_xml(
            self.issuer_name(),
            &self.urls.idp_url(IdpEndpoint::Authn),
            &keys,
        ))
    }

    /// The authn endpoint.
    ///
    /// Decode failures and requests with neither `SAMLRequest` nor `service`
    /// are errors. A request-bound validation failure is shown on the prompt
    /// with no confirm button; an unknown `service` is an error.
    pub fn authn<U>(&self, params: &FlowParams, user: &U) -> SamlResult<FlowOutcome>
    where
        U: CurrentUser + ?Sized,
    {
        if let Some(identity) = user.identity() {
            if let Some(outcome) = self.try_shortcut(params, identity)? {
                return Ok(outcome);
            }
        }

        let target = Target::from_params(params)?;
        let current_url = self
            .urls
            .with_query(IdpEndpoint::Authn, &params.forwarded_query());

        let Some(identity) = user.identity() else {
            tracing::debug!(issuer = target.issuer(), "redirecting anonymous user to login");
            return Ok(FlowOutcome::RedirectToLogin {
                location: self.login.login_url(&current_url),
            });
        };

        let registry = self.settings.sp_source().snapshot();
        // No known ACS URL counts as a validation failure here, not at confirm.
        let validated = validate(&registry, target.issuer(), target.requested_acs())
            .and_then(|client| {
                client.destination()?;
                Ok(client)
            });

        let (destination, error) = match (&target, validated) {
            (Target::Request(request), Ok(_)) => (request.destination_name().to_string(), None),
            (Target::Request(request), Err(err)) => (
                request.destination_name().to_string(),
                Some(err.user_message().to_string()),
            ),
            (Target::Service(_), Ok(client)) => {
                (display_name(&client.friendly_name).to_string(), None)
            }
            (Target::Service(_), Err(err)) => return Err(err),
        };

        let token = error
            .is_none()
            .then(|| self.tokens.issue(&target.scope(), &identity.username));

        tracing::debug!(
            issuer = target.issuer(),
            username = %identity.username,
            valid = error.is_none(),
            "rendering confirmation prompt"
        );

        Ok(FlowOutcome::AwaitingConfirmation(ConfirmationPrompt {
            destination,
            username: identity.username.clone(),
            user_display_name: user
                .display_name()
                .unwrap_or(&identity.username)
                .to_string(),
            saml_request: params.saml_request().map(String::from),
            relay_state: params.relay_state().map(String::from),
            service: params.service().map(String::from),
            token,
            confirm_url: self.urls.idp_url(IdpEndpoint::Confirm),
            switch_user_url: self.login.logout_url(&current_url),
            home_url: self.urls.home_url().to_string(),
            error,
        }))
    }

    /// The confirm endpoint. Every failure here is an error.
    pub fn confirm<U>(&self, params: &FlowParams, user: &U) -> SamlResult<FlowOutcome>
    where
        U: CurrentUser + ?Sized,
    {
        let (Some(identity), Some(token), true) =
            (user.identity(), params.token(), params.is_confirmed())
        else {
            return Err(SamlError::InvalidRequest(
                "confirmation requires a logged-in user, a token and the confirm intent".into(),
            ));
        };

        let target = Target::from_params(params)?;
        self.tokens
            .consume(token, &target.scope(), &identity.username)?;

        self.respond(&target, params.relay_state(), identity)
    }

    fn try_shortcut(
        &self,
        params: &FlowParams,
        identity: &UserIdentity,
    ) -> SamlResult<Option<FlowOutcome>> {
        let (None, Some(service), Some(token)) =
            (params.saml_request(), params.service(), params.token())
        else {
            return Ok(None);
        };

        let target = Target::Service(service.to_string());
        if self
            .tokens
            .verify(token, &target.scope(), &identity.username)
            .is_err()
        {
            return Ok(None);
        }
        self.tokens.consume(token, &target.scope(), &identity.username)?;

        tracing::debug!(service, "service token present, skipping confirmation prompt");
        self.respond(&target, params.relay_state(), identity).map(Some)
    }

    fn respond(
        &self,
        target: &Target,
        relay_state: Option<&str>,
        identity: &UserIdentity,
    ) -> SamlResult<FlowOutcome> {
        let registry = self.settings.sp_source().snapshot();
        let client: ValidatedClient =
            validate(&registry, target.issuer(), target.requested_acs())?;
        let request = AssertionRequest::for_client(&client, target.in_response_to(), identity)?;

        let keys = self.signing_keys()?;
        let response = self.builder.build(&request, keys)?;

        tracing::info!(
            issuer = %client.entity_id,
            username = %identity.username,
            destination = response.destination(),
            response_id = %response.response.id,
            "issued SAML response"
        );

        Ok(FlowOutcome::Respond(PostResponse {
            destination: response.destination().to_string(),
            response_id: response.response.id.clone(),
            html: response.to_post_form(relay_state),
        }))
    }

    /// URL starting an IdP-initiated login to `service`, or `None` for an
    /// unknown service or one without a registered ACS URL. With `auto_login_as` the URL carries a token for
    /// that user and skips the prompt.
    #[must_use]
    pub fn login_to_service_url(
        &self,
        service: &str,
        auto_login_as: Option<&UserIdentity>,
    ) -> Option<String> {
        let registry = self.settings.sp_source().snapshot();
        validate(&registry, service, None).ok()?.destination().ok()?;

        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("service", service);
        if let Some(user) = auto_login_as {
            let token = self
                .tokens
                .issue(&TokenScope::for_service(service), &user.username);
            query.append_pair(TOKEN_PARAM, &token);
        }
        Some(self.urls.with_query(IdpEndpoint::Authn, &query.finish()))
    }
}
