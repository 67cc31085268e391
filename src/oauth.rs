//! OAuth authorization code flow helpers.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use uuid::Uuid;

use crate::error::{HelixError, Result};
use crate::rest::HttpClient;
use crate::route::ArrayMode;
use crate::token::Token;

/// A set of OAuth scopes, kept in insertion order without duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scopes(Vec<String>);

impl Scopes {
    pub fn new<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out = Scopes::default();
        for scope in scopes {
            out.insert(scope);
        }
        out
    }

    /// Parse a whitespace or `+` separated list
    pub fn parse(raw: &str) -> Self {
        Scopes::new(raw.split(|c: char| c.is_whitespace() || c == '+').filter(|s| !s.is_empty()))
    }

    pub fn insert(&mut self, scope: impl Into<String>) {
        let scope = scope.into();
        if !self.0.contains(&scope) {
            self.0.push(scope);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for Scopes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

/// A built authorization URL and the parameters that went into it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationUrl {
    pub url: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub response_type: String,
    pub scopes: Scopes,
    pub force_verify: bool,
    pub state: String,
}

/// OAuth helper bound to an [`HttpClient`] and its client credentials
#[derive(Clone)]
pub struct OAuth {
    http: HttpClient,
    scopes: Option<Scopes>,
}

impl OAuth {
    pub fn new(http: HttpClient) -> Self {
        OAuth { http, scopes: None }
    }

    /// Scopes used when a request does not name any
    pub fn with_default_scopes(mut self, scopes: Scopes) -> Self {
        self.scopes = Some(scopes);
        self
    }

    pub fn default_scopes(&self) -> Option<&Scopes> {
        self.scopes.as_ref().filter(|s| !s.is_empty())
    }

    /// Build the URL a user visits to grant `scopes`.
    /// A random `state` is generated when none is given.
    pub fn authorization_url(
        &self,
        scopes: &Scopes,
        redirect_uri: &str,
        force_verify: bool,
        state: Option<String>,
    ) -> Result<AuthorizationUrl> {
        if scopes.is_empty() {
            return Err(HelixError::Other("at least one scope is required".to_string()));
        }

        let config = self.http.config();
        let state = state.unwrap_or_else(|| Uuid::new_v4().to_string());

        let route = self
            .http
            .identity_route(Method::GET, "oauth2/authorize")
            .with_array_mode(ArrayMode::Joined)
            .with_param("client_id", config.client_id.as_str())
            .with_param("redirect_uri", redirect_uri)
            .with_param("response_type", "code")
            .with_param("scope", scopes.as_slice())
            .with_param("force_verify", force_verify)
            .with_param("state", state.as_str());

        Ok(AuthorizationUrl {
            url: route.url().to_string(),
            client_id: config.client_id.clone(),
            redirect_uri: redirect_uri.to_string(),
            response_type: "code".to_string(),
            scopes: scopes.clone(),
            force_verify,
            state,
        })
    }

    /// Exchange an authorization code for a user token
    pub async fn user_access_token(&self, code: &str, redirect_uri: &str) -> Result<Token> {
        let config = self.http.config();
        let secret = config
            .client_secret
            .as_deref()
            .ok_or_else(|| HelixError::Config("client_secret is required to exchange codes".to_string()))?;

        let route = self
            .http
            .identity_route(Method::POST, "oauth2/token")
            .with_param("client_id", config.client_id.as_str())
            .with_param("client_secret", secret)
            .with_param("code", code)
            .with_param("grant_type", "authorization_code")
            .with_param("redirect_uri", redirect_uri);

        debug!(route = %route, "exchanging authorization code");
        self.http.request_as(&route).await
    }
}

impl fmt::Debug for OAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth")
            .field("client_id", &self.http.config().client_id)
            .field("scopes", &self.scopes)
            .finish()
    }
}
