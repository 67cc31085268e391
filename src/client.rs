use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

use crate::error::{HelixError, Result};

/// Primary API host
pub const API_BASE: &str = "https://api.twitch.tv/helix/";

/// Identity host used for OAuth endpoints
pub const ID_BASE: &str = "https://id.twitch.tv/";

/// Create the HTTP session for API requests.
///
/// `User-Agent` and `Client-ID` are attached to every request made through it.
pub fn create_http_client(config: &Config) -> Result<Client> {
    let mut headers = HeaderMap::new();
    let client_id = HeaderValue::from_str(&config.client_id)
        .map_err(|_| HelixError::Config("client_id is not a valid header value".to_string()))?;
    headers.insert("Client-ID", client_id);

    let client = ClientBuilder::new()
        .user_agent(&config.user_agent)
        .default_headers(headers)
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .build()?;

    Ok(client)
}

/// Configuration for the Helix client
#[derive(Clone)]
pub struct Config {
    /// Application client id, sent as `Client-ID`
    pub client_id: String,
    /// Application client secret, required for token exchange
    pub client_secret: Option<String>,
    /// Base URL for API routes
    pub api_base: String,
    /// Base URL for identity (OAuth) routes
    pub id_base: String,
    /// Total request timeout
    pub timeout: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Config {
    /// Create a new configuration for the given client id
    pub fn new(client_id: impl Into<String>) -> Self {
        Config {
            client_id: client_id.into(),
            client_secret: None,
            api_base: API_BASE.to_string(),
            id_base: ID_BASE.to_string(),
            timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(10),
            user_agent: default_user_agent(),
        }
    }

    /// Set the client secret
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Override both base hosts, mostly useful against a mock server
    pub fn with_base_urls(mut self, api_base: impl Into<String>, id_base: impl Into<String>) -> Self {
        self.api_base = ensure_trailing_slash(api_base.into());
        self.id_base = ensure_trailing_slash(id_base.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base URL for a route, depending on the host it targets
    pub fn base_url(&self, use_identity_host: bool) -> &str {
        if use_identity_host {
            &self.id_base
        } else {
            &self.api_base
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("id_base", &self.id_base)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

fn default_user_agent() -> String {
    format!(
        "{}/{} (Rust; reqwest)",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )
}

fn ensure_trailing_slash(mut base: String) -> String {
    if !base.ends_with('/') {
        base.push('/');
    }
    base
}
