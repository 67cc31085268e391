use serde::{Deserialize, Serialize};

/// Token represents an OAuth2 user access token as returned by the
/// identity host's token endpoint.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    /// Access token for API requests
    pub access_token: String,

    /// Refresh token for renewing expired access tokens
    #[serde(default)]
    pub refresh_token: String,

    /// Token type (usually "bearer")
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Token lifetime in seconds
    #[serde(default)]
    pub expires_in: i64,

    /// Scopes granted to the token
    #[serde(default)]
    pub scope: Vec<String>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Token {
    /// Create a new Token
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>, expires_in: i64) -> Self {
        Token {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            token_type: default_token_type(),
            expires_in,
            scope: Vec::new(),
        }
    }

    /// Check if we have a refresh token available
    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    /// Value for the `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

// Keep tokens out of logs
impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}
