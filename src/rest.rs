use parking_lot::{Mutex, RwLock};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::client::{create_http_client, Config};
use crate::error::{HelixError, Result};
use crate::paginate::Paginated;
use crate::response::Payload;
use crate::route::Route;
use crate::token::Token;

/// Transport for API requests.
///
/// Cloning is cheap: clones share the configuration, the HTTP session and
/// the token store. The session is created on the first request.
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: Config,
    session: Mutex<Option<Client>>,
    tokens: RwLock<HashMap<String, Token>>,
}

impl HttpClient {
    /// Create a new client. No connection is made until the first request.
    pub fn new(config: Config) -> Self {
        HttpClient {
            inner: Arc::new(Inner {
                config,
                session: Mutex::new(None),
                tokens: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Start a route on the configured API host
    pub fn route(&self, method: Method, path: &str) -> Route {
        Route::new(method, path).with_base(&self.inner.config.api_base)
    }

    /// Start a route on the configured identity host
    pub fn identity_route(&self, method: Method, path: &str) -> Route {
        Route::identity(method, path).with_base(&self.inner.config.id_base)
    }

    /// Store a token for the given user id. The empty id holds the app token.
    pub fn add_token(&self, user_id: impl Into<String>, token: Token) {
        self.inner.tokens.write().insert(user_id.into(), token);
    }

    /// Forget the token stored for the given user id
    pub fn remove_token(&self, user_id: &str) -> Option<Token> {
        self.inner.tokens.write().remove(user_id)
    }

    fn token(&self, user_id: &str) -> Option<Token> {
        self.inner.tokens.read().get(user_id).cloned()
    }

    fn session(&self) -> Result<Client> {
        let mut session = self.inner.session.lock();
        if let Some(client) = session.as_ref() {
            return Ok(client.clone());
        }

        debug!("initialising a new HTTP session");
        let client = create_http_client(&self.inner.config)?;
        *session = Some(client.clone());
        Ok(client)
    }

    /// Whether a session is currently attached
    pub fn has_session(&self) -> bool {
        self.inner.session.lock().is_some()
    }

    /// Detach the current session. A new one is created on the next request.
    pub fn clear(&self) {
        if self.inner.session.lock().take().is_some() {
            debug!("cleared HTTP session, a new session will be created on the next request");
        }
    }

    /// Shut the session down. Pooled connections close once in-flight
    /// requests holding the session finish.
    pub async fn close(&self) {
        let Some(client) = self.inner.session.lock().take() else {
            return;
        };
        drop(client);
        debug!("HTTP session closed");
    }

    /// Execute a single request.
    ///
    /// The body is decoded as JSON when the response advertises a JSON
    /// content type and returned as text otherwise. Any status >= 400 fails
    /// with [`HelixError::Http`] carrying the raw body.
    pub async fn request(&self, route: &Route) -> Result<Payload> {
        let session = self.session()?;
        debug!(route = %route, "attempting request");

        let mut request = session.request(route.method().clone(), route.url());

        let has_auth_override = route
            .headers()
            .keys()
            .any(|name| name.eq_ignore_ascii_case(AUTHORIZATION.as_str()));
        if !has_auth_override {
            if let Some(token) = self.token(route.token_id()) {
                request = request.header(AUTHORIZATION, token.bearer());
            }
        }

        for (name, value) in route.headers() {
            request = request.header(name.as_str(), value.as_str());
        }

        if let Some(json) = route.json().filter(|json| !is_empty_body(json)) {
            request = request.json(json);
        }

        let start = std::time::Instant::now();
        let response = request.send().await?;
        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("application/json"))
            .unwrap_or(false);
        let body = response.text().await?;

        debug!(
            route = %route,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "request finished"
        );

        if status.as_u16() >= 400 {
            return Err(HelixError::http(status.as_u16(), route.to_string(), body));
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(Payload::NoContent);
        }

        if is_json {
            Ok(Payload::Json(serde_json::from_str(&body)?))
        } else {
            Ok(Payload::Text(body))
        }
    }

    /// Execute a request that must return structured JSON.
    /// A 204 response yields `Value::Null`.
    pub async fn request_json(&self, route: &Route) -> Result<Value> {
        self.request(route).await?.into_json()
    }

    /// Execute a request and deserialize the JSON body into `T`
    pub async fn request_as<T: DeserializeOwned>(&self, route: &Route) -> Result<T> {
        let value = self.request_json(route).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Wrap a list route in a lazily fetched result stream
    pub fn request_paginated<T, F>(&self, route: Route, max_results: Option<usize>, converter: F) -> Paginated<T>
    where
        F: Fn(Value, &Value) -> Result<T> + Send + Sync + 'static,
    {
        Paginated::new(self.clone(), route, max_results, converter)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.inner.config)
            .field("has_session", &self.has_session())
            .finish()
    }
}

fn is_empty_body(json: &Value) -> bool {
    match json {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
