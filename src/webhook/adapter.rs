use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{HelixError, Result};
use crate::oauth::{OAuth, Scopes};
use crate::time::Time;
use crate::webhook::dispatch::{DispatchEvent, Dispatcher};
use crate::webhook::events::{event_name, Event, EventError, NotificationPayload, RevocationPayload, SubscriptionRevoked};
use crate::webhook::message::{self, MessageType, WebhookMessage};
use crate::webhook::replay::ReplayWindow;
use crate::webhook::signature::{self, SignatureError};

/// Messages older than this are refused
pub const MAX_MESSAGE_AGE_MINUTES: i64 = 10;

const MIN_SECRET_LEN: usize = 10;
const MAX_SECRET_LEN: usize = 100;

/// Configuration for the webhook server
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
    /// Public domain the platform reaches this server on. Always served
    /// over https when set.
    pub domain: Option<String>,
    /// Path for EventSub messages
    pub eventsub_path: String,
    /// Shared secret used to sign EventSub messages
    pub eventsub_secret: Option<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        WebhookConfig {
            host: "localhost".to_string(),
            port: 4343,
            domain: None,
            eventsub_path: "callback".to_string(),
            eventsub_secret: None,
        }
    }
}

impl WebhookConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        WebhookConfig {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_eventsub_path(mut self, path: impl Into<String>) -> Self {
        self.eventsub_path = path.into();
        self
    }

    pub fn with_eventsub_secret(mut self, secret: impl Into<String>) -> Self {
        self.eventsub_secret = Some(secret.into());
        self
    }

    /// Fails when a secret is set whose length is outside 10..=100
    pub fn validate(&self) -> Result<()> {
        if let Some(secret) = &self.eventsub_secret {
            let len = secret.chars().count();
            if !(MIN_SECRET_LEN..=MAX_SECRET_LEN).contains(&len) {
                return Err(HelixError::Config(format!(
                    "eventsub secret must be between {} and {} characters long",
                    MIN_SECRET_LEN, MAX_SECRET_LEN
                )));
            }
        }
        Ok(())
    }

    /// Public origin, without a trailing slash
    pub fn origin(&self) -> String {
        match &self.domain {
            Some(domain) => {
                let domain = domain
                    .trim_start_matches("http://")
                    .trim_start_matches("https://")
                    .trim_end_matches('/');
                format!("https://{}", domain)
            }
            None => format!("http://{}:{}", self.host, self.port),
        }
    }

    /// Normalized EventSub path with a single leading slash
    pub fn path(&self) -> String {
        let path = self.eventsub_path.trim_matches('/');
        if path.is_empty() {
            "/callback".to_string()
        } else {
            format!("/{}", path)
        }
    }

    /// URL to register as the EventSub callback
    pub fn eventsub_url(&self) -> String {
        format!("{}{}", self.origin(), self.path())
    }

    /// URL to register as the OAuth redirect
    pub fn redirect_url(&self) -> String {
        format!("{}/oauth/callback", self.origin())
    }
}

impl std::fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("domain", &self.domain)
            .field("eventsub_path", &self.eventsub_path)
            .field("eventsub_secret", &self.eventsub_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Reason an EventSub message was refused. Always answered with `400`.
#[derive(Debug, Error)]
pub enum Rejection {
    #[error("Unknown or missing message type.")]
    UnknownMessageType,
    #[error("Eventsub webhook secret is not configured.")]
    MissingSecret,
    #[error("Bad Request. Invalid Message-ID or Message-Timestamp.")]
    MissingIdOrTimestamp,
    #[error("Previously responded to Message.")]
    Replayed,
    #[error("Challenge Failed. Failed to verify the integrity of the message: {0}.")]
    Signature(#[from] SignatureError),
    #[error("Invalid Message-Timestamp.")]
    InvalidTimestamp,
    #[error("Message has expired.")]
    Expired,
    #[error("Invalid message body: {0}.")]
    InvalidBody(String),
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

struct AdapterState {
    config: WebhookConfig,
    dispatcher: Arc<dyn Dispatcher>,
    oauth: Option<OAuth>,
    replay: Mutex<ReplayWindow>,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

impl AdapterState {
    /// Run every check that does not depend on the message kind
    fn validate(&self, headers: &HeaderMap, body: Bytes, now: DateTime<Utc>) -> std::result::Result<WebhookMessage, Rejection> {
        let kind: MessageType = header_str(headers, message::MESSAGE_TYPE)
            .and_then(|v| v.parse().ok())
            .ok_or(Rejection::UnknownMessageType)?;

        let secret = self
            .config
            .eventsub_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(Rejection::MissingSecret)?;

        let (Some(id), Some(timestamp)) = (
            header_str(headers, message::MESSAGE_ID),
            header_str(headers, message::MESSAGE_TIMESTAMP),
        ) else {
            return Err(Rejection::MissingIdOrTimestamp);
        };

        // recorded before verification so a concurrent duplicate cannot slip through
        if !self.replay.lock().insert(id) {
            return Err(Rejection::Replayed);
        }

        let signature = header_str(headers, message::MESSAGE_SIGNATURE);
        signature::verify_message(secret, id, timestamp, &body, signature)?;

        let payload: Value = serde_json::from_slice(&body).map_err(|e| Rejection::InvalidBody(e.to_string()))?;

        let sent = Time::parse(timestamp).map_err(|_| Rejection::InvalidTimestamp)?;
        if sent.age_at(now) >= Duration::minutes(MAX_MESSAGE_AGE_MINUTES) {
            return Err(Rejection::Expired);
        }

        Ok(WebhookMessage {
            kind,
            id: id.to_string(),
            timestamp: sent,
            payload,
        })
    }

    async fn handle(&self, message: WebhookMessage) -> Response {
        match message.kind {
            MessageType::Verification => match message.payload.get("challenge").and_then(Value::as_str) {
                Some(challenge) => (
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, "text/plain")],
                    challenge.to_string(),
                )
                    .into_response(),
                None => Rejection::InvalidBody("missing challenge".to_string()).into_response(),
            },
            MessageType::Notification => {
                let payload: NotificationPayload = match serde_json::from_value(message.payload) {
                    Ok(payload) => payload,
                    Err(e) => return Rejection::InvalidBody(e.to_string()).into_response(),
                };
                let name = event_name(&payload.subscription.kind);

                match Event::from_notification(&payload.subscription.kind, payload.event) {
                    Ok(event) => {
                        self.dispatcher
                            .dispatch(DispatchEvent::Notification {
                                name,
                                subscription: payload.subscription,
                                event,
                            })
                            .await;
                    }
                    Err(EventError::Unknown(kind)) => {
                        warn!(event = %name, subscription_type = %kind, "received an unhandled eventsub event");
                    }
                    Err(EventError::Decode(e)) => {
                        warn!(event = %name, error = %e, "failed to decode eventsub event");
                    }
                }
                StatusCode::OK.into_response()
            }
            MessageType::Revocation => {
                let payload: RevocationPayload = match serde_json::from_value(message.payload) {
                    Ok(payload) => payload,
                    Err(e) => return Rejection::InvalidBody(e.to_string()).into_response(),
                };
                self.dispatcher
                    .dispatch(DispatchEvent::SubscriptionRevoked(SubscriptionRevoked::new(
                        payload.subscription,
                    )))
                    .await;
                StatusCode::NO_CONTENT.into_response()
            }
        }
    }
}

async fn eventsub_callback(State(state): State<Arc<AdapterState>>, headers: HeaderMap, body: Bytes) -> Response {
    match state.validate(&headers, body, Utc::now()) {
        Ok(message) => {
            debug!(
                message_id = %message.id,
                kind = %message.kind,
                sent_at = %message.timestamp.to_rfc3339(),
                "accepted eventsub message"
            );
            state.handle(message).await
        }
        Err(rejection) => {
            debug!(reason = %rejection, "rejected eventsub message");
            rejection.into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct OAuthRedirectQuery {
    scopes: Option<String>,
    force_verify: Option<String>,
}

async fn oauth_redirect(State(state): State<Arc<AdapterState>>, Query(query): Query<OAuthRedirectQuery>) -> Response {
    let scopes = query
        .scopes
        .as_deref()
        .map(Scopes::parse)
        .filter(|s| !s.is_empty())
        .or_else(|| state.oauth.as_ref().and_then(|o| o.default_scopes().cloned()));

    let Some(scopes) = scopes else {
        warn!("no scopes provided in request to /oauth");
        return (StatusCode::BAD_REQUEST, "No scopes were provided. Scopes must be provided.").into_response();
    };

    let Some(oauth) = state.oauth.as_ref() else {
        error!("received /oauth request but no OAuth helper is configured");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    let force_verify = query
        .force_verify
        .as_deref()
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    match oauth.authorization_url(&scopes, &state.config.redirect_url(), force_verify, None) {
        Ok(payload) => Redirect::permanent(&payload.url).into_response(),
        Err(e) => {
            error!(error = %e, "failed to build authorization URL");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct OAuthCallbackQuery {
    code: Option<String>,
}

async fn oauth_callback(State(state): State<Arc<AdapterState>>, Query(query): Query<OAuthCallbackQuery>) -> Response {
    debug!("received OAuth callback request");

    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let Some(oauth) = state.oauth.as_ref() else {
        error!("received OAuth callback but no OAuth helper is configured");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    match oauth.user_access_token(&code, &state.config.redirect_url()).await {
        Ok(token) => {
            state.dispatcher.dispatch(DispatchEvent::OAuthAuthorized(token)).await;
            (StatusCode::OK, "Success. You can leave this page.").into_response()
        }
        Err(e) => {
            error!(error = %e, "failed to fetch user token");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// HTTP server receiving EventSub webhooks and OAuth redirects
pub struct WebhookAdapter {
    state: Arc<AdapterState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl WebhookAdapter {
    /// Create an adapter. Fails if the configured secret has an invalid length.
    pub fn new(config: WebhookConfig, dispatcher: Arc<dyn Dispatcher>, oauth: Option<OAuth>) -> Result<Self> {
        config.validate()?;

        Ok(WebhookAdapter {
            state: Arc::new(AdapterState {
                config,
                dispatcher,
                oauth,
                replay: Mutex::new(ReplayWindow::default()),
            }),
            task: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &WebhookConfig {
        &self.state.config
    }

    pub fn eventsub_url(&self) -> String {
        self.state.config.eventsub_url()
    }

    pub fn redirect_url(&self) -> String {
        self.state.config.redirect_url()
    }

    /// Router serving the EventSub and OAuth routes. Clones share the replay window.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/oauth", get(oauth_redirect))
            .route("/oauth/callback", get(oauth_callback))
            .route(&self.state.config.path(), post(eventsub_callback))
            .with_state(self.state.clone())
    }

    /// Bind and start serving in a background task. Returns the bound address.
    pub async fn run(&self) -> Result<SocketAddr> {
        let config = &self.state.config;
        let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
        let addr = listener.local_addr()?;
        let router = self.router();

        info!(%addr, eventsub_url = %self.eventsub_url(), "starting webhook adapter");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                error!(error = %e, "webhook server stopped with an error");
            }
        });

        if let Some(previous) = self.task.lock().replace(handle) {
            previous.abort();
        }

        Ok(addr)
    }

    /// Stop the server task. Errors raised while stopping are logged, never returned.
    pub async fn close(&self) {
        let Some(handle) = self.task.lock().take() else {
            return;
        };

        handle.abort();
        match handle.await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => debug!("webhook server task cancelled"),
            Err(e) => debug!(error = %e, "ignoring error raised while stopping webhook server"),
        }

        info!("webhook adapter shut down");
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl std::fmt::Debug for WebhookAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookAdapter")
            .field("config", &self.state.config)
            .field("oauth", &self.state.oauth)
            .finish()
    }
}
