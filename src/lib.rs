//! # helix-client - Twitch Helix API client and EventSub webhook receiver
//!
//! An async client for the Helix REST API plus an axum server that receives
//! EventSub webhooks and completes the OAuth authorization code flow.
//!
//! ## Features
//!
//! - Route builder with ordered query parameters and `None` stripping
//! - Per-user token store with app token fallback
//! - Lazy cursor pagination with a result budget
//! - EventSub signature verification, replay protection and freshness checks
//! - Typed EventSub events delivered through a [`Dispatcher`]
//!
//! ## Basic Usage
//!
//! ```no_run
//! use helix_client::{Config, HttpClient, Token};
//!
//! # async fn run() -> helix_client::Result<()> {
//! let http = HttpClient::new(Config::new("my-client-id"));
//! http.add_token("", Token::new("app-token", "", 3600));
//!
//! let mut games = http.get_top_games(100, None, Some(250));
//! while let Some(game) = games.next().await? {
//!     println!("{} ({})", game.name, game.id);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Receiving EventSub webhooks
//!
//! ```no_run
//! use std::sync::Arc;
//! use helix_client::webhook::{LoggingDispatcher, WebhookAdapter, WebhookConfig};
//!
//! # async fn run() -> helix_client::Result<()> {
//! let config = WebhookConfig::new("0.0.0.0", 4343)
//!     .with_domain("hooks.example.com")
//!     .with_eventsub_secret("a-long-shared-secret");
//!
//! let adapter = WebhookAdapter::new(config, Arc::new(LoggingDispatcher), None)?;
//! adapter.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod endpoints;
pub mod error;
pub mod models;
pub mod oauth;
pub mod paginate;
pub mod response;
pub mod rest;
pub mod route;
pub mod time;
pub mod token;
pub mod webhook;

// Re-export main types for convenience
pub use client::Config;
pub use endpoints::ClipSource;
pub use error::{HelixError, Result};
pub use oauth::{AuthorizationUrl, OAuth, Scopes};
pub use paginate::Paginated;
pub use response::{Page, Pagination, Payload};
pub use rest::HttpClient;
pub use route::{ArrayMode, ParamValue, Params, Route};
pub use time::Time;
pub use token::Token;
pub use webhook::{DispatchEvent, Dispatcher, WebhookAdapter, WebhookConfig};

pub use reqwest::Method;
pub use serde_json::json;
