//! Standalone EventSub receiver that logs every event it accepts.
//!
//! Configured from the environment:
//!
//! - `HELIX_CLIENT_ID` / `HELIX_CLIENT_SECRET`: enable the OAuth routes
//! - `HELIX_WEBHOOK_SECRET`: shared EventSub secret (required)
//! - `HELIX_HOST` / `HELIX_PORT`: bind address, default `localhost:4343`
//! - `HELIX_DOMAIN`: public domain used for callback URLs
//! - `HELIX_SCOPES`: default scopes for `/oauth`
//! - `RUST_LOG`: log filter, default `info`

use anyhow::{Context, Result};
use std::env;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use helix_client::webhook::{LoggingDispatcher, WebhookAdapter, WebhookConfig};
use helix_client::{Config, HttpClient, OAuth, Scopes};

fn load_config() -> Result<WebhookConfig> {
    let mut config = WebhookConfig::default();

    if let Ok(host) = env::var("HELIX_HOST") {
        config.host = host;
    }
    if let Ok(port) = env::var("HELIX_PORT") {
        config.port = port.parse().context("HELIX_PORT must be a port number")?;
    }
    if let Ok(domain) = env::var("HELIX_DOMAIN") {
        config = config.with_domain(domain);
    }

    let secret = env::var("HELIX_WEBHOOK_SECRET").context("HELIX_WEBHOOK_SECRET is required")?;
    Ok(config.with_eventsub_secret(secret))
}

fn load_oauth() -> Option<OAuth> {
    let client_id = env::var("HELIX_CLIENT_ID").ok()?;
    let mut config = Config::new(client_id);
    match env::var("HELIX_CLIENT_SECRET") {
        Ok(secret) => config = config.with_client_secret(secret),
        Err(_) => warn!("HELIX_CLIENT_SECRET is not set, /oauth/callback will fail"),
    }

    let oauth = OAuth::new(HttpClient::new(config));
    Some(match env::var("HELIX_SCOPES") {
        Ok(scopes) => oauth.with_default_scopes(Scopes::parse(&scopes)),
        Err(_) => oauth,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config()?;
    let oauth = load_oauth();
    if oauth.is_none() {
        info!("HELIX_CLIENT_ID is not set, OAuth routes are disabled");
    }

    let adapter = WebhookAdapter::new(config, Arc::new(LoggingDispatcher), oauth)?;
    let addr = adapter.run().await?;

    info!(%addr, eventsub_url = %adapter.eventsub_url(), redirect_url = %adapter.redirect_url(), "listening");

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    info!("shutting down");
    adapter.close().await;

    Ok(())
}
