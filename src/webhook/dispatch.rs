use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::token::Token;
use crate::webhook::events::{Event, Subscription, SubscriptionRevoked};

/// Something the webhook adapter hands to the application
#[derive(Debug, Clone)]
pub enum DispatchEvent {
    /// A decoded notification, dispatched under `name`
    Notification {
        name: String,
        subscription: Subscription,
        event: Event,
    },
    SubscriptionRevoked(SubscriptionRevoked),
    /// A user completed the OAuth flow
    OAuthAuthorized(Token),
}

impl DispatchEvent {
    pub fn name(&self) -> &str {
        match self {
            DispatchEvent::Notification { name, .. } => name,
            DispatchEvent::SubscriptionRevoked(_) => "subscription_revoked",
            DispatchEvent::OAuthAuthorized(_) => "oauth_authorized",
        }
    }
}

/// Receives events from the webhook adapter
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, event: DispatchEvent);
}

/// Dispatcher that only logs what it receives
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingDispatcher;

#[async_trait]
impl Dispatcher for LoggingDispatcher {
    async fn dispatch(&self, event: DispatchEvent) {
        match &event {
            DispatchEvent::Notification { subscription, event, .. } => info!(
                event = event.subscription_type(),
                subscription_id = %subscription.id,
                broadcaster_id = %event.broadcaster().id,
                "received notification"
            ),
            DispatchEvent::SubscriptionRevoked(revoked) => info!(
                subscription_id = %revoked.subscription.id,
                reason = ?revoked.reason,
                "subscription revoked"
            ),
            DispatchEvent::OAuthAuthorized(token) => info!(scopes = ?token.scope, "user authorized"),
        }
    }
}

/// Forward events into a channel
#[async_trait]
impl Dispatcher for mpsc::UnboundedSender<DispatchEvent> {
    async fn dispatch(&self, event: DispatchEvent) {
        if self.send(event).is_err() {
            warn!("dispatch channel closed, dropping event");
        }
    }
}
