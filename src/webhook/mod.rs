//! EventSub webhook receiver.
//!
//! [`WebhookAdapter`] serves three routes on one axum server:
//!
//! - `POST <eventsub_path>` receives EventSub messages. Every message is
//!   checked for a known message type, a fresh timestamp, an unseen message
//!   id and a valid HMAC signature before it is decoded and dispatched.
//! - `GET /oauth` redirects to the authorization URL for the requested scopes.
//! - `GET /oauth/callback` exchanges the returned code for a token.
//!
//! Validation failures never escape the HTTP boundary: they become `400`
//! responses with a short reason.

pub mod adapter;
pub mod dispatch;
pub mod events;
pub mod message;
pub mod replay;
pub mod signature;

pub use adapter::{Rejection, WebhookAdapter, WebhookConfig};
pub use dispatch::{DispatchEvent, Dispatcher, LoggingDispatcher};
pub use events::{Event, EventError, RevocationReason, Subscription, SubscriptionRevoked};
pub use message::{MessageType, WebhookMessage};
pub use replay::ReplayWindow;
pub use signature::{sign_message, verify_message, SignatureError};
