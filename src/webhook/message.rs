use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::time::Time;

pub const MESSAGE_TYPE: &str = "Twitch-Eventsub-Message-Type";
pub const MESSAGE_ID: &str = "Twitch-Eventsub-Message-Id";
pub const MESSAGE_TIMESTAMP: &str = "Twitch-Eventsub-Message-Timestamp";
pub const MESSAGE_SIGNATURE: &str = "Twitch-Eventsub-Message-Signature";

/// Kind of an inbound EventSub message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Ownership check sent when a subscription is created
    Verification,
    Notification,
    Revocation,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Verification => "webhook_callback_verification",
            MessageType::Notification => "notification",
            MessageType::Revocation => "revocation",
        }
    }
}

impl FromStr for MessageType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "webhook_callback_verification" => Ok(MessageType::Verification),
            "notification" => Ok(MessageType::Notification),
            "revocation" => Ok(MessageType::Revocation),
            _ => Err(()),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message that passed validation
#[derive(Debug, Clone)]
pub struct WebhookMessage {
    pub kind: MessageType,
    pub id: String,
    /// When Twitch sent the message
    pub timestamp: Time,
    pub payload: Value,
}
