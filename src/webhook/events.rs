//! Typed EventSub events.
//!
//! Notifications carry a `subscription` block and an untyped `event` object.
//! [`Event::from_notification`] picks the concrete type from the
//! subscription type and decodes the event into it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::PartialUser;
use crate::time::Time;

/// Subscription metadata included with every message. Only `type` is
/// required; the rest defaults when Twitch leaves it out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub cost: u64,
    #[serde(default)]
    pub condition: Value,
    #[serde(default)]
    pub transport: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Time>,
}

/// Body of a `notification` message
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationPayload {
    pub subscription: Subscription,
    pub event: Value,
}

/// Body of a `revocation` message
#[derive(Debug, Clone, Deserialize)]
pub struct RevocationPayload {
    pub subscription: Subscription,
}

/// Why a subscription was revoked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevocationReason {
    UserRemoved,
    AuthorizationRevoked,
    NotificationFailuresExceeded,
    VersionRemoved,
    Other(String),
}

impl RevocationReason {
    pub fn from_status(status: &str) -> Self {
        match status {
            "user_removed" => RevocationReason::UserRemoved,
            "authorization_revoked" => RevocationReason::AuthorizationRevoked,
            "notification_failures_exceeded" => RevocationReason::NotificationFailuresExceeded,
            "version_removed" => RevocationReason::VersionRemoved,
            other => RevocationReason::Other(other.to_string()),
        }
    }
}

/// Notice that the platform revoked a subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRevoked {
    pub subscription: Subscription,
    pub reason: RevocationReason,
}

impl SubscriptionRevoked {
    pub fn new(subscription: Subscription) -> Self {
        let reason = RevocationReason::from_status(&subscription.status);
        SubscriptionRevoked { subscription, reason }
    }
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("unhandled subscription type: {0}")]
    Unknown(String),
    #[error("failed to decode event: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelFollow {
    pub user_id: String,
    pub user_login: String,
    pub user_name: String,
    pub broadcaster_user_id: String,
    pub broadcaster_user_login: String,
    pub broadcaster_user_name: String,
    pub followed_at: Time,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamOnline {
    pub id: String,
    pub broadcaster_user_id: String,
    pub broadcaster_user_login: String,
    pub broadcaster_user_name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub started_at: Time,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamOffline {
    pub broadcaster_user_id: String,
    pub broadcaster_user_login: String,
    pub broadcaster_user_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelUpdate {
    pub broadcaster_user_id: String,
    pub broadcaster_user_login: String,
    pub broadcaster_user_name: String,
    pub title: String,
    pub language: String,
    pub category_id: String,
    pub category_name: String,
    #[serde(default)]
    pub content_classification_labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSubscribe {
    pub user_id: String,
    pub user_login: String,
    pub user_name: String,
    pub broadcaster_user_id: String,
    pub broadcaster_user_login: String,
    pub broadcaster_user_name: String,
    pub tier: String,
    pub is_gift: bool,
}

/// Cheer event. User fields are absent for anonymous cheers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelCheer {
    pub is_anonymous: bool,
    pub user_id: Option<String>,
    pub user_login: Option<String>,
    pub user_name: Option<String>,
    pub broadcaster_user_id: String,
    pub broadcaster_user_login: String,
    pub broadcaster_user_name: String,
    pub message: String,
    pub bits: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRaid {
    pub from_broadcaster_user_id: String,
    pub from_broadcaster_user_login: String,
    pub from_broadcaster_user_name: String,
    pub to_broadcaster_user_id: String,
    pub to_broadcaster_user_login: String,
    pub to_broadcaster_user_name: String,
    pub viewers: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelBan {
    pub user_id: String,
    pub user_login: String,
    pub user_name: String,
    pub broadcaster_user_id: String,
    pub broadcaster_user_login: String,
    pub broadcaster_user_name: String,
    pub moderator_user_id: String,
    pub moderator_user_login: String,
    pub moderator_user_name: String,
    #[serde(default)]
    pub reason: String,
    pub banned_at: Time,
    pub ends_at: Option<Time>,
    pub is_permanent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedemptionReward {
    pub id: String,
    pub title: String,
    pub cost: u64,
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelPointsRedemptionAdd {
    pub id: String,
    pub broadcaster_user_id: String,
    pub broadcaster_user_login: String,
    pub broadcaster_user_name: String,
    pub user_id: String,
    pub user_login: String,
    pub user_name: String,
    #[serde(default)]
    pub user_input: String,
    pub status: String,
    pub reward: RedemptionReward,
    pub redeemed_at: Time,
}

/// A decoded notification event
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ChannelFollow(ChannelFollow),
    StreamOnline(StreamOnline),
    StreamOffline(StreamOffline),
    ChannelUpdate(ChannelUpdate),
    ChannelSubscribe(ChannelSubscribe),
    ChannelCheer(ChannelCheer),
    ChannelRaid(ChannelRaid),
    ChannelBan(ChannelBan),
    ChannelPointsRedemptionAdd(ChannelPointsRedemptionAdd),
}

fn decode<T: DeserializeOwned>(event: Value) -> Result<T, EventError> {
    Ok(serde_json::from_value(event)?)
}

impl Event {
    /// Decode `event` into the type registered for `subscription_type`
    pub fn from_notification(subscription_type: &str, event: Value) -> Result<Self, EventError> {
        let event = match subscription_type {
            "channel.follow" => Event::ChannelFollow(decode(event)?),
            "stream.online" => Event::StreamOnline(decode(event)?),
            "stream.offline" => Event::StreamOffline(decode(event)?),
            "channel.update" => Event::ChannelUpdate(decode(event)?),
            "channel.subscribe" => Event::ChannelSubscribe(decode(event)?),
            "channel.cheer" => Event::ChannelCheer(decode(event)?),
            "channel.raid" => Event::ChannelRaid(decode(event)?),
            "channel.ban" => Event::ChannelBan(decode(event)?),
            "channel.channel_points_custom_reward_redemption.add" => {
                Event::ChannelPointsRedemptionAdd(decode(event)?)
            }
            other => return Err(EventError::Unknown(other.to_string())),
        };
        Ok(event)
    }

    pub fn subscription_type(&self) -> &'static str {
        match self {
            Event::ChannelFollow(_) => "channel.follow",
            Event::StreamOnline(_) => "stream.online",
            Event::StreamOffline(_) => "stream.offline",
            Event::ChannelUpdate(_) => "channel.update",
            Event::ChannelSubscribe(_) => "channel.subscribe",
            Event::ChannelCheer(_) => "channel.cheer",
            Event::ChannelRaid(_) => "channel.raid",
            Event::ChannelBan(_) => "channel.ban",
            Event::ChannelPointsRedemptionAdd(_) => "channel.channel_points_custom_reward_redemption.add",
        }
    }

    /// The broadcaster whose channel the event belongs to. Raids report the
    /// receiving channel.
    pub fn broadcaster(&self) -> PartialUser {
        let (id, login) = match self {
            Event::ChannelFollow(e) => (&e.broadcaster_user_id, &e.broadcaster_user_login),
            Event::StreamOnline(e) => (&e.broadcaster_user_id, &e.broadcaster_user_login),
            Event::StreamOffline(e) => (&e.broadcaster_user_id, &e.broadcaster_user_login),
            Event::ChannelUpdate(e) => (&e.broadcaster_user_id, &e.broadcaster_user_login),
            Event::ChannelSubscribe(e) => (&e.broadcaster_user_id, &e.broadcaster_user_login),
            Event::ChannelCheer(e) => (&e.broadcaster_user_id, &e.broadcaster_user_login),
            Event::ChannelRaid(e) => (&e.to_broadcaster_user_id, &e.to_broadcaster_user_login),
            Event::ChannelBan(e) => (&e.broadcaster_user_id, &e.broadcaster_user_login),
            Event::ChannelPointsRedemptionAdd(e) => (&e.broadcaster_user_id, &e.broadcaster_user_login),
        };
        PartialUser::new(id.clone(), Some(login.clone()))
    }
}

/// Name an event is dispatched under, e.g. `channel.follow` becomes
/// `channel_follow` and `channel.channel_points_...` drops the doubled prefix.
pub fn event_name(subscription_type: &str) -> String {
    subscription_type
        .replace("channel.channel_", "channel.")
        .replace('.', "_")
}
