//! Typed records for endpoint responses.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::time::Time;

/// Minimal data about a user: an id and, usually, a login
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartialUser {
    pub id: String,
    pub name: Option<String>,
}

impl PartialUser {
    pub fn new(id: impl Into<String>, name: Option<String>) -> Self {
        PartialUser {
            id: id.into(),
            name,
        }
    }

    /// Build from an item carrying `user_id` / `user_login` fields
    pub fn from_user_fields(item: &Value) -> Option<Self> {
        let id = item.get("user_id")?.as_str()?;
        let name = item.get("user_login").and_then(Value::as_str).map(str::to_string);
        Some(PartialUser::new(id, name))
    }
}

/// Full user record from `GET users`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub login: String,
    pub display_name: String,
    #[serde(rename = "type", default)]
    pub user_type: String,
    #[serde(default)]
    pub broadcaster_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub profile_image_url: String,
    #[serde(default)]
    pub offline_image_url: String,
    #[serde(default)]
    pub email: Option<String>,
    pub created_at: Time,
}

/// A follower of a channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelFollower {
    pub user_id: String,
    pub user_login: String,
    pub user_name: String,
    pub followed_at: Time,
}

impl ChannelFollower {
    pub fn user(&self) -> PartialUser {
        PartialUser::new(self.user_id.clone(), Some(self.user_login.clone()))
    }
}

/// First page of followers together with the reported total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelFollowers {
    #[serde(default)]
    pub total: u64,
    pub data: Vec<ChannelFollower>,
}

/// A game or category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub box_art_url: String,
    #[serde(default)]
    pub igdb_id: String,
}

/// A clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub id: String,
    pub url: String,
    pub broadcaster_id: String,
    pub broadcaster_name: String,
    pub creator_id: String,
    pub creator_name: String,
    #[serde(default)]
    pub video_id: String,
    pub game_id: String,
    pub title: String,
    pub view_count: u64,
    pub created_at: Time,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub is_featured: bool,
}

/// An emote available to a user. The image URL is derived from the
/// page-level template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEmote {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub emote_type: String,
    #[serde(default)]
    pub emote_set_id: String,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub format: Vec<String>,
    #[serde(default)]
    pub scale: Vec<String>,
    #[serde(default)]
    pub theme_mode: Vec<String>,
    #[serde(default)]
    pub template: String,
}

impl UserEmote {
    /// Decode an item, attaching the template from the raw page
    pub fn from_page_item(item: Value, page: &Value) -> Result<Self> {
        let mut emote: UserEmote = serde_json::from_value(item)?;
        if let Some(template) = page.get("template").and_then(Value::as_str) {
            emote.template = template.to_string();
        }
        Ok(emote)
    }

    /// Fill the template's placeholders
    pub fn url(&self, format: &str, theme_mode: &str, scale: &str) -> String {
        self.template
            .replace("{{id}}", &self.id)
            .replace("{{format}}", format)
            .replace("{{theme_mode}}", theme_mode)
            .replace("{{scale}}", scale)
    }
}

/// Result of starting a commercial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commercial {
    pub length: u32,
    #[serde(default)]
    pub message: String,
    pub retry_after: u32,
}

/// Envelope used by endpoints returning `{"data": [...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataList<T> {
    pub data: Vec<T>,
}
