//! Endpoint methods. Each one only marshals its arguments into a [`Route`]
//! and hands it to the transport or to a [`Paginated`] stream.

use reqwest::Method;
use serde_json::json;

use crate::error::{HelixError, Result};
use crate::models::{ChannelFollower, ChannelFollowers, Clip, Commercial, DataList, Game, PartialUser, User, UserEmote};
use crate::paginate::{self, Paginated};
use crate::rest::HttpClient;
use crate::route::{Params, Route};
use crate::time::Time;

/// Filter for [`HttpClient::get_clips`]. Exactly one source is used.
#[derive(Debug, Clone)]
pub enum ClipSource {
    Broadcaster(String),
    Game(String),
    Ids(Vec<String>),
}

fn chatter(item: serde_json::Value, _page: &serde_json::Value) -> Result<PartialUser> {
    PartialUser::from_user_fields(&item)
        .ok_or_else(|| HelixError::MalformedResponse("chatter without user_id".to_string()))
}

impl HttpClient {
    /// Look up users by id and/or login
    pub async fn get_users(&self, ids: &[String], logins: &[String], token_for: Option<&str>) -> Result<Vec<User>> {
        let mut route = self.route(Method::GET, "users").token_for(token_for.unwrap_or_default());
        let mut params = Params::new();
        if !ids.is_empty() {
            params.insert("id".to_string(), ids.into());
        }
        if !logins.is_empty() {
            params.insert("login".to_string(), logins.into());
        }
        route.update_params(params, true);

        let users: DataList<User> = self.request_as(&route).await?;
        Ok(users.data)
    }

    /// Run a commercial on the broadcaster's channel
    pub async fn start_commercial(&self, broadcaster_id: &str, length: u32, token_for: &str) -> Result<Commercial> {
        let route = self
            .route(Method::POST, "channels/commercial")
            .with_json(json!({"broadcaster_id": broadcaster_id, "length": length}))
            .token_for(token_for);

        let mut response: DataList<Commercial> = self.request_as(&route).await?;
        if response.data.is_empty() {
            return Err(HelixError::MalformedResponse("empty commercial response".to_string()));
        }
        Ok(response.data.swap_remove(0))
    }

    /// Delete one chat message, or all of them when `message_id` is `None`
    pub async fn delete_chat_message(
        &self,
        broadcaster_id: &str,
        moderator_id: &str,
        token_for: &str,
        message_id: Option<&str>,
    ) -> Result<()> {
        let route = self
            .route(Method::DELETE, "moderation/chat")
            .with_param("broadcaster_id", broadcaster_id)
            .with_param("moderator_id", moderator_id)
            .with_param("message_id", message_id)
            .token_for(token_for);

        self.request_json(&route).await?;
        Ok(())
    }

    /// First page of a channel's followers plus a stream over all of them
    pub async fn get_channel_followers(
        &self,
        broadcaster_id: &str,
        user_id: Option<&str>,
        token_for: &str,
        first: u32,
    ) -> Result<(ChannelFollowers, Paginated<ChannelFollower>)> {
        let route = self
            .route(Method::GET, "channels/followers")
            .with_param("first", first)
            .with_param("broadcaster_id", broadcaster_id)
            .with_param("user_id", user_id)
            .token_for(token_for);

        let followers: ChannelFollowers = self.request_as(&route).await?;
        let stream = self.request_paginated(route, None, paginate::deserialize);
        Ok((followers, stream))
    }

    /// Users currently connected to the broadcaster's chat
    pub fn get_chatters(
        &self,
        broadcaster_id: &str,
        moderator_id: &str,
        token_for: &str,
        first: u32,
        max_results: Option<usize>,
    ) -> Paginated<PartialUser> {
        let route = self
            .route(Method::GET, "chat/chatters")
            .with_param("broadcaster_id", broadcaster_id)
            .with_param("moderator_id", moderator_id)
            .with_param("first", first)
            .token_for(token_for);

        self.request_paginated(route, max_results, chatter)
    }

    /// Users blocked by the broadcaster
    pub fn get_user_block_list(
        &self,
        broadcaster_id: &str,
        token_for: &str,
        first: u32,
        max_results: Option<usize>,
    ) -> Paginated<PartialUser> {
        let route = self
            .route(Method::GET, "users/blocks")
            .with_param("broadcaster_id", broadcaster_id)
            .with_param("first", first)
            .token_for(token_for);

        self.request_paginated(route, max_results, chatter)
    }

    /// Games sorted by current viewers
    pub fn get_top_games(&self, first: u32, token_for: Option<&str>, max_results: Option<usize>) -> Paginated<Game> {
        let route = self
            .route(Method::GET, "games/top")
            .with_param("first", first)
            .token_for(token_for.unwrap_or_default());

        self.request_paginated(route, max_results, paginate::deserialize)
    }

    /// Clips for a broadcaster, a game, or a set of clip ids
    pub fn get_clips(
        &self,
        source: ClipSource,
        first: u32,
        started_at: Option<Time>,
        ended_at: Option<Time>,
        is_featured: Option<bool>,
        max_results: Option<usize>,
    ) -> Paginated<Clip> {
        let route = self.route(Method::GET, "clips").with_param("first", first);
        let route = match source {
            ClipSource::Broadcaster(id) => route.with_param("broadcaster_id", id),
            ClipSource::Game(id) => route.with_param("game_id", id),
            ClipSource::Ids(ids) => route.with_param("id", ids),
        };
        let route = route
            .with_param("started_at", started_at.map(|t| t.to_rfc3339()))
            .with_param("ended_at", ended_at.map(|t| t.to_rfc3339()))
            .with_param("is_featured", is_featured);

        self.request_paginated(route, max_results, paginate::deserialize)
    }

    /// Emotes the user can use, with image templates resolved per page
    pub fn get_user_emotes(
        &self,
        user_id: &str,
        token_for: &str,
        broadcaster_id: Option<&str>,
        max_results: Option<usize>,
    ) -> Paginated<UserEmote> {
        let route: Route = self
            .route(Method::GET, "chat/emotes/user")
            .with_param("user_id", user_id)
            .with_param("broadcaster_id", broadcaster_id)
            .token_for(token_for);

        self.request_paginated(route, max_results, UserEmote::from_page_item)
    }
}
