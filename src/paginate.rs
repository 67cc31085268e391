//! Cursor-based result streams for list endpoints.
//!
//! A [`Paginated`] owns its [`Route`] and fetches one page at a time, each
//! fetch injecting the cursor from the previous page as `after`. Items are
//! converted as soon as a page arrives and handed out in server order.
//!
//! ```no_run
//! # async fn run(client: helix_client::HttpClient) -> helix_client::Result<()> {
//! use helix_client::Method;
//!
//! let route = client.route(Method::GET, "games/top").with_param("first", 100);
//! let mut games = client.request_paginated(route, Some(250), |item, _page| Ok(item));
//!
//! while let Some(game) = games.next().await? {
//!     println!("{}", game["name"]);
//! }
//! # Ok(())
//! # }
//! ```

use futures::future::BoxFuture;
use futures::stream::{self, Stream};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::VecDeque;
use std::future::IntoFuture;
use tracing::debug;

use crate::error::{HelixError, Result};
use crate::response::Page;
use crate::rest::HttpClient;
use crate::route::{ParamValue, Params, Route};

/// Page size the API uses when `first` is not given
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Converts one raw item into `T`. Receives the whole raw page as well, for
/// items that depend on page-level fields.
pub type Converter<T> = Box<dyn Fn(Value, &Value) -> Result<T> + Send + Sync>;

/// Converter that deserializes each item into `T`
pub fn deserialize<T: DeserializeOwned>(item: Value, _page: &Value) -> Result<T> {
    Ok(serde_json::from_value(item)?)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Cursor {
    Unset,
    At(String),
    Exhausted,
}

/// Lazily fetched, cursor-paginated list of `T`
pub struct Paginated<T> {
    http: HttpClient,
    route: Route,
    cursor: Cursor,
    first: u64,
    remaining: Option<i64>,
    converter: Converter<T>,
    buffer: VecDeque<T>,
}

impl<T> Paginated<T> {
    /// Create a stream over `route`, yielding at most `max_results` items
    /// when a budget is given. The requested page size is lowered to the
    /// budget if it would exceed it.
    pub fn new<F>(http: HttpClient, mut route: Route, max_results: Option<usize>, converter: F) -> Self
    where
        F: Fn(Value, &Value) -> Result<T> + Send + Sync + 'static,
    {
        let mut first = match route.params().get("first") {
            Some(ParamValue::Value(v)) => v.parse().unwrap_or(DEFAULT_PAGE_SIZE),
            _ => DEFAULT_PAGE_SIZE,
        };

        if let Some(max) = max_results {
            let max = max as u64;
            if max < first {
                first = max;
                let mut params = Params::new();
                params.insert("first".to_string(), first.into());
                route.update_params(params, true);
            }
        }

        Paginated {
            http,
            route,
            cursor: Cursor::Unset,
            first,
            remaining: max_results.map(|m| m as i64),
            converter: Box::new(converter),
            buffer: VecDeque::new(),
        }
    }

    /// The route used for page fetches, including the latest cursor
    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Page size requested from the server
    pub fn page_size(&self) -> u64 {
        self.first
    }

    /// Items left in the budget, `None` when unbounded
    pub fn remaining(&self) -> Option<i64> {
        self.remaining
    }

    /// Number of converted items waiting to be handed out
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// True once no further page will be fetched
    pub fn is_exhausted(&self) -> bool {
        self.cursor == Cursor::Exhausted || matches!(self.remaining, Some(n) if n <= 0)
    }

    /// Fetch one page into the buffer. Does nothing once the cursor is
    /// exhausted or the budget is spent.
    async fn advance(&mut self) -> Result<()> {
        let after = match &self.cursor {
            Cursor::Exhausted => return Ok(()),
            Cursor::Unset => ParamValue::Null,
            Cursor::At(cursor) => ParamValue::Value(cursor.clone()),
        };

        if matches!(self.remaining, Some(n) if n <= 0) {
            return Ok(());
        }

        let mut params = Params::new();
        params.insert("after".to_string(), after);
        self.route.update_params(params, true);

        let raw = self.http.request_json(&self.route).await?;
        if !raw.is_object() {
            return Err(HelixError::MalformedResponse(format!(
                "expected a page object from {}",
                self.route
            )));
        }

        let mut page = Page::from_value(&raw)?;
        self.cursor = match page.cursor() {
            Some(cursor) => Cursor::At(cursor.to_string()),
            None => Cursor::Exhausted,
        };

        let items = page.take_items()?;
        debug!(
            route = %self.route,
            items = items.len(),
            exhausted = self.cursor == Cursor::Exhausted,
            "fetched page"
        );

        for item in items {
            if let Some(remaining) = self.remaining.as_mut() {
                *remaining -= 1;
                if *remaining < 0 {
                    break;
                }
            }

            let converted = (self.converter)(item, &raw)?;
            self.buffer.push_back(converted);
        }

        Ok(())
    }

    /// Get the next item, fetching a page when the buffer is empty.
    /// Returns `Ok(None)` once a fetch produces nothing.
    pub async fn next(&mut self) -> Result<Option<T>> {
        if self.buffer.is_empty() {
            self.advance().await?;
        }

        Ok(self.buffer.pop_front())
    }

    /// Return the buffered items, fetching a single page first if the buffer
    /// is empty. This does not drain the remaining pages.
    pub async fn flatten(mut self) -> Result<Vec<T>> {
        if self.buffer.is_empty() {
            self.advance().await?;
        }

        Ok(self.buffer.into_iter().collect())
    }

    /// Adapt into a `Stream`. The stream ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<T>> + Send
    where
        T: Send + 'static,
    {
        stream::try_unfold(self, |mut pages| async move {
            let item = pages.next().await?;
            Ok(item.map(|item| (item, pages)))
        })
    }
}

impl<T: Send + 'static> IntoFuture for Paginated<T> {
    type Output = Result<Vec<T>>;
    type IntoFuture = BoxFuture<'static, Result<Vec<T>>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.flatten())
    }
}

impl<T> std::fmt::Debug for Paginated<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginated")
            .field("route", &self.route)
            .field("cursor", &self.cursor)
            .field("first", &self.first)
            .field("remaining", &self.remaining)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}
