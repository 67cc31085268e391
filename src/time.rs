use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::ops::Deref;
use std::str::FromStr;

use crate::error::{HelixError, Result};

/// Timestamp type that wraps chrono::DateTime and serializes as the RFC 3339
/// strings used throughout the API and in webhook headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(pub DateTime<Utc>);

impl Time {
    /// Create a new Time from a DateTime
    pub fn new(dt: DateTime<Utc>) -> Self {
        Time(dt)
    }

    /// Parse an RFC 3339 timestamp, e.g. `2019-11-16T10:11:12.634234626Z`
    pub fn parse(value: &str) -> Result<Self> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| Time(dt.with_timezone(&Utc)))
            .map_err(|e| HelixError::Other(format!("invalid timestamp {:?}: {}", value, e)))
    }

    /// Time elapsed between this instant and `now`. Negative when in the future.
    pub fn age_at(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.0
    }

    /// Get the unix timestamp in seconds
    pub fn unix(&self) -> i64 {
        self.0.timestamp()
    }

    /// RFC 3339 string with nanosecond precision and a `Z` suffix
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

impl Deref for Time {
    type Target = DateTime<Utc>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<DateTime<Utc>> for Time {
    fn from(dt: DateTime<Utc>) -> Self {
        Time(dt)
    }
}

impl From<Time> for DateTime<Utc> {
    fn from(t: Time) -> Self {
        t.0
    }
}

impl FromStr for Time {
    type Err = HelixError;

    fn from_str(s: &str) -> Result<Self> {
        Time::parse(s)
    }
}

impl Serialize for Time {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Time {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Time::parse(&raw).map_err(serde::de::Error::custom)
    }
}
