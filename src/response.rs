use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{HelixError, Result};

/// Decoded body of a single API response
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The server answered with a JSON content type
    Json(Value),
    /// Any other content type
    Text(String),
    /// 204 No Content
    NoContent,
}

impl Payload {
    /// Require a structured JSON value. No content maps to `Value::Null`.
    pub fn into_json(self) -> Result<Value> {
        match self {
            Payload::Json(value) => Ok(value),
            Payload::NoContent => Ok(Value::Null),
            Payload::Text(_) => Err(HelixError::TypeMismatch(
                "expected JSON data, but received text data".to_string(),
            )),
        }
    }

    /// Get a value from a JSON payload by a slash-separated path.
    /// For example, "data/0/login" reads the login of the first item.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let Payload::Json(root) = self else {
            return None;
        };

        let mut current = root;
        for part in path.split('/').filter(|s| !s.is_empty()) {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(arr) => arr.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        Some(current)
    }

    /// Get a string value by a slash-separated path
    pub fn get_string(&self, path: &str) -> Option<String> {
        self.get(path).and_then(|v| v.as_str().map(str::to_string))
    }
}

/// Pagination block attached to list responses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// One page of a list endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Items of this page. `None` when the payload had no `data` field.
    #[serde(default)]
    pub data: Option<Vec<Value>>,

    #[serde(default)]
    pub pagination: Option<Pagination>,

    /// Total count, reported by a few endpoints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl Page {
    /// Decode a page from a raw JSON value
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(Page::deserialize(value)?)
    }

    /// Cursor for the next page, if the server reported one
    pub fn cursor(&self) -> Option<&str> {
        self.pagination
            .as_ref()
            .and_then(|p| p.cursor.as_deref())
            .filter(|c| !c.is_empty())
    }

    /// Take the item list, failing when it is missing
    pub fn take_items(&mut self) -> Result<Vec<Value>> {
        self.data
            .take()
            .ok_or_else(|| HelixError::MalformedResponse("expected \"data\" key not found".to_string()))
    }
}
