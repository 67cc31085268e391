//! Request descriptors.
//!
//! A [`Route`] describes exactly one HTTP call: method, target host and path,
//! query parameters, JSON body, header overrides and the id of the user whose
//! token authorizes it. The full URL is computed when the route is built and
//! recomputed whenever the parameters change.

use indexmap::IndexMap;
use reqwest::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use url::form_urlencoded;

use crate::client::{API_BASE, ID_BASE};

/// Ordered query parameter mapping. Iteration order is insertion order,
/// which keeps the generated URL deterministic.
pub type Params = IndexMap<String, ParamValue>;

/// A single query parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// A scalar value
    Value(String),
    /// An ordered sequence of values, encoded according to the route's [`ArrayMode`]
    List(Vec<String>),
    /// An absent value. Never written to the URL.
    Null,
}

impl ParamValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Value(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Value(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        ParamValue::Value(value.clone())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Value(value.to_string())
    }
}

macro_rules! impl_param_from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for ParamValue {
            fn from(value: $ty) -> Self {
                ParamValue::Value(value.to_string())
            }
        })*
    };
}

impl_param_from_int!(i32, i64, u32, u64, usize);

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        ParamValue::List(values)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(values: Vec<&str>) -> Self {
        ParamValue::List(values.into_iter().map(str::to_string).collect())
    }
}

impl From<&[String]> for ParamValue {
    fn from(values: &[String]) -> Self {
        ParamValue::List(values.to_vec())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ParamValue::Null)
    }
}

/// How sequence values are written to the query string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayMode {
    /// `key=a&key=b`
    #[default]
    Repeat,
    /// `key=a+b`
    Joined,
}

/// Describes a single API call
#[derive(Debug, Clone)]
pub struct Route {
    method: Method,
    path: String,
    params: Params,
    json: Option<Value>,
    headers: HashMap<String, String>,
    token_for: String,
    use_identity_host: bool,
    array_mode: ArrayMode,
    base: String,
    base_url: String,
    url: String,
}

impl Route {
    /// Create a route against the primary API host
    pub fn new(method: Method, path: &str) -> Self {
        Self::build(method, path, false)
    }

    /// Create a route against the identity host. Sequence values are joined
    /// with `+` there, as the OAuth endpoints expect.
    pub fn identity(method: Method, path: &str) -> Self {
        Self::build(method, path, true)
    }

    fn build(method: Method, path: &str, use_identity_host: bool) -> Self {
        let mut route = Route {
            method,
            path: path.to_string(),
            params: Params::new(),
            json: None,
            headers: HashMap::new(),
            token_for: String::new(),
            use_identity_host,
            array_mode: if use_identity_host {
                ArrayMode::Joined
            } else {
                ArrayMode::Repeat
            },
            base: if use_identity_host { ID_BASE } else { API_BASE }.to_string(),
            base_url: String::new(),
            url: String::new(),
        };
        route.build_url(true);
        route
    }

    /// Point the route at a different base host
    pub fn with_base(mut self, base: &str) -> Self {
        self.base = base.to_string();
        if !self.base.ends_with('/') {
            self.base.push('/');
        }
        self.build_url(true);
        self
    }

    /// Add a single query parameter
    pub fn with_param(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self.build_url(true);
        self
    }

    /// Add several query parameters
    pub fn with_params<K, V, I>(mut self, params: I) -> Self
    where
        K: Into<String>,
        V: Into<ParamValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self.build_url(true);
        self
    }

    /// Set the JSON body
    pub fn with_json(mut self, json: Value) -> Self {
        self.json = Some(json);
        self
    }

    /// Add a header override
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    /// Set the id of the user whose token should authorize this call
    pub fn token_for(mut self, user_id: impl Into<String>) -> Self {
        self.token_for = user_id.into();
        self
    }

    /// Choose how sequence parameters are encoded
    pub fn with_array_mode(mut self, mode: ArrayMode) -> Self {
        self.array_mode = mode;
        self.build_url(true);
        self
    }

    /// Merge parameters into the existing ones and rebuild the URL.
    ///
    /// Keys whose value is [`ParamValue::Null`] are never written to the URL.
    /// With `remove_none` they are also dropped from the parameter map.
    pub fn update_params(&mut self, params: Params, remove_none: bool) -> &str {
        self.params.extend(params);
        self.build_url(remove_none);
        &self.url
    }

    fn build_url(&mut self, remove_none: bool) {
        self.path = self.path.trim_matches('/').to_string();
        self.base_url = format!("{}{}", self.base, self.path);

        if remove_none {
            self.params.retain(|_, value| !value.is_null());
        }

        let mut pairs: Vec<String> = Vec::with_capacity(self.params.len());
        for (key, value) in &self.params {
            let key = encode(key);
            match value {
                ParamValue::Null => continue,
                ParamValue::Value(v) => pairs.push(format!("{}={}", key, encode(v))),
                ParamValue::List(values) => match self.array_mode {
                    ArrayMode::Repeat => {
                        pairs.extend(values.iter().map(|v| format!("{}={}", key, encode(v))));
                    }
                    ArrayMode::Joined => {
                        // `+` separates elements, so spaces inside one become `%20`
                        let joined: Vec<String> = values
                            .iter()
                            .map(|v| encode(v).replace('+', "%20"))
                            .collect();
                        pairs.push(format!("{}={}", key, joined.join("+")));
                    }
                },
            }
        }

        self.url = if pairs.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}?{}", self.base_url, pairs.join("&"))
        };
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The full URL including the query string
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The URL without the query string
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn json(&self) -> Option<&Value> {
        self.json.as_ref()
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn token_id(&self) -> &str {
        &self.token_for
    }

    pub fn uses_identity_host(&self) -> bool {
        self.use_identity_host
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.method, self.base_url)
    }
}

/// Percent-encode a query component, writing spaces as `+`
pub fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
