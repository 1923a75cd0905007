//! Owned request snapshot source
//!
//! [`HttpRequest`] is the plain-data implementation of [`RequestSource`]. Hosts
//! built on the `http` crate (axum, hyper, tower) can build one from request
//! parts; tests and the replay tool deserialize it from fixtures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::request::{Headers, RequestAccessError, RequestSource};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub query_string: String,
    pub headers: Headers,
    pub cookies: BTreeMap<String, String>,
    pub raw_body: String,
    /// Pre-decoded body parameters; decoded from `raw_body` when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoded_params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_id: Option<String>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        let query_string = url
            .split_once('?')
            .map(|(_, q)| q.to_string())
            .unwrap_or_default();
        Self {
            method: method.into().to_ascii_uppercase(),
            url,
            query_string,
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(name, value);
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, raw_body: impl Into<String>) -> Self {
        self.raw_body = raw_body.into();
        self
    }

    pub fn with_route(mut self, route_id: impl Into<String>) -> Self {
        self.route_id = Some(route_id.into());
        self
    }

    /// Build from `http` request parts and the buffered body
    pub fn from_http(parts: &http::request::Parts, body: &[u8]) -> Self {
        let headers: Headers = parts
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let mut cookies = BTreeMap::new();
        for header in parts.headers.get_all(http::header::COOKIE) {
            let Ok(raw) = header.to_str() else {
                continue;
            };
            for cookie in cookie::Cookie::split_parse(raw).flatten() {
                cookies.insert(cookie.name().to_string(), cookie.value().to_string());
            }
        }

        let url = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());

        Self {
            method: parts.method.as_str().to_string(),
            url,
            query_string: parts.uri.query().unwrap_or_default().to_string(),
            headers,
            cookies,
            raw_body: String::from_utf8_lossy(body).into_owned(),
            decoded_params: None,
            route_id: None,
        }
    }

    fn decode_body(&self) -> Result<Value, RequestAccessError> {
        if self.raw_body.is_empty() {
            return Ok(Value::Object(Map::new()));
        }

        let content_type = self
            .headers
            .get("content-type")
            .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase());

        match content_type.as_deref() {
            Some("application/json") => serde_json::from_str(&self.raw_body)
                .map_err(|e| RequestAccessError::Decode(e.to_string())),
            Some("application/x-www-form-urlencoded") => {
                let pairs: Vec<(String, String)> = serde_urlencoded::from_str(&self.raw_body)
                    .map_err(|e| RequestAccessError::Decode(e.to_string()))?;
                let mut params = Value::Object(Map::new());
                for (key, value) in pairs {
                    insert_form_field(&mut params, &split_form_key(&key), Value::String(value));
                }
                Ok(params)
            }
            _ => Ok(Value::Object(Map::new())),
        }
    }
}

/// Split `user[card][number]` into `["user", "card", "number"]`
///
/// `[]` yields an empty segment. Keys that are not well formed stay whole.
fn split_form_key(key: &str) -> Vec<&str> {
    let Some(open) = key.find('[').filter(|open| *open > 0) else {
        return vec![key];
    };

    let mut segments = vec![&key[..open]];
    let mut rest = &key[open..];
    while let Some(inner) = rest.strip_prefix('[') {
        let Some(close) = inner.find(']') else {
            return vec![key];
        };
        segments.push(&inner[..close]);
        rest = &inner[close + 1..];
    }
    if !rest.is_empty() {
        return vec![key];
    }
    segments
}

fn insert_form_field(node: &mut Value, segments: &[&str], value: Value) {
    let Some((segment, tail)) = segments.split_first() else {
        *node = value;
        return;
    };

    if segment.is_empty() {
        if !node.is_array() {
            *node = Value::Array(Vec::new());
        }
        if let Value::Array(items) = node {
            items.push(Value::Null);
            if let Some(last) = items.last_mut() {
                insert_form_field(last, tail, value);
            }
        }
        return;
    }

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(fields) = node {
        let child = fields.entry(segment.to_string()).or_insert(Value::Null);
        insert_form_field(child, tail, value);
    }
}

impl RequestSource for HttpRequest {
    fn method(&self) -> Result<String, RequestAccessError> {
        if self.method.is_empty() {
            return Err(RequestAccessError::Unavailable("method"));
        }
        Ok(self.method.clone())
    }

    fn url(&self) -> Result<String, RequestAccessError> {
        Ok(self.url.clone())
    }

    fn query_string(&self) -> Result<String, RequestAccessError> {
        Ok(self.query_string.clone())
    }

    fn headers(&self) -> Result<Headers, RequestAccessError> {
        Ok(self.headers.clone())
    }

    fn cookies(&self) -> Result<BTreeMap<String, String>, RequestAccessError> {
        Ok(self.cookies.clone())
    }

    fn raw_body(&self) -> Result<String, RequestAccessError> {
        Ok(self.raw_body.clone())
    }

    fn decoded_body_params(&self) -> Result<Value, RequestAccessError> {
        match &self.decoded_params {
            Some(params) => Ok(params.clone()),
            None => self.decode_body(),
        }
    }

    fn route_id(&self) -> Option<String> {
        self.route_id.clone()
    }
}
