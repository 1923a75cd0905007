//! Read-only view of the current HTTP request
//!
//! The host framework exposes its request through [`RequestSource`]. Every
//! accessor is fallible: a request that is only partially available must not
//! prevent an event from being reported.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestAccessError {
    #[error("Request field unavailable: {0}")]
    Unavailable(&'static str),

    #[error("Failed to decode request body: {0}")]
    Decode(String),
}

/// Ordered header list with case-insensitive lookup
///
/// Names keep the casing they arrived with; duplicates are allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// First value for `name`, compared case-insensitively
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// One entry per name, repeated values joined with `, `
    ///
    /// Names compare case-insensitively; the first spelling seen is kept.
    pub fn combined(&self) -> Vec<(&str, String)> {
        let mut combined: Vec<(&str, String)> = Vec::with_capacity(self.0.len());
        for (name, value) in &self.0 {
            match combined.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
                Some((_, joined)) => {
                    joined.push_str(", ");
                    joined.push_str(value);
                }
                None => combined.push((name.as_str(), value.clone())),
            }
        }
        combined
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let combined = self.combined();
        let mut map = serializer.serialize_map(Some(combined.len()))?;
        for (name, value) in &combined {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HeadersVisitor;

        impl<'de> Visitor<'de> for HeadersVisitor {
            type Value = Headers;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of header names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Headers, A::Error> {
                let mut headers = Headers::new();
                while let Some((name, value)) = access.next_entry::<String, String>()? {
                    headers.push(name, value);
                }
                Ok(headers)
            }
        }

        deserializer.deserialize_map(HeadersVisitor)
    }
}

/// Accessors the host framework provides for the current request
pub trait RequestSource: Send + Sync {
    fn method(&self) -> Result<String, RequestAccessError>;

    /// Request URL as seen by the application (path and query)
    fn url(&self) -> Result<String, RequestAccessError>;

    fn query_string(&self) -> Result<String, RequestAccessError>;

    fn headers(&self) -> Result<Headers, RequestAccessError>;

    fn cookies(&self) -> Result<BTreeMap<String, String>, RequestAccessError>;

    fn raw_body(&self) -> Result<String, RequestAccessError>;

    /// Body decoded into structured parameters
    fn decoded_body_params(&self) -> Result<serde_json::Value, RequestAccessError>;

    /// Identifier of the resolved route, if routing has happened
    fn route_id(&self) -> Option<String> {
        None
    }
}
