//! Outbound event envelope
//!
//! Serializes to the JSON event shape accepted by Sentry-compatible
//! ingestion endpoints.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::snapshot::RequestSnapshot;

/// External event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreadcrumbType {
    Default,
    Navigation,
    Http,
    User,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breadcrumb {
    #[serde(rename = "type")]
    pub ty: BreadcrumbType,
    pub level: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl Breadcrumb {
    pub fn new(ty: BreadcrumbType, level: Severity) -> Self {
        Self {
            ty,
            level,
            category: None,
            message: None,
            data: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

impl UserContext {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ip_address: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// File name relative to the stripped prefix
    pub filename: String,
    pub abs_path: String,
    pub lineno: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_app: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stacktrace {
    pub frames: Vec<Frame>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exception {
    #[serde(rename = "type")]
    pub ty: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<Stacktrace>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionList {
    /// Chained exceptions, root cause first
    pub values: Vec<Exception>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub formatted: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Breadcrumbs {
    pub values: Vec<Breadcrumb>,
}

/// A single captured event, ready for the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub level: Severity,
    pub platform: String,
    pub environment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestSnapshot>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub extra: BTreeMap<String, Value>,
    #[serde(default)]
    pub breadcrumbs: Breadcrumbs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserContext>,
}

impl Event {
    pub fn new(level: Severity, environment: impl Into<String>) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().simple().to_string(),
            timestamp: Utc::now(),
            level,
            platform: "native".to_string(),
            environment: environment.into(),
            message: None,
            exception: None,
            request: None,
            tags: BTreeMap::new(),
            extra: BTreeMap::new(),
            breadcrumbs: Breadcrumbs::default(),
            user: None,
        }
    }

    pub fn is_exception(&self) -> bool {
        self.exception.is_some()
    }

    /// Frames of every exception in the chain
    pub fn frames_mut(&mut self) -> impl Iterator<Item = &mut Frame> + '_ {
        self.exception
            .iter_mut()
            .flat_map(|list| list.values.iter_mut())
            .filter_map(|exc| exc.stacktrace.as_mut())
            .flat_map(|trace| trace.frames.iter_mut())
    }
}
