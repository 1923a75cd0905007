//! Log records produced by the host logging facility
//!
//! A request accumulates any number of records; at teardown they are reduced
//! into a single reportable event.

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Level of a log record
///
/// Numeric values follow the host logger: a lower value is more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Trace,
    Profile,
    ProfileBegin,
    ProfileEnd,
    /// A raw level outside the known enumeration
    Unknown(u32),
}

impl LogLevel {
    pub const ALL: [LogLevel; 7] = [
        LogLevel::Error,
        LogLevel::Warning,
        LogLevel::Info,
        LogLevel::Trace,
        LogLevel::Profile,
        LogLevel::ProfileBegin,
        LogLevel::ProfileEnd,
    ];

    pub const fn value(self) -> u32 {
        match self {
            LogLevel::Error => 0x01,
            LogLevel::Warning => 0x02,
            LogLevel::Info => 0x04,
            LogLevel::Trace => 0x08,
            LogLevel::Profile => 0x40,
            LogLevel::ProfileBegin => 0x50,
            LogLevel::ProfileEnd => 0x60,
            LogLevel::Unknown(value) => value,
        }
    }

    pub const fn from_value(value: u32) -> Self {
        match value {
            0x01 => LogLevel::Error,
            0x02 => LogLevel::Warning,
            0x04 => LogLevel::Info,
            0x08 => LogLevel::Trace,
            0x40 => LogLevel::Profile,
            0x50 => LogLevel::ProfileBegin,
            0x60 => LogLevel::ProfileEnd,
            other => LogLevel::Unknown(other),
        }
    }

    /// Human readable name used when formatting records
    pub fn name(self) -> String {
        match self {
            LogLevel::Error => "error".to_string(),
            LogLevel::Warning => "warning".to_string(),
            LogLevel::Info => "info".to_string(),
            LogLevel::Trace => "trace".to_string(),
            LogLevel::Profile => "profile".to_string(),
            LogLevel::ProfileBegin => "profile begin".to_string(),
            LogLevel::ProfileEnd => "profile end".to_string(),
            LogLevel::Unknown(value) => format!("unknown ({:#x})", value),
        }
    }

    /// Parse a configuration name such as `warning` or `profile_begin`
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "error" => Some(LogLevel::Error),
            "warning" => Some(LogLevel::Warning),
            "info" => Some(LogLevel::Info),
            "trace" => Some(LogLevel::Trace),
            "profile" => Some(LogLevel::Profile),
            "profile_begin" => Some(LogLevel::ProfileBegin),
            "profile_end" => Some(LogLevel::ProfileEnd),
            _ => None,
        }
    }

    /// True when `self` is strictly more severe than `other`
    pub fn is_more_severe_than(self, other: LogLevel) -> bool {
        self.value() < other.value()
    }
}

impl Serialize for LogLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            LogLevel::Unknown(value) => serializer.serialize_u32(*value),
            known => serializer.serialize_str(&known.name().replace(' ', "_")),
        }
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Value(u32),
            Name(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Value(value) => Ok(LogLevel::from_value(value)),
            Raw::Name(name) => LogLevel::from_name(&name)
                .ok_or_else(|| serde::de::Error::custom(format!("unknown log level: {}", name))),
        }
    }
}

/// A single `file:line` location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    pub file: String,
    pub line: u32,
}

impl StackFrame {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

/// A captured error value
///
/// Holds what the reporting pipeline needs from an error without keeping the
/// original error alive: its type, display message, source chain and frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorValue {
    pub type_name: String,
    pub message: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub frames: Vec<StackFrame>,
}

impl ErrorValue {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            sources: Vec::new(),
            frames: Vec::new(),
        }
    }

    /// Capture any error, walking its `source()` chain
    pub fn from_error<E: std::error::Error>(err: &E) -> Self {
        let mut value = Self::new(short_type_name(std::any::type_name::<E>()), err.to_string());
        let mut source = err.source();
        while let Some(inner) = source {
            value.sources.push(inner.to_string());
            source = inner.source();
        }
        value
    }

    pub fn with_frames(mut self, frames: Vec<StackFrame>) -> Self {
        self.frames = frames;
        self
    }
}

fn short_type_name(full: &str) -> String {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

/// Body of a log record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LogBody {
    Text(String),
    Structured(serde_json::Value),
    Error(ErrorValue),
}

impl LogBody {
    pub fn as_error(&self) -> Option<&ErrorValue> {
        match self {
            LogBody::Error(err) => Some(err),
            _ => None,
        }
    }

    /// String form of the body; non-string values are dumped as pretty JSON
    pub fn to_text(&self) -> String {
        match self {
            LogBody::Text(text) => text.clone(),
            LogBody::Structured(serde_json::Value::String(text)) => text.clone(),
            LogBody::Structured(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            LogBody::Error(err) => format!("{}: {}", err.type_name, err.message),
        }
    }

    /// Body as a JSON value, for the `real_body` extra
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            LogBody::Text(text) => serde_json::Value::String(text.clone()),
            LogBody::Structured(value) => value.clone(),
            LogBody::Error(err) => serde_json::to_value(err).unwrap_or(serde_json::Value::Null),
        }
    }
}

impl From<&str> for LogBody {
    fn from(text: &str) -> Self {
        LogBody::Text(text.to_string())
    }
}

impl From<String> for LogBody {
    fn from(text: String) -> Self {
        LogBody::Text(text)
    }
}

impl From<serde_json::Value> for LogBody {
    fn from(value: serde_json::Value) -> Self {
        LogBody::Structured(value)
    }
}

impl From<ErrorValue> for LogBody {
    fn from(err: ErrorValue) -> Self {
        LogBody::Error(err)
    }
}

/// A log record as emitted by the host logging facility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub body: LogBody,
    pub level: LogLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Unix time in seconds, with microsecond fraction
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_frames: Option<Vec<StackFrame>>,
}

impl LogRecord {
    pub fn new(level: LogLevel, body: impl Into<LogBody>) -> Self {
        Self {
            body: body.into(),
            level,
            category: None,
            timestamp: Utc::now().timestamp_micros() as f64 / 1_000_000.0,
            stack_frames: None,
        }
    }

    /// Record an error value at `error` level
    pub fn from_error<E: std::error::Error>(err: &E) -> Self {
        Self::new(LogLevel::Error, ErrorValue::from_error(err))
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_stack_frames(mut self, frames: Vec<StackFrame>) -> Self {
        self.stack_frames = Some(frames);
        self
    }

    /// Category, treating an empty string as absent
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref().filter(|c| !c.is_empty())
    }
}
