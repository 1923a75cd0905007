//! Core types shared across the scopebridge crates

pub mod dsn;
pub mod error;
pub mod http_request;
pub mod record;
pub mod request;
pub mod rules;
pub mod settings;

pub use dsn::Dsn;
pub use error::{ConfigError, ReportingError, ReportingResult};
pub use http_request::HttpRequest;
pub use record::{ErrorValue, LogBody, LogLevel, LogRecord, StackFrame};
pub use request::{Headers, RequestAccessError, RequestSource};
pub use rules::{RedactionRuleSet, RuleNode};
pub use settings::{ClientOptions, InAppOptions, LogTargetSettings, Settings};

// Re-export external dependencies
pub use chrono;
pub use serde_json;
pub use tracing;
