//! Reporting settings
//!
//! [`Settings`] mirrors the settings file (`scopebridge.yaml`) and is compiled
//! into immutable [`ClientOptions`] once at start-up. Any invalid value is a
//! [`ConfigError`]; nothing here is resolved lazily at request time.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::dsn::Dsn;
use crate::error::ConfigError;
use crate::record::LogLevel;
use crate::rules::{RedactionRuleSet, RuleNode};

pub const DEFAULT_ENVIRONMENT: &str = "production";
pub const DEFAULT_PII_REPLACE_TEXT: &str = "[Filtered PII]";
pub const DEFAULT_MAX_BREADCRUMBS: usize = 100;
pub const DEFAULT_BODY_METHODS: [&str; 3] = ["POST", "PUT", "PATCH"];
pub const DEFAULT_STRIP_HEADERS: [&str; 2] = ["cookie", "set-cookie"];
pub const DEFAULT_PII_HEADERS: [&str; 2] = ["authorization", "remote_addr"];
pub const DEFAULT_INTEGRATIONS: [&str; 2] = ["request", "in_app"];

const ENV_DSN: &str = "SCOPEBRIDGE_DSN";
const ENV_ENVIRONMENT: &str = "SCOPEBRIDGE_ENVIRONMENT";
const ENV_SEND_DEFAULT_PII: &str = "SCOPEBRIDGE_SEND_DEFAULT_PII";

/// Filters applied to records before they are collected for a request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogTargetSettings {
    /// Levels to collect. Empty means all levels.
    pub levels: Vec<LogLevel>,
    /// Categories to collect. Empty means all; a trailing `*` matches a prefix.
    pub categories: Vec<String>,
    /// Categories to drop, same matching rules as `categories`
    pub except: Vec<String>,
}

/// Settings file contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dsn: Option<String>,
    pub environment: String,

    /// Application root, used for in-app frame classification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_root: Option<String>,
    /// Path prefixes stripped from frame file names. Defaults to `[project_root]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefixes: Option<Vec<String>>,
    /// Path prefixes never considered in-app. Defaults to `[project_root/vendor/]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_app_exclude: Option<Vec<String>>,

    pub integrations: Vec<String>,
    pub send_default_pii: bool,

    /// Route id to body field rules
    pub pii_body_fields: BTreeMap<String, Vec<RuleNode>>,
    pub pii_replace_text: String,
    pub http_methods_with_body: Vec<String>,
    pub strip_headers: Vec<String>,
    pub pii_headers: Vec<String>,

    /// UTC offset record times are rendered in (`+09:00`, `-0530`, `UTC`).
    /// Defaults to the local zone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    pub max_breadcrumbs: usize,
    pub log_target: LogTargetSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: DEFAULT_ENVIRONMENT.to_string(),
            project_root: None,
            prefixes: None,
            in_app_exclude: None,
            integrations: DEFAULT_INTEGRATIONS.iter().map(|s| s.to_string()).collect(),
            send_default_pii: false,
            pii_body_fields: BTreeMap::new(),
            pii_replace_text: DEFAULT_PII_REPLACE_TEXT.to_string(),
            http_methods_with_body: DEFAULT_BODY_METHODS.iter().map(|s| s.to_string()).collect(),
            strip_headers: DEFAULT_STRIP_HEADERS.iter().map(|s| s.to_string()).collect(),
            pii_headers: DEFAULT_PII_HEADERS.iter().map(|s| s.to_string()).collect(),
            time_zone: None,
            max_breadcrumbs: DEFAULT_MAX_BREADCRUMBS,
            log_target: LogTargetSettings::default(),
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Read a settings file and apply `SCOPEBRIDGE_*` environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)?;
        let mut settings = Self::from_yaml(&yaml)?;
        settings.apply_overrides(|key| std::env::var(key).ok())?;

        tracing::debug!("Loaded reporting settings from {}", path.display());
        Ok(settings)
    }

    /// Apply overrides from a key lookup (normally the process environment)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dsn) = lookup(ENV_DSN) {
            self.dsn = Some(dsn).filter(|d| !d.is_empty());
        }
        if let Some(environment) = lookup(ENV_ENVIRONMENT) {
            self.environment = environment;
        }
        if let Some(raw) = lookup(ENV_SEND_DEFAULT_PII) {
            self.send_default_pii = parse_bool(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: ENV_SEND_DEFAULT_PII.to_string(),
                message: format!("expected a boolean, got '{}'", raw),
            })?;
        }
        Ok(())
    }

    /// Validate and compile into runtime options
    pub fn compile(&self) -> Result<ClientOptions, ConfigError> {
        let dsn = self.dsn.as_deref().map(Dsn::parse).transpose()?;

        if self.environment.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "environment".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        for (route, rules) in &self.pii_body_fields {
            if rules.is_empty() {
                return Err(ConfigError::InvalidRule {
                    route: route.clone(),
                    reason: "rule list is empty".to_string(),
                });
            }
            for rule in rules {
                rule.validate().map_err(|reason| ConfigError::InvalidRule {
                    route: route.clone(),
                    reason,
                })?;
            }
        }

        let mut http_methods_with_body = BTreeSet::new();
        for method in &self.http_methods_with_body {
            let method = method.trim().to_ascii_uppercase();
            if method.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "http_methods_with_body".to_string(),
                    message: "method names must not be empty".to_string(),
                });
            }
            http_methods_with_body.insert(method);
        }

        let mut redaction = RedactionRuleSet::new(
            &self.strip_headers,
            &self.pii_headers,
            self.pii_replace_text.clone(),
        );
        redaction.pii_body_fields_by_route = self.pii_body_fields.clone();

        let time_zone = match &self.time_zone {
            Some(raw) => Some(parse_utc_offset(raw).ok_or_else(|| ConfigError::InvalidValue {
                key: "time_zone".to_string(),
                message: format!("expected a UTC offset such as +09:00, got {:?}", raw),
            })?),
            None => None,
        };

        let project_root = self
            .project_root
            .as_ref()
            .map(|root| root.trim_end_matches('/').to_string())
            .filter(|root| !root.is_empty());
        let prefixes = match &self.prefixes {
            Some(prefixes) => prefixes.clone(),
            None => project_root.iter().cloned().collect(),
        };
        let exclude = match &self.in_app_exclude {
            Some(exclude) => exclude.clone(),
            None => project_root
                .iter()
                .map(|root| format!("{}/vendor/", root))
                .collect(),
        };

        Ok(ClientOptions {
            dsn,
            environment: self.environment.clone(),
            send_default_pii: self.send_default_pii,
            redaction,
            http_methods_with_body,
            in_app: InAppOptions {
                project_root,
                prefixes,
                exclude,
            },
            integrations: self.integrations.clone(),
            time_zone,
            max_breadcrumbs: self.max_breadcrumbs,
            log_target: self.log_target.clone(),
        })
    }
}

/// Parse `UTC`, `Z` or a signed `HH`, `HHMM` or `HH:MM` offset
fn parse_utc_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("utc") || raw.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }

    let sign = match raw.chars().next()? {
        '+' => 1,
        '-' => -1,
        _ => return None,
    };
    let digits: String = raw[1..].chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Stack frame classification options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InAppOptions {
    pub project_root: Option<String>,
    pub prefixes: Vec<String>,
    pub exclude: Vec<String>,
}

/// Compiled, immutable client configuration shared by every request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub dsn: Option<Dsn>,
    pub environment: String,
    pub send_default_pii: bool,
    pub redaction: RedactionRuleSet,
    /// Upper-cased HTTP methods whose body is reported
    pub http_methods_with_body: BTreeSet<String>,
    pub in_app: InAppOptions,
    pub integrations: Vec<String>,
    /// Offset record times are rendered in, `None` for the local zone
    pub time_zone: Option<FixedOffset>,
    pub max_breadcrumbs: usize,
    pub log_target: LogTargetSettings,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: DEFAULT_ENVIRONMENT.to_string(),
            send_default_pii: false,
            redaction: RedactionRuleSet::new(
                DEFAULT_STRIP_HEADERS,
                DEFAULT_PII_HEADERS,
                DEFAULT_PII_REPLACE_TEXT,
            ),
            http_methods_with_body: DEFAULT_BODY_METHODS.iter().map(|s| s.to_string()).collect(),
            in_app: InAppOptions::default(),
            integrations: DEFAULT_INTEGRATIONS.iter().map(|s| s.to_string()).collect(),
            time_zone: None,
            max_breadcrumbs: DEFAULT_MAX_BREADCRUMBS,
            log_target: LogTargetSettings::default(),
        }
    }
}

impl ClientOptions {
    pub fn body_allowed(&self, method: &str) -> bool {
        self.http_methods_with_body
            .contains(&method.to_ascii_uppercase())
    }
}
