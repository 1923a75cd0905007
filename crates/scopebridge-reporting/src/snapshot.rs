//! Request snapshot builder
//!
//! Produces the sanitized request section of an event. With PII sending off,
//! headers go through the redactor, cookies are never sent and bodies of
//! routes with body rules are replaced by a placeholder.

use std::collections::BTreeMap;

use scopebridge_core::{ClientOptions, Headers, RequestAccessError, RequestSource};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::redact::{redact_body_fields, redact_headers};

/// Name of the extra holding decoded body parameters
pub const DECODED_PARAMS_EXTRA: &str = "decodedParams";

/// Reported instead of the raw body when it may carry PII
pub const PII_BODY_PLACEHOLDER: &str =
    "Not available due to PII. See \"decodedParams\" in Additional data block.";

/// Header carrying the client address
pub const REMOTE_ADDR_HEADER: &str = "remote_addr";

const REMOTE_ADDR_ENV: &str = "REMOTE_ADDR";

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Request unavailable: {0}")]
    Request(#[from] RequestAccessError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestSnapshot {
    pub url: String,
    pub method: String,
    pub query_string: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    /// Decoded body, reported as the `decodedParams` extra
    #[serde(skip)]
    pub decoded_params: Option<Value>,
}

impl RequestSnapshot {
    /// Client address, only known when PII sending is on
    pub fn remote_addr(&self) -> Option<&str> {
        self.env.get(REMOTE_ADDR_ENV).map(String::as_str)
    }
}

/// Build the sanitized snapshot of `request`
///
/// Method, URL and query string are required; failing to read them fails the
/// whole snapshot. Every other field degrades to absent with a warning.
pub fn build_snapshot(
    request: &dyn RequestSource,
    options: &ClientOptions,
    route_id: Option<&str>,
) -> Result<RequestSnapshot, SnapshotError> {
    let method = request.method()?;
    let mut snapshot = RequestSnapshot {
        url: request.url()?,
        method: method.clone(),
        query_string: request.query_string()?,
        ..Default::default()
    };

    let headers = request.headers().unwrap_or_else(|e| {
        tracing::warn!("Omitting request headers from report: {}", e);
        Headers::new()
    });

    if options.send_default_pii {
        if let Some(addr) = headers.get(REMOTE_ADDR_HEADER) {
            snapshot
                .env
                .insert(REMOTE_ADDR_ENV.to_string(), addr.to_string());
        }
        snapshot.cookies = match request.cookies() {
            Ok(cookies) => Some(cookies),
            Err(e) => {
                tracing::warn!("Omitting request cookies from report: {}", e);
                None
            }
        };
        snapshot.headers = headers;
    } else {
        snapshot.headers = redact_headers(&headers, &options.redaction);
    }

    if options.body_allowed(&method) {
        attach_body(&mut snapshot, request, options, route_id);
    }

    Ok(snapshot)
}

fn attach_body(
    snapshot: &mut RequestSnapshot,
    request: &dyn RequestSource,
    options: &ClientOptions,
    route_id: Option<&str>,
) {
    let raw_body = match request.raw_body() {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!("Omitting request body from report: {}", e);
            return;
        }
    };
    if raw_body.is_empty() {
        return;
    }

    let mut decoded = match request.decoded_body_params() {
        Ok(params) => Some(params),
        Err(e) => {
            tracing::warn!("Omitting decoded body parameters from report: {}", e);
            None
        }
    };

    let body_rules = route_id
        .filter(|_| !options.send_default_pii)
        .and_then(|route| options.redaction.body_rules_for(route));

    match body_rules {
        Some(rules) => {
            tracing::debug!(
                "Replacing request body with placeholder for route {:?}",
                route_id
            );
            snapshot.data = Some(PII_BODY_PLACEHOLDER.to_string());
            if let Some(params) = decoded.as_mut() {
                redact_body_fields(params, rules, &options.redaction.replacement_text);
            }
        }
        None => snapshot.data = Some(raw_body),
    }

    snapshot.decoded_params = decoded;
}

#[cfg(test)]
mod tests {
    use super::*;
    use scopebridge_core::{HttpRequest, RuleNode};
    use serde_json::json;
    use tracing_test::traced_test;

    fn options_with_login_rules(send_default_pii: bool) -> ClientOptions {
        let mut options = ClientOptions {
            send_default_pii,
            ..Default::default()
        };
        options.redaction = options
            .redaction
            .with_route_rules("login", vec![RuleNode::leaf("password")]);
        options
    }

    fn login_request() -> HttpRequest {
        HttpRequest::new("POST", "/login?lang=en")
            .with_header("Content-Type", "application/json")
            .with_header("Authorization", "Bearer abc")
            .with_header("Cookie", "session=1")
            .with_header("remote_addr", "198.51.100.4")
            .with_cookie("session", "1")
            .with_body(r#"{"password":"secret","login":"ann"}"#)
            .with_route("login")
    }

    /// Request whose optional accessors all fail
    struct BrokenRequest;

    impl RequestSource for BrokenRequest {
        fn method(&self) -> Result<String, RequestAccessError> {
            Ok("POST".to_string())
        }
        fn url(&self) -> Result<String, RequestAccessError> {
            Ok("/broken".to_string())
        }
        fn query_string(&self) -> Result<String, RequestAccessError> {
            Ok(String::new())
        }
        fn headers(&self) -> Result<Headers, RequestAccessError> {
            Err(RequestAccessError::Unavailable("headers"))
        }
        fn cookies(&self) -> Result<BTreeMap<String, String>, RequestAccessError> {
            Err(RequestAccessError::Unavailable("cookies"))
        }
        fn raw_body(&self) -> Result<String, RequestAccessError> {
            Ok("a=1".to_string())
        }
        fn decoded_body_params(&self) -> Result<Value, RequestAccessError> {
            Err(RequestAccessError::Decode("bad body".to_string()))
        }
        fn route_id(&self) -> Option<String> {
            Some("login".to_string())
        }
    }

    #[test]
    fn test_pii_suppressed_body_uses_placeholder() {
        let options = options_with_login_rules(false);
        let snapshot = build_snapshot(&login_request(), &options, Some("login")).unwrap();

        assert_eq!(snapshot.data.as_deref(), Some(PII_BODY_PLACEHOLDER));
        assert_eq!(
            snapshot.decoded_params,
            Some(json!({"password": "[Filtered PII]", "login": "ann"}))
        );
        assert_eq!(snapshot.cookies, None);
        assert_eq!(snapshot.headers.get("cookie"), None);
        assert_eq!(snapshot.headers.get("authorization"), Some("[Filtered PII]"));
        assert_eq!(snapshot.remote_addr(), None);
        assert_eq!(snapshot.url, "/login?lang=en");
        assert_eq!(snapshot.query_string, "lang=en");
    }

    #[test]
    fn test_route_without_rules_reports_raw_body() {
        let options = options_with_login_rules(false);
        let snapshot = build_snapshot(&login_request(), &options, Some("signup")).unwrap();

        assert_eq!(
            snapshot.data.as_deref(),
            Some(r#"{"password":"secret","login":"ann"}"#)
        );
        assert_eq!(
            snapshot.decoded_params,
            Some(json!({"password": "secret", "login": "ann"}))
        );
    }

    #[test]
    fn test_send_default_pii_reports_everything() {
        let options = options_with_login_rules(true);
        let snapshot = build_snapshot(&login_request(), &options, Some("login")).unwrap();

        assert_eq!(
            snapshot.data.as_deref(),
            Some(r#"{"password":"secret","login":"ann"}"#)
        );
        assert_eq!(snapshot.headers.get("authorization"), Some("Bearer abc"));
        assert_eq!(snapshot.headers.get("cookie"), Some("session=1"));
        assert_eq!(
            snapshot.cookies.as_ref().and_then(|c| c.get("session")).map(String::as_str),
            Some("1")
        );
        assert_eq!(snapshot.remote_addr(), Some("198.51.100.4"));
    }

    #[test]
    fn test_body_skipped_for_get_and_empty_body() {
        let options = ClientOptions::default();

        let get = HttpRequest::new("GET", "/items?page=2").with_body("ignored");
        let snapshot = build_snapshot(&get, &options, None).unwrap();
        assert_eq!(snapshot.data, None);
        assert_eq!(snapshot.decoded_params, None);

        let empty = HttpRequest::new("POST", "/items");
        let snapshot = build_snapshot(&empty, &options, None).unwrap();
        assert_eq!(snapshot.data, None);
    }

    #[test]
    fn test_missing_method_fails_snapshot() {
        let request = HttpRequest::default();
        assert!(build_snapshot(&request, &ClientOptions::default(), None).is_err());
    }

    #[traced_test]
    #[test]
    fn test_optional_fields_degrade() {
        let options = options_with_login_rules(false);
        let snapshot = build_snapshot(&BrokenRequest, &options, Some("login")).unwrap();

        assert!(snapshot.headers.is_empty());
        assert_eq!(snapshot.data.as_deref(), Some(PII_BODY_PLACEHOLDER));
        assert_eq!(snapshot.decoded_params, None);
        assert!(logs_contain("Omitting request headers from report"));
        assert!(logs_contain("Omitting decoded body parameters from report"));

        let options = options_with_login_rules(true);
        let snapshot = build_snapshot(&BrokenRequest, &options, Some("login")).unwrap();
        assert_eq!(snapshot.cookies, None);
        assert_eq!(snapshot.data.as_deref(), Some("a=1"));
    }
}
