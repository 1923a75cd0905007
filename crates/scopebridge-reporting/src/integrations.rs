//! Event processors enabled by name in the settings
//!
//! - `request`: attaches the sanitized request snapshot, the `decodedParams`
//!   extra and, when PII sending is on, the user's IP address
//! - `in_app`: classifies exception frames as application code and strips
//!   configured path prefixes from file names

use std::panic::{catch_unwind, AssertUnwindSafe};

use scopebridge_core::{ClientOptions, ConfigError, RequestSource};

use crate::event::{Event, UserContext};
use crate::snapshot::{build_snapshot, DECODED_PARAMS_EXTRA};

pub const REQUEST_INTEGRATION: &str = "request";
pub const IN_APP_INTEGRATION: &str = "in_app";

/// Data available to integrations while an event is processed
pub struct EventContext<'a> {
    pub options: &'a ClientOptions,
    pub request: Option<&'a dyn RequestSource>,
}

pub trait Integration: Send + Sync {
    fn name(&self) -> &'static str;

    /// Enrich `event`. Must not fail: unavailable data is left out.
    fn process_event(&self, event: &mut Event, context: &EventContext<'_>);
}

/// Instantiate integrations from their configured names
pub fn from_names(names: &[String]) -> Result<Vec<Box<dyn Integration>>, ConfigError> {
    names
        .iter()
        .map(|name| -> Result<Box<dyn Integration>, ConfigError> {
            match name.as_str() {
                REQUEST_INTEGRATION => Ok(Box::new(RequestIntegration)),
                IN_APP_INTEGRATION => Ok(Box::new(InAppIntegration)),
                other => Err(ConfigError::UnknownIntegration(other.to_string())),
            }
        })
        .collect()
}

pub struct RequestIntegration;

impl Integration for RequestIntegration {
    fn name(&self) -> &'static str {
        REQUEST_INTEGRATION
    }

    fn process_event(&self, event: &mut Event, context: &EventContext<'_>) {
        let Some(request) = context.request else {
            tracing::debug!("No request bound to scope, skipping request data");
            return;
        };

        let route_id = request
            .route_id()
            .or_else(|| event.tags.get("route").cloned());

        let result = catch_unwind(AssertUnwindSafe(|| {
            build_snapshot(request, context.options, route_id.as_deref())
        }));

        let mut snapshot = match result {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                tracing::warn!("Sending event without request data: {}", e);
                return;
            }
            Err(_) => {
                tracing::warn!("Sending event without request data: request access panicked");
                return;
            }
        };

        if let Some(params) = snapshot.decoded_params.take() {
            event.extra.insert(DECODED_PARAMS_EXTRA.to_string(), params);
        }

        if context.options.send_default_pii {
            if let Some(addr) = snapshot.remote_addr() {
                let user = event.user.get_or_insert_with(UserContext::default);
                if user.ip_address.is_none() {
                    user.ip_address = Some(addr.to_string());
                }
            }
        }

        event.request = Some(snapshot);
    }
}

pub struct InAppIntegration;

impl Integration for InAppIntegration {
    fn name(&self) -> &'static str {
        IN_APP_INTEGRATION
    }

    fn process_event(&self, event: &mut Event, context: &EventContext<'_>) {
        let in_app = &context.options.in_app;

        for frame in event.frames_mut() {
            let path = frame.abs_path.as_str();

            let excluded = in_app.exclude.iter().any(|prefix| path_under(path, prefix));
            frame.in_app = match &in_app.project_root {
                _ if excluded => Some(false),
                Some(root) => Some(path_under(path, root)),
                None => None,
            };

            if let Some(prefix) = in_app
                .prefixes
                .iter()
                .filter(|prefix| path_under(path, prefix))
                .max_by_key(|prefix| prefix.len())
            {
                let stripped = path[prefix.len()..].trim_start_matches('/');
                frame.filename = stripped.to_string();
            }
        }
    }
}

/// Whether `path` is `prefix` itself or lies below it
fn path_under(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}
