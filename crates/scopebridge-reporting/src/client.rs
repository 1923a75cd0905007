//! Reporting client and per-request scopes
//!
//! One [`Client`] is shared by the whole process. Each request handler opens
//! its own [`RequestScope`], which owns the mutable scope data for that
//! request and is passed explicitly down the call chain.

use std::sync::Arc;

use scopebridge_core::{
    ClientOptions, ConfigError, ErrorValue, ReportingError, ReportingResult, RequestSource,
    Settings,
};
use serde_json::Value;

use crate::assembler::{exception_event, message_event};
use crate::event::{Breadcrumb, Event, Severity, UserContext};
use crate::integrations::{self, EventContext, Integration};
use crate::scope::Scope;
use crate::transport::Transport;

pub struct Client {
    options: ClientOptions,
    integrations: Vec<Box<dyn Integration>>,
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Fails on integration names that are not known
    pub fn new(options: ClientOptions, transport: Arc<dyn Transport>) -> Result<Self, ConfigError> {
        let integrations = integrations::from_names(&options.integrations)?;
        tracing::debug!(
            "Reporting client ready - environment: {}, integrations: {:?}",
            options.environment,
            options.integrations
        );
        Ok(Self {
            options,
            integrations,
            transport,
        })
    }

    pub fn from_settings(
        settings: &Settings,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        Self::new(settings.compile()?, transport)
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn integration_names(&self) -> Vec<&'static str> {
        self.integrations.iter().map(|i| i.name()).collect()
    }

    /// Open a fresh scope for one request
    pub fn request_scope(self: &Arc<Self>, request: Option<Arc<dyn RequestSource>>) -> RequestScope {
        RequestScope {
            client: Arc::clone(self),
            scope: Scope::new(self.options.max_breadcrumbs),
            request,
        }
    }

    /// Run integrations over `event` and hand it to the transport
    ///
    /// Returns the event id.
    pub fn capture_event(
        &self,
        mut event: Event,
        request: Option<&dyn RequestSource>,
    ) -> ReportingResult<String> {
        let context = EventContext {
            options: &self.options,
            request,
        };
        for integration in &self.integrations {
            integration.process_event(&mut event, &context);
        }

        let event_id = event.event_id.clone();
        tracing::debug!("Sending event {} at level {:?}", event_id, event.level);

        self.transport.send_event(event).map_err(|e| {
            tracing::error!("Failed to send event {}: {}", event_id, e);
            ReportingError::from(e)
        })?;
        Ok(event_id)
    }
}

/// Scope data and request binding for a single request
pub struct RequestScope {
    client: Arc<Client>,
    scope: Scope,
    request: Option<Arc<dyn RequestSource>>,
}

impl RequestScope {
    pub fn client(&self) -> &Arc<Client> {
        &self.client
    }

    pub fn options(&self) -> &ClientOptions {
        self.client.options()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    pub fn configure_scope<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Scope),
    {
        f(&mut self.scope);
    }

    pub fn request(&self) -> Option<&dyn RequestSource> {
        self.request.as_deref()
    }

    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.scope.set_tag(key, value);
    }

    pub fn set_extra(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.scope.set_extra(key, value);
    }

    pub fn add_breadcrumb(&mut self, breadcrumb: Breadcrumb) {
        self.scope.add_breadcrumb(breadcrumb);
    }

    pub fn set_user(&mut self, user: Option<UserContext>) {
        self.scope.set_user(user);
    }

    pub fn capture_exception(&self, error: &ErrorValue) -> ReportingResult<String> {
        let mut event = exception_event(error, None, &self.options().environment);
        self.scope.apply_to_event(&mut event);
        self.capture_event(event)
    }

    pub fn capture_message(&self, text: &str, level: Severity) -> ReportingResult<String> {
        let mut event = message_event(text, level, &self.options().environment);
        self.scope.apply_to_event(&mut event);
        self.capture_event(event)
    }

    /// Send an event that already carries this scope's data
    pub fn capture_event(&self, event: Event) -> ReportingResult<String> {
        self.client.capture_event(event, self.request())
    }
}
