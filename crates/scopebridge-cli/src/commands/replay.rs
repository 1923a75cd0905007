use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::Args;
use scopebridge_core::{HttpRequest, LogRecord, RequestSource, Settings};
use scopebridge_reporting::{
    on_action_dispatch, on_authentication_success, ActionDispatch, Client, Event,
    HandlerDescriptor, LogTarget, Transport, TransportError,
};
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Args)]
pub struct ReplayCommand {
    /// Settings file (YAML)
    #[arg(long, env = "SCOPEBRIDGE_CONFIG")]
    pub config: PathBuf,

    /// Recorded request and log records (JSON)
    #[arg(long)]
    pub fixture: PathBuf,
}

/// A request as recorded for replay
#[derive(Debug, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub request: Option<HttpRequest>,
    /// Route the request was dispatched to
    #[serde(default)]
    pub route: Option<String>,
    /// Handler of the route, `Owner::method` or a function path
    #[serde(default)]
    pub handler: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub records: Vec<LogRecord>,
}

/// Writes each event as one JSON line
pub struct JsonLinesTransport<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesTransport<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> Transport for JsonLinesTransport<W> {
    fn send_event(&self, event: Event) -> Result<(), TransportError> {
        let line = serde_json::to_string(&event)
            .map_err(|e| TransportError::Delivery(format!("Failed to encode event: {}", e)))?;
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writeln!(writer, "{}", line).map_err(|e| TransportError::Delivery(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| TransportError::Delivery(e.to_string()))
    }
}

/// Parse `Owner::method` into a method handler, anything else into a function
pub fn parse_handler(handler: &str) -> HandlerDescriptor {
    let handler = handler.trim_end_matches("()");
    if let Some((owner, method)) = handler.rsplit_once("::") {
        let type_name = owner.rsplit("::").next().unwrap_or(owner);
        if type_name.starts_with(|c: char| c.is_ascii_uppercase()) {
            return HandlerDescriptor::Method {
                owner: owner.to_string(),
                method: method.to_string(),
            };
        }
    }
    HandlerDescriptor::Function {
        path: handler.to_string(),
    }
}

/// Run a fixture through the pipeline, returning the id of the captured event
pub fn replay(
    settings: &Settings,
    fixture: Fixture,
    transport: Arc<dyn Transport>,
) -> anyhow::Result<Option<String>> {
    let client = Arc::new(Client::from_settings(settings, transport)?);

    let request = fixture
        .request
        .map(|request| Arc::new(request) as Arc<dyn RequestSource>);
    let mut scope = client.request_scope(request);

    if let Some(route) = &fixture.route {
        let handler = fixture
            .handler
            .as_deref()
            .map(parse_handler)
            .unwrap_or_else(|| HandlerDescriptor::Function {
                path: route.clone(),
            });
        on_action_dispatch(scope.scope_mut(), &ActionDispatch::new(route.clone(), handler));
    }
    if let Some(user_id) = &fixture.user_id {
        on_authentication_success(scope.scope_mut(), user_id);
    }

    let mut target = LogTarget::new(client.options().log_target.clone());
    let total = fixture.records.len();
    let kept = target.collect_all(fixture.records);
    debug!("Collected {} of {} log records", kept, total);

    Ok(target.export(&scope)?)
}

impl ReplayCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let settings = Settings::load(&self.config)?;

        let raw = std::fs::read_to_string(&self.fixture).map_err(|e| {
            anyhow::anyhow!("Failed to read fixture {}: {}", self.fixture.display(), e)
        })?;
        let fixture: Fixture = serde_json::from_str(&raw).map_err(|e| {
            anyhow::anyhow!("Invalid fixture {}: {}", self.fixture.display(), e)
        })?;

        let transport = Arc::new(JsonLinesTransport::new(io::stdout()));
        match replay(&settings, fixture, transport)? {
            Some(event_id) => info!("Captured event {}", event_id),
            None => info!("No log records to report"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scopebridge_reporting::RecordingTransport;
    use serde_json::json;

    const FIXTURE: &str = r#"{
        "request": {
            "method": "POST",
            "url": "/account/login",
            "headers": {"Content-Type": "application/json", "Authorization": "Bearer x"},
            "raw_body": "{\"login\":\"ann\",\"password\":\"hunter2\"}"
        },
        "route": "account/login",
        "handler": "AccountController::login",
        "user_id": "17",
        "records": [
            {"body": {"kind": "text", "value": "attempt"}, "level": "info", "category": "auth", "timestamp": 1700000000.0},
            {"body": {"kind": "text", "value": "denied"}, "level": "error", "category": "auth", "timestamp": 1700000001.5}
        ]
    }"#;

    fn settings() -> Settings {
        Settings::from_yaml(
            "pii_body_fields:\n  account/login:\n    - password\n",
        )
        .unwrap()
    }

    #[test]
    fn test_parse_handler() {
        assert_eq!(
            parse_handler("AccountController::login"),
            HandlerDescriptor::Method {
                owner: "AccountController".to_string(),
                method: "login".to_string(),
            }
        );
        assert_eq!(
            parse_handler("app::handlers::health()"),
            HandlerDescriptor::Function {
                path: "app::handlers::health".to_string(),
            }
        );
        assert_eq!(
            parse_handler("index"),
            HandlerDescriptor::Function {
                path: "index".to_string(),
            }
        );
    }

    #[test]
    fn test_replay_fixture() {
        let fixture: Fixture = serde_json::from_str(FIXTURE).unwrap();
        let transport = Arc::new(RecordingTransport::new());

        let event_id = replay(&settings(), fixture, transport.clone()).unwrap();

        let events = transport.take();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(Some(event.event_id.clone()), event_id);
        assert_eq!(event.message.as_ref().unwrap().formatted, "denied");
        assert_eq!(event.tags["route"], "account/login");
        assert_eq!(event.user.as_ref().unwrap().id.as_deref(), Some("17"));
        assert_eq!(
            event.breadcrumbs.values[0].data["action"],
            json!("AccountController::login()")
        );
        assert_eq!(
            event.extra["decodedParams"],
            json!({"login": "ann", "password": "[Filtered PII]"})
        );
    }

    #[test]
    fn test_replay_without_records() {
        let fixture: Fixture = serde_json::from_str(r#"{"route": "site/index"}"#).unwrap();
        let transport = Arc::new(RecordingTransport::new());

        assert_eq!(replay(&settings(), fixture, transport.clone()).unwrap(), None);
        assert!(transport.is_empty());
    }

    #[test]
    fn test_json_lines_transport() {
        let transport = JsonLinesTransport::new(Vec::new());
        let event = Event::new(scopebridge_reporting::Severity::Info, "test");
        let id = event.event_id.clone();

        transport.send_event(event).unwrap();

        let output = String::from_utf8(transport.into_inner()).unwrap();
        let line: serde_json::Value = serde_json::from_str(output.trim_end()).unwrap();
        assert_eq!(line["event_id"], json!(id));
        assert_eq!(line["level"], json!("info"));
    }
}
