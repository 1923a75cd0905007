use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use colored::Colorize;
use scopebridge_core::{ClientOptions, Settings};
use scopebridge_reporting::{Client, RecordingTransport};
use tracing::debug;

#[derive(Args)]
pub struct CheckConfigCommand {
    /// Settings file (YAML)
    #[arg(long, env = "SCOPEBRIDGE_CONFIG")]
    pub config: PathBuf,
}

/// Human readable summary of the effective options
pub fn summarize(options: &ClientOptions) -> Vec<(&'static str, String)> {
    let join = |items: Vec<String>| {
        if items.is_empty() {
            "-".to_string()
        } else {
            items.join(", ")
        }
    };

    vec![
        (
            "Endpoint",
            options
                .dsn
                .as_ref()
                .map(|dsn| dsn.envelope_url())
                .unwrap_or_else(|| "-".to_string()),
        ),
        ("Environment", options.environment.clone()),
        ("Send default PII", options.send_default_pii.to_string()),
        ("Integrations", join(options.integrations.clone())),
        (
            "Body methods",
            join(options.http_methods_with_body.iter().cloned().collect()),
        ),
        (
            "Stripped headers",
            join(options.redaction.strip_headers.iter().cloned().collect()),
        ),
        (
            "PII headers",
            join(options.redaction.pii_headers.iter().cloned().collect()),
        ),
        (
            "Routes with body rules",
            join(
                options
                    .redaction
                    .pii_body_fields_by_route
                    .keys()
                    .cloned()
                    .collect(),
            ),
        ),
        (
            "Project root",
            options
                .in_app
                .project_root
                .clone()
                .unwrap_or_else(|| "-".to_string()),
        ),
        ("Max breadcrumbs", options.max_breadcrumbs.to_string()),
    ]
}

impl CheckConfigCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let settings = Settings::load(&self.config)?;
        let client = Client::from_settings(&settings, Arc::new(RecordingTransport::new()))?;
        debug!("Integrations resolved: {:?}", client.integration_names());

        println!(
            "{} {}",
            "✓".bright_green().bold(),
            format!("{} is valid", self.config.display())
                .bright_white()
                .bold()
        );
        for (label, value) in summarize(client.options()) {
            println!("  {:<24} {}", format!("{}:", label).bright_white(), value.bright_cyan());
        }
        Ok(())
    }
}
