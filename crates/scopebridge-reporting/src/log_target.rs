//! Per-request log collection
//!
//! A [`LogTarget`] buffers the records a request emits and, on
//! [`export`](LogTarget::export), reduces them into a single event.

use scopebridge_core::{LogLevel, LogRecord, LogTargetSettings, ReportingResult};

use crate::assembler::assemble;
use crate::client::RequestScope;
use crate::reducer::reduce;

#[derive(Debug, Default)]
pub struct LogTarget {
    settings: LogTargetSettings,
    records: Vec<LogRecord>,
}

impl LogTarget {
    pub fn new(settings: LogTargetSettings) -> Self {
        Self {
            settings,
            records: Vec::new(),
        }
    }

    /// Buffer `record` if it passes the level and category filters
    pub fn collect(&mut self, record: LogRecord) -> bool {
        if !self.accepts(&record) {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Returns how many records were kept
    pub fn collect_all<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = LogRecord>,
    {
        let mut kept = 0;
        for record in records {
            if self.collect(record) {
                kept += 1;
            }
        }
        kept
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Reduce the buffered records into one event and capture it
    ///
    /// The buffer is drained either way. Returns the event id, or `None` when
    /// nothing was buffered.
    pub fn export(&mut self, scope: &RequestScope) -> ReportingResult<Option<String>> {
        let records = std::mem::take(&mut self.records);
        let options = scope.options();

        let Some(batch) = reduce(&records, options.time_zone) else {
            tracing::debug!("No log records collected, nothing to export");
            return Ok(None);
        };
        tracing::debug!(
            "Exporting {} log records, primary at index {}",
            records.len(),
            batch.primary_index
        );

        let event = assemble(batch.primary, &batch.rest, scope.scope(), options)?;
        scope.capture_event(event).map(Some)
    }

    fn accepts(&self, record: &LogRecord) -> bool {
        level_allowed(&self.settings.levels, record.level)
            && category_allowed(&self.settings, record.category().unwrap_or_default())
    }
}

fn level_allowed(levels: &[LogLevel], level: LogLevel) -> bool {
    levels.is_empty() || levels.contains(&level)
}

fn category_allowed(settings: &LogTargetSettings, category: &str) -> bool {
    let included = settings.categories.is_empty()
        || settings
            .categories
            .iter()
            .any(|pattern| category_matches(pattern, category));

    included
        && !settings
            .except
            .iter()
            .any(|pattern| category_matches(pattern, category))
}

fn category_matches(pattern: &str, category: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => category.starts_with(prefix),
        None => pattern == category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::client::Client;
    use crate::transport::RecordingTransport;
    use scopebridge_core::ClientOptions;
    use tracing_test::traced_test;

    fn record(level: LogLevel, category: &str) -> LogRecord {
        LogRecord::new(level, "message").with_category(category)
    }

    #[test]
    fn test_category_matching() {
        assert!(category_matches("db", "db"));
        assert!(!category_matches("db", "db.query"));
        assert!(category_matches("db*", "db.query"));
        assert!(category_matches("*", ""));
    }

    #[test]
    fn test_filters() {
        let mut target = LogTarget::new(LogTargetSettings {
            levels: vec![LogLevel::Error, LogLevel::Warning],
            categories: vec!["app*".to_string()],
            except: vec!["app.noise".to_string()],
        });

        assert!(target.collect(record(LogLevel::Error, "app.orders")));
        assert!(!target.collect(record(LogLevel::Info, "app.orders")));
        assert!(!target.collect(record(LogLevel::Warning, "db")));
        assert!(!target.collect(record(LogLevel::Error, "app.noise")));
        assert_eq!(target.records().len(), 1);
    }

    #[test]
    fn test_default_settings_collect_everything() {
        let mut target = LogTarget::default();
        let kept = target.collect_all(vec![
            record(LogLevel::Trace, ""),
            record(LogLevel::ProfileBegin, "profiling"),
            LogRecord::new(LogLevel::Info, "no category"),
        ]);
        assert_eq!(kept, 3);
    }

    #[traced_test]
    #[test]
    fn test_export_empty_batch_sends_nothing() {
        let transport = Arc::new(RecordingTransport::new());
        let client = Arc::new(Client::new(ClientOptions::default(), transport.clone()).unwrap());
        let scope = client.request_scope(None);

        let mut target = LogTarget::default();
        assert_eq!(target.export(&scope).unwrap(), None);
        assert!(transport.is_empty());
        assert!(logs_contain("nothing to export"));
    }

    #[test]
    fn test_export_drains_buffer() {
        let transport = Arc::new(RecordingTransport::new());
        let client = Arc::new(Client::new(ClientOptions::default(), transport.clone()).unwrap());
        let scope = client.request_scope(None);

        let mut target = LogTarget::default();
        target.collect(LogRecord::new(LogLevel::Info, "started"));
        target.collect(LogRecord::new(LogLevel::Error, "failed"));

        let event_id = target.export(&scope).unwrap();

        assert!(target.is_empty());
        let events = transport.take();
        assert_eq!(events.len(), 1);
        assert_eq!(Some(events[0].event_id.clone()), event_id);
        assert_eq!(events[0].message.as_ref().unwrap().formatted, "failed");
    }
}
