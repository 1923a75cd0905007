//! Reduction of a request's log records into one reportable record

use chrono::FixedOffset;
use scopebridge_core::LogRecord;

use crate::format::format_record;

/// Result of reducing one request's records
#[derive(Debug)]
pub struct ReducedBatch<'a> {
    /// Position of the primary record in the input
    pub primary_index: usize,
    pub primary: &'a LogRecord,
    /// Every other record, formatted, in input order
    pub rest: Vec<String>,
}

/// Pick the most severe record and format the others
///
/// Among equally severe records the first one wins. The primary is excluded
/// from `rest` by position, so identical records elsewhere are kept.
/// Returns `None` for an empty batch.
pub fn reduce<'a>(
    records: &'a [LogRecord],
    offset: Option<FixedOffset>,
) -> Option<ReducedBatch<'a>> {
    let (first, tail) = records.split_first()?;

    let mut primary_index = 0;
    let mut primary = first;
    for (position, record) in tail.iter().enumerate() {
        if record.level.is_more_severe_than(primary.level) {
            primary_index = position + 1;
            primary = record;
        }
    }

    let rest = records
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != primary_index)
        .map(|(_, record)| format_record(record, offset))
        .collect();

    tracing::debug!(
        "Reduced {} log records, primary at {} ({})",
        records.len(),
        primary_index,
        primary.level.name()
    );

    Some(ReducedBatch {
        primary_index,
        primary,
        rest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scopebridge_core::{LogBody, LogLevel};

    fn record(level: LogLevel, text: &str) -> LogRecord {
        LogRecord::new(level, text).with_timestamp(1_700_000_000.0)
    }

    #[test]
    fn test_most_severe_wins_regardless_of_position() {
        let records = vec![
            record(LogLevel::Warning, "slow query"),
            record(LogLevel::Error, "db down"),
            record(LogLevel::Info, "request done"),
        ];

        let batch = reduce(&records, FixedOffset::east_opt(0)).unwrap();

        assert_eq!(batch.primary_index, 1);
        assert_eq!(batch.primary.body, LogBody::from("db down"));
        assert_eq!(batch.rest.len(), 2);
        assert!(batch.rest[0].ends_with("slow query"));
        assert!(batch.rest[1].ends_with("request done"));
    }

    #[test]
    fn test_first_of_equal_severity_wins() {
        let records = vec![
            record(LogLevel::Error, "first"),
            record(LogLevel::Error, "second"),
        ];

        let batch = reduce(&records, FixedOffset::east_opt(0)).unwrap();

        assert_eq!(batch.primary_index, 0);
        assert_eq!(batch.primary.body, LogBody::from("first"));
        assert_eq!(batch.rest.len(), 1);
        assert!(batch.rest[0].ends_with("[error][application] second"));
    }

    #[test]
    fn test_identical_records_are_distinct() {
        let records = vec![
            record(LogLevel::Warning, "same"),
            record(LogLevel::Warning, "same"),
            record(LogLevel::Warning, "same"),
        ];

        let batch = reduce(&records, FixedOffset::east_opt(0)).unwrap();

        assert_eq!(batch.primary_index, 0);
        assert_eq!(batch.rest.len(), 2);
    }

    #[test]
    fn test_single_record_has_no_rest() {
        let records = vec![record(LogLevel::Trace, "only")];
        let batch = reduce(&records, None).unwrap();

        assert_eq!(batch.primary_index, 0);
        assert!(batch.rest.is_empty());
    }

    #[test]
    fn test_empty_batch() {
        assert!(reduce(&[], None).is_none());
    }

    #[test]
    fn test_unknown_levels_order_by_value() {
        let records = vec![
            record(LogLevel::Info, "info"),
            record(LogLevel::Unknown(0x03), "odd"),
        ];

        let batch = reduce(&records, None).unwrap();
        assert_eq!(batch.primary.level, LogLevel::Unknown(0x03));
    }
}
