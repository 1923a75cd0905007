//! Text rendering of log records

use chrono::{DateTime, FixedOffset, Local, Utc};
use scopebridge_core::{LogRecord, StackFrame};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %:z";

/// Render a unix timestamp as wall clock time in the given offset
///
/// Without a configured offset the local zone is used. The suffix is always
/// the offset the time was rendered in.
pub fn format_timestamp(timestamp: f64, offset: Option<FixedOffset>) -> String {
    let secs = timestamp.trunc() as i64;
    let nanos = (timestamp.fract().abs() * 1_000_000_000.0) as u32;

    let Some(utc) = DateTime::<Utc>::from_timestamp(secs, nanos) else {
        return timestamp.to_string();
    };
    let time = match offset {
        Some(offset) => utc.with_timezone(&offset),
        None => utc.with_timezone(&Local).fixed_offset(),
    };
    time.format(TIME_FORMAT).to_string()
}

pub fn format_frame(frame: &StackFrame) -> String {
    format!("in {}:{}", frame.file, frame.line)
}

/// Single line rendering used for the `logs` extra, traces indented below
pub fn format_record(record: &LogRecord, offset: Option<FixedOffset>) -> String {
    let mut line = format!(
        "{} [{}][{}] {}",
        format_timestamp(record.timestamp, offset),
        record.level.name(),
        record.category().unwrap_or("application"),
        record.body.to_text()
    );

    for frame in record.stack_frames.iter().flatten() {
        line.push_str("\n    ");
        line.push_str(&format_frame(frame));
    }
    line
}
