//! Event assembly
//!
//! Turns the reduced batch into an [`Event`]. Error bodies become exception
//! events, everything else a message event carrying the raw body, its time
//! and its traces as extras. The caller's [`Scope`] contributes tags,
//! breadcrumbs and user; request data is attached at capture time by the
//! `request` integration.

use scopebridge_core::{ClientOptions, ErrorValue, LogBody, LogRecord, ReportingResult, StackFrame};
use serde_json::Value;

use crate::event::{Event, Exception, ExceptionList, Frame, Message, Severity, Stacktrace};
use crate::format::{format_frame, format_timestamp};
use crate::scope::Scope;
use crate::severity::map_level;

pub const NOT_AVAILABLE: &str = "N/A";

/// Assemble the event for a reduced batch
///
/// Fails only when a message record carries a level with no severity.
pub fn assemble(
    primary: &LogRecord,
    rest: &[String],
    scope: &Scope,
    options: &ClientOptions,
) -> ReportingResult<Event> {
    let mut event = match &primary.body {
        LogBody::Error(err) => {
            exception_event(err, primary.stack_frames.as_deref(), &options.environment)
        }
        body => {
            let severity = map_level(primary.level)?;
            let mut event = message_event(body.to_text(), severity, &options.environment);
            event.extra.insert("real_body".to_string(), body.to_value());
            event.extra.insert(
                "real_time".to_string(),
                Value::String(format_timestamp(primary.timestamp, options.time_zone)),
            );
            event
                .extra
                .insert("traces".to_string(), traces_value(primary.stack_frames.as_deref()));
            event
        }
    };

    if let Some(category) = primary.category() {
        event.tags.insert("category".to_string(), category.to_string());
    }
    event.extra.insert("logs".to_string(), logs_value(rest));

    scope.apply_to_event(&mut event);
    Ok(event)
}

/// Exception event for `error`, root cause first
///
/// The error's own frames are used when present, `fallback_frames` otherwise.
pub fn exception_event(
    error: &ErrorValue,
    fallback_frames: Option<&[StackFrame]>,
    environment: &str,
) -> Event {
    let frames = if error.frames.is_empty() {
        fallback_frames.unwrap_or_default()
    } else {
        error.frames.as_slice()
    };

    let mut values: Vec<Exception> = error
        .sources
        .iter()
        .rev()
        .map(|source| Exception {
            ty: "Error".to_string(),
            value: source.clone(),
            stacktrace: None,
        })
        .collect();
    values.push(Exception {
        ty: error.type_name.clone(),
        value: error.message.clone(),
        stacktrace: stacktrace(frames),
    });

    let mut event = Event::new(Severity::Error, environment);
    event.exception = Some(ExceptionList { values });
    event
}

pub fn message_event(text: impl Into<String>, level: Severity, environment: &str) -> Event {
    let mut event = Event::new(level, environment);
    event.message = Some(Message {
        formatted: text.into(),
    });
    event
}

fn stacktrace(frames: &[StackFrame]) -> Option<Stacktrace> {
    if frames.is_empty() {
        return None;
    }
    Some(Stacktrace {
        frames: frames
            .iter()
            .map(|frame| Frame {
                filename: frame.file.clone(),
                abs_path: frame.file.clone(),
                lineno: frame.line,
                in_app: None,
            })
            .collect(),
    })
}

fn traces_value(frames: Option<&[StackFrame]>) -> Value {
    match frames {
        Some(frames) if !frames.is_empty() => {
            Value::Array(frames.iter().map(|f| Value::String(format_frame(f))).collect())
        }
        _ => Value::String(NOT_AVAILABLE.to_string()),
    }
}

fn logs_value(rest: &[String]) -> Value {
    if rest.is_empty() {
        Value::String(NOT_AVAILABLE.to_string())
    } else {
        Value::Array(rest.iter().cloned().map(Value::String).collect())
    }
}
