//! Mapping of log levels to event severities

use scopebridge_core::{LogLevel, ReportingError, ReportingResult};

use crate::event::Severity;

/// Map a log level to the external severity
///
/// Unknown levels are an error: they mean the host logger and this crate
/// disagree on the level enumeration.
pub fn map_level(level: LogLevel) -> ReportingResult<Severity> {
    match level {
        LogLevel::Trace | LogLevel::Profile | LogLevel::ProfileBegin | LogLevel::ProfileEnd => {
            Ok(Severity::Debug)
        }
        LogLevel::Info => Ok(Severity::Info),
        LogLevel::Warning => Ok(Severity::Warning),
        LogLevel::Error => Ok(Severity::Error),
        LogLevel::Unknown(value) => Err(ReportingError::UnsupportedLevel(value)),
    }
}
