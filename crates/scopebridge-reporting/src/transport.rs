//! Outbound transport seam
//!
//! Delivery (HTTP, retries, batching) belongs to the transport implementation.
//! The pipeline makes exactly one `send_event` call per captured event.

use std::sync::Mutex;

use scopebridge_core::ReportingError;
use thiserror::Error;

use crate::event::Event;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Transport unavailable: {0}")]
    Unavailable(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

impl From<TransportError> for ReportingError {
    fn from(err: TransportError) -> Self {
        ReportingError::Transport(err.to_string())
    }
}

pub trait Transport: Send + Sync {
    fn send_event(&self, event: Event) -> Result<(), TransportError>;
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingTransport {
    events: Mutex<Vec<Event>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events sent so far
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Remove and return the events sent so far
    pub fn take(&self) -> Vec<Event> {
        std::mem::take(
            &mut *self
                .events
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Transport for RecordingTransport {
    fn send_event(&self, event: Event) -> Result<(), TransportError> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
        Ok(())
    }
}
