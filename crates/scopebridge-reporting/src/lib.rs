//! Request-scoped error and log reporting
//!
//! Log records collected while a request is handled are reduced to one
//! primary record, mapped to a severity and assembled into an event together
//! with a sanitized snapshot of the request. Events leave through a
//! [`Transport`].

pub mod assembler;
pub mod client;
pub mod event;
pub mod format;
pub mod hooks;
pub mod integrations;
pub mod log_target;
pub mod redact;
pub mod reducer;
pub mod scope;
pub mod severity;
pub mod snapshot;
pub mod transport;

pub use assembler::assemble;
pub use client::{Client, RequestScope};
pub use event::{
    Breadcrumb, BreadcrumbType, Event, Exception, ExceptionList, Frame, Message, Severity,
    Stacktrace, UserContext,
};
pub use hooks::{
    on_action_dispatch, on_authentication_success, ActionDispatch, HandlerDescriptor, Identity,
};
pub use integrations::{EventContext, Integration};
pub use log_target::LogTarget;
pub use redact::{redact_body_fields, redact_headers};
pub use reducer::{reduce, ReducedBatch};
pub use scope::Scope;
pub use severity::map_level;
pub use snapshot::{build_snapshot, RequestSnapshot, SnapshotError};
pub use transport::{RecordingTransport, Transport, TransportError};

pub use scopebridge_core as core;
