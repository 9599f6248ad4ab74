//! Transport layer: internal record shapes, connection management, and
//! the frame sender
//!
//! Records enter this layer already validated and with their JSON
//! payload built; from here they are owned by an accumulator until a
//! flush hands them to the [`Sender`], which encodes and writes them as
//! one length-prefixed frame.

mod connection;
mod sender;

pub(crate) use sender::Sender;

use usercanal_protocol::{EventType, LogEventType, LogLevel};

/// Internal event shape carried from enqueue to encode
#[derive(Debug, Clone)]
pub(crate) struct EventRecord {
    /// Milliseconds since epoch, non-zero by the time it is enqueued
    pub timestamp: u64,
    /// Event kind
    pub event_type: EventType,
    /// Event name
    pub name: String,
    /// Explicit device identifier, if the caller overrode it
    pub device_id: Option<[u8; 16]>,
    /// Explicit session identifier, if the caller overrode it
    pub session_id: Option<[u8; 16]>,
    /// JSON payload, built once at enqueue time
    pub payload: Vec<u8>,
}

/// Internal log shape carried from enqueue to encode
#[derive(Debug, Clone)]
pub(crate) struct LogRecord {
    /// Log kind
    pub event_type: LogEventType,
    /// Correlation identifier, non-zero by the time it is enqueued
    pub context_id: u64,
    /// Severity level
    pub level: LogLevel,
    /// Milliseconds since epoch, non-zero by the time it is enqueued
    pub timestamp: u64,
    /// Source hostname/instance
    pub source: String,
    /// Service name
    pub service: String,
    /// JSON payload, built once at enqueue time
    pub payload: Vec<u8>,
}
