//! Decoders for the nested payloads carried in a batch's `data` field
//!
//! The outer [`crate::FlatBatch`] exposes `data` as opaque bytes; these
//! parsers interpret it as `EventData` (a vector of events) or
//! `LogData` (a vector of log entries) according to the batch's schema
//! type. Both are thin typed layers over the shared `wire` table
//! reader; parsing is zero-copy and decoded records borrow from the
//! input buffer.
//!
//! ```ignore
//! use usercanal_protocol::{FlatBatch, SchemaType, decode_event_data, decode_log_data};
//!
//! let batch = FlatBatch::parse(msg)?;
//! let data = batch.data()?;
//!
//! match batch.schema_type() {
//!     SchemaType::Event => {
//!         for event in decode_event_data(data)? {
//!             println!("{}: {}", event.event_name.unwrap_or("-"), event.timestamp);
//!         }
//!     }
//!     SchemaType::Log => {
//!         for log in decode_log_data(data)? {
//!             println!("[{}] {}", log.level, log.service.unwrap_or("-"));
//!         }
//!     }
//!     SchemaType::Unknown => {}
//! }
//! ```

mod event;
mod log;

pub use event::{DecodedEvent, EventType, decode_event_data};
pub use log::{DecodedLogEntry, LogEventType, LogLevel, decode_log_data};

// =============================================================================
// Decoded Batch Result
// =============================================================================

/// Result of decoding a batch data payload
#[derive(Debug)]
pub enum DecodedData<'a> {
    /// Contains decoded events
    Events(Vec<DecodedEvent<'a>>),
    /// Contains decoded log entries
    Logs(Vec<DecodedLogEntry<'a>>),
}

impl<'a> DecodedData<'a> {
    /// Get as events, if this is an Events variant
    pub fn as_events(&self) -> Option<&Vec<DecodedEvent<'a>>> {
        match self {
            DecodedData::Events(e) => Some(e),
            _ => None,
        }
    }

    /// Get as logs, if this is a Logs variant
    pub fn as_logs(&self) -> Option<&Vec<DecodedLogEntry<'a>>> {
        match self {
            DecodedData::Logs(l) => Some(l),
            _ => None,
        }
    }

    /// Get the number of records in the decoded data
    pub fn len(&self) -> usize {
        match self {
            DecodedData::Events(e) => e.len(),
            DecodedData::Logs(l) => l.len(),
        }
    }

    /// Check if the decoded data is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
