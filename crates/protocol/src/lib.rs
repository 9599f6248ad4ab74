//! UserCanal wire protocol - shared types for the collection protocol
//!
//! This crate is the contract between the SDK and the collector:
//!
//! - `SchemaType` - discriminator for the payload carried by a batch
//! - `EventType`, `LogEventType`, `LogLevel` - record enums
//! - `FlatBatch` - zero-copy parser for the outer Batch message
//! - `decode_event_data` / `decode_log_data` - inner payload parsers
//! - `ProtocolError` - typed parse failures
//!
//! # Wire Format
//!
//! Batches travel over TCP as length-prefixed frames:
//!
//! ```text
//! [4 bytes: length (big-endian)][N bytes: Batch message]
//! ```
//!
//! The Batch message itself uses a vtable-based table format parsed
//! directly without code generation. See [`flatbuf`] for the layout.
//!
//! The parsers exist so that anything receiving SDK traffic (the
//! collector, test harnesses, debugging tools) can read batches back
//! without copying; the SDK itself only encodes.

mod error;
mod flatbuf;
mod schema;
mod wire;

pub mod decode;

pub use decode::{
    DecodedData, DecodedEvent, DecodedLogEntry, EventType, LogEventType, LogLevel,
    decode_event_data, decode_log_data,
};
pub use error::ProtocolError;
pub use flatbuf::FlatBatch;
pub use schema::SchemaType;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// API key length in bytes (decoded from a 32-hex-digit credential)
pub const API_KEY_LENGTH: usize = 16;

/// Device/session identifier length in bytes
pub const UUID_LENGTH: usize = 16;

/// Hard cap on records per batch
pub const MAX_BATCH_ITEMS: usize = 1000;

/// Hard cap on the encoded size of one batch (10 MiB)
pub const MAX_BATCH_BYTES: usize = 10 * 1024 * 1024;

/// Hard cap on one record's payload (1 MiB)
pub const MAX_RECORD_BYTES: usize = 1024 * 1024;

/// Smallest buffer that could hold a valid Batch message
pub const MIN_BATCH_SIZE: usize = 16;

/// Sanity ceiling for incoming messages (16 MiB), above any legal batch
pub const MAX_REASONABLE_SIZE: usize = 16 * 1024 * 1024;

// Test modules - only compiled during testing
#[cfg(test)]
mod flatbuf_test;
