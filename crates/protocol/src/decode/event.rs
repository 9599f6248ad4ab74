//! Event decoding from EventData payloads
//!
//! # Table layout
//!
//! ```text
//! table Event {
//!     event_type   (id: 0, u8)
//!     timestamp    (id: 1, u64 ms)
//!     device_id    (id: 2, [u8;16], optional)
//!     session_id   (id: 3, [u8;16], optional)
//!     event_name   (id: 4, string)
//!     payload      (id: 5, [u8])
//! }
//! table EventData { events:[Event] (required); }
//! ```

use crate::wire::Table;
use crate::{ProtocolError, Result};

// =============================================================================
// Event Types
// =============================================================================

/// Event kinds for the different analytics processing paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum EventType {
    /// Default value (never sent)
    #[default]
    Unknown = 0,
    /// User action tracking (page views, clicks, revenue)
    Track = 1,
    /// User identification / trait updates
    Identify = 2,
    /// Group membership / trait updates
    Group = 3,
    /// Identity resolution / user merging
    Alias = 4,
    /// Generic entity enrichment
    Enrich = 5,
}

impl EventType {
    /// Parse from raw byte value
    #[inline]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Track,
            2 => Self::Identify,
            3 => Self::Group,
            4 => Self::Alias,
            5 => Self::Enrich,
            _ => Self::Unknown,
        }
    }

    /// Convert to raw byte value
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Get string representation
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Track => "track",
            Self::Identify => "identify",
            Self::Group => "group",
            Self::Alias => "alias",
            Self::Enrich => "enrich",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Decoded Event
// =============================================================================

/// A decoded event from EventData
#[derive(Debug, Clone)]
pub struct DecodedEvent<'a> {
    /// Event kind for routing
    pub event_type: EventType,
    /// Timestamp in milliseconds since epoch
    pub timestamp: u64,
    /// Device ID (16 bytes), absent unless the caller supplied one
    pub device_id: Option<&'a [u8; 16]>,
    /// Session ID (16 bytes), absent unless the caller supplied one
    pub session_id: Option<&'a [u8; 16]>,
    /// Event name (e.g. "user_signed_up")
    pub event_name: Option<&'a str>,
    /// JSON payload bytes
    pub payload: &'a [u8],
}

// =============================================================================
// EventData Parser
// =============================================================================

/// Parse an EventData payload into its events, preserving order
pub fn decode_event_data(buf: &[u8]) -> Result<Vec<DecodedEvent<'_>>> {
    let root = Table::root(buf)?;

    // Field 0: events vector
    let events = root
        .tables(0)?
        .ok_or_else(|| ProtocolError::missing_field("events"))?;

    events.iter().map(parse_event).collect()
}

/// Parse a single Event table
fn parse_event<'a>(table: &Table<'a>) -> Result<DecodedEvent<'a>> {
    Ok(DecodedEvent {
        event_type: EventType::from_u8(table.scalar_u8(0, 0)),
        timestamp: table.scalar_u64(1, 0),
        device_id: table.fixed_bytes::<16>(2)?,
        session_id: table.fixed_bytes::<16>(3)?,
        event_name: table.string(4)?,
        payload: table.bytes(5)?.unwrap_or(&[]),
    })
}
