//! Log decoding from LogData payloads
//!
//! # Table layout
//!
//! ```text
//! table LogEntry {
//!     event_type   (id: 0, u8)
//!     context_id   (id: 1, u64)
//!     level        (id: 2, u8)
//!     timestamp    (id: 3, u64 ms)
//!     source       (id: 4, string)
//!     service      (id: 5, string)
//!     payload      (id: 6, [u8])
//! }
//! table LogData { logs:[LogEntry] (required); }
//! ```

use crate::wire::Table;
use crate::{ProtocolError, Result};

// =============================================================================
// Log Event Types
// =============================================================================

/// Log event kinds for routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum LogEventType {
    /// Default/unspecified log kind
    Unknown = 0,
    /// Standard log collection
    #[default]
    Collect = 1,
    /// Log enrichment/annotation
    Enrich = 2,
}

impl LogEventType {
    /// Parse from raw byte value
    #[inline]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Collect,
            2 => Self::Enrich,
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
            Self::Collect => "collect",
            Self::Enrich => "enrich",
        }
    }
}

impl std::fmt::Display for LogEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Log Levels
// =============================================================================

/// Log severity levels (RFC 5424 syslog ordering + TRACE; 0 = most severe)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum LogLevel {
    /// System is unusable
    Emergency = 0,
    /// Action must be taken immediately
    Alert = 1,
    /// Critical conditions
    Critical = 2,
    /// Error conditions
    Error = 3,
    /// Warning conditions
    Warning = 4,
    /// Normal but significant condition
    Notice = 5,
    /// Informational messages
    #[default]
    Info = 6,
    /// Debug-level messages
    Debug = 7,
    /// Detailed tracing information
    Trace = 8,
}

impl LogLevel {
    /// Parse from raw byte value (Info for out-of-range values)
    #[inline]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Emergency,
            1 => Self::Alert,
            2 => Self::Critical,
            3 => Self::Error,
            4 => Self::Warning,
            5 => Self::Notice,
            6 => Self::Info,
            7 => Self::Debug,
            8 => Self::Trace,
            _ => Self::Info,
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
            Self::Emergency => "emergency",
            Self::Alert => "alert",
            Self::Critical => "critical",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Notice => "notice",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Decoded Log Entry
// =============================================================================

/// A decoded log entry from LogData
#[derive(Debug, Clone)]
pub struct DecodedLogEntry<'a> {
    /// Log event kind
    pub event_type: LogEventType,
    /// Correlation identifier (generated by the SDK when the caller
    /// passed 0)
    pub context_id: u64,
    /// Log severity level
    pub level: LogLevel,
    /// Timestamp in milliseconds since epoch
    pub timestamp: u64,
    /// Source hostname/instance
    pub source: Option<&'a str>,
    /// Service/application name
    pub service: Option<&'a str>,
    /// Payload bytes (JSON)
    pub payload: &'a [u8],
}

// =============================================================================
// LogData Parser
// =============================================================================

/// Parse a LogData payload into its entries, preserving order
pub fn decode_log_data(buf: &[u8]) -> Result<Vec<DecodedLogEntry<'_>>> {
    let root = Table::root(buf)?;

    // Field 0: logs vector
    let logs = root
        .tables(0)?
        .ok_or_else(|| ProtocolError::missing_field("logs"))?;

    logs.iter().map(parse_log_entry).collect()
}

/// Parse a single LogEntry table
fn parse_log_entry<'a>(table: &Table<'a>) -> Result<DecodedLogEntry<'a>> {
    Ok(DecodedLogEntry {
        event_type: LogEventType::from_u8(table.scalar_u8(0, 0)),
        context_id: table.scalar_u64(1, 0),
        level: LogLevel::from_u8(table.scalar_u8(2, LogLevel::Info.as_u8())),
        timestamp: table.scalar_u64(3, 0),
        source: table.string(4)?,
        service: table.string(5)?,
        payload: table.bytes(6)?.unwrap_or(&[]),
    })
}
