//! Schema discriminator for the outer Batch message
//!
//! The collector uses this single byte to decide how to parse the
//! opaque `data` field of a batch.

/// Payload kind carried in a batch's `data` field
///
/// `Unknown` exists only as the default for malformed input; the SDK
/// never emits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SchemaType {
    /// Default value for unrecognised bytes (never sent)
    Unknown = 0,
    /// Product analytics events (EventData payload)
    Event = 1,
    /// Structured log entries (LogData payload)
    Log = 2,
}

impl SchemaType {
    /// Parse schema type from raw byte value
    #[inline]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Event,
            2 => Self::Log,
            _ => Self::Unknown,
        }
    }

    /// Convert to raw byte value
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Get the string name of this schema type
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Event => "event",
            Self::Log => "log",
        }
    }
}

impl std::fmt::Display for SchemaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
