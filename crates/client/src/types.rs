//! Host-facing record types and validation
//!
//! Callers hand the SDK the shapes in this module; the façade validates
//! them, converts them to the internal transport records, and enqueues.
//! Property values are a closed tagged set ([`Value`]) so unsupported
//! shapes are unrepresentable rather than rejected at runtime.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};

pub use usercanal_protocol::{EventType, LogEventType, LogLevel};

/// Max `user_id` length in bytes
pub const MAX_USER_ID_LEN: usize = 255;

/// Max event name length in bytes
pub const MAX_EVENT_NAME_LEN: usize = 128;

/// Max number of properties per record
pub const MAX_PROPERTIES: usize = 64;

/// Max property key length in characters
pub const MAX_PROPERTY_KEY_LEN: usize = 64;

/// Max serialised size of one property value (1 KiB)
pub const MAX_PROPERTY_VALUE_BYTES: usize = 1024;

/// Max log `service` length in bytes
pub const MAX_SERVICE_LEN: usize = 64;

/// Max log `source` length in bytes
pub const MAX_SOURCE_LEN: usize = 128;

/// Max log `message` length in bytes (8 KiB)
pub const MAX_MESSAGE_LEN: usize = 8 * 1024;

/// Max number of structured `data` entries per log entry
pub const MAX_DATA_ENTRIES: usize = 32;

/// A map of property values attached to an event or log entry
pub type Properties = BTreeMap<String, Value>;

/// A property value
///
/// The supported set is closed: null, string, signed 64-bit integer,
/// 64-bit float, boolean, timestamp, plus nested lists and maps of the
/// same. Timestamps serialise as RFC 3339 strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// JSON null
    Null,
    /// Boolean
    Bool(bool),
    /// Signed 64-bit integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Point in time, serialised as RFC 3339
    Time(DateTime<Utc>),
    /// Nested list
    List(Vec<Value>),
    /// Nested map
    Map(BTreeMap<String, Value>),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Time(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Self::Map(v)
    }
}

// =============================================================================
// Events
// =============================================================================

/// A tracking event as supplied by the caller
#[derive(Debug, Clone, Default)]
pub struct Event {
    /// User performing the action (required, ≤255 bytes)
    pub user_id: String,
    /// Event name (required, ≤128 bytes)
    pub name: String,
    /// Event properties
    pub properties: Properties,
    /// Milliseconds since epoch; filled at enqueue time when `None`
    pub timestamp: Option<u64>,
}

impl Event {
    /// Validate caller input
    pub fn validate(&self) -> Result<()> {
        validate_user_id(&self.user_id)?;
        validate_event_name(&self.name)?;
        validate_properties(&self.properties)
    }
}

/// A tracking event with explicit identity and timestamp overrides
///
/// The plain ingest path never autogenerates device or session ids;
/// their absence is meaningful to the collector. This shape is the only
/// way to set them.
#[derive(Debug, Clone, Default)]
pub struct EventAdvanced {
    /// User performing the action (required, ≤255 bytes)
    pub user_id: String,
    /// Event name (required, ≤128 bytes)
    pub name: String,
    /// Event properties
    pub properties: Properties,
    /// Explicit device identifier (16 bytes)
    pub device_id: Option<[u8; 16]>,
    /// Explicit session identifier (16 bytes)
    pub session_id: Option<[u8; 16]>,
    /// Milliseconds since epoch; filled at enqueue time when `None`
    pub timestamp: Option<u64>,
}

impl EventAdvanced {
    /// Validate caller input
    pub fn validate(&self) -> Result<()> {
        validate_user_id(&self.user_id)?;
        validate_event_name(&self.name)?;
        validate_properties(&self.properties)
    }
}

// =============================================================================
// Revenue
// =============================================================================

/// A revenue event
///
/// The order identifier travels in the payload, not the envelope.
#[derive(Debug, Clone, Default)]
pub struct Revenue {
    /// User who made the purchase (required)
    pub user_id: String,
    /// Order identifier (required)
    pub order_id: String,
    /// Amount, must be positive
    pub amount: f64,
    /// Currency code (required, e.g. "USD")
    pub currency: String,
    /// Revenue classification (e.g. "subscription"), if any
    pub revenue_type: Option<String>,
    /// Product line items
    pub products: Vec<Product>,
    /// Additional properties merged into the payload
    pub properties: Properties,
}

impl Revenue {
    /// Validate caller input
    pub fn validate(&self) -> Result<()> {
        validate_user_id(&self.user_id)?;
        if self.order_id.is_empty() {
            return Err(Error::validation("order_id", "is required"));
        }
        if self.amount <= 0.0 {
            return Err(Error::validation("amount", "must be positive"));
        }
        if self.currency.is_empty() {
            return Err(Error::validation("currency", "is required"));
        }
        for (i, product) in self.products.iter().enumerate() {
            product
                .validate()
                .map_err(|err| match err {
                    Error::Validation { field, message } => Error::validation(
                        format!("products[{i}].{field}"),
                        message,
                    ),
                    other => other,
                })?;
        }
        validate_properties(&self.properties)
    }
}

/// A product line item in a revenue event
#[derive(Debug, Clone, Default)]
pub struct Product {
    /// Product identifier (required)
    pub id: String,
    /// Display name
    pub name: String,
    /// Unit price, must not be negative
    pub price: f64,
    /// Quantity, must be positive
    pub quantity: u32,
}

impl Product {
    /// Validate caller input
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::validation("id", "is required"));
        }
        if self.price < 0.0 {
            return Err(Error::validation("price", "cannot be negative"));
        }
        if self.quantity == 0 {
            return Err(Error::validation("quantity", "must be positive"));
        }
        Ok(())
    }
}

// =============================================================================
// Logs
// =============================================================================

/// A structured log entry as supplied by the caller
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Log kind for routing
    pub event_type: LogEventType,
    /// Correlation identifier; generated at enqueue time when 0
    pub context_id: u64,
    /// Severity level
    pub level: LogLevel,
    /// Milliseconds since epoch; filled at enqueue time when `None`
    pub timestamp: Option<u64>,
    /// Source hostname/instance; defaults to the process hostname
    pub source: String,
    /// Service/application name (required, ≤64 bytes)
    pub service: String,
    /// Human-readable message (≤8 KiB)
    pub message: String,
    /// Structured data merged into the payload (≤32 entries)
    pub data: Properties,
}

impl Default for LogEntry {
    fn default() -> Self {
        Self {
            event_type: LogEventType::Collect,
            context_id: 0,
            level: LogLevel::Info,
            timestamp: None,
            source: String::new(),
            service: String::new(),
            message: String::new(),
            data: Properties::new(),
        }
    }
}

impl LogEntry {
    /// Validate caller input
    ///
    /// Expects `source` to already be defaulted; the façade substitutes
    /// the process hostname before validation.
    pub fn validate(&self) -> Result<()> {
        if self.service.is_empty() {
            return Err(Error::validation("service", "is required"));
        }
        if self.service.len() > MAX_SERVICE_LEN {
            return Err(Error::validation(
                "service",
                format!("exceeds {MAX_SERVICE_LEN} bytes"),
            ));
        }
        if self.source.is_empty() {
            return Err(Error::validation("source", "is required"));
        }
        if self.source.len() > MAX_SOURCE_LEN {
            return Err(Error::validation(
                "source",
                format!("exceeds {MAX_SOURCE_LEN} bytes"),
            ));
        }
        if self.message.len() > MAX_MESSAGE_LEN {
            return Err(Error::validation(
                "message",
                format!("exceeds {MAX_MESSAGE_LEN} bytes"),
            ));
        }
        if self.data.len() > MAX_DATA_ENTRIES {
            return Err(Error::validation(
                "data",
                format!("exceeds {MAX_DATA_ENTRIES} entries"),
            ));
        }
        if self.message.is_empty() && self.data.is_empty() {
            return Err(Error::validation(
                "content",
                "either message or data is required",
            ));
        }
        validate_properties(&self.data)
    }
}

// =============================================================================
// Validation helpers
// =============================================================================

pub(crate) fn validate_user_id(user_id: &str) -> Result<()> {
    if user_id.is_empty() {
        return Err(Error::validation("user_id", "is required"));
    }
    if user_id.len() > MAX_USER_ID_LEN {
        return Err(Error::validation(
            "user_id",
            format!("exceeds {MAX_USER_ID_LEN} bytes"),
        ));
    }
    Ok(())
}

pub(crate) fn validate_event_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::validation("name", "is required"));
    }
    if name.len() > MAX_EVENT_NAME_LEN {
        return Err(Error::validation(
            "name",
            format!("exceeds {MAX_EVENT_NAME_LEN} bytes"),
        ));
    }
    Ok(())
}

pub(crate) fn validate_properties(props: &Properties) -> Result<()> {
    if props.len() > MAX_PROPERTIES {
        return Err(Error::validation(
            "properties",
            format!("exceeds {MAX_PROPERTIES} entries"),
        ));
    }

    for (key, value) in props {
        if key.is_empty() {
            return Err(Error::validation("property key", "cannot be empty"));
        }
        if key.chars().count() > MAX_PROPERTY_KEY_LEN {
            return Err(Error::validation(
                format!("property '{key}'"),
                format!("key exceeds {MAX_PROPERTY_KEY_LEN} characters"),
            ));
        }

        // Value shape is enforced by the type; only the serialised size
        // needs a runtime check.
        let serialized = serde_json::to_vec(value)
            .map_err(|err| Error::validation(format!("property '{key}'"), err.to_string()))?;
        if serialized.len() > MAX_PROPERTY_VALUE_BYTES {
            return Err(Error::validation(
                format!("property '{key}'"),
                format!("value exceeds {MAX_PROPERTY_VALUE_BYTES} bytes serialised"),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
