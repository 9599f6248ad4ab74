//! Conversion from caller input to internal transport records
//!
//! Validation and payload serialisation happen here, once, at enqueue
//! time. The payload is a compact JSON object carrying the
//! human-readable envelope fields; by the time a record reaches an
//! accumulator its cost is fixed and bounded.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Map, json};
use usercanal_protocol::EventType;

use crate::error::{Error, Result};
use crate::identity;
use crate::transport::{EventRecord, LogRecord};
use crate::types::{Event, EventAdvanced, LogEntry, Properties, Revenue};

/// Event name used for revenue tracking payloads
const REVENUE_EVENT_NAME: &str = "order_completed";

/// Milliseconds since the Unix epoch
pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Use the caller's timestamp when set, otherwise stamp now
fn resolve_timestamp(timestamp: Option<u64>) -> u64 {
    match timestamp {
        Some(ts) if ts > 0 => ts,
        _ => now_ms(),
    }
}

fn properties_json(props: &Properties) -> Result<serde_json::Value> {
    serde_json::to_value(props).map_err(|err| Error::validation("properties", err.to_string()))
}

fn marshal(payload: &serde_json::Value) -> Result<Vec<u8>> {
    serde_json::to_vec(payload).map_err(|err| Error::validation("payload", err.to_string()))
}

/// Convert a tracking event
pub(crate) fn event_record(event: &Event) -> Result<EventRecord> {
    event.validate()?;

    let payload = marshal(&json!({
        "user_id": event.user_id,
        "name": event.name,
        "properties": properties_json(&event.properties)?,
    }))?;

    Ok(EventRecord {
        timestamp: resolve_timestamp(event.timestamp),
        event_type: EventType::Track,
        name: event.name.clone(),
        device_id: None,
        session_id: None,
        payload,
    })
}

/// Convert an identify call
pub(crate) fn identify_record(user_id: &str, traits: &Properties) -> Result<EventRecord> {
    crate::types::validate_user_id(user_id)?;
    crate::types::validate_properties(traits)?;

    let payload = marshal(&json!({
        "user_id": user_id,
        "traits": properties_json(traits)?,
    }))?;

    Ok(EventRecord {
        timestamp: now_ms(),
        event_type: EventType::Identify,
        name: "identify".to_string(),
        device_id: None,
        session_id: None,
        payload,
    })
}

/// Convert a group call
pub(crate) fn group_record(
    user_id: &str,
    group_id: &str,
    properties: &Properties,
) -> Result<EventRecord> {
    crate::types::validate_user_id(user_id)?;
    if group_id.is_empty() {
        return Err(Error::validation("group_id", "is required"));
    }
    crate::types::validate_properties(properties)?;

    let payload = marshal(&json!({
        "user_id": user_id,
        "group_id": group_id,
        "properties": properties_json(properties)?,
    }))?;

    Ok(EventRecord {
        timestamp: now_ms(),
        event_type: EventType::Group,
        name: "group".to_string(),
        device_id: None,
        session_id: None,
        payload,
    })
}

/// Convert a revenue event
///
/// The order identifier belongs in the payload properties; the envelope
/// only carries the user performing the purchase.
pub(crate) fn revenue_record(revenue: &Revenue) -> Result<EventRecord> {
    revenue.validate()?;

    let mut properties = Map::new();
    properties.insert("order_id".to_string(), json!(revenue.order_id));
    properties.insert("revenue".to_string(), json!(revenue.amount));
    properties.insert("currency".to_string(), json!(revenue.currency));
    if let Some(ref revenue_type) = revenue.revenue_type {
        properties.insert("type".to_string(), json!(revenue_type));
    }
    if !revenue.products.is_empty() {
        let products: Vec<serde_json::Value> = revenue
            .products
            .iter()
            .map(|p| {
                json!({
                    "id": p.id,
                    "name": p.name,
                    "price": p.price,
                    "quantity": p.quantity,
                })
            })
            .collect();
        properties.insert("products".to_string(), json!(products));
    }

    // Custom properties merge over the envelope ones
    if let serde_json::Value::Object(custom) = properties_json(&revenue.properties)? {
        for (key, value) in custom {
            properties.insert(key, value);
        }
    }

    let payload = marshal(&json!({
        "user_id": revenue.user_id,
        "name": REVENUE_EVENT_NAME,
        "properties": properties,
    }))?;

    Ok(EventRecord {
        timestamp: now_ms(),
        event_type: EventType::Track,
        name: REVENUE_EVENT_NAME.to_string(),
        device_id: None,
        session_id: None,
        payload,
    })
}

/// Convert an event with explicit overrides
pub(crate) fn advanced_record(event: &EventAdvanced) -> Result<EventRecord> {
    event.validate()?;

    let payload = marshal(&json!({
        "user_id": event.user_id,
        "name": event.name,
        "properties": properties_json(&event.properties)?,
    }))?;

    Ok(EventRecord {
        timestamp: resolve_timestamp(event.timestamp),
        event_type: EventType::Track,
        name: event.name.clone(),
        device_id: event.device_id,
        session_id: event.session_id,
        payload,
    })
}

/// Convert a log entry
///
/// Expects `source` to already be defaulted by the façade. Generates a
/// context id when the caller passed 0, and merges `message` with the
/// structured data into one payload object.
pub(crate) fn log_record(entry: &LogEntry) -> Result<LogRecord> {
    entry.validate()?;

    let context_id = if entry.context_id == 0 {
        identity::new_context_id()
    } else {
        entry.context_id
    };

    let mut payload = Map::new();
    if !entry.message.is_empty() {
        payload.insert("message".to_string(), json!(entry.message));
    }
    if let serde_json::Value::Object(data) = properties_json(&entry.data)? {
        for (key, value) in data {
            payload.insert(key, value);
        }
    }

    Ok(LogRecord {
        event_type: entry.event_type,
        context_id,
        level: entry.level,
        timestamp: resolve_timestamp(entry.timestamp),
        source: entry.source.clone(),
        service: entry.service.clone(),
        payload: marshal(&serde_json::Value::Object(payload))?,
    })
}

#[cfg(test)]
#[path = "convert_test.rs"]
mod convert_test;
