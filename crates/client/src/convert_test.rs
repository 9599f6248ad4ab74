//! Tests for input-to-record conversion and payload serialisation

use usercanal_protocol::{EventType, LogEventType, LogLevel};

use super::*;
use crate::types::{Product, Value};

fn payload_json(payload: &[u8]) -> serde_json::Value {
    serde_json::from_slice(payload).expect("payload should be valid JSON")
}

#[test]
fn test_event_record_shape() {
    let mut properties = crate::types::Properties::new();
    properties.insert("method".to_string(), Value::from("email"));

    let event = Event {
        user_id: "u1".into(),
        name: "user_signed_up".into(),
        properties,
        timestamp: None,
    };
    let record = event_record(&event).unwrap();

    assert_eq!(record.event_type, EventType::Track);
    assert_eq!(record.name, "user_signed_up");
    assert!(record.timestamp > 0);
    assert!(record.device_id.is_none());
    assert!(record.session_id.is_none());

    let json = payload_json(&record.payload);
    assert_eq!(json["user_id"], "u1");
    assert_eq!(json["name"], "user_signed_up");
    assert_eq!(json["properties"]["method"], "email");
}

#[test]
fn test_event_record_honours_caller_timestamp() {
    let event = Event {
        user_id: "u1".into(),
        name: "n".into(),
        timestamp: Some(1_700_000_000_000),
        ..Event::default()
    };
    let record = event_record(&event).unwrap();
    assert_eq!(record.timestamp, 1_700_000_000_000);
}

#[test]
fn test_event_record_rejects_invalid() {
    let event = Event {
        name: "n".into(),
        ..Event::default()
    };
    assert!(event_record(&event).unwrap_err().is_validation());
}

#[test]
fn test_identify_record_shape() {
    let mut traits = crate::types::Properties::new();
    traits.insert("plan".to_string(), Value::from("pro"));

    let record = identify_record("u1", &traits).unwrap();

    assert_eq!(record.event_type, EventType::Identify);
    assert!(record.timestamp > 0);

    let json = payload_json(&record.payload);
    assert_eq!(json["user_id"], "u1");
    assert_eq!(json["traits"]["plan"], "pro");
}

#[test]
fn test_group_record_shape() {
    let record = group_record("u1", "team-9", &crate::types::Properties::new()).unwrap();

    assert_eq!(record.event_type, EventType::Group);

    let json = payload_json(&record.payload);
    assert_eq!(json["user_id"], "u1");
    assert_eq!(json["group_id"], "team-9");
}

#[test]
fn test_group_record_requires_group_id() {
    let err = group_record("u1", "", &crate::types::Properties::new()).unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn test_revenue_record_shape() {
    let mut properties = crate::types::Properties::new();
    properties.insert("coupon".to_string(), Value::from("SAVE10"));

    let revenue = Revenue {
        user_id: "u1".into(),
        order_id: "ord-42".into(),
        amount: 19.99,
        currency: "USD".into(),
        revenue_type: Some("subscription".into()),
        products: vec![Product {
            id: "p1".into(),
            name: "Pro".into(),
            price: 19.99,
            quantity: 1,
        }],
        properties,
    };
    let record = revenue_record(&revenue).unwrap();

    assert_eq!(record.event_type, EventType::Track);
    assert_eq!(record.name, "order_completed");

    let json = payload_json(&record.payload);
    assert_eq!(json["user_id"], "u1");
    assert_eq!(json["name"], "order_completed");

    // The order identifier lives in the payload, not the envelope
    let props = &json["properties"];
    assert_eq!(props["order_id"], "ord-42");
    assert_eq!(props["revenue"], 19.99);
    assert_eq!(props["currency"], "USD");
    assert_eq!(props["type"], "subscription");
    assert_eq!(props["coupon"], "SAVE10");
    assert_eq!(props["products"][0]["id"], "p1");
    assert_eq!(props["products"][0]["quantity"], 1);
}

#[test]
fn test_revenue_record_omits_optional_fields() {
    let revenue = Revenue {
        user_id: "u1".into(),
        order_id: "ord-1".into(),
        amount: 1.0,
        currency: "EUR".into(),
        ..Revenue::default()
    };
    let record = revenue_record(&revenue).unwrap();

    let json = payload_json(&record.payload);
    assert!(json["properties"].get("type").is_none());
    assert!(json["properties"].get("products").is_none());
}

#[test]
fn test_advanced_record_overrides() {
    let event = EventAdvanced {
        user_id: "u1".into(),
        name: "custom".into(),
        device_id: Some([0xAA; 16]),
        session_id: Some([0xBB; 16]),
        timestamp: Some(123_456),
        ..EventAdvanced::default()
    };
    let record = advanced_record(&event).unwrap();

    assert_eq!(record.timestamp, 123_456);
    assert_eq!(record.device_id, Some([0xAA; 16]));
    assert_eq!(record.session_id, Some([0xBB; 16]));
}

#[test]
fn test_advanced_record_without_overrides_leaves_ids_absent() {
    let event = EventAdvanced {
        user_id: "u1".into(),
        name: "custom".into(),
        ..EventAdvanced::default()
    };
    let record = advanced_record(&event).unwrap();

    assert!(record.device_id.is_none());
    assert!(record.session_id.is_none());
    assert!(record.timestamp > 0);
}

#[test]
fn test_log_record_shape() {
    let mut data = crate::types::Properties::new();
    data.insert("status".to_string(), Value::Int(200));

    let entry = LogEntry {
        level: LogLevel::Warning,
        context_id: 42,
        source: "web-01".into(),
        service: "api".into(),
        message: "slow request".into(),
        data,
        ..LogEntry::default()
    };
    let record = log_record(&entry).unwrap();

    assert_eq!(record.event_type, LogEventType::Collect);
    assert_eq!(record.level, LogLevel::Warning);
    assert_eq!(record.context_id, 42);
    assert_eq!(record.source, "web-01");
    assert_eq!(record.service, "api");
    assert!(record.timestamp > 0);

    let json = payload_json(&record.payload);
    assert_eq!(json["message"], "slow request");
    assert_eq!(json["status"], 200);
}

#[test]
fn test_log_record_generates_context_id() {
    let entry = LogEntry {
        source: "web-01".into(),
        service: "api".into(),
        message: "hello".into(),
        ..LogEntry::default()
    };

    let record = log_record(&entry).unwrap();
    assert_ne!(record.context_id, 0);

    // Two conversions of the same entry get distinct context ids
    let other = log_record(&entry).unwrap();
    assert_ne!(record.context_id, other.context_id);
}

#[test]
fn test_log_record_data_only() {
    let mut data = crate::types::Properties::new();
    data.insert("event".to_string(), Value::from("gc_pause"));

    let entry = LogEntry {
        source: "web-01".into(),
        service: "api".into(),
        data,
        ..LogEntry::default()
    };
    let record = log_record(&entry).unwrap();

    let json = payload_json(&record.payload);
    assert!(json.get("message").is_none());
    assert_eq!(json["event"], "gc_pause");
}

#[test]
fn test_log_record_rejects_invalid() {
    // Source left empty: the façade defaults it before conversion, so
    // conversion itself must reject
    let entry = LogEntry {
        service: "api".into(),
        message: "hello".into(),
        ..LogEntry::default()
    };
    assert!(log_record(&entry).unwrap_err().is_validation());
}

#[test]
fn test_now_ms_is_recent() {
    // Sanity: after 2023-01-01, before 2100
    let now = now_ms();
    assert!(now > 1_672_531_200_000);
    assert!(now < 4_102_444_800_000);
}
