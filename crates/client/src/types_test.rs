//! Tests for record validation and property value serialisation

use chrono::{TimeZone, Utc};

use super::*;

fn props(entries: &[(&str, Value)]) -> Properties {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

// =============================================================================
// Value serialisation
// =============================================================================

#[test]
fn test_value_null_serialises_to_json_null() {
    assert_eq!(serde_json::to_string(&Value::Null).unwrap(), "null");
}

#[test]
fn test_value_scalars() {
    assert_eq!(serde_json::to_string(&Value::Bool(true)).unwrap(), "true");
    assert_eq!(serde_json::to_string(&Value::Int(-7)).unwrap(), "-7");
    assert_eq!(serde_json::to_string(&Value::Float(1.5)).unwrap(), "1.5");
    assert_eq!(
        serde_json::to_string(&Value::String("hi".into())).unwrap(),
        "\"hi\""
    );
}

#[test]
fn test_value_time_serialises_as_rfc3339() {
    let time = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
    let json = serde_json::to_string(&Value::Time(time)).unwrap();
    assert!(json.starts_with("\"2024-05-01T12:30:00"), "got {json}");
}

#[test]
fn test_value_nested() {
    let value = Value::List(vec![
        Value::Int(1),
        Value::Map(props(&[("k", Value::from("v"))])),
    ]);
    assert_eq!(
        serde_json::to_string(&value).unwrap(),
        r#"[1,{"k":"v"}]"#
    );
}

#[test]
fn test_value_from_conversions() {
    assert_eq!(Value::from(true), Value::Bool(true));
    assert_eq!(Value::from(42i64), Value::Int(42));
    assert_eq!(Value::from(42i32), Value::Int(42));
    assert_eq!(Value::from(42u32), Value::Int(42));
    assert_eq!(Value::from(2.5f64), Value::Float(2.5));
    assert_eq!(Value::from("s"), Value::String("s".into()));
}

// =============================================================================
// Event validation
// =============================================================================

#[test]
fn test_event_valid() {
    let event = Event {
        user_id: "u1".into(),
        name: "user_signed_up".into(),
        properties: props(&[("method", Value::from("email"))]),
        timestamp: None,
    };
    assert!(event.validate().is_ok());
}

#[test]
fn test_event_missing_user_id() {
    let event = Event {
        name: "x".into(),
        ..Event::default()
    };
    assert!(event.validate().unwrap_err().is_validation());
}

#[test]
fn test_event_user_id_boundary() {
    let mut event = Event {
        user_id: "u".repeat(MAX_USER_ID_LEN),
        name: "x".into(),
        ..Event::default()
    };
    assert!(event.validate().is_ok());

    event.user_id.push('u');
    assert!(event.validate().is_err());
}

#[test]
fn test_event_name_boundary() {
    let mut event = Event {
        user_id: "u1".into(),
        name: "n".repeat(MAX_EVENT_NAME_LEN),
        ..Event::default()
    };
    assert!(event.validate().is_ok());

    event.name.push('n');
    assert!(event.validate().is_err());
}

#[test]
fn test_properties_count_boundary() {
    let at_cap: Properties = (0..MAX_PROPERTIES)
        .map(|i| (format!("k{i}"), Value::Int(i as i64)))
        .collect();
    assert!(validate_properties(&at_cap).is_ok());

    let over: Properties = (0..MAX_PROPERTIES + 1)
        .map(|i| (format!("k{i}"), Value::Int(i as i64)))
        .collect();
    assert!(validate_properties(&over).is_err());
}

#[test]
fn test_property_key_boundary() {
    let key = "k".repeat(MAX_PROPERTY_KEY_LEN);
    let ok = props(&[(key.as_str(), Value::Null)]);
    assert!(validate_properties(&ok).is_ok());

    let key = "k".repeat(MAX_PROPERTY_KEY_LEN + 1);
    let over = props(&[(key.as_str(), Value::Null)]);
    assert!(validate_properties(&over).is_err());
}

#[test]
fn test_property_empty_key_rejected() {
    let bad = props(&[("", Value::Null)]);
    assert!(validate_properties(&bad).is_err());
}

#[test]
fn test_property_value_size_boundary() {
    // A string of N chars serialises to N+2 bytes with quotes
    let at_cap = props(&[("k", Value::from("v".repeat(MAX_PROPERTY_VALUE_BYTES - 2)))]);
    assert!(validate_properties(&at_cap).is_ok());

    let over = props(&[("k", Value::from("v".repeat(MAX_PROPERTY_VALUE_BYTES - 1)))]);
    assert!(validate_properties(&over).is_err());
}

// =============================================================================
// Revenue validation
// =============================================================================

fn valid_revenue() -> Revenue {
    Revenue {
        user_id: "u1".into(),
        order_id: "ord-1".into(),
        amount: 9.99,
        currency: "USD".into(),
        revenue_type: Some("subscription".into()),
        products: vec![Product {
            id: "p1".into(),
            name: "Pro Plan".into(),
            price: 9.99,
            quantity: 1,
        }],
        properties: Properties::new(),
    }
}

#[test]
fn test_revenue_valid() {
    assert!(valid_revenue().validate().is_ok());
}

#[test]
fn test_revenue_requires_positive_amount() {
    let mut revenue = valid_revenue();
    revenue.amount = 0.0;
    assert!(revenue.validate().is_err());

    revenue.amount = -1.0;
    assert!(revenue.validate().is_err());
}

#[test]
fn test_revenue_requires_order_and_currency() {
    let mut revenue = valid_revenue();
    revenue.order_id.clear();
    assert!(revenue.validate().is_err());

    let mut revenue = valid_revenue();
    revenue.currency.clear();
    assert!(revenue.validate().is_err());
}

#[test]
fn test_revenue_validates_products() {
    let mut revenue = valid_revenue();
    revenue.products[0].id.clear();
    let err = revenue.validate().unwrap_err();
    assert!(err.to_string().contains("products[0]"), "got {err}");

    let mut revenue = valid_revenue();
    revenue.products[0].price = -0.01;
    assert!(revenue.validate().is_err());

    let mut revenue = valid_revenue();
    revenue.products[0].quantity = 0;
    assert!(revenue.validate().is_err());
}

// =============================================================================
// Log validation
// =============================================================================

fn valid_log() -> LogEntry {
    LogEntry {
        service: "api".into(),
        source: "web-01".into(),
        message: "request served".into(),
        ..LogEntry::default()
    }
}

#[test]
fn test_log_valid() {
    assert!(valid_log().validate().is_ok());
}

#[test]
fn test_log_defaults() {
    let entry = LogEntry::default();
    assert_eq!(entry.event_type, LogEventType::Collect);
    assert_eq!(entry.level, LogLevel::Info);
    assert_eq!(entry.context_id, 0);
}

#[test]
fn test_log_requires_service_and_source() {
    let mut entry = valid_log();
    entry.service.clear();
    assert!(entry.validate().is_err());

    let mut entry = valid_log();
    entry.source.clear();
    assert!(entry.validate().is_err());
}

#[test]
fn test_log_service_and_source_boundaries() {
    let mut entry = valid_log();
    entry.service = "s".repeat(MAX_SERVICE_LEN);
    assert!(entry.validate().is_ok());
    entry.service.push('s');
    assert!(entry.validate().is_err());

    let mut entry = valid_log();
    entry.source = "h".repeat(MAX_SOURCE_LEN);
    assert!(entry.validate().is_ok());
    entry.source.push('h');
    assert!(entry.validate().is_err());
}

#[test]
fn test_log_message_boundary() {
    let mut entry = valid_log();
    entry.message = "m".repeat(MAX_MESSAGE_LEN);
    assert!(entry.validate().is_ok());
    entry.message.push('m');
    assert!(entry.validate().is_err());
}

#[test]
fn test_log_requires_message_or_data() {
    let mut entry = valid_log();
    entry.message.clear();
    assert!(entry.validate().is_err());

    entry.data = props(&[("key", Value::from("value"))]);
    assert!(entry.validate().is_ok());
}

#[test]
fn test_log_data_entry_cap() {
    let mut entry = valid_log();
    entry.data = (0..MAX_DATA_ENTRIES)
        .map(|i| (format!("k{i}"), Value::Int(i as i64)))
        .collect();
    assert!(entry.validate().is_ok());

    entry
        .data
        .insert("one_more".to_string(), Value::Null);
    assert!(entry.validate().is_err());
}
