//! Tests for the binary codec
//!
//! Every encode is checked by decoding with the reference parsers from
//! `usercanal-protocol`, so the encoder and the wire contract cannot
//! drift apart silently.

use usercanal_protocol::{
    EventType, FlatBatch, LogEventType, LogLevel, SchemaType, decode_event_data, decode_log_data,
};

use super::*;
use crate::transport::{EventRecord, LogRecord};

fn event(name: &str, payload: &[u8]) -> EventRecord {
    EventRecord {
        timestamp: 1_700_000_000_000,
        event_type: EventType::Track,
        name: name.to_string(),
        device_id: None,
        session_id: None,
        payload: payload.to_vec(),
    }
}

fn log(service: &str, payload: &[u8]) -> LogRecord {
    LogRecord {
        event_type: LogEventType::Collect,
        context_id: 0xDEADBEEF,
        level: LogLevel::Error,
        timestamp: 1_700_000_000_001,
        source: "web-01".to_string(),
        service: service.to_string(),
        payload: payload.to_vec(),
    }
}

// =============================================================================
// Events
// =============================================================================

#[test]
fn test_encode_single_event_roundtrip() {
    let records = [event("user_signed_up", b"{\"m\":\"email\"}")];
    let data = encode_event_data(&records);

    let decoded = decode_event_data(&data).unwrap();
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].event_type, EventType::Track);
    assert_eq!(decoded[0].timestamp, 1_700_000_000_000);
    assert_eq!(decoded[0].event_name, Some("user_signed_up"));
    assert_eq!(decoded[0].payload, b"{\"m\":\"email\"}");
    assert!(decoded[0].device_id.is_none());
    assert!(decoded[0].session_id.is_none());
}

#[test]
fn test_encode_event_with_identifiers() {
    let mut record = event("custom", b"{}");
    record.device_id = Some([0xAA; 16]);
    record.session_id = Some([0xBB; 16]);

    let data = encode_event_data(&[record]);
    let decoded = decode_event_data(&data).unwrap();

    assert_eq!(decoded[0].device_id, Some(&[0xAA; 16]));
    assert_eq!(decoded[0].session_id, Some(&[0xBB; 16]));
}

#[test]
fn test_encode_event_types_roundtrip() {
    let mut records = Vec::new();
    for event_type in [
        EventType::Track,
        EventType::Identify,
        EventType::Group,
        EventType::Alias,
        EventType::Enrich,
    ] {
        let mut record = event("typed", b"{}");
        record.event_type = event_type;
        records.push(record);
    }

    let decoded_data = encode_event_data(&records);
    let decoded = decode_event_data(&decoded_data).unwrap();
    let types: Vec<_> = decoded.iter().map(|e| e.event_type).collect();
    assert_eq!(
        types,
        [
            EventType::Track,
            EventType::Identify,
            EventType::Group,
            EventType::Alias,
            EventType::Enrich,
        ]
    );
}

#[test]
fn test_encode_preserves_queue_order() {
    let records: Vec<EventRecord> = (0..25)
        .map(|i| event(&format!("event_{i}"), format!("{{\"i\":{i}}}").as_bytes()))
        .collect();

    let data = encode_event_data(&records);
    let decoded = decode_event_data(&data).unwrap();

    assert_eq!(decoded.len(), 25);
    for (i, decoded_event) in decoded.iter().enumerate() {
        assert_eq!(decoded_event.event_name, Some(format!("event_{i}").as_str()));
    }
}

#[test]
fn test_event_estimate_is_upper_bound() {
    let cases: Vec<Vec<EventRecord>> = vec![
        vec![event("a", b"{}")],
        vec![event("a", b"{}"), event("bb", b"{\"k\":\"v\"}")],
        (0..100).map(|i| event(&format!("e{i}"), &vec![b'x'; i])).collect(),
        vec![{
            let mut r = event("with_ids", &vec![b'p'; 4096]);
            r.device_id = Some([1; 16]);
            r.session_id = Some([2; 16]);
            r
        }],
    ];

    for records in cases {
        let estimate = estimated_event_data_size(&records);
        let actual = encode_event_data(&records).len();
        assert!(
            estimate >= actual,
            "estimate {estimate} below actual {actual} for {} records",
            records.len()
        );
    }
}

// =============================================================================
// Logs
// =============================================================================

#[test]
fn test_encode_single_log_roundtrip() {
    let records = [log("api", b"{\"message\":\"boom\"}")];
    let data = encode_log_data(&records);

    let decoded = decode_log_data(&data).unwrap();
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].event_type, LogEventType::Collect);
    assert_eq!(decoded[0].context_id, 0xDEADBEEF);
    assert_eq!(decoded[0].level, LogLevel::Error);
    assert_eq!(decoded[0].timestamp, 1_700_000_000_001);
    assert_eq!(decoded[0].source, Some("web-01"));
    assert_eq!(decoded[0].service, Some("api"));
    assert_eq!(decoded[0].payload, b"{\"message\":\"boom\"}");
}

#[test]
fn test_encode_log_levels_roundtrip() {
    let records: Vec<LogRecord> = (0..=8u8)
        .map(|value| {
            let mut record = log("api", b"{}");
            record.level = LogLevel::from_u8(value);
            record
        })
        .collect();

    let data = encode_log_data(&records);
    let decoded = decode_log_data(&data).unwrap();

    for (value, entry) in decoded.iter().enumerate() {
        assert_eq!(entry.level.as_u8(), value as u8);
    }
}

#[test]
fn test_log_estimate_is_upper_bound() {
    let cases: Vec<Vec<LogRecord>> = vec![
        vec![log("a", b"{}")],
        (0..50).map(|i| log(&format!("svc{i}"), &vec![b'x'; i * 3])).collect(),
    ];

    for records in cases {
        let estimate = estimated_log_data_size(&records);
        let actual = encode_log_data(&records).len();
        assert!(
            estimate >= actual,
            "estimate {estimate} below actual {actual} for {} records",
            records.len()
        );
    }
}

// =============================================================================
// Outer batch
// =============================================================================

#[test]
fn test_batch_roundtrip() {
    let api_key: [u8; 16] = [
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E,
        0x0F,
    ];
    let records = [event("user_signed_up", b"{\"m\":\"email\"}")];
    let data = encode_event_data(&records);

    let built = BatchBuilder::new()
        .api_key(api_key)
        .batch_id(0x1234_5678_9ABC_DEF0)
        .schema_type(SchemaType::Event)
        .data_owned(data.clone())
        .build()
        .unwrap();

    let parsed = FlatBatch::parse(built.as_bytes()).unwrap();
    assert_eq!(parsed.api_key().unwrap(), &api_key);
    assert_eq!(parsed.batch_id(), 0x1234_5678_9ABC_DEF0);
    assert_eq!(parsed.schema_type(), SchemaType::Event);
    assert_eq!(parsed.data().unwrap(), &data[..]);

    // The embedded payload decodes back to the original records
    let decoded = decode_event_data(parsed.data().unwrap()).unwrap();
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].event_name, Some("user_signed_up"));
}

#[test]
fn test_log_batch_roundtrip() {
    let records = [log("api", b"{\"message\":\"hi\"}")];
    let data = encode_log_data(&records);

    let built = BatchBuilder::new()
        .api_key([0x42; 16])
        .batch_id(7)
        .schema_type(SchemaType::Log)
        .data_owned(data)
        .build()
        .unwrap();

    let parsed = FlatBatch::parse(built.as_bytes()).unwrap();
    assert_eq!(parsed.schema_type(), SchemaType::Log);

    let decoded = decode_log_data(parsed.data().unwrap()).unwrap();
    assert_eq!(decoded[0].service, Some("api"));
}

#[test]
fn test_batch_requires_api_key() {
    let err = BatchBuilder::new().data_owned(vec![1]).build().unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn test_batch_requires_data() {
    let err = BatchBuilder::new().api_key([0; 16]).build().unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn test_batch_estimate_is_upper_bound() {
    let records = [event("a", b"{}"), event("b", b"{}")];
    let estimate = estimated_event_batch_size(&records);

    let data = encode_event_data(&records);
    let built = BatchBuilder::new()
        .api_key([0; 16])
        .batch_id(1)
        .schema_type(SchemaType::Event)
        .data_owned(data)
        .build()
        .unwrap();

    assert!(estimate >= built.len());
}

#[test]
fn test_identical_input_encodes_identically() {
    let records = [event("same", b"{\"x\":1}")];
    assert_eq!(encode_event_data(&records), encode_event_data(&records));
}
