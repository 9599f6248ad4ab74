//! Tests for the outer Batch parser
//!
//! The buffers here are assembled by hand with the same layout the SDK
//! encoder emits, so the parser is exercised against known-good bytes
//! without depending on the encoder.

use crate::{FlatBatch, MIN_BATCH_SIZE, ProtocolError, SchemaType};

/// Assemble a Batch message by hand.
///
/// Layout (offsets in bytes):
/// - 0: root offset -> 16
/// - 4: vtable [size=12][table_size=24][api_key=4][batch_id=12][schema_type=20][data=8]
/// - 16: table [soffset=12][api_key off][data off][batch_id u64][schema_type u8][pad]
/// - 40: api_key vector
/// - 60: data vector
fn build_batch(api_key: [u8; 16], batch_id: u64, schema_type: u8, data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();

    // Root offset
    buf.extend_from_slice(&16u32.to_le_bytes());

    // VTable
    buf.extend_from_slice(&12u16.to_le_bytes()); // vtable size
    buf.extend_from_slice(&24u16.to_le_bytes()); // table size
    buf.extend_from_slice(&4u16.to_le_bytes()); // field 0: api_key
    buf.extend_from_slice(&12u16.to_le_bytes()); // field 1: batch_id
    buf.extend_from_slice(&20u16.to_le_bytes()); // field 2: schema_type
    buf.extend_from_slice(&8u16.to_le_bytes()); // field 3: data

    // Table
    buf.extend_from_slice(&12i32.to_le_bytes()); // soffset back to vtable
    buf.extend_from_slice(&20u32.to_le_bytes()); // api_key vector at 40, field at 20
    buf.extend_from_slice(&36u32.to_le_bytes()); // data vector at 60, field at 24
    buf.extend_from_slice(&batch_id.to_le_bytes());
    buf.push(schema_type);
    buf.extend_from_slice(&[0u8; 3]); // padding

    // api_key vector
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&api_key);

    // data vector
    buf.extend_from_slice(&(data.len() as u32).to_le_bytes());
    buf.extend_from_slice(data);

    buf
}

#[test]
fn test_parse_valid_batch() {
    let api_key: [u8; 16] = [
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E,
        0x0F,
    ];
    let buf = build_batch(api_key, 0x1122334455667788, 1, b"abcd");

    let batch = FlatBatch::parse(&buf).expect("should parse hand-built batch");

    assert_eq!(batch.api_key().unwrap(), &api_key);
    assert_eq!(batch.batch_id(), 0x1122334455667788);
    assert_eq!(batch.schema_type(), SchemaType::Event);
    assert_eq!(batch.data().unwrap(), b"abcd");
}

#[test]
fn test_parse_log_schema_type() {
    let buf = build_batch([0xAB; 16], 7, 2, b"log payload");

    let batch = FlatBatch::parse(&buf).unwrap();
    assert_eq!(batch.schema_type(), SchemaType::Log);
    assert_eq!(batch.data().unwrap(), b"log payload");
}

#[test]
fn test_parse_unknown_schema_type() {
    let buf = build_batch([0u8; 16], 1, 99, b"x");

    let batch = FlatBatch::parse(&buf).unwrap();
    assert_eq!(batch.schema_type(), SchemaType::Unknown);
}

#[test]
fn test_parse_empty_data() {
    let buf = build_batch([0u8; 16], 1, 1, b"");

    let batch = FlatBatch::parse(&buf).unwrap();
    assert_eq!(batch.data().unwrap(), b"");
}

#[test]
fn test_parse_raw_bytes_roundtrip() {
    let buf = build_batch([3u8; 16], 42, 1, b"payload");
    let batch = FlatBatch::parse(&buf).unwrap();
    assert_eq!(batch.raw_bytes(), &buf[..]);
}

#[test]
fn test_parse_too_short() {
    let buf = vec![0u8; MIN_BATCH_SIZE - 1];
    let err = FlatBatch::parse(&buf).unwrap_err();
    assert!(matches!(err, ProtocolError::MessageTooShort { .. }));
}

#[test]
fn test_parse_root_offset_out_of_bounds() {
    let mut buf = build_batch([0u8; 16], 1, 1, b"x");
    // Point the root offset past the end of the buffer
    let bogus = (buf.len() as u32 + 100).to_le_bytes();
    buf[0..4].copy_from_slice(&bogus);

    let err = FlatBatch::parse(&buf).unwrap_err();
    assert!(matches!(err, ProtocolError::InvalidFlatBuffer(_)));
}

#[test]
fn test_parse_garbage() {
    let buf = vec![0xFFu8; 64];
    assert!(FlatBatch::parse(&buf).is_err());
}

#[test]
fn test_missing_api_key_field() {
    let mut buf = build_batch([0u8; 16], 1, 1, b"x");
    // Zero out vtable slot 0 (api_key) at offset 8
    buf[8] = 0;
    buf[9] = 0;

    let batch = FlatBatch::parse(&buf).unwrap();
    let err = batch.api_key().unwrap_err();
    assert!(matches!(err, ProtocolError::MissingField("api_key")));
}

#[test]
fn test_missing_data_field() {
    let mut buf = build_batch([0u8; 16], 1, 1, b"x");
    // Zero out vtable slot 3 (data) at offset 14
    buf[14] = 0;
    buf[15] = 0;

    let batch = FlatBatch::parse(&buf).unwrap();
    let err = batch.data().unwrap_err();
    assert!(matches!(err, ProtocolError::MissingField("data")));
}

#[test]
fn test_missing_batch_id_defaults_to_zero() {
    let mut buf = build_batch([0u8; 16], 999, 1, b"x");
    // Zero out vtable slot 1 (batch_id) at offset 10
    buf[10] = 0;
    buf[11] = 0;

    let batch = FlatBatch::parse(&buf).unwrap();
    assert_eq!(batch.batch_id(), 0);
}

#[test]
fn test_error_display() {
    let err = ProtocolError::too_short(16, 4);
    assert_eq!(
        err.to_string(),
        "message too short: expected at least 16 bytes, got 4"
    );

    let err = ProtocolError::invalid_api_key_length(10);
    assert_eq!(
        err.to_string(),
        "invalid API key length: expected 16 bytes, got 10"
    );

    let err = ProtocolError::missing_field("data");
    assert_eq!(err.to_string(), "missing required field: data");
}
