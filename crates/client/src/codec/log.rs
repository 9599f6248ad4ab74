//! LogEntry and LogData encoders
//!
//! LogEntry table layout (inline offsets from table start):
//!
//! ```text
//! +4:  source offset (u32)      vtable slot 4
//! +8:  service offset (u32)     vtable slot 5
//! +12: payload offset (u32)     vtable slot 6
//! +16: context_id (u64)         vtable slot 1
//! +24: timestamp (u64)          vtable slot 3
//! +32: event_type (u8)          vtable slot 0
//! +33: level (u8)               vtable slot 2
//! +34..36: padding
//! ```

use crate::codec::event::build_table_vector;
use crate::transport::LogRecord;

/// Upper bound on one encoded log entry: fixed table overhead plus
/// vector headers, string terminators, and alignment slack
const PER_LOG_OVERHEAD: usize = 112;

/// Upper bound on the LogData wrapper plus per-element offset slack
const LOG_DATA_OVERHEAD: usize = 32;

/// Conservative upper bound on `encode_log_data` output size
pub(crate) fn estimated_log_data_size(records: &[LogRecord]) -> usize {
    LOG_DATA_OVERHEAD
        + records
            .iter()
            .map(|r| PER_LOG_OVERHEAD + r.source.len() + r.service.len() + r.payload.len())
            .sum::<usize>()
}

/// Encode an ordered slice of log entries into a LogData payload
pub(crate) fn encode_log_data(records: &[LogRecord]) -> Vec<u8> {
    let encoded: Vec<Vec<u8>> = records.iter().map(encode_log_entry).collect();
    build_table_vector(&encoded, estimated_log_data_size(records))
}

/// Encode a single LogEntry table as a standalone buffer
fn encode_log_entry(record: &LogRecord) -> Vec<u8> {
    // VTable: size(u16) + table_size(u16) + 7 field slots (u16 each)
    let vtable_size: u16 = 4 + 7 * 2; // 18 bytes
    let table_size: u16 = 4 + 32;

    let estimated_size = 4
        + vtable_size as usize
        + 2
        + table_size as usize
        + (4 + record.source.len() + 1)
        + (4 + record.service.len() + 1)
        + (4 + record.payload.len())
        + 16;

    let mut buf = Vec::with_capacity(estimated_size);

    // === Root offset placeholder ===
    buf.extend_from_slice(&[0u8; 4]);

    // === VTable ===
    let vtable_start = buf.len();

    buf.extend_from_slice(&vtable_size.to_le_bytes());
    buf.extend_from_slice(&table_size.to_le_bytes());

    buf.extend_from_slice(&32u16.to_le_bytes()); // field 0: event_type at +32
    buf.extend_from_slice(&16u16.to_le_bytes()); // field 1: context_id at +16
    buf.extend_from_slice(&33u16.to_le_bytes()); // field 2: level at +33
    buf.extend_from_slice(&24u16.to_le_bytes()); // field 3: timestamp at +24
    buf.extend_from_slice(&4u16.to_le_bytes()); // field 4: source at +4
    buf.extend_from_slice(&8u16.to_le_bytes()); // field 5: service at +8
    buf.extend_from_slice(&12u16.to_le_bytes()); // field 6: payload at +12

    // Pad the 18-byte vtable so the table starts 4-aligned
    buf.extend_from_slice(&[0u8; 2]);

    // === Table ===
    let table_start = buf.len();

    let soffset: i32 = (table_start - vtable_start) as i32;
    buf.extend_from_slice(&soffset.to_le_bytes());

    let source_offset_pos = buf.len();
    buf.extend_from_slice(&[0u8; 4]);

    let service_offset_pos = buf.len();
    buf.extend_from_slice(&[0u8; 4]);

    let payload_offset_pos = buf.len();
    buf.extend_from_slice(&[0u8; 4]);

    buf.extend_from_slice(&record.context_id.to_le_bytes());
    buf.extend_from_slice(&record.timestamp.to_le_bytes());
    buf.push(record.event_type.as_u8());
    buf.push(record.level.as_u8());
    buf.extend_from_slice(&[0u8; 2]); // padding

    // === Strings and vectors ===

    while !buf.len().is_multiple_of(4) {
        buf.push(0);
    }

    let source_start = buf.len();
    buf.extend_from_slice(&(record.source.len() as u32).to_le_bytes());
    buf.extend_from_slice(record.source.as_bytes());
    buf.push(0);

    while !buf.len().is_multiple_of(4) {
        buf.push(0);
    }

    let service_start = buf.len();
    buf.extend_from_slice(&(record.service.len() as u32).to_le_bytes());
    buf.extend_from_slice(record.service.as_bytes());
    buf.push(0);

    while !buf.len().is_multiple_of(4) {
        buf.push(0);
    }

    let payload_start = buf.len();
    buf.extend_from_slice(&(record.payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(&record.payload);

    // === Fill in offsets ===

    buf[0..4].copy_from_slice(&(table_start as u32).to_le_bytes());

    let source_rel = (source_start - source_offset_pos) as u32;
    buf[source_offset_pos..source_offset_pos + 4].copy_from_slice(&source_rel.to_le_bytes());

    let service_rel = (service_start - service_offset_pos) as u32;
    buf[service_offset_pos..service_offset_pos + 4].copy_from_slice(&service_rel.to_le_bytes());

    let payload_rel = (payload_start - payload_offset_pos) as u32;
    buf[payload_offset_pos..payload_offset_pos + 4].copy_from_slice(&payload_rel.to_le_bytes());

    buf
}
