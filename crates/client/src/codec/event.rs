//! Event and EventData encoders
//!
//! Each event becomes a standalone table buffer; `encode_event_data`
//! embeds them in order into the `events` vector of an EventData table.
//!
//! Event table layout (inline offsets from table start):
//!
//! ```text
//! +4:  device_id offset (u32)   vtable slot 2, 0 when absent
//! +8:  session_id offset (u32)  vtable slot 3, 0 when absent
//! +12: event_name offset (u32)  vtable slot 4
//! +16: payload offset (u32)     vtable slot 5
//! +20: timestamp (u64)          vtable slot 1
//! +28: event_type (u8)          vtable slot 0
//! +29..32: padding
//! ```

use usercanal_protocol::UUID_LENGTH;

use crate::transport::EventRecord;

/// Upper bound on one encoded event: fixed table overhead plus both
/// optional identifier vectors, vector headers, string terminator, and
/// alignment slack
const PER_EVENT_OVERHEAD: usize = 136;

/// Upper bound on the EventData wrapper (root, vtable, table, vector
/// header) plus per-element offset and alignment
const EVENT_DATA_OVERHEAD: usize = 32;

/// Conservative upper bound on `encode_event_data` output size
pub(crate) fn estimated_event_data_size(records: &[EventRecord]) -> usize {
    EVENT_DATA_OVERHEAD
        + records
            .iter()
            .map(|r| PER_EVENT_OVERHEAD + r.name.len() + r.payload.len())
            .sum::<usize>()
}

/// Encode an ordered slice of events into an EventData payload
pub(crate) fn encode_event_data(records: &[EventRecord]) -> Vec<u8> {
    let encoded: Vec<Vec<u8>> = records.iter().map(encode_event).collect();
    build_table_vector(&encoded, estimated_event_data_size(records))
}

/// Encode a single Event table as a standalone buffer
fn encode_event(record: &EventRecord) -> Vec<u8> {
    // VTable: size(u16) + table_size(u16) + 6 field slots (u16 each)
    let vtable_size: u16 = 4 + 6 * 2; // 16 bytes
    let table_size: u16 = 4 + 28;

    let estimated_size = 4
        + vtable_size as usize
        + table_size as usize
        + 2 * (4 + UUID_LENGTH)
        + (4 + record.name.len() + 1)
        + (4 + record.payload.len())
        + 16;

    let mut buf = Vec::with_capacity(estimated_size);

    // === Root offset placeholder ===
    buf.extend_from_slice(&[0u8; 4]);

    // === VTable ===
    let vtable_start = buf.len();

    buf.extend_from_slice(&vtable_size.to_le_bytes());
    buf.extend_from_slice(&table_size.to_le_bytes());

    let has_device = record.device_id.is_some();
    let has_session = record.session_id.is_some();

    buf.extend_from_slice(&28u16.to_le_bytes()); // field 0: event_type at +28
    buf.extend_from_slice(&20u16.to_le_bytes()); // field 1: timestamp at +20
    buf.extend_from_slice(&(if has_device { 4u16 } else { 0 }).to_le_bytes()); // field 2: device_id
    buf.extend_from_slice(&(if has_session { 8u16 } else { 0 }).to_le_bytes()); // field 3: session_id
    buf.extend_from_slice(&12u16.to_le_bytes()); // field 4: event_name at +12
    buf.extend_from_slice(&16u16.to_le_bytes()); // field 5: payload at +16

    // === Table ===
    let table_start = buf.len();

    let soffset: i32 = (table_start - vtable_start) as i32;
    buf.extend_from_slice(&soffset.to_le_bytes());

    let device_id_offset_pos = buf.len();
    buf.extend_from_slice(&[0u8; 4]);

    let session_id_offset_pos = buf.len();
    buf.extend_from_slice(&[0u8; 4]);

    let event_name_offset_pos = buf.len();
    buf.extend_from_slice(&[0u8; 4]);

    let payload_offset_pos = buf.len();
    buf.extend_from_slice(&[0u8; 4]);

    buf.extend_from_slice(&record.timestamp.to_le_bytes());
    buf.push(record.event_type.as_u8());
    buf.extend_from_slice(&[0u8; 3]); // padding

    // === Vectors and strings ===

    while !buf.len().is_multiple_of(4) {
        buf.push(0);
    }

    let device_id_vec_start = record.device_id.as_ref().map(|id| {
        let start = buf.len();
        buf.extend_from_slice(&(UUID_LENGTH as u32).to_le_bytes());
        buf.extend_from_slice(id);
        start
    });

    while !buf.len().is_multiple_of(4) {
        buf.push(0);
    }

    let session_id_vec_start = record.session_id.as_ref().map(|id| {
        let start = buf.len();
        buf.extend_from_slice(&(UUID_LENGTH as u32).to_le_bytes());
        buf.extend_from_slice(id);
        start
    });

    while !buf.len().is_multiple_of(4) {
        buf.push(0);
    }

    // Strings carry a null terminator after the length-prefixed bytes
    let event_name_start = buf.len();
    buf.extend_from_slice(&(record.name.len() as u32).to_le_bytes());
    buf.extend_from_slice(record.name.as_bytes());
    buf.push(0);

    while !buf.len().is_multiple_of(4) {
        buf.push(0);
    }

    let payload_vec_start = buf.len();
    buf.extend_from_slice(&(record.payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(&record.payload);

    // === Fill in offsets ===

    buf[0..4].copy_from_slice(&(table_start as u32).to_le_bytes());

    if let Some(start) = device_id_vec_start {
        let rel = (start - device_id_offset_pos) as u32;
        buf[device_id_offset_pos..device_id_offset_pos + 4].copy_from_slice(&rel.to_le_bytes());
    }

    if let Some(start) = session_id_vec_start {
        let rel = (start - session_id_offset_pos) as u32;
        buf[session_id_offset_pos..session_id_offset_pos + 4].copy_from_slice(&rel.to_le_bytes());
    }

    let name_rel = (event_name_start - event_name_offset_pos) as u32;
    buf[event_name_offset_pos..event_name_offset_pos + 4].copy_from_slice(&name_rel.to_le_bytes());

    let payload_rel = (payload_vec_start - payload_offset_pos) as u32;
    buf[payload_offset_pos..payload_offset_pos + 4].copy_from_slice(&payload_rel.to_le_bytes());

    buf
}

/// Build a wrapper table whose field 0 is a vector of embedded tables
///
/// Shared by EventData and LogData: both are a single-field table
/// wrapping `[Table]`. Each element arrives as a standalone buffer with
/// its own root offset; the vector offsets must point at the table
/// itself, so the element's root offset is folded into its position.
pub(super) fn build_table_vector(elements: &[Vec<u8>], capacity_hint: usize) -> Vec<u8> {
    // VTable: size(u16) + table_size(u16) + 1 field slot
    let vtable_size: u16 = 4 + 2; // 6 bytes
    let table_size: u16 = 8; // soffset + vector offset

    let mut buf = Vec::with_capacity(capacity_hint);

    // === Root offset placeholder ===
    buf.extend_from_slice(&[0u8; 4]);

    // === VTable ===
    let vtable_start = buf.len();

    buf.extend_from_slice(&vtable_size.to_le_bytes());
    buf.extend_from_slice(&table_size.to_le_bytes());
    buf.extend_from_slice(&4u16.to_le_bytes()); // field 0: vector offset at +4

    // Pad the 6-byte vtable so the table starts 4-aligned
    buf.extend_from_slice(&[0u8; 2]);

    // === Table ===
    let table_start = buf.len();

    let soffset: i32 = (table_start - vtable_start) as i32;
    buf.extend_from_slice(&soffset.to_le_bytes());

    let vector_offset_pos = buf.len();
    buf.extend_from_slice(&[0u8; 4]);

    while !buf.len().is_multiple_of(4) {
        buf.push(0);
    }

    // === Element vector ===
    let vector_start = buf.len();
    buf.extend_from_slice(&(elements.len() as u32).to_le_bytes());

    let offsets_start = buf.len();
    for _ in elements {
        buf.extend_from_slice(&[0u8; 4]);
    }

    // Embed each element and note where its table actually lives
    let mut table_positions = Vec::with_capacity(elements.len());
    for element in elements {
        while !buf.len().is_multiple_of(4) {
            buf.push(0);
        }

        let element_start = buf.len();
        let root_offset = if element.len() >= 4 {
            u32::from_le_bytes([element[0], element[1], element[2], element[3]]) as usize
        } else {
            0
        };

        table_positions.push(element_start + root_offset);
        buf.extend_from_slice(element);
    }

    // Fill in element offsets (relative from slot position to table)
    for (i, &table_pos) in table_positions.iter().enumerate() {
        let offset_pos = offsets_start + i * 4;
        let rel = (table_pos - offset_pos) as u32;
        buf[offset_pos..offset_pos + 4].copy_from_slice(&rel.to_le_bytes());
    }

    let vector_rel = (vector_start - vector_offset_pos) as u32;
    buf[vector_offset_pos..vector_offset_pos + 4].copy_from_slice(&vector_rel.to_le_bytes());

    buf[0..4].copy_from_slice(&(table_start as u32).to_le_bytes());

    buf
}
