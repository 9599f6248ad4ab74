//! Outer Batch wrapper builder
//!
//! Wraps an encoded inner payload (EventData or LogData) together with
//! the workspace credential, a random batch identifier, and the schema
//! discriminator.
//!
//! # Wire format
//!
//! The table format is built back to front:
//!
//! ```text
//! [4 bytes: root offset] -> points to table
//! [vtable]
//!   - vtable_size (u16)
//!   - table_size (u16)
//!   - field offsets (u16 each, 0 = not present)
//! [table]
//!   - soffset to vtable (i32)
//!   - inline scalars and vector offsets
//! [vectors]
//!   - length (u32)
//!   - data bytes
//! ```
//!
//! Batch table layout (inline offsets from table start):
//!
//! ```text
//! +4:  api_key offset (u32)     vtable slot 0
//! +8:  data offset (u32)        vtable slot 3
//! +12: batch_id (u64)           vtable slot 1
//! +20: schema_type (u8)         vtable slot 2
//! +21..24: padding
//! ```

use bytes::Bytes;
use usercanal_protocol::{API_KEY_LENGTH, MAX_REASONABLE_SIZE, SchemaType};

use crate::error::{Error, Result};

/// Builder for the outer Batch message
///
/// # Required fields
///
/// - `api_key` - 16-byte workspace credential
/// - `data` - encoded inner payload
#[derive(Debug, Clone)]
pub(crate) struct BatchBuilder {
    api_key: Option<[u8; API_KEY_LENGTH]>,
    batch_id: u64,
    schema_type: SchemaType,
    data: Option<Vec<u8>>,
}

impl BatchBuilder {
    /// Create a new batch builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            api_key: None,
            batch_id: 0,
            schema_type: SchemaType::Unknown,
            data: None,
        }
    }

    /// Set the workspace credential (required, 16 bytes)
    #[must_use]
    pub fn api_key(mut self, key: [u8; API_KEY_LENGTH]) -> Self {
        self.api_key = Some(key);
        self
    }

    /// Set the batch identifier
    #[must_use]
    pub fn batch_id(mut self, batch_id: u64) -> Self {
        self.batch_id = batch_id;
        self
    }

    /// Set the schema discriminator
    #[must_use]
    pub fn schema_type(mut self, schema_type: SchemaType) -> Self {
        self.schema_type = schema_type;
        self
    }

    /// Set the inner payload from owned bytes
    #[must_use]
    pub fn data_owned(mut self, data: Vec<u8>) -> Self {
        self.data = Some(data);
        self
    }

    /// Build the Batch message
    ///
    /// # Errors
    ///
    /// Returns a validation error if a required field is missing or the
    /// payload exceeds the protocol sanity ceiling.
    pub fn build(self) -> Result<BuiltBatch> {
        let api_key = self
            .api_key
            .ok_or_else(|| Error::validation("api_key", "is required"))?;
        let data = self
            .data
            .ok_or_else(|| Error::validation("data", "is required"))?;

        if data.len() > MAX_REASONABLE_SIZE {
            return Err(Error::validation(
                "batch",
                format!(
                    "payload size {} exceeds protocol limit {}",
                    data.len(),
                    MAX_REASONABLE_SIZE
                ),
            ));
        }

        let bytes = build_batch_buffer(&api_key, self.batch_id, self.schema_type, &data);

        Ok(BuiltBatch {
            bytes: Bytes::from(bytes),
        })
    }
}

/// A built Batch message ready to frame and send
#[derive(Debug, Clone)]
pub(crate) struct BuiltBatch {
    bytes: Bytes,
}

impl BuiltBatch {
    /// Get the raw bytes of the batch
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Get the length of the batch in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

impl AsRef<[u8]> for BuiltBatch {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Build the Batch wire buffer
fn build_batch_buffer(
    api_key: &[u8; API_KEY_LENGTH],
    batch_id: u64,
    schema_type: SchemaType,
    data: &[u8],
) -> Vec<u8> {
    // VTable: size(u16) + table_size(u16) + 4 field slots (u16 each)
    let vtable_size: u16 = 4 + 4 * 2; // 12 bytes
    let table_size: u16 = 4 + 20; // soffset + inline data

    let estimated_size = 4
        + vtable_size as usize
        + table_size as usize
        + (4 + API_KEY_LENGTH)
        + (4 + data.len())
        + 16; // padding slack

    let mut buf = Vec::with_capacity(estimated_size);

    // === Root offset placeholder ===
    buf.extend_from_slice(&[0u8; 4]);

    // === VTable ===
    let vtable_start = buf.len();

    buf.extend_from_slice(&vtable_size.to_le_bytes());
    buf.extend_from_slice(&table_size.to_le_bytes());
    buf.extend_from_slice(&4u16.to_le_bytes()); // field 0: api_key offset at +4
    buf.extend_from_slice(&12u16.to_le_bytes()); // field 1: batch_id at +12
    buf.extend_from_slice(&20u16.to_le_bytes()); // field 2: schema_type at +20
    buf.extend_from_slice(&8u16.to_le_bytes()); // field 3: data offset at +8

    // === Table ===
    let table_start = buf.len();

    // soffset: vtable = table - soffset
    let soffset: i32 = (table_start - vtable_start) as i32;
    buf.extend_from_slice(&soffset.to_le_bytes());

    let api_key_offset_pos = buf.len();
    buf.extend_from_slice(&[0u8; 4]);

    let data_offset_pos = buf.len();
    buf.extend_from_slice(&[0u8; 4]);

    buf.extend_from_slice(&batch_id.to_le_bytes());
    buf.push(schema_type.as_u8());
    buf.extend_from_slice(&[0u8; 3]); // padding

    // === Vectors ===

    while !buf.len().is_multiple_of(4) {
        buf.push(0);
    }

    let api_key_vec_start = buf.len();
    buf.extend_from_slice(&(API_KEY_LENGTH as u32).to_le_bytes());
    buf.extend_from_slice(api_key);

    while !buf.len().is_multiple_of(4) {
        buf.push(0);
    }

    let data_vec_start = buf.len();
    buf.extend_from_slice(&(data.len() as u32).to_le_bytes());
    buf.extend_from_slice(data);

    // === Fill in offsets ===

    buf[0..4].copy_from_slice(&(table_start as u32).to_le_bytes());

    let api_key_rel = (api_key_vec_start - api_key_offset_pos) as u32;
    buf[api_key_offset_pos..api_key_offset_pos + 4].copy_from_slice(&api_key_rel.to_le_bytes());

    let data_rel = (data_vec_start - data_offset_pos) as u32;
    buf[data_offset_pos..data_offset_pos + 4].copy_from_slice(&data_rel.to_le_bytes());

    buf
}
