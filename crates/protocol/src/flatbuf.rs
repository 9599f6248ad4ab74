//! Zero-copy parsing of the outer Batch message
//!
//! The Batch is one table in the vtable wire format (see the `wire`
//! module); this layer adds the message-level size bounds and the
//! typed field accessors.
//!
//! # Batch fields (vtable slots)
//!
//! | slot | field       | type                       |
//! |------|-------------|----------------------------|
//! | 0    | api_key     | 16-byte vector, required   |
//! | 1    | batch_id    | u64                        |
//! | 2    | schema_type | u8                         |
//! | 3    | data        | byte vector, required      |

use crate::wire::Table;
use crate::{
    API_KEY_LENGTH, MAX_REASONABLE_SIZE, MIN_BATCH_SIZE, ProtocolError, Result, SchemaType,
};

/// Field IDs for the Batch table (vtable slot indices)
const FIELD_API_KEY: usize = 0;
const FIELD_BATCH_ID: usize = 1;
const FIELD_SCHEMA_TYPE: usize = 2;
const FIELD_DATA: usize = 3;

/// Zero-copy view into a Batch message
///
/// Field accessors return slices or values directly from the
/// underlying buffer without copying.
///
/// # Example
///
/// ```ignore
/// let msg: &[u8] = receive_frame();
/// let batch = FlatBatch::parse(msg)?;
///
/// let api_key = batch.api_key()?;
/// let schema_type = batch.schema_type();
/// let data = batch.data()?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FlatBatch<'a> {
    /// Raw message bytes
    buf: &'a [u8],
    /// Resolved root table
    table: Table<'a>,
}

impl<'a> FlatBatch<'a> {
    /// Parse a Batch message
    ///
    /// Validates the message bounds and table structure without copying
    /// data; field access is deferred until the accessor methods are
    /// called.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the message is shorter than [`MIN_BATCH_SIZE`]
    /// - the message exceeds [`MAX_REASONABLE_SIZE`]
    /// - the root offset or vtable structure is invalid
    pub fn parse(buf: &'a [u8]) -> Result<Self> {
        if buf.len() < MIN_BATCH_SIZE {
            return Err(ProtocolError::too_short(MIN_BATCH_SIZE, buf.len()));
        }

        if buf.len() > MAX_REASONABLE_SIZE {
            return Err(ProtocolError::message_too_large(
                buf.len(),
                MAX_REASONABLE_SIZE,
            ));
        }

        let table = Table::root(buf)?;

        Ok(Self { buf, table })
    }

    /// Get the raw buffer
    #[inline]
    pub fn raw_bytes(&self) -> &'a [u8] {
        self.buf
    }

    /// Get the API key (required field, 16 bytes)
    ///
    /// # Errors
    ///
    /// Returns an error if the field is missing or has the wrong length.
    pub fn api_key(&self) -> Result<&'a [u8; API_KEY_LENGTH]> {
        let bytes = self
            .table
            .bytes(FIELD_API_KEY)?
            .ok_or(ProtocolError::missing_field("api_key"))?;

        bytes
            .try_into()
            .map_err(|_| ProtocolError::invalid_api_key_length(bytes.len()))
    }

    /// Get the batch ID
    ///
    /// Returns 0 if the field is missing.
    pub fn batch_id(&self) -> u64 {
        self.table.scalar_u64(FIELD_BATCH_ID, 0)
    }

    /// Get the schema type
    ///
    /// Returns `SchemaType::Unknown` if the field is missing or invalid.
    pub fn schema_type(&self) -> SchemaType {
        SchemaType::from_u8(self.table.scalar_u8(FIELD_SCHEMA_TYPE, 0))
    }

    /// Get the data payload (required field)
    ///
    /// The raw bytes of the schema-specific inner payload (EventData or
    /// LogData), without copying.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is missing.
    pub fn data(&self) -> Result<&'a [u8]> {
        self.table
            .bytes(FIELD_DATA)?
            .ok_or(ProtocolError::missing_field("data"))
    }
}
