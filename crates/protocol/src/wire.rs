//! Low-level reading of the vtable wire format
//!
//! Every table in the protocol goes through one substrate: the outer
//! Batch and the embedded Event/LogEntry tables are all views produced
//! by [`Table`]. A table is a position in the buffer whose leading
//! soffset points back at its vtable; the vtable's u16 slots give each
//! field's inline position, with 0 marking an absent field.
//!
//! ```text
//! [vtable]  [vtable_size:u16][table_size:u16][slot:u16]...
//! [table]   [soffset:i32][inline scalars and u32 offsets...]
//! [vector]  [length:u32][data...]
//! ```
//!
//! Scalars are little-endian. Vector, string, and nested-table fields
//! hold a u32 offset relative to the field's own position; following
//! one is the same operation everywhere, so [`Table::indirect`] is the
//! only place it happens.
//!
//! All reads are bounds checked; malformed input produces
//! [`ProtocolError`], never a panic or an out-of-range access.

use crate::{ProtocolError, Result};

/// Read N little-endian bytes at `pos`
#[inline]
fn bytes_at<const N: usize>(buf: &[u8], pos: usize) -> Result<[u8; N]> {
    buf.get(pos..pos + N)
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| ProtocolError::too_short(pos + N, buf.len()))
}

#[inline]
pub(crate) fn read_u16(buf: &[u8], pos: usize) -> Result<u16> {
    Ok(u16::from_le_bytes(bytes_at(buf, pos)?))
}

#[inline]
pub(crate) fn read_u32(buf: &[u8], pos: usize) -> Result<u32> {
    Ok(u32::from_le_bytes(bytes_at(buf, pos)?))
}

#[inline]
pub(crate) fn read_i32(buf: &[u8], pos: usize) -> Result<i32> {
    Ok(i32::from_le_bytes(bytes_at(buf, pos)?))
}

#[inline]
pub(crate) fn read_u64(buf: &[u8], pos: usize) -> Result<u64> {
    Ok(u64::from_le_bytes(bytes_at(buf, pos)?))
}

/// Zero-copy view of one table
///
/// Field accessors return values or slices straight from the
/// underlying buffer; nothing is copied or cached beyond the resolved
/// vtable position.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Table<'a> {
    buf: &'a [u8],
    /// Absolute position of the table (its soffset field)
    pos: usize,
    /// Absolute position of the first vtable field slot
    slots: usize,
    /// Number of field slots the vtable carries
    slot_count: usize,
}

impl<'a> Table<'a> {
    /// Resolve the root table of a standalone buffer
    ///
    /// The buffer starts with a u32 offset to its root table.
    pub fn root(buf: &'a [u8]) -> Result<Self> {
        let pos = read_u32(buf, 0)? as usize;
        if pos >= buf.len() {
            return Err(ProtocolError::invalid_flatbuffer(format!(
                "root offset {pos} exceeds buffer length {}",
                buf.len()
            )));
        }
        Self::at(buf, pos)
    }

    /// Resolve the table whose soffset field sits at `pos`
    ///
    /// vtable = table - soffset; a negative soffset places the vtable
    /// after the table.
    pub fn at(buf: &'a [u8], pos: usize) -> Result<Self> {
        let soffset = read_i32(buf, pos)? as i64;

        let vtable = pos as i64 - soffset;
        if vtable < 0 {
            return Err(ProtocolError::invalid_flatbuffer("vtable offset underflow"));
        }
        let vtable = vtable as usize;

        let vtable_size = read_u16(buf, vtable)? as usize;
        if vtable_size < 4 || vtable + vtable_size > buf.len() {
            return Err(ProtocolError::invalid_flatbuffer(format!(
                "invalid vtable size {vtable_size} at offset {vtable}"
            )));
        }

        Ok(Self {
            buf,
            pos,
            slots: vtable + 4,
            slot_count: (vtable_size - 4) / 2,
        })
    }

    /// Absolute position of a field's inline data, or None when the
    /// slot is empty or beyond this vtable
    fn field(&self, slot: usize) -> Option<usize> {
        if slot >= self.slot_count {
            return None;
        }
        let rel = read_u16(self.buf, self.slots + slot * 2).ok()? as usize;
        (rel != 0).then(|| self.pos + rel)
    }

    /// Follow the u32 relative offset stored at `pos`
    ///
    /// Used for vectors, strings, and embedded tables alike; the
    /// target must leave room for at least its own header word.
    fn indirect(&self, pos: usize) -> Result<usize> {
        let target = pos + read_u32(self.buf, pos)? as usize;
        if target + 4 > self.buf.len() {
            return Err(ProtocolError::invalid_flatbuffer(
                "indirect offset out of bounds",
            ));
        }
        Ok(target)
    }

    /// Read a u8 scalar field, or `default` when absent
    pub fn scalar_u8(&self, slot: usize, default: u8) -> u8 {
        self.field(slot)
            .and_then(|pos| self.buf.get(pos).copied())
            .unwrap_or(default)
    }

    /// Read a u64 scalar field, or `default` when absent
    pub fn scalar_u64(&self, slot: usize, default: u64) -> u64 {
        self.field(slot)
            .and_then(|pos| read_u64(self.buf, pos).ok())
            .unwrap_or(default)
    }

    /// Read a byte-vector field
    pub fn bytes(&self, slot: usize) -> Result<Option<&'a [u8]>> {
        let Some(field) = self.field(slot) else {
            return Ok(None);
        };

        let vector = self.indirect(field)?;
        let length = read_u32(self.buf, vector)? as usize;
        let start = vector + 4;

        self.buf
            .get(start..start + length)
            .map(Some)
            .ok_or_else(|| {
                ProtocolError::invalid_flatbuffer(format!(
                    "vector data extends past buffer: {} + {} > {}",
                    start,
                    length,
                    self.buf.len()
                ))
            })
    }

    /// Read a fixed-width byte vector (e.g. a 16-byte identifier)
    ///
    /// A vector of any other length is treated as not present.
    pub fn fixed_bytes<const N: usize>(&self, slot: usize) -> Result<Option<&'a [u8; N]>> {
        Ok(self.bytes(slot)?.and_then(|bytes| bytes.try_into().ok()))
    }

    /// Read a UTF-8 string field
    ///
    /// Strings share the vector representation; the trailing null
    /// terminator sits outside the counted length.
    pub fn string(&self, slot: usize) -> Result<Option<&'a str>> {
        match self.bytes(slot)? {
            None => Ok(None),
            Some(bytes) => std::str::from_utf8(bytes)
                .map(Some)
                .map_err(|_| ProtocolError::invalid_flatbuffer("invalid UTF-8 string")),
        }
    }

    /// Read a vector-of-tables field, resolving each element
    pub fn tables(&self, slot: usize) -> Result<Option<Vec<Table<'a>>>> {
        let Some(field) = self.field(slot) else {
            return Ok(None);
        };

        let vector = self.indirect(field)?;
        let length = read_u32(self.buf, vector)? as usize;

        // Each element is a u32 offset to its table
        let elements = vector + 4;
        if elements + length * 4 > self.buf.len() {
            return Err(ProtocolError::invalid_flatbuffer(
                "vector elements out of bounds",
            ));
        }

        let mut tables = Vec::with_capacity(length);
        for i in 0..length {
            let table_pos = self.indirect(elements + i * 4)?;
            tables.push(Table::at(self.buf, table_pos)?);
        }

        Ok(Some(tables))
    }
}
