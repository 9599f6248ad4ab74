//! Binary codec - serialises validated batches into wire messages
//!
//! The encoders produce the vtable-based table format described in
//! `usercanal-protocol`, built back-to-front by hand without code
//! generation. Record order is preserved exactly as the accumulator
//! queued it.
//!
//! Size estimation companions return conservative upper bounds on the
//! encoded size, so the sender can preflight a batch against the
//! configured maximum without encoding twice. An estimate is always
//! `>=` the actual encoded size; only when the estimate exceeds the cap
//! does the exact length need to be consulted.

mod batch;
mod event;
mod log;

pub(crate) use batch::{BatchBuilder, BuiltBatch};
pub(crate) use event::{encode_event_data, estimated_event_data_size};
pub(crate) use log::{encode_log_data, estimated_log_data_size};

use crate::transport::{EventRecord, LogRecord};

/// Upper bound on the outer Batch wrapper overhead (root offset,
/// vtable, table, api_key vector, data vector header, padding)
const BATCH_OVERHEAD: usize = 96;

/// Conservative upper bound on the encoded size of an event batch
pub(crate) fn estimated_event_batch_size(records: &[EventRecord]) -> usize {
    BATCH_OVERHEAD + estimated_event_data_size(records)
}

/// Conservative upper bound on the encoded size of a log batch
pub(crate) fn estimated_log_batch_size(records: &[LogRecord]) -> usize {
    BATCH_OVERHEAD + estimated_log_data_size(records)
}

#[cfg(test)]
#[path = "codec_test.rs"]
mod codec_test;
