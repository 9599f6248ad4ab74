//! UserCanal Client SDK
//!
//! Ships two classes of structured records - analytics events and
//! structured log entries - from the host process to a collector over a
//! single long-lived TCP channel. Callers never block on network I/O:
//! records land in in-memory accumulators that flush on size or time,
//! and transient network faults requeue the affected batch rather than
//! dropping it.
//!
//! # Architecture
//!
//! ```text
//! caller -> Client (validate + convert) -> accumulator -> codec -> sender -> TCP
//!                                              ^                      |
//!                                              +---- requeue on fail -+
//! ```
//!
//! - [`Client`] - ingest façade and lifecycle
//! - accumulators - one per record kind, size- and timer-triggered
//! - codec - length-prefixed binary frames (see `usercanal-protocol`)
//! - transport - single resilient connection with DNS failover and
//!   exponential backoff
//!
//! # Quick Start
//!
//! ```no_run
//! use tokio_util::sync::CancellationToken;
//! use usercanal_client::{Client, Config, Properties, Value};
//!
//! # async fn run() -> usercanal_client::Result<()> {
//! let client = Client::new(
//!     "000102030405060708090a0b0c0d0e0f",
//!     Config::default(),
//! )
//! .await?;
//!
//! let ctx = CancellationToken::new();
//!
//! let mut props = Properties::new();
//! props.insert("method".to_string(), Value::from("email"));
//! client.event(&ctx, "user-123", "user_signed_up", props).await?;
//!
//! client.log_info(&ctx, "api", "request served", Properties::new()).await?;
//!
//! client.flush(&ctx).await?;
//! client.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Delivery contract
//!
//! At-least-once while the process lives: a record accepted by an
//! ingest call is eventually encoded into a batch unless the client is
//! closed before the collector becomes reachable again. Nothing is
//! spooled to disk; pending records are lost on abrupt process death.

mod batcher;
mod client;
mod codec;
mod config;
mod convert;
mod error;
mod identity;
mod stats;
mod transport;
mod types;

pub use client::Client;
pub use config::{
    ApiKey, Config, DEFAULT_BATCH_SIZE, DEFAULT_CLOSE_TIMEOUT, DEFAULT_ENDPOINT,
    DEFAULT_FLUSH_INTERVAL, DEFAULT_MAX_RETRIES,
};
pub use error::{Error, Result};
pub use stats::{Stats, TransportMetrics};
pub use types::{
    Event, EventAdvanced, LogEntry, MAX_DATA_ENTRIES, MAX_EVENT_NAME_LEN, MAX_MESSAGE_LEN,
    MAX_PROPERTIES, MAX_PROPERTY_KEY_LEN, MAX_PROPERTY_VALUE_BYTES, MAX_SERVICE_LEN,
    MAX_SOURCE_LEN, MAX_USER_ID_LEN, Product, Properties, Revenue, Value,
};

// Protocol enums shared with the wire format
pub use usercanal_protocol::{EventType, LogEventType, LogLevel, SchemaType};
