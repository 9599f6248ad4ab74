//! Client configuration
//!
//! The SDK receives a fully resolved [`Config`]; there is no file or
//! environment lookup here. Out-of-range values fall back to the
//! defaults with a warning rather than failing construction, so a bad
//! tuning knob never takes analytics down.

use std::time::Duration;

use usercanal_protocol::{API_KEY_LENGTH, MAX_BATCH_BYTES, MAX_BATCH_ITEMS, MAX_RECORD_BYTES};

use crate::error::{Error, Result};

/// Canonical production endpoint
pub const DEFAULT_ENDPOINT: &str = "collect.usercanal.com:50000";

/// Default number of records per batch
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default time between periodic batch sends
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);

/// Default number of advisory retry attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default timeout for the final flush during shutdown
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Client configuration, resolved and ready to use
#[derive(Debug, Clone)]
pub struct Config {
    /// Collector endpoint as `host:port`; bare hostnames get port 50000
    pub endpoint: String,
    /// Records per accumulator before a size-triggered flush
    pub batch_size: usize,
    /// Max time between sends for a non-empty accumulator
    pub flush_interval: Duration,
    /// Advisory retry count; reconnection itself retries without bound
    pub max_retries: u32,
    /// Bound on the final flush performed by `close()`
    pub close_timeout: Duration,
    /// Emit verbose diagnostics through the `tracing` sink
    pub debug: bool,
    /// Hard cap on records per batch
    pub max_batch_items: usize,
    /// Hard cap on the encoded size of one batch
    pub max_batch_bytes: usize,
    /// Hard cap on one record's payload
    pub max_record_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            debug: false,
            max_batch_items: MAX_BATCH_ITEMS,
            max_batch_bytes: MAX_BATCH_BYTES,
            max_record_bytes: MAX_RECORD_BYTES,
        }
    }
}

impl Config {
    /// Replace out-of-range values with defaults, warning for each
    pub(crate) fn normalized(mut self) -> Self {
        if self.endpoint.is_empty() {
            tracing::warn!(default = DEFAULT_ENDPOINT, "empty endpoint, using default");
            self.endpoint = DEFAULT_ENDPOINT.to_string();
        }
        if self.batch_size == 0 {
            tracing::warn!(
                default = DEFAULT_BATCH_SIZE,
                "invalid batch size 0, using default"
            );
            self.batch_size = DEFAULT_BATCH_SIZE;
        }
        if self.flush_interval.is_zero() {
            tracing::warn!(
                default_secs = DEFAULT_FLUSH_INTERVAL.as_secs(),
                "invalid flush interval 0, using default"
            );
            self.flush_interval = DEFAULT_FLUSH_INTERVAL;
        }
        if self.close_timeout.is_zero() {
            tracing::warn!(
                default_secs = DEFAULT_CLOSE_TIMEOUT.as_secs(),
                "invalid close timeout 0, using default"
            );
            self.close_timeout = DEFAULT_CLOSE_TIMEOUT;
        }
        if self.max_batch_items == 0 || self.max_batch_items > MAX_BATCH_ITEMS {
            tracing::warn!(
                default = MAX_BATCH_ITEMS,
                "max_batch_items out of range, using default"
            );
            self.max_batch_items = MAX_BATCH_ITEMS;
        }
        if self.max_record_bytes == 0 {
            tracing::warn!(
                default = MAX_RECORD_BYTES,
                "invalid max_record_bytes 0, using default"
            );
            self.max_record_bytes = MAX_RECORD_BYTES;
        }
        if self.max_batch_bytes == 0 {
            tracing::warn!(
                default = MAX_BATCH_BYTES,
                "invalid max_batch_bytes 0, using default"
            );
            self.max_batch_bytes = MAX_BATCH_BYTES;
        }
        if self.batch_size > self.max_batch_items {
            tracing::warn!(
                batch_size = self.batch_size,
                cap = self.max_batch_items,
                "batch size exceeds max_batch_items, clamping"
            );
            self.batch_size = self.max_batch_items;
        }
        self
    }
}

/// Workspace credential: 32 hexadecimal characters, decoded to 16 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiKey([u8; API_KEY_LENGTH]);

impl ApiKey {
    /// Parse a 32-hex-digit credential
    ///
    /// # Errors
    ///
    /// Returns a validation error for any other form; nothing is
    /// connected or spawned before this check passes.
    pub fn parse(credential: &str) -> Result<Self> {
        if credential.is_empty() {
            return Err(Error::validation("api_key", "is required"));
        }
        if credential.len() != API_KEY_LENGTH * 2 {
            return Err(Error::validation(
                "api_key",
                format!(
                    "must be {} hex characters, got {}",
                    API_KEY_LENGTH * 2,
                    credential.len()
                ),
            ));
        }

        let decoded =
            hex::decode(credential).map_err(|_| Error::validation("api_key", "invalid format"))?;

        // Safe: length checked above, hex halves it
        Ok(Self(decoded.try_into().unwrap()))
    }

    /// The decoded 16 credential bytes
    #[inline]
    pub fn as_bytes(&self) -> &[u8; API_KEY_LENGTH] {
        &self.0
    }
}

impl std::str::FromStr for ApiKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
