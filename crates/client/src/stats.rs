//! Read-only observability snapshots
//!
//! [`Stats`] is composed by the façade from accumulator queue depths
//! and the sender's transport metrics. Counters are written on the send
//! path; a snapshot takes one lock and copies.

use std::time::{Duration, SystemTime};

/// Transport-level counters maintained by the sender
#[derive(Debug, Clone, Default)]
pub struct TransportMetrics {
    /// Events shipped successfully
    pub events_sent: u64,
    /// Log entries shipped successfully
    pub logs_sent: u64,
    /// Event batches shipped
    pub event_batches_sent: u64,
    /// Log batches shipped
    pub log_batches_sent: u64,
    /// All batches shipped
    pub total_batches_sent: u64,
    /// Frame bytes written to the socket
    pub bytes_sent: u64,
    /// Failed send attempts
    pub failed_attempts: u64,
    /// Wall-clock time of the last successful send
    pub last_send_time: Option<SystemTime>,
    /// Wall-clock time of the last failed send
    pub last_failure_time: Option<SystemTime>,
    /// Running average of events per shipped batch
    pub average_event_batch_size: f64,
    /// Running average of log entries per shipped batch
    pub average_log_batch_size: f64,
    /// Time since the sender was created
    pub connection_uptime: Duration,
    /// Successful reconnections performed by the retry task
    pub reconnect_count: u64,
}

/// Aggregate client statistics
#[derive(Debug, Clone)]
pub struct Stats {
    /// Events waiting in the accumulator
    pub events_in_queue: u64,
    /// Log entries waiting in the accumulator
    pub logs_in_queue: u64,
    /// Events shipped successfully
    pub events_sent: u64,
    /// Log entries shipped successfully
    pub logs_sent: u64,
    /// All batches shipped
    pub total_batches_sent: u64,
    /// Frame bytes written to the socket
    pub bytes_sent: u64,
    /// Failed send attempts
    pub failed_attempts: u64,
    /// Connection lifecycle state name
    pub connection_state: String,
    /// Time since the transport was created
    pub connection_uptime: Duration,
    /// Successful reconnections
    pub reconnect_count: u64,
    /// Wall-clock time of the last successful event flush
    pub last_flush_time: Option<SystemTime>,
    /// Wall-clock time of the last transport failure
    pub last_failure_time: Option<SystemTime>,
    /// Running average of events per shipped batch
    pub average_event_batch_size: f64,
    /// Running average of log entries per shipped batch
    pub average_log_batch_size: f64,
    /// Configured endpoint
    pub endpoint: String,
    /// Addresses currently resolved for the endpoint
    pub resolved_endpoints: usize,
    /// Wall-clock time of the last DNS resolution
    pub last_dns_resolution: Option<SystemTime>,
    /// DNS resolution failures
    pub dns_failures: u64,
}
