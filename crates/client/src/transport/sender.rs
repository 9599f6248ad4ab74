//! Frame sender
//!
//! Owns the connection manager. A send validates per-record and
//! per-batch preconditions, encodes the snapshot, and writes one
//! length-prefixed frame. The connection mutex doubles as the writer
//! lock, so frames from concurrent flushes never interleave.
//!
//! Validation failures are deterministic and reported without touching
//! the connection; write failures record metrics, signal the retry
//! task, and surface as network errors so the accumulator requeues.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use bytes::{BufMut, BytesMut};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use usercanal_protocol::SchemaType;

use crate::codec;
use crate::config::{ApiKey, Config};
use crate::error::{Error, Result};
use crate::identity;
use crate::stats::TransportMetrics;
use crate::transport::connection::{ConnManager, ConnStateChange};
use crate::transport::{EventRecord, LogRecord};

/// Write deadline for one frame
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) struct Sender {
    conn_mgr: Arc<ConnManager>,
    api_key: [u8; 16],

    max_batch_items: usize,
    max_batch_bytes: usize,
    max_record_bytes: usize,

    start_time: Instant,
    metrics: parking_lot::Mutex<TransportMetrics>,

    shutdown: CancellationToken,
    monitor: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl Sender {
    pub fn new(api_key: ApiKey, config: &Config) -> Arc<Self> {
        Arc::new(Self {
            conn_mgr: ConnManager::new(config.endpoint.clone()),
            api_key: *api_key.as_bytes(),
            max_batch_items: config.max_batch_items,
            max_batch_bytes: config.max_batch_bytes,
            max_record_bytes: config.max_record_bytes,
            start_time: Instant::now(),
            metrics: parking_lot::Mutex::new(TransportMetrics::default()),
            shutdown: CancellationToken::new(),
            monitor: parking_lot::Mutex::new(None),
        })
    }

    /// Start the connection tasks and the state monitor
    ///
    /// Must be called within a Tokio runtime, once.
    pub fn start(self: &Arc<Self>) {
        self.conn_mgr.start();

        if let Some(state_rx) = self.conn_mgr.take_state_changes() {
            let shutdown = self.shutdown.clone();
            *self.monitor.lock() = Some(tokio::spawn(run_monitor(state_rx, shutdown)));
        }
    }

    /// Attempt the initial connection; failure hands over to the retry
    /// task instead of failing construction
    pub async fn connect_initial(&self, ctx: &CancellationToken) {
        if let Err(err) = self.conn_mgr.connect(ctx).await {
            tracing::warn!(error = %err, "initial connection failed, retrying in background");
            self.conn_mgr.signal_retry();
        }
    }

    /// Ship one batch of events
    pub async fn send_events(&self, ctx: &CancellationToken, records: &[EventRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        if self.shutdown.is_cancelled() {
            return Err(Error::validation("sender", "is shutting down"));
        }

        self.validate_events(records)?;

        let data = codec::encode_event_data(records);
        let built = codec::BatchBuilder::new()
            .api_key(self.api_key)
            .batch_id(identity::new_batch_id())
            .schema_type(SchemaType::Event)
            .data_owned(data)
            .build()?;

        // The estimate is an upper bound, so a batch it clears needs no
        // exact check; one it flags is rejected only on the real size.
        if codec::estimated_event_batch_size(records) > self.max_batch_bytes
            && built.len() > self.max_batch_bytes
        {
            return Err(Error::validation(
                "batch",
                format!(
                    "encoded size {} exceeds limit {}",
                    built.len(),
                    self.max_batch_bytes
                ),
            ));
        }

        let frame_len = self.write_frame(ctx, built.as_bytes()).await?;
        self.record_event_success(records.len() as u64, frame_len as u64);
        Ok(())
    }

    /// Ship one batch of log entries
    pub async fn send_logs(&self, ctx: &CancellationToken, records: &[LogRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        if self.shutdown.is_cancelled() {
            return Err(Error::validation("sender", "is shutting down"));
        }

        self.validate_logs(records)?;

        let data = codec::encode_log_data(records);
        let built = codec::BatchBuilder::new()
            .api_key(self.api_key)
            .batch_id(identity::new_batch_id())
            .schema_type(SchemaType::Log)
            .data_owned(data)
            .build()?;

        if codec::estimated_log_batch_size(records) > self.max_batch_bytes
            && built.len() > self.max_batch_bytes
        {
            return Err(Error::validation(
                "batch",
                format!(
                    "encoded size {} exceeds limit {}",
                    built.len(),
                    self.max_batch_bytes
                ),
            ));
        }

        let frame_len = self.write_frame(ctx, built.as_bytes()).await?;
        self.record_log_success(records.len() as u64, frame_len as u64);
        Ok(())
    }

    /// Transport metrics snapshot
    pub fn metrics(&self) -> TransportMetrics {
        let mut metrics = self.metrics.lock().clone();
        metrics.connection_uptime = self.start_time.elapsed();
        metrics.reconnect_count = self.conn_mgr.reconnect_count();
        metrics
    }

    /// Connection lifecycle state name
    pub fn state_name(&self) -> &'static str {
        self.conn_mgr.state_name()
    }

    /// DNS observability passthrough
    pub fn dns_stats(&self) -> (usize, Option<SystemTime>, u64) {
        self.conn_mgr.dns_stats()
    }

    /// Stop the monitor and shut the connection down
    pub async fn close(&self) {
        self.shutdown.cancel();

        let monitor = self.monitor.lock().take();
        if let Some(monitor) = monitor {
            let _ = monitor.await;
        }

        self.conn_mgr.close().await;
    }

    // =========================================================================
    // Validation
    // =========================================================================

    fn validate_events(&self, records: &[EventRecord]) -> Result<()> {
        if records.len() > self.max_batch_items {
            return Err(Error::validation(
                "events",
                format!("batch too large (max {} events)", self.max_batch_items),
            ));
        }

        let mut total = 0usize;
        for (i, record) in records.iter().enumerate() {
            if record.timestamp == 0 {
                return Err(Error::validation(
                    "timestamp",
                    format!("event[{i}] timestamp is required"),
                ));
            }
            if record.name.is_empty() {
                return Err(Error::validation(
                    "name",
                    format!("event[{i}] name is required"),
                ));
            }
            if record.payload.is_empty() {
                return Err(Error::validation(
                    "payload",
                    format!("event[{i}] payload is required"),
                ));
            }
            if record.payload.len() > self.max_record_bytes {
                return Err(Error::validation(
                    "payload",
                    format!(
                        "event[{i}] payload too large (max {} bytes)",
                        self.max_record_bytes
                    ),
                ));
            }
            total += record.payload.len();
        }

        if total > self.max_batch_bytes {
            return Err(Error::validation(
                "batch",
                format!(
                    "total payload size {total} exceeds limit {}",
                    self.max_batch_bytes
                ),
            ));
        }

        Ok(())
    }

    fn validate_logs(&self, records: &[LogRecord]) -> Result<()> {
        if records.len() > self.max_batch_items {
            return Err(Error::validation(
                "logs",
                format!("batch too large (max {} logs)", self.max_batch_items),
            ));
        }

        let mut total = 0usize;
        for (i, record) in records.iter().enumerate() {
            if record.timestamp == 0 {
                return Err(Error::validation(
                    "timestamp",
                    format!("log[{i}] timestamp is required"),
                ));
            }
            if record.source.is_empty() {
                return Err(Error::validation(
                    "source",
                    format!("log[{i}] source is required"),
                ));
            }
            if record.service.is_empty() {
                return Err(Error::validation(
                    "service",
                    format!("log[{i}] service is required"),
                ));
            }
            if record.payload.is_empty() {
                return Err(Error::validation(
                    "payload",
                    format!("log[{i}] payload is required"),
                ));
            }
            if record.payload.len() > self.max_record_bytes {
                return Err(Error::validation(
                    "payload",
                    format!(
                        "log[{i}] payload too large (max {} bytes)",
                        self.max_record_bytes
                    ),
                ));
            }
            total += record.payload.len();
        }

        if total > self.max_batch_bytes {
            return Err(Error::validation(
                "batch",
                format!(
                    "total payload size {total} exceeds limit {}",
                    self.max_batch_bytes
                ),
            ));
        }

        Ok(())
    }

    // =========================================================================
    // Frame writing
    // =========================================================================

    /// Write one length-prefixed frame, returning the frame size
    async fn write_frame(&self, ctx: &CancellationToken, bytes: &[u8]) -> Result<usize> {
        let mut frame = BytesMut::with_capacity(4 + bytes.len());
        frame.put_u32(bytes.len() as u32);
        frame.extend_from_slice(bytes);

        let mut conn = self.conn_mgr.writer().await;
        if conn.is_none() {
            drop(conn);
            tracing::debug!("no active connection, attempting immediate reconnect");
            if let Err(err) = self.conn_mgr.connect(ctx).await {
                self.record_failure();
                self.conn_mgr.signal_retry();
                return Err(Error::network(
                    "send",
                    format!("no active connection and reconnect failed: {err}"),
                ));
            }
            conn = self.conn_mgr.writer().await;
        }

        let Some(stream) = conn.as_mut() else {
            self.record_failure();
            self.conn_mgr.signal_retry();
            return Err(Error::network("send", "connection unavailable after reconnect"));
        };

        enum Outcome {
            Done,
            Io(std::io::Error),
            Deadline,
            Cancelled,
        }

        let outcome = {
            let write = async {
                stream.write_all(&frame).await?;
                stream.flush().await
            };

            tokio::select! {
                res = tokio::time::timeout(SEND_TIMEOUT, write) => match res {
                    Ok(Ok(())) => Outcome::Done,
                    Ok(Err(err)) => Outcome::Io(err),
                    Err(_) => Outcome::Deadline,
                },
                _ = ctx.cancelled() => Outcome::Cancelled,
            }
        };

        match outcome {
            Outcome::Done => Ok(frame.len()),
            Outcome::Io(err) => {
                *conn = None;
                drop(conn);
                self.record_failure();
                self.conn_mgr.signal_retry();
                Err(Error::network("send", err.to_string()))
            }
            Outcome::Deadline => {
                *conn = None;
                drop(conn);
                self.record_failure();
                self.conn_mgr.signal_retry();
                Err(Error::network("send", "write deadline exceeded"))
            }
            Outcome::Cancelled => {
                // The frame may be partially written; the stream cannot
                // carry another one.
                *conn = None;
                drop(conn);
                self.record_failure();
                self.conn_mgr.signal_retry();
                Err(Error::timeout("send"))
            }
        }
    }

    // =========================================================================
    // Metrics
    // =========================================================================

    fn record_event_success(&self, event_count: u64, frame_bytes: u64) {
        let mut metrics = self.metrics.lock();
        metrics.events_sent += event_count;
        metrics.event_batches_sent += 1;
        metrics.total_batches_sent += 1;
        metrics.bytes_sent += frame_bytes;
        metrics.last_send_time = Some(SystemTime::now());
        metrics.average_event_batch_size =
            metrics.events_sent as f64 / metrics.event_batches_sent as f64;
    }

    fn record_log_success(&self, log_count: u64, frame_bytes: u64) {
        let mut metrics = self.metrics.lock();
        metrics.logs_sent += log_count;
        metrics.log_batches_sent += 1;
        metrics.total_batches_sent += 1;
        metrics.bytes_sent += frame_bytes;
        metrics.last_send_time = Some(SystemTime::now());
        metrics.average_log_batch_size =
            metrics.logs_sent as f64 / metrics.log_batches_sent as f64;
    }

    fn record_failure(&self) {
        let mut metrics = self.metrics.lock();
        metrics.failed_attempts += 1;
        metrics.last_failure_time = Some(SystemTime::now());
    }
}

/// Log state transitions observed from the connection manager
async fn run_monitor(mut state_rx: mpsc::Receiver<ConnStateChange>, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            change = state_rx.recv() => match change {
                Some(change) => {
                    tracing::debug!(state = %change.state, "transport observed state change");
                }
                None => return,
            },
        }
    }
}

#[cfg(test)]
#[path = "sender_test.rs"]
mod sender_test;
