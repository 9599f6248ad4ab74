//! Client façade
//!
//! Validates caller input, converts it to internal records, and routes
//! each record to the right accumulator. Events and logs ride
//! independent pipelines that share one transport.
//!
//! Lifecycle: `Active -> Closing -> Closed`. While closing, ingest
//! calls fail with a validation error; `Closed` is absorbing.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::batcher::{Batcher, SendBatch};
use crate::config::{ApiKey, Config};
use crate::convert;
use crate::error::{Error, Result};
use crate::identity;
use crate::stats::Stats;
use crate::transport::{EventRecord, LogRecord, Sender};
use crate::types::{Event, EventAdvanced, LogEntry, LogEventType, LogLevel, Properties, Revenue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Active,
    Closing,
    Closed,
}

/// Ships events into the sender's event pipeline
struct EventSink(Arc<Sender>);

impl SendBatch<EventRecord> for EventSink {
    fn send(
        &self,
        ctx: &CancellationToken,
        records: &[EventRecord],
    ) -> impl Future<Output = Result<()>> + Send {
        self.0.send_events(ctx, records)
    }
}

/// Ships log entries into the sender's log pipeline
struct LogSink(Arc<Sender>);

impl SendBatch<LogRecord> for LogSink {
    fn send(
        &self,
        ctx: &CancellationToken,
        records: &[LogRecord],
    ) -> impl Future<Output = Result<()>> + Send {
        self.0.send_logs(ctx, records)
    }
}

/// Analytics and logging client
///
/// Cheap to share behind an `Arc`; every operation takes `&self`.
pub struct Client {
    config: Config,
    hostname: String,
    sender: Arc<Sender>,
    events: Batcher<EventRecord, EventSink>,
    logs: Batcher<LogRecord, LogSink>,
    lifecycle: RwLock<Lifecycle>,
}

impl Client {
    /// Create a client and start its background workers
    ///
    /// The credential must be 32 hexadecimal characters; credential and
    /// configuration problems fail here, before any I/O. An unreachable
    /// collector does not: the initial connect failure is handed to the
    /// reconnection task and enqueued records are delivered once the
    /// collector comes back.
    ///
    /// Must be called within a Tokio runtime.
    pub async fn new(api_key: &str, config: Config) -> Result<Self> {
        let api_key = ApiKey::parse(api_key)?;
        let config = config.normalized();

        if config.debug {
            tracing::debug!(endpoint = %config.endpoint, batch_size = config.batch_size, "client starting");
        }

        let hostname = identity::discover_hostname();

        let sender = Sender::new(api_key, &config);
        sender.start();
        sender.connect_initial(&CancellationToken::new()).await;

        let events = Batcher::new(
            config.batch_size,
            config.flush_interval,
            EventSink(Arc::clone(&sender)),
        );
        let logs = Batcher::new(
            config.batch_size,
            config.flush_interval,
            LogSink(Arc::clone(&sender)),
        );

        Ok(Self {
            config,
            hostname,
            sender,
            events,
            logs,
            lifecycle: RwLock::new(Lifecycle::Active),
        })
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Track an analytics event
    pub async fn event(
        &self,
        ctx: &CancellationToken,
        user_id: impl Into<String>,
        name: impl Into<String>,
        properties: Properties,
    ) -> Result<()> {
        self.check_open()?;

        let event = Event {
            user_id: user_id.into(),
            name: name.into(),
            properties,
            timestamp: None,
        };
        let record = convert::event_record(&event)?;
        self.events.add(ctx, record).await
    }

    /// Associate a user with their traits
    pub async fn event_identify(
        &self,
        ctx: &CancellationToken,
        user_id: impl Into<String>,
        traits: Properties,
    ) -> Result<()> {
        self.check_open()?;

        let record = convert::identify_record(&user_id.into(), &traits)?;
        self.events.add(ctx, record).await
    }

    /// Associate a user with a group
    pub async fn event_group(
        &self,
        ctx: &CancellationToken,
        user_id: impl Into<String>,
        group_id: impl Into<String>,
        properties: Properties,
    ) -> Result<()> {
        self.check_open()?;

        let record = convert::group_record(&user_id.into(), &group_id.into(), &properties)?;
        self.events.add(ctx, record).await
    }

    /// Track a revenue event
    pub async fn event_revenue(&self, ctx: &CancellationToken, revenue: Revenue) -> Result<()> {
        self.check_open()?;

        let record = convert::revenue_record(&revenue)?;
        self.events.add(ctx, record).await
    }

    /// Track an event with explicit device, session, or timestamp
    /// overrides
    pub async fn event_advanced(
        &self,
        ctx: &CancellationToken,
        event: EventAdvanced,
    ) -> Result<()> {
        self.check_open()?;

        let record = convert::advanced_record(&event)?;
        self.events.add(ctx, record).await
    }

    // =========================================================================
    // Logs
    // =========================================================================

    /// Enqueue a structured log entry
    ///
    /// An empty `source` is replaced with the process hostname
    /// discovered at startup.
    pub async fn log(&self, ctx: &CancellationToken, mut entry: LogEntry) -> Result<()> {
        self.check_open()?;

        if entry.source.is_empty() {
            entry.source = self.hostname.clone();
        }
        let record = convert::log_record(&entry)?;
        self.logs.add(ctx, record).await
    }

    /// Enqueue multiple log entries, stopping at the first failure
    pub async fn log_batch(&self, ctx: &CancellationToken, entries: Vec<LogEntry>) -> Result<()> {
        for entry in entries {
            self.log(ctx, entry).await?;
        }
        Ok(())
    }

    /// Emergency-level log entry
    pub async fn log_emergency(
        &self,
        ctx: &CancellationToken,
        service: impl Into<String>,
        message: impl Into<String>,
        data: Properties,
    ) -> Result<()> {
        self.log_with_level(ctx, LogLevel::Emergency, service.into(), message.into(), data)
            .await
    }

    /// Alert-level log entry
    pub async fn log_alert(
        &self,
        ctx: &CancellationToken,
        service: impl Into<String>,
        message: impl Into<String>,
        data: Properties,
    ) -> Result<()> {
        self.log_with_level(ctx, LogLevel::Alert, service.into(), message.into(), data)
            .await
    }

    /// Critical-level log entry
    pub async fn log_critical(
        &self,
        ctx: &CancellationToken,
        service: impl Into<String>,
        message: impl Into<String>,
        data: Properties,
    ) -> Result<()> {
        self.log_with_level(ctx, LogLevel::Critical, service.into(), message.into(), data)
            .await
    }

    /// Error-level log entry
    pub async fn log_error(
        &self,
        ctx: &CancellationToken,
        service: impl Into<String>,
        message: impl Into<String>,
        data: Properties,
    ) -> Result<()> {
        self.log_with_level(ctx, LogLevel::Error, service.into(), message.into(), data)
            .await
    }

    /// Warning-level log entry
    pub async fn log_warning(
        &self,
        ctx: &CancellationToken,
        service: impl Into<String>,
        message: impl Into<String>,
        data: Properties,
    ) -> Result<()> {
        self.log_with_level(ctx, LogLevel::Warning, service.into(), message.into(), data)
            .await
    }

    /// Notice-level log entry
    pub async fn log_notice(
        &self,
        ctx: &CancellationToken,
        service: impl Into<String>,
        message: impl Into<String>,
        data: Properties,
    ) -> Result<()> {
        self.log_with_level(ctx, LogLevel::Notice, service.into(), message.into(), data)
            .await
    }

    /// Info-level log entry
    pub async fn log_info(
        &self,
        ctx: &CancellationToken,
        service: impl Into<String>,
        message: impl Into<String>,
        data: Properties,
    ) -> Result<()> {
        self.log_with_level(ctx, LogLevel::Info, service.into(), message.into(), data)
            .await
    }

    /// Debug-level log entry
    pub async fn log_debug(
        &self,
        ctx: &CancellationToken,
        service: impl Into<String>,
        message: impl Into<String>,
        data: Properties,
    ) -> Result<()> {
        self.log_with_level(ctx, LogLevel::Debug, service.into(), message.into(), data)
            .await
    }

    /// Trace-level log entry
    pub async fn log_trace(
        &self,
        ctx: &CancellationToken,
        service: impl Into<String>,
        message: impl Into<String>,
        data: Properties,
    ) -> Result<()> {
        self.log_with_level(ctx, LogLevel::Trace, service.into(), message.into(), data)
            .await
    }

    async fn log_with_level(
        &self,
        ctx: &CancellationToken,
        level: LogLevel,
        service: String,
        message: String,
        data: Properties,
    ) -> Result<()> {
        self.log(
            ctx,
            LogEntry {
                event_type: LogEventType::Collect,
                level,
                service,
                message,
                data,
                ..LogEntry::default()
            },
        )
        .await
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Flush both accumulators, events first, and wait for completion
    ///
    /// Returns the first failure observed.
    pub async fn flush(&self, ctx: &CancellationToken) -> Result<()> {
        self.check_open()?;

        let events_result = self.events.flush(ctx).await;
        let logs_result = self.logs.flush(ctx).await;
        events_result.and(logs_result)
    }

    /// Flush what remains and shut the client down
    ///
    /// New ingest calls fail as soon as the transition to closing
    /// happens. The final flush is bounded by the configured close
    /// timeout; records that could not be shipped within it are
    /// reported through the returned error and remain visible in
    /// [`Client::stats`] as queued remnants.
    pub async fn close(&self) -> Result<()> {
        {
            let mut lifecycle = self.lifecycle.write();
            match *lifecycle {
                Lifecycle::Closed => return Err(Error::validation("client", "already closed")),
                Lifecycle::Closing => {
                    return Err(Error::validation("client", "already shutting down"));
                }
                Lifecycle::Active => *lifecycle = Lifecycle::Closing,
            }
        }

        let deadline = Instant::now() + self.config.close_timeout;
        let events_result = self.events.close(self.config.close_timeout).await;
        let remaining = deadline.saturating_duration_since(Instant::now());
        let logs_result = self.logs.close(remaining).await;

        self.sender.close().await;

        *self.lifecycle.write() = Lifecycle::Closed;

        events_result.and(logs_result)
    }

    /// Read-only statistics snapshot
    pub fn stats(&self) -> Stats {
        let metrics = self.sender.metrics();
        let (resolved_endpoints, last_dns_resolution, dns_failures) = self.sender.dns_stats();

        Stats {
            events_in_queue: self.events.queue_size(),
            logs_in_queue: self.logs.queue_size(),
            events_sent: metrics.events_sent,
            logs_sent: metrics.logs_sent,
            total_batches_sent: metrics.total_batches_sent,
            bytes_sent: metrics.bytes_sent,
            failed_attempts: metrics.failed_attempts,
            connection_state: self.sender.state_name().to_string(),
            connection_uptime: metrics.connection_uptime,
            reconnect_count: metrics.reconnect_count,
            last_flush_time: self.events.last_flush_time(),
            last_failure_time: metrics.last_failure_time,
            average_event_batch_size: metrics.average_event_batch_size,
            average_log_batch_size: metrics.average_log_batch_size,
            endpoint: self.config.endpoint.clone(),
            resolved_endpoints,
            last_dns_resolution,
            dns_failures,
        }
    }

    fn check_open(&self) -> Result<()> {
        match *self.lifecycle.read() {
            Lifecycle::Active => Ok(()),
            Lifecycle::Closing => Err(Error::validation("client", "is shutting down")),
            Lifecycle::Closed => Err(Error::validation("client", "is closed")),
        }
    }
}
