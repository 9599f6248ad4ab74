//! Connection management
//!
//! Maintains the single TCP connection to the collector:
//!
//! - DNS resolution with periodic refresh (10 min) and bounded retries
//! - Round-robin failover across resolved addresses, falling back to
//!   the literal endpoint when resolution fails
//! - Exponential backoff reconnection (1 s base, 1.5x multiplier, 30 s
//!   cap, ±20 % jitter), retrying without bound until close
//! - A coalescing single-slot retry signal: duplicate signals while a
//!   retry is in flight collapse into one
//! - State transitions (Idle -> Connecting -> Connected -> Failed)
//!   published on a bounded notification channel

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime};

use rand::Rng;
use socket2::{SockRef, TcpKeepalive};
use tokio::net::{TcpStream, lookup_host};
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Default collector port when the endpoint omits one
const DEFAULT_PORT: u16 = 50000;

/// Reconnection backoff: initial delay
const BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Reconnection backoff: growth factor per attempt
const BACKOFF_MULTIPLIER: f64 = 1.5;

/// Reconnection backoff: delay ceiling
const BACKOFF_MAX: Duration = Duration::from_secs(30);

/// Reconnection backoff: random jitter fraction
const BACKOFF_JITTER: f64 = 0.2;

/// How often resolved addresses are refreshed
const DNS_REFRESH_INTERVAL: Duration = Duration::from_secs(600);

/// Bounded retries per resolution pass
const MAX_DNS_RETRIES: u32 = 3;

/// Base delay between resolution retries
const DNS_RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Per-attempt connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// TCP keep-alive probe interval
const KEEPALIVE_TIME: Duration = Duration::from_secs(10);

/// Socket send buffer size (256 KiB)
const SEND_BUFFER_SIZE: usize = 256 * 1024;

/// Connection lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnState {
    Idle,
    Connecting,
    Connected,
    Failed,
}

impl ConnState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ConnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A state transition published on the notification channel
#[derive(Debug, Clone)]
pub(crate) struct ConnStateChange {
    pub state: ConnState,
    pub changed_at: SystemTime,
}

/// Resolved address ring and resolution bookkeeping
struct DnsState {
    resolved: Vec<std::net::SocketAddr>,
    next_index: usize,
    last_resolution: Option<Instant>,
    last_resolution_wall: Option<SystemTime>,
    failures: u64,
}

pub(crate) struct ConnManager {
    endpoint: String,

    conn: tokio::sync::Mutex<Option<TcpStream>>,
    dns: parking_lot::Mutex<DnsState>,
    state: parking_lot::Mutex<ConnState>,

    state_tx: mpsc::Sender<ConnStateChange>,
    state_rx: parking_lot::Mutex<Option<mpsc::Receiver<ConnStateChange>>>,

    retry: Notify,
    attempts: AtomicU64,
    reconnects: AtomicU64,

    shutdown: CancellationToken,
    tasks: parking_lot::Mutex<Vec<JoinHandle<()>>>,
}

impl ConnManager {
    pub fn new(endpoint: impl Into<String>) -> Arc<Self> {
        let (state_tx, state_rx) = mpsc::channel(1);

        Arc::new(Self {
            endpoint: endpoint.into(),
            conn: tokio::sync::Mutex::new(None),
            dns: parking_lot::Mutex::new(DnsState {
                resolved: Vec::new(),
                next_index: 0,
                last_resolution: None,
                last_resolution_wall: None,
                failures: 0,
            }),
            state: parking_lot::Mutex::new(ConnState::Idle),
            state_tx,
            state_rx: parking_lot::Mutex::new(Some(state_rx)),
            retry: Notify::new(),
            attempts: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
            tasks: parking_lot::Mutex::new(Vec::new()),
        })
    }

    /// Start the DNS refresh and reconnection tasks
    ///
    /// Must be called within a Tokio runtime, once.
    pub fn start(self: &Arc<Self>) {
        let mut tasks = self.tasks.lock();
        tasks.push(tokio::spawn(Arc::clone(self).run_dns_refresh()));
        tasks.push(tokio::spawn(Arc::clone(self).run_retry_loop()));
    }

    /// Take the state-change receiver (single consumer)
    pub fn take_state_changes(&self) -> Option<mpsc::Receiver<ConnStateChange>> {
        self.state_rx.lock().take()
    }

    /// Lock the connection slot for writing
    ///
    /// The returned guard is the writer lock: whoever holds it is the
    /// single writer on the socket.
    pub async fn writer(&self) -> tokio::sync::MutexGuard<'_, Option<TcpStream>> {
        self.conn.lock().await
    }

    /// Ask the retry task for a reconnect; duplicates coalesce
    pub fn signal_retry(&self) {
        self.retry.notify_one();
    }

    /// Current lifecycle state name
    pub fn state_name(&self) -> &'static str {
        self.state.lock().as_str()
    }

    /// Total connect attempts since construction
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Successful reconnections performed by the retry task
    pub fn reconnect_count(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }

    /// DNS observability: resolved address count, last resolution time,
    /// resolution failures
    pub fn dns_stats(&self) -> (usize, Option<SystemTime>, u64) {
        let dns = self.dns.lock();
        (dns.resolved.len(), dns.last_resolution_wall, dns.failures)
    }

    /// Establish a new connection, replacing any existing one
    pub async fn connect(&self, ctx: &CancellationToken) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(Error::validation("connection", "is closed"));
        }

        // Drop any stale socket before dialling again
        self.conn.lock().await.take();

        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        self.update_state(ConnState::Connecting);

        if let Err(err) = self.resolve(false).await {
            tracing::warn!(error = %err, "DNS resolution failed, using literal endpoint");
        }

        let endpoint = self.next_endpoint();
        tracing::debug!(attempt, endpoint = %endpoint, "connection attempt starting");

        let stream = tokio::select! {
            res = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(endpoint.as_str())) => {
                match res {
                    Ok(Ok(stream)) => stream,
                    Ok(Err(err)) => {
                        self.update_state(ConnState::Failed);
                        return Err(Error::network(
                            "connect",
                            format!("attempt {attempt} to {endpoint} failed: {err}"),
                        ));
                    }
                    Err(_) => {
                        self.update_state(ConnState::Failed);
                        return Err(Error::network(
                            "connect",
                            format!("attempt {attempt} to {endpoint} timed out"),
                        ));
                    }
                }
            }
            _ = ctx.cancelled() => {
                self.update_state(ConnState::Failed);
                return Err(Error::timeout("connect"));
            }
            _ = self.shutdown.cancelled() => {
                return Err(Error::validation("connection", "is closed"));
            }
        };

        if let Err(err) = tune_socket(&stream) {
            tracing::debug!(error = %err, "socket tuning failed");
        }

        *self.conn.lock().await = Some(stream);
        self.update_state(ConnState::Connected);
        Ok(())
    }

    /// Cancel internal tasks, wait for them, and close the socket
    ///
    /// Idempotent.
    pub async fn close(&self) {
        self.shutdown.cancel();

        let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            let _ = task.await;
        }

        self.conn.lock().await.take();
        self.update_state(ConnState::Idle);
    }

    fn update_state(&self, new_state: ConnState) {
        let changed = {
            let mut state = self.state.lock();
            let changed = *state != new_state;
            *state = new_state;
            changed
        };

        if changed {
            tracing::debug!(state = %new_state, "connection state changed");
            let change = ConnStateChange {
                state: new_state,
                changed_at: SystemTime::now(),
            };
            if self.state_tx.try_send(change).is_err() {
                tracing::debug!("state change notification dropped - channel full");
            }
        }
    }

    /// Resolve the endpoint host, honouring the refresh TTL
    async fn resolve(&self, force: bool) -> Result<()> {
        let (host, port) = split_endpoint(&self.endpoint);

        let mut last_err: Option<std::io::Error> = None;
        for attempt in 0..MAX_DNS_RETRIES {
            if attempt > 0 {
                let delay = DNS_RETRY_BASE_DELAY * attempt;
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = self.shutdown.cancelled() => {
                        return Err(Error::validation("connection", "is closed"));
                    }
                }
            }

            if !force {
                let dns = self.dns.lock();
                let fresh = dns
                    .last_resolution
                    .is_some_and(|at| at.elapsed() < DNS_REFRESH_INTERVAL);
                if fresh && !dns.resolved.is_empty() {
                    return Ok(());
                }
            }

            match lookup_host((host.as_str(), port)).await {
                Ok(addrs) => {
                    let resolved: Vec<_> = addrs.collect();
                    let count = resolved.len();
                    let mut dns = self.dns.lock();
                    dns.resolved = resolved;
                    dns.last_resolution = Some(Instant::now());
                    dns.last_resolution_wall = Some(SystemTime::now());
                    if dns.next_index >= count.max(1) {
                        dns.next_index = 0;
                    }
                    tracing::debug!(host = %host, endpoints = count, "resolved endpoint");
                    return Ok(());
                }
                Err(err) => {
                    self.dns.lock().failures += 1;
                    tracing::warn!(attempt = attempt + 1, error = %err, "DNS resolution attempt failed");
                    last_err = Some(err);
                }
            }
        }

        Err(Error::network(
            "dns",
            format!(
                "resolution failed after {MAX_DNS_RETRIES} attempts: {}",
                last_err.map(|e| e.to_string()).unwrap_or_default()
            ),
        ))
    }

    /// Next address from the resolved ring, or the literal endpoint
    fn next_endpoint(&self) -> String {
        let mut dns = self.dns.lock();

        if dns.resolved.is_empty() {
            let (host, port) = split_endpoint(&self.endpoint);
            return format!("{host}:{port}");
        }

        let addr = dns.resolved[dns.next_index % dns.resolved.len()];
        dns.next_index = (dns.next_index + 1) % dns.resolved.len();
        addr.to_string()
    }

    /// Reconnection task: consumes retry signals, dials with backoff
    /// until connected, then returns to idle
    async fn run_retry_loop(self: Arc<Self>) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => return,
                _ = self.retry.notified() => {}
            }

            // A stale signal for a connection that already recovered
            if self.conn.lock().await.is_some() {
                continue;
            }

            let mut attempt: u32 = 1;
            loop {
                if self.shutdown.is_cancelled() {
                    return;
                }

                let ctx = CancellationToken::new();
                match self.connect(&ctx).await {
                    Ok(()) => {
                        self.reconnects.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!(attempt, "reconnected");
                        break;
                    }
                    Err(err) => {
                        attempt += 1;
                        let delay = backoff_delay(attempt);
                        tracing::debug!(
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "reconnect failed, backing off"
                        );
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = self.shutdown.cancelled() => return,
                        }
                    }
                }
            }
        }
    }

    /// Periodic DNS refresh task
    async fn run_dns_refresh(self: Arc<Self>) {
        if let Err(err) = self.resolve(false).await {
            tracing::warn!(error = %err, "initial DNS resolution failed");
        }

        let mut ticker = tokio::time::interval(DNS_REFRESH_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => return,
                _ = ticker.tick() => {
                    if let Err(err) = self.resolve(true).await {
                        tracing::warn!(error = %err, "DNS refresh failed");
                    }
                }
            }
        }
    }
}

/// Keep-alive on, Nagle off, send buffer raised
fn tune_socket(stream: &TcpStream) -> std::io::Result<()> {
    stream.set_nodelay(true)?;

    let sock = SockRef::from(stream);
    sock.set_tcp_keepalive(&TcpKeepalive::new().with_time(KEEPALIVE_TIME))?;
    sock.set_send_buffer_size(SEND_BUFFER_SIZE)?;

    Ok(())
}

/// Split `host:port`, defaulting the port when absent
///
/// A string that does not parse as `host:port` is treated as a bare
/// host with the default port.
fn split_endpoint(endpoint: &str) -> (String, u16) {
    if let Some((host, port)) = endpoint.rsplit_once(':')
        && !host.is_empty()
        && let Ok(port) = port.parse::<u16>()
    {
        return (host.to_string(), port);
    }
    (endpoint.to_string(), DEFAULT_PORT)
}

/// Delay before reconnect attempt `attempt`
///
/// Attempt 1 connects immediately; from there the nominal delay grows
/// by 1.5x per attempt from a 1 s base, capped at 30 s, with ±20 %
/// random jitter applied after the cap.
fn backoff_delay(attempt: u32) -> Duration {
    if attempt <= 1 {
        return Duration::ZERO;
    }

    let nominal = BACKOFF_BASE.as_secs_f64() * BACKOFF_MULTIPLIER.powi((attempt - 2) as i32);
    let nominal = nominal.min(BACKOFF_MAX.as_secs_f64());

    let jitter = BACKOFF_JITTER * nominal;
    let delayed = rand::rng().random_range((nominal - jitter)..=(nominal + jitter));

    Duration::from_secs_f64(delayed)
}

#[cfg(test)]
#[path = "connection_test.rs"]
mod connection_test;
