//! Batch accumulator
//!
//! One generic accumulator serves both record kinds, parameterised by
//! the record type and the sink that ships a snapshot. Two triggers
//! move records out: reaching `size_cap` flushes synchronously from the
//! caller's context, and a dedicated worker task flushes every
//! `flush_interval`.
//!
//! # Locking
//!
//! The queue lock is held only around O(1) vector operations; it is
//! never held across network I/O. A separate async gate serialises
//! flushes so at most one snapshot is in flight per accumulator.
//!
//! # Failure handling
//!
//! - Network failure: the snapshot is prepended back to the queue, so
//!   the failed batch retries ahead of anything enqueued after it.
//! - Caller cancellation: the snapshot is dropped; requeueing into a
//!   context the caller already abandoned would retry forever.
//! - Validation failure: the snapshot is dropped; it would fail the
//!   same way on every retry.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Sink that ships one snapshot of records
pub(crate) trait SendBatch<T>: Send + Sync + 'static {
    /// Send the snapshot, honouring the cancellation handle
    fn send(
        &self,
        ctx: &CancellationToken,
        records: &[T],
    ) -> impl Future<Output = Result<()>> + Send;
}

/// In-memory queue with size- and time-based flush triggers
pub(crate) struct Batcher<T, S> {
    inner: Arc<Inner<T, S>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

struct Inner<T, S> {
    items: Mutex<Vec<T>>,
    size_cap: usize,
    flush_gate: tokio::sync::Mutex<()>,
    success_count: AtomicU64,
    failure_count: AtomicU64,
    last_flush: Mutex<Option<SystemTime>>,
    last_failure: Mutex<Option<SystemTime>>,
    sink: S,
    shutdown: CancellationToken,
}

impl<T, S> Batcher<T, S>
where
    T: Send + Sync + 'static,
    S: SendBatch<T>,
{
    /// Create the accumulator and start its periodic flush worker
    ///
    /// Must be called within a Tokio runtime.
    pub fn new(size_cap: usize, flush_interval: Duration, sink: S) -> Self {
        let inner = Arc::new(Inner {
            items: Mutex::new(Vec::with_capacity(size_cap)),
            size_cap,
            flush_gate: tokio::sync::Mutex::new(()),
            success_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            last_flush: Mutex::new(None),
            last_failure: Mutex::new(None),
            sink,
            shutdown: CancellationToken::new(),
        });

        let worker = tokio::spawn(periodic_flush(Arc::clone(&inner), flush_interval));

        Self {
            inner,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Append one record, flushing synchronously at the size threshold
    pub async fn add(&self, ctx: &CancellationToken, record: T) -> Result<()> {
        if ctx.is_cancelled() {
            return Err(Error::timeout("add"));
        }

        let needs_flush = {
            let mut items = self.inner.items.lock();
            items.push(record);
            items.len() >= self.inner.size_cap
        };

        if needs_flush {
            return self.inner.flush(ctx).await;
        }

        Ok(())
    }

    /// Flush the current queue contents as one batch
    pub async fn flush(&self, ctx: &CancellationToken) -> Result<()> {
        self.inner.flush(ctx).await
    }

    /// Stop the periodic worker and drain under a bounded timeout
    ///
    /// Records that could not be shipped stay queued so the remnant
    /// count is observable; they are lost when the accumulator is
    /// dropped.
    pub async fn close(&self, timeout: Duration) -> Result<()> {
        self.inner.shutdown.cancel();

        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            let _ = worker.await;
        }

        self.inner.drain(timeout).await
    }

    /// Number of records currently queued
    pub fn queue_size(&self) -> u64 {
        self.inner.items.lock().len() as u64
    }

    /// Total records shipped successfully
    pub fn success_count(&self) -> u64 {
        self.inner.success_count.load(Ordering::Relaxed)
    }

    /// Total records that have been through a failed flush
    pub fn failure_count(&self) -> u64 {
        self.inner.failure_count.load(Ordering::Relaxed)
    }

    /// Wall-clock time of the last successful flush
    pub fn last_flush_time(&self) -> Option<SystemTime> {
        *self.inner.last_flush.lock()
    }

    /// Wall-clock time of the last failed flush
    pub fn last_failure_time(&self) -> Option<SystemTime> {
        *self.inner.last_failure.lock()
    }
}

impl<T, S> Drop for Batcher<T, S> {
    fn drop(&mut self) {
        // Stops the worker if close() was never called
        self.inner.shutdown.cancel();
    }
}

impl<T, S> Inner<T, S>
where
    T: Send + Sync + 'static,
    S: SendBatch<T>,
{
    async fn flush(&self, ctx: &CancellationToken) -> Result<()> {
        let _gate = self.flush_gate.lock().await;

        let snapshot = {
            let mut items = self.items.lock();
            if items.is_empty() {
                return Ok(());
            }
            std::mem::replace(&mut *items, Vec::with_capacity(self.size_cap))
        };

        let count = snapshot.len() as u64;

        match self.sink.send(ctx, &snapshot).await {
            Ok(()) => {
                self.record_success(count);
                tracing::debug!(records = count, "flushed batch");
                Ok(())
            }
            Err(err) => {
                self.record_failure(count);

                if ctx.is_cancelled() {
                    // Caller abandoned the operation; do not requeue
                    // into a context that will never complete.
                    return Err(Error::timeout("flush"));
                }

                if err.is_validation() {
                    // Deterministic failure; retrying would loop.
                    tracing::warn!(records = count, error = %err, "dropping invalid batch");
                    return Err(err);
                }

                self.requeue(snapshot);
                Err(err)
            }
        }
    }

    /// Final drain for shutdown: one bounded attempt, remnants requeued
    async fn drain(&self, timeout: Duration) -> Result<()> {
        let _gate = self.flush_gate.lock().await;

        let snapshot = {
            let mut items = self.items.lock();
            if items.is_empty() {
                return Ok(());
            }
            std::mem::take(&mut *items)
        };

        let count = snapshot.len() as u64;
        tracing::debug!(records = count, "flushing remaining records during shutdown");

        // A deadline token instead of dropping the send future: the
        // snapshot must survive to be requeued for remnant accounting.
        let deadline = CancellationToken::new();
        let timer = {
            let deadline = deadline.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                deadline.cancel();
            })
        };

        let result = self.sink.send(&deadline, &snapshot).await;
        timer.abort();

        match result {
            Ok(()) => {
                self.record_success(count);
                Ok(())
            }
            Err(err) => {
                self.record_failure(count);
                self.requeue(snapshot);
                tracing::warn!(
                    remaining = count,
                    "records remained unflushed during shutdown"
                );
                if deadline.is_cancelled() {
                    Err(Error::timeout("close"))
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Put a failed snapshot back at the head of the queue
    fn requeue(&self, mut snapshot: Vec<T>) {
        let mut items = self.items.lock();
        let mut tail = std::mem::take(&mut *items);
        snapshot.append(&mut tail);
        *items = snapshot;
    }

    fn record_success(&self, count: u64) {
        self.success_count.fetch_add(count, Ordering::Relaxed);
        *self.last_flush.lock() = Some(SystemTime::now());
    }

    fn record_failure(&self, count: u64) {
        self.failure_count.fetch_add(count, Ordering::Relaxed);
        *self.last_failure.lock() = Some(SystemTime::now());
    }
}

/// Worker task: flush every `flush_interval` until shutdown
async fn periodic_flush<T, S>(inner: Arc<Inner<T, S>>, flush_interval: Duration)
where
    T: Send + Sync + 'static,
    S: SendBatch<T>,
{
    let mut ticker = tokio::time::interval(flush_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = inner.shutdown.cancelled() => return,
            _ = ticker.tick() => {
                let ctx = CancellationToken::new();
                if let Err(err) = inner.flush(&ctx).await {
                    tracing::warn!(error = %err, "periodic flush failed");
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "batcher_test.rs"]
mod batcher_test;
