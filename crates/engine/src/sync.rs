// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background delivery of queued mutations.
//!
//! One item is in flight at a time, always the outbox head, so per-job
//! order follows enqueue order. A retryable failure keeps the head in
//! place and backs off; a terminal refusal removes it and moves on.

use crate::backoff::Backoff;
use crate::idempotency::idempotency_key;
use cp_adapters::{ApiError, ProofApi};
use cp_core::{OutboxEntry, OutboxItem, OutboxItemId, PhotoId};
use cp_storage::{OutboxService, StoreError};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Tuning for [`SyncEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    /// Upper bound on a single submission.
    pub request_timeout: Duration,
    /// Attempts on one item before a `RetryWarning` is emitted.
    pub warn_after_attempts: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            request_timeout: Duration::from_secs(15),
            warn_after_attempts: 5,
        }
    }
}

impl SyncConfig {
    cp_core::setters! {
        base_backoff: Duration,
        max_backoff: Duration,
        request_timeout: Duration,
        warn_after_attempts: u32,
    }
}

/// Delivery progress, consumed by the orchestrator's reconciler.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Attempting { entry: OutboxEntry, attempt: u32 },
    Acknowledged { entry: OutboxEntry, photo_id: Option<PhotoId> },
    RetryWarning { entry: OutboxEntry, attempts: u32, error: String },
    Rejected { entry: OutboxEntry, reason: String },
}

impl SyncEvent {
    pub fn entry(&self) -> &OutboxEntry {
        match self {
            SyncEvent::Attempting { entry, .. }
            | SyncEvent::Acknowledged { entry, .. }
            | SyncEvent::RetryWarning { entry, .. }
            | SyncEvent::Rejected { entry, .. } => entry,
        }
    }
}

/// Result of one [`SyncEngine::drain_once`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub acknowledged: usize,
    pub rejected: usize,
    /// Items still queued when the pass ended.
    pub remaining: usize,
    /// The retryable failure that stopped the pass, if any.
    pub stopped_by: Option<String>,
}

enum Attempt {
    Acknowledged,
    Rejected,
    Retry { attempts: u32 },
}

#[derive(Debug)]
struct HeadAttempts {
    item_id: OutboxItemId,
    count: u32,
    warned: bool,
    last_error: String,
}

pub struct SyncEngine<S, A> {
    store: Arc<S>,
    api: A,
    config: SyncConfig,
    backoff: Backoff,
    wake: Arc<Notify>,
    events: mpsc::UnboundedSender<SyncEvent>,
    head: Mutex<Option<HeadAttempts>>,
}

impl<S: OutboxService, A: ProofApi> SyncEngine<S, A> {
    pub fn new(
        store: Arc<S>,
        api: A,
        config: SyncConfig,
        wake: Arc<Notify>,
        events: mpsc::UnboundedSender<SyncEvent>,
    ) -> Self {
        let backoff = Backoff::new(config.base_backoff, config.max_backoff);
        Self { store, api, config, backoff, wake, events, head: Mutex::new(None) }
    }

    /// Deliver until cancelled.
    ///
    /// Idles on the wake signal while the queue is empty. Cancellation
    /// drops an in-flight submission without acknowledging it, so the item
    /// is sent again next run.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(pending = self.store.len(), "sync engine started");
        loop {
            let Some(entry) = self.store.peek() else {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = self.wake.notified() => {}
                }
                continue;
            };
            let outcome = tokio::select! {
                _ = cancel.cancelled() => break,
                outcome = self.attempt(entry) => outcome,
            };
            if let Attempt::Retry { attempts } = outcome {
                let delay = self.backoff.delay(attempts);
                debug!(attempts, delay_ms = delay.as_millis() as u64, "backing off");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
        info!(pending = self.store.len(), "sync engine stopped");
    }

    /// Deliver queued items until the queue is empty or a retryable
    /// failure occurs. Never sleeps.
    pub async fn drain_once(&self) -> DrainReport {
        let mut report = DrainReport::default();
        while let Some(entry) = self.store.peek() {
            match self.attempt(entry).await {
                Attempt::Acknowledged => report.acknowledged += 1,
                Attempt::Rejected => report.rejected += 1,
                Attempt::Retry { .. } => {
                    report.stopped_by = self.head.lock().as_ref().map(|h| h.last_error.clone());
                    break;
                }
            }
        }
        report.remaining = self.store.len();
        report
    }

    async fn attempt(&self, entry: OutboxEntry) -> Attempt {
        let attempt = self.attempts_on(&entry.id) + 1;
        debug!(seq = entry.seq, item_id = %entry.id, job_id = %entry.job_id(), attempt, "submitting");
        self.emit(SyncEvent::Attempting { entry: entry.clone(), attempt });

        match self.submit(&entry).await {
            Ok(photo_id) => match self.store.acknowledge(photo_id.clone()) {
                Ok(_) => {
                    info!(seq = entry.seq, item_id = %entry.id, job_id = %entry.job_id(), "acknowledged");
                    *self.head.lock() = None;
                    self.emit(SyncEvent::Acknowledged { entry, photo_id });
                    Attempt::Acknowledged
                }
                Err(e) => self.store_failure(&entry, e),
            },
            Err(e) if e.is_retryable() => self.record_retry(entry, e),
            Err(e) => {
                let reason = e.to_string();
                match self.store.reject(&reason) {
                    Ok(_) => {
                        warn!(seq = entry.seq, item_id = %entry.id, job_id = %entry.job_id(), %reason, "rejected by server");
                        *self.head.lock() = None;
                        self.emit(SyncEvent::Rejected { entry, reason });
                        Attempt::Rejected
                    }
                    Err(e) => self.store_failure(&entry, e),
                }
            }
        }
    }

    async fn submit(&self, entry: &OutboxEntry) -> Result<Option<PhotoId>, ApiError> {
        let key = idempotency_key(entry.job_id(), entry.item.step(), &entry.id);
        let request = async {
            match &entry.item {
                OutboxItem::ChecklistBulk { job_id, items } => {
                    self.api.update_checklist(job_id, items, &key).await.map(|()| None)
                }
                OutboxItem::Photo { job_id, photo_kind, file, metadata } => self
                    .api
                    .upload_photo(job_id, *photo_kind, file, metadata.as_ref(), &key)
                    .await
                    .map(Some),
            }
        };
        tokio::time::timeout(self.config.request_timeout, request)
            .await
            .unwrap_or(Err(ApiError::Timeout))
    }

    fn attempts_on(&self, item_id: &OutboxItemId) -> u32 {
        match self.head.lock().as_ref() {
            Some(head) if head.item_id == *item_id => head.count,
            _ => 0,
        }
    }

    fn record_retry(&self, entry: OutboxEntry, e: ApiError) -> Attempt {
        let error = e.to_string();
        let (attempts, warn_now) = {
            let mut head = self.head.lock();
            if head.as_ref().is_some_and(|h| h.item_id != entry.id) {
                *head = None;
            }
            let state = head.get_or_insert_with(|| HeadAttempts {
                item_id: entry.id.clone(),
                count: 0,
                warned: false,
                last_error: String::new(),
            });
            state.count += 1;
            state.last_error = error.clone();
            let warn_now = !state.warned && state.count >= self.config.warn_after_attempts;
            state.warned |= warn_now;
            (state.count, warn_now)
        };
        debug!(seq = entry.seq, item_id = %entry.id, attempts, %error, "retryable failure");
        if warn_now {
            warn!(seq = entry.seq, item_id = %entry.id, job_id = %entry.job_id(), attempts, %error, "item keeps failing");
            self.emit(SyncEvent::RetryWarning { entry, attempts, error });
        }
        Attempt::Retry { attempts }
    }

    // The server may already hold the change; the same key is sent again
    // next attempt, so it is safe to treat this as retryable.
    fn store_failure(&self, entry: &OutboxEntry, e: StoreError) -> Attempt {
        debug_assert!(
            !matches!(e, StoreError::NoPendingItem),
            "outbox head changed under the sync engine"
        );
        error!(seq = entry.seq, item_id = %entry.id, error = %e, "failed to settle outbox item");
        self.record_retry(entry.clone(), ApiError::Network(format!("local store: {e}")))
    }

    fn emit(&self, event: SyncEvent) {
        if self.events.send(event).is_err() {
            debug!("sync event receiver dropped");
        }
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
