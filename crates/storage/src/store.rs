// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage seams injected into the engine.

use crate::snapshot::SnapshotError;
use crate::wal::WalError;
use cp_core::{Job, JobId, OutboxEntry, OutboxItem, PhotoId, RejectedEntry};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Acknowledge or reject without a preceding `peek`.
    #[error("no pending item: acknowledge/reject called without a peeked item")]
    NoPendingItem,
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable FIFO of server mutations awaiting delivery.
///
/// `peek` marks the head as the item under delivery; `acknowledge` and
/// `reject` remove exactly that item. Items are handed out in enqueue order
/// across all jobs.
pub trait OutboxService: Send + Sync + 'static {
    /// Append an item. Once this returns the item survives a restart.
    fn enqueue(&self, item: OutboxItem) -> Result<OutboxEntry, StoreError>;

    /// Oldest unacknowledged item, left in place.
    fn peek(&self) -> Option<OutboxEntry>;

    /// Remove the item returned by the last `peek` and fold it into the
    /// stored job snapshot, as one durable change.
    fn acknowledge(&self, photo_id: Option<PhotoId>) -> Result<OutboxEntry, StoreError>;

    /// Remove the peeked item as terminally refused, keeping it for display.
    fn reject(&self, reason: &str) -> Result<OutboxEntry, StoreError>;

    fn pending(&self) -> Vec<OutboxEntry>;

    fn pending_for_job(&self, job_id: &JobId) -> Vec<OutboxEntry>;

    fn rejected(&self) -> Vec<RejectedEntry>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Confirmed job snapshots kept for offline start-up.
pub trait JobStore: Send + Sync + 'static {
    fn save_job(&self, job: &Job) -> Result<(), StoreError>;

    fn load_job(&self, id: &JobId) -> Option<Job>;

    fn jobs(&self) -> Vec<Job>;

    fn forget_job(&self, id: &JobId) -> Result<(), StoreError>;
}
