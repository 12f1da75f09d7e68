// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed store: WAL plus periodic zstd snapshots.

use crate::snapshot::Snapshot;
use crate::state::MaterializedState;
use crate::store::{JobStore, OutboxService, StoreError};
use crate::wal::Wal;
use cp_core::{
    Clock, Event, IdGen, Job, JobId, OutboxEntry, OutboxItem, OutboxItemId, PhotoId,
    RejectedEntry, SystemClock, UuidIdGen,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const WAL_FILE: &str = "events.wal";
pub const SNAPSHOT_FILE: &str = "snapshot.json";

/// Tuning for [`DurableStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Events appended between automatic checkpoints; 0 disables them.
    pub checkpoint_every: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { checkpoint_every: 500 }
    }
}

impl StoreConfig {
    cp_core::setters! { checkpoint_every: u64 }
}

struct Inner {
    wal: Wal,
    state: MaterializedState,
    /// Outbox seq handed out by the last `peek`.
    peeked: Option<u64>,
    since_checkpoint: u64,
}

/// Outbox and job cache persisted under a state directory.
///
/// Every mutation is appended to the WAL and fsynced before the call
/// returns. All access is serialized through one mutex.
pub struct DurableStore<C: Clock = SystemClock> {
    inner: Mutex<Inner>,
    snapshot_path: PathBuf,
    config: StoreConfig,
    clock: C,
}

impl DurableStore<SystemClock> {
    pub fn open(dir: &Path, config: StoreConfig) -> Result<Self, StoreError> {
        Self::open_with_clock(dir, config, SystemClock)
    }
}

impl<C: Clock> DurableStore<C> {
    /// Load the latest snapshot and replay the WAL written after it.
    pub fn open_with_clock(dir: &Path, config: StoreConfig, clock: C) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;
        let snapshot_path = dir.join(SNAPSHOT_FILE);

        let (mut state, base_seq) = match Snapshot::load(&snapshot_path)? {
            Some(snapshot) => (snapshot.state, snapshot.seq),
            None => (MaterializedState::default(), 0),
        };

        let wal = Wal::open(&dir.join(WAL_FILE), base_seq)?;
        let replay = wal.entries_after(base_seq)?;
        for entry in &replay {
            state.apply_event(&entry.event);
        }

        info!(
            snapshot_seq = base_seq,
            replayed = replay.len(),
            pending = state.outbox.len(),
            jobs = state.jobs.len(),
            "store opened"
        );

        Ok(Self {
            inner: Mutex::new(Inner {
                wal,
                state,
                peeked: None,
                since_checkpoint: replay.len() as u64,
            }),
            snapshot_path,
            config,
            clock,
        })
    }

    /// Write a snapshot of the current state and truncate the WAL it covers.
    ///
    /// Returns the WAL sequence the snapshot covers.
    pub fn checkpoint(&self) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock();
        self.checkpoint_locked(&mut inner)
    }

    /// A copy of the materialized state.
    pub fn state(&self) -> MaterializedState {
        self.inner.lock().state.clone()
    }

    fn checkpoint_locked(&self, inner: &mut Inner) -> Result<u64, StoreError> {
        inner.wal.flush()?;
        let seq = inner.wal.write_seq();
        Snapshot::new(seq, inner.state.clone()).save(&self.snapshot_path)?;
        inner.wal.truncate_before(seq + 1)?;
        inner.since_checkpoint = 0;
        info!(seq, pending = inner.state.outbox.len(), "checkpoint written");
        Ok(seq)
    }

    /// Append, fsync, then apply. State only changes once the event is durable.
    fn commit(&self, inner: &mut Inner, event: Event) -> Result<(), StoreError> {
        let seq = inner.wal.append(&event)?;
        inner.wal.flush()?;
        debug!(seq, event = event.name(), "event committed");
        inner.state.apply_event(&event);
        inner.since_checkpoint += 1;

        if self.config.checkpoint_every > 0 && inner.since_checkpoint >= self.config.checkpoint_every
        {
            // The event is already durable in the WAL; a failed checkpoint
            // only delays compaction.
            if let Err(e) = self.checkpoint_locked(inner) {
                warn!(error = %e, "automatic checkpoint failed");
            }
        }
        Ok(())
    }

    fn take_peeked(inner: &mut Inner) -> Result<OutboxEntry, StoreError> {
        let seq = inner.peeked.take().ok_or(StoreError::NoPendingItem)?;
        inner.state.outbox.iter().find(|e| e.seq == seq).cloned().ok_or(StoreError::NoPendingItem)
    }
}

impl<C: Clock> OutboxService for DurableStore<C> {
    fn enqueue(&self, item: OutboxItem) -> Result<OutboxEntry, StoreError> {
        let mut inner = self.inner.lock();
        let entry = OutboxEntry {
            seq: inner.state.last_outbox_seq + 1,
            id: OutboxItemId::new(UuidIdGen.next()),
            item,
            enqueued_at_ms: self.clock.epoch_ms(),
        };
        self.commit(&mut inner, Event::OutboxEnqueued { entry: entry.clone() })?;
        info!(
            seq = entry.seq,
            item_id = %entry.id,
            job_id = %entry.job_id(),
            kind = %entry.item,
            "item enqueued"
        );
        Ok(entry)
    }

    fn peek(&self) -> Option<OutboxEntry> {
        let mut inner = self.inner.lock();
        let head = inner.state.head().cloned();
        inner.peeked = head.as_ref().map(|e| e.seq);
        head
    }

    fn acknowledge(&self, photo_id: Option<PhotoId>) -> Result<OutboxEntry, StoreError> {
        let mut inner = self.inner.lock();
        let entry = Self::take_peeked(&mut inner)?;
        self.commit(&mut inner, Event::OutboxAcked { seq: entry.seq, photo_id })?;
        Ok(entry)
    }

    fn reject(&self, reason: &str) -> Result<OutboxEntry, StoreError> {
        let mut inner = self.inner.lock();
        let entry = Self::take_peeked(&mut inner)?;
        let event = Event::OutboxRejected {
            seq: entry.seq,
            reason: reason.to_string(),
            at_ms: self.clock.epoch_ms(),
        };
        self.commit(&mut inner, event)?;
        Ok(entry)
    }

    fn pending(&self) -> Vec<OutboxEntry> {
        self.inner.lock().state.outbox.clone()
    }

    fn pending_for_job(&self, job_id: &JobId) -> Vec<OutboxEntry> {
        self.inner.lock().state.pending_for_job(job_id).cloned().collect()
    }

    fn rejected(&self) -> Vec<RejectedEntry> {
        self.inner.lock().state.rejected.clone()
    }

    fn len(&self) -> usize {
        self.inner.lock().state.outbox.len()
    }
}

impl<C: Clock> JobStore for DurableStore<C> {
    fn save_job(&self, job: &Job) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if inner.state.jobs.get(&job.id) == Some(job) {
            return Ok(());
        }
        self.commit(&mut inner, Event::JobSnapshot { job: Box::new(job.clone()) })
    }

    fn load_job(&self, id: &JobId) -> Option<Job> {
        self.inner.lock().state.jobs.get(id).cloned()
    }

    fn jobs(&self) -> Vec<Job> {
        self.inner.lock().state.jobs.values().cloned().collect()
    }

    fn forget_job(&self, id: &JobId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if !inner.state.jobs.contains_key(id) {
            return Ok(());
        }
        self.commit(&mut inner, Event::JobForgotten { id: id.clone() })
    }
}

#[cfg(test)]
#[path = "durable_tests.rs"]
mod tests;
