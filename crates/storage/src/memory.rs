// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory store for tests

use crate::state::MaterializedState;
use crate::store::{JobStore, OutboxService, StoreError};
use cp_core::{
    Clock, Event, FakeClock, IdGen, Job, JobId, OutboxEntry, OutboxItem, OutboxItemId, PhotoId,
    RejectedEntry, SequentialIdGen,
};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct MemoryState {
    state: MaterializedState,
    peeked: Option<u64>,
    fail_enqueue: bool,
}

/// Same contract as the durable store without touching disk.
///
/// Item ids are `item-1`, `item-2`, ... Clones share state.
#[derive(Clone)]
pub struct MemoryStore<C: Clock = FakeClock> {
    inner: Arc<Mutex<MemoryState>>,
    ids: SequentialIdGen,
    clock: C,
}

impl Default for MemoryStore<FakeClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore<FakeClock> {
    pub fn new() -> Self {
        Self::with_clock(FakeClock::new())
    }
}

impl<C: Clock> MemoryStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryState::default())),
            ids: SequentialIdGen::new("item"),
            clock,
        }
    }

    /// Make subsequent `enqueue` calls fail as if the disk were full.
    pub fn fail_enqueue(&self, fail: bool) {
        self.inner.lock().fail_enqueue = fail;
    }

    fn commit(inner: &mut MemoryState, event: Event) {
        inner.state.apply_event(&event);
    }

    fn take_peeked(inner: &mut MemoryState) -> Result<OutboxEntry, StoreError> {
        let seq = inner.peeked.take().ok_or(StoreError::NoPendingItem)?;
        inner.state.outbox.iter().find(|e| e.seq == seq).cloned().ok_or(StoreError::NoPendingItem)
    }
}

impl<C: Clock> OutboxService for MemoryStore<C> {
    fn enqueue(&self, item: OutboxItem) -> Result<OutboxEntry, StoreError> {
        let mut inner = self.inner.lock();
        if inner.fail_enqueue {
            return Err(StoreError::Io(std::io::Error::other("injected enqueue failure")));
        }
        let entry = OutboxEntry {
            seq: inner.state.last_outbox_seq + 1,
            id: OutboxItemId::new(self.ids.next()),
            item,
            enqueued_at_ms: self.clock.epoch_ms(),
        };
        Self::commit(&mut inner, Event::OutboxEnqueued { entry: entry.clone() });
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
        Self::commit(&mut inner, Event::OutboxAcked { seq: entry.seq, photo_id });
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
        Self::commit(&mut inner, event);
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

impl<C: Clock> JobStore for MemoryStore<C> {
    fn save_job(&self, job: &Job) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        Self::commit(&mut inner, Event::JobSnapshot { job: Box::new(job.clone()) });
        Ok(())
    }

    fn load_job(&self, id: &JobId) -> Option<Job> {
        self.inner.lock().state.jobs.get(id).cloned()
    }

    fn jobs(&self) -> Vec<Job> {
        self.inner.lock().state.jobs.values().cloned().collect()
    }

    fn forget_job(&self, id: &JobId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        Self::commit(&mut inner, Event::JobForgotten { id: id.clone() });
        Ok(())
    }
}
