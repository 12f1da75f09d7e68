// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from WAL replay

use cp_core::{Event, Job, JobId, OutboxEntry, PendingChange, RejectedEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rejected entries kept for display; oldest are dropped first.
pub const MAX_REJECTED: usize = 100;

/// Local state derived from the event log.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterializedState {
    /// Queued items in enqueue order.
    #[serde(default)]
    pub outbox: Vec<OutboxEntry>,
    #[serde(default)]
    pub rejected: Vec<RejectedEntry>,
    /// Last confirmed server snapshot per job.
    #[serde(default)]
    pub jobs: BTreeMap<JobId, Job>,
    /// Highest outbox sequence ever assigned. Never reused.
    #[serde(default)]
    pub last_outbox_seq: u64,
}

impl MaterializedState {
    /// Apply an event to derive state changes.
    ///
    /// Every handler is idempotent: replaying an event that is already
    /// reflected (for example a WAL entry also covered by the snapshot)
    /// leaves the state unchanged.
    pub fn apply_event(&mut self, event: &Event) {
        match event {
            Event::OutboxEnqueued { entry } => {
                if entry.seq > self.last_outbox_seq {
                    self.last_outbox_seq = entry.seq;
                    self.outbox.push(entry.clone());
                }
            }

            Event::OutboxAcked { seq, photo_id } => {
                let Some(idx) = self.outbox.iter().position(|e| e.seq == *seq) else {
                    return;
                };
                let entry = self.outbox.remove(idx);
                if let Some(job) = self.jobs.get_mut(entry.job_id()) {
                    PendingChange::from(&entry.item).confirm(job, photo_id.clone());
                }
            }

            Event::OutboxRejected { seq, reason, at_ms } => {
                let Some(idx) = self.outbox.iter().position(|e| e.seq == *seq) else {
                    return;
                };
                let entry = self.outbox.remove(idx);
                self.rejected.push(RejectedEntry {
                    entry,
                    reason: reason.clone(),
                    rejected_at_ms: *at_ms,
                });
                if self.rejected.len() > MAX_REJECTED {
                    let excess = self.rejected.len() - MAX_REJECTED;
                    self.rejected.drain(..excess);
                }
            }

            Event::JobSnapshot { job } => {
                self.jobs.insert(job.id.clone(), job.as_ref().clone());
            }

            Event::JobForgotten { id } => {
                self.jobs.remove(id);
            }
        }
    }

    /// Oldest queued item.
    pub fn head(&self) -> Option<&OutboxEntry> {
        self.outbox.first()
    }

    pub fn pending_for_job<'a>(&'a self, job_id: &'a JobId) -> impl Iterator<Item = &'a OutboxEntry> {
        self.outbox.iter().filter(move |e| e.job_id() == job_id)
    }

    /// Get a job by ID or unique prefix.
    pub fn get_job(&self, id: &str) -> Option<&Job> {
        if let Some(job) = self.jobs.get(id) {
            return Some(job);
        }
        let mut matches = self.jobs.iter().filter(|(k, _)| k.starts_with(id));
        match (matches.next(), matches.next()) {
            (Some((_, job)), None) => Some(job),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
