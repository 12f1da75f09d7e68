// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job completion orchestrator
//!
//! Owns one [`JobMirror`] per open job. Submissions validate against the
//! optimistic view, then either go to the server synchronously (check
//! events) or through the outbox (photos, checklist). Sync results flow
//! back through [`JobOrchestrator::apply_sync_event`].

mod reconcile;
mod submit;

use crate::error::ProofError;
use crate::events::ProofEvent;
use crate::gps::{GpsCapture, GpsConfig};
use cp_adapters::{LocationProvider, ProofApi};
use cp_core::{Clock, Job, JobId, JobMirror, OutboxItem, RejectedChange, StepPosition};
use cp_storage::{JobStore, OutboxService, PhotoSpool};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Notify};
use tracing::{debug, info};

/// Buffered events per job before slow observers start lagging.
const EVENT_CAPACITY: usize = 64;

/// Collaborators injected into the orchestrator.
pub struct OrchestratorDeps<S, A, L> {
    pub store: Arc<S>,
    pub api: A,
    pub location: L,
    pub spool: PhotoSpool,
    /// Signalled after every enqueue; shared with the sync engine.
    pub wake: Arc<Notify>,
}

pub struct JobOrchestrator<S, A, L, C> {
    store: Arc<S>,
    api: A,
    gps: GpsCapture<L>,
    spool: PhotoSpool,
    clock: C,
    wake: Arc<Notify>,
    mirrors: Mutex<HashMap<JobId, JobMirror>>,
    channels: Mutex<HashMap<JobId, broadcast::Sender<ProofEvent>>>,
    /// Bumped whenever a queued item settles.
    settled: watch::Sender<u64>,
    /// One submission at a time, so validation and enqueue see the same view.
    submit_lock: tokio::sync::Mutex<()>,
}

impl<S, A, L, C> JobOrchestrator<S, A, L, C>
where
    S: OutboxService + JobStore,
    A: ProofApi,
    L: LocationProvider,
    C: Clock,
{
    pub fn new(deps: OrchestratorDeps<S, A, L>, clock: C, gps: GpsConfig) -> Self {
        let (settled, _) = watch::channel(0);
        Self {
            store: deps.store,
            api: deps.api,
            gps: GpsCapture::new(deps.location, gps),
            spool: deps.spool,
            clock,
            wake: deps.wake,
            mirrors: Mutex::new(HashMap::new()),
            channels: Mutex::new(HashMap::new()),
            settled,
            submit_lock: tokio::sync::Mutex::new(()),
        }
    }

    #[cfg(feature = "dev-location-override")]
    pub fn with_fix_strategy(mut self, strategy: crate::gps::FixStrategy) -> Self {
        self.gps = self.gps.with_strategy(strategy);
        self
    }

    /// Rebuild mirrors from persisted snapshots and queued items.
    ///
    /// Spooled photos no queued item refers to are deleted. Returns the
    /// number of jobs restored.
    pub fn restore(&self) -> Result<usize, ProofError> {
        let jobs = self.store.jobs();
        let mut mirrors = self.mirrors.lock();
        for job in jobs.iter() {
            let pending = self.store.pending_for_job(&job.id);
            mirrors.insert(job.id.clone(), JobMirror::restore(job.clone(), &pending));
        }
        drop(mirrors);

        let queued = self.store.pending();
        let keep = queued.iter().filter_map(|entry| match &entry.item {
            OutboxItem::Photo { file, .. } => Some(file.as_path()),
            OutboxItem::ChecklistBulk { .. } => None,
        });
        let pruned = self.spool.prune(keep)?;
        info!(jobs = jobs.len(), queued = queued.len(), pruned, "restored local state");
        Ok(jobs.len())
    }

    /// Start tracking `job` or replace its confirmed base.
    ///
    /// Queued changes for the job stay applied on top of the new base.
    pub fn open_job(&self, job: Job) -> Result<StepPosition, ProofError> {
        self.store.save_job(&job)?;
        let job_id = job.id.clone();
        let position = {
            let mut mirrors = self.mirrors.lock();
            match mirrors.get_mut(&job_id) {
                Some(mirror) => mirror.apply_server_snapshot(job),
                None => {
                    let pending = self.store.pending_for_job(&job_id);
                    mirrors.insert(job_id.clone(), JobMirror::restore(job, &pending));
                }
            }
            mirrors.get(&job_id).map(JobMirror::position).unwrap_or(StepPosition::NotStarted)
        };
        debug!(%job_id, %position, "snapshot applied");
        let mut events = vec![ProofEvent::SnapshotApplied { job_id: job_id.clone(), position }];
        if position == StepPosition::Done {
            events.push(ProofEvent::Done { job_id });
        }
        self.publish(events);
        Ok(position)
    }

    /// Fetch the server's copy of a job and apply it.
    pub async fn refresh(&self, job_id: &JobId) -> Result<StepPosition, ProofError> {
        let job = self.api.fetch_job(job_id).await.map_err(|e| ProofError::from_api(job_id, e))?;
        self.open_job(job)
    }

    /// Optimistic view: confirmed state plus queued changes.
    pub fn view(&self, job_id: &JobId) -> Option<Job> {
        self.mirrors.lock().get(job_id).map(JobMirror::view)
    }

    /// Server-confirmed state only.
    pub fn confirmed(&self, job_id: &JobId) -> Option<Job> {
        self.mirrors.lock().get(job_id).map(|m| m.confirmed().clone())
    }

    pub fn position(&self, job_id: &JobId) -> Option<StepPosition> {
        self.mirrors.lock().get(job_id).map(JobMirror::position)
    }

    pub fn pending_count(&self, job_id: &JobId) -> usize {
        self.mirrors.lock().get(job_id).map_or(0, JobMirror::pending_count)
    }

    /// Changes the server refused since the job was opened.
    pub fn rejected(&self, job_id: &JobId) -> Vec<RejectedChange> {
        self.mirrors.lock().get(job_id).map(|m| m.rejected().to_vec()).unwrap_or_default()
    }

    pub fn dismiss_rejected(&self, job_id: &JobId) {
        if let Some(mirror) = self.mirrors.lock().get_mut(job_id) {
            mirror.clear_rejected();
        }
    }

    /// Subscribe to progress events for one job.
    pub fn observe_job_state(&self, job_id: &JobId) -> broadcast::Receiver<ProofEvent> {
        self.channels
            .lock()
            .entry(job_id.clone())
            .or_insert_with(|| broadcast::channel(EVENT_CAPACITY).0)
            .subscribe()
    }

    /// Resolve once nothing for `job_id` is waiting on the server.
    ///
    /// Rejected items count as settled; check [`Self::rejected`] afterwards.
    pub async fn wait_for_sync(&self, job_id: &JobId) {
        let mut settled = self.settled.subscribe();
        while self.has_pending(job_id) {
            if settled.changed().await.is_err() {
                return;
            }
        }
    }

    fn has_pending(&self, job_id: &JobId) -> bool {
        self.mirrors.lock().get(job_id).is_some_and(JobMirror::has_pending)
    }

    fn mark_settled(&self) {
        self.settled.send_modify(|version| *version += 1);
    }

    fn publish(&self, events: Vec<ProofEvent>) {
        let channels = self.channels.lock();
        for event in events {
            if let Some(tx) = channels.get(event.job_id()) {
                // No receivers is fine
                let _ = tx.send(event);
            }
        }
    }

    fn release_photo(&self, file: &Path) {
        self.spool.release(file);
    }
}

/// Events describing a move from `before` to `after`.
fn position_events(job_id: &JobId, before: StepPosition, after: StepPosition) -> Vec<ProofEvent> {
    let mut events = Vec::new();
    if before != after {
        events.push(ProofEvent::StepAdvanced { job_id: job_id.clone(), position: after });
        if after == StepPosition::Done {
            events.push(ProofEvent::Done { job_id: job_id.clone() });
        }
    }
    events
}

#[cfg(test)]
#[path = "../orchestrator_tests/mod.rs"]
mod tests;
