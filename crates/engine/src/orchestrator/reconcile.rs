// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Folding sync results back into job mirrors.

use super::JobOrchestrator;
use crate::error::ProofError;
use crate::events::ProofEvent;
use crate::sync::SyncEvent;
use cp_adapters::{LocationProvider, ProofApi};
use cp_core::{Clock, OutboxItem};
use cp_storage::{JobStore, OutboxService};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

impl<S, A, L, C> JobOrchestrator<S, A, L, C>
where
    S: OutboxService + JobStore,
    A: ProofApi,
    L: LocationProvider,
    C: Clock,
{
    /// Apply one delivery result.
    ///
    /// An acknowledgement promotes the overlay entry into the confirmed
    /// base and persists it. A rejection drops the entry, reverting the
    /// view to what it was before the submission.
    pub fn apply_sync_event(&self, event: &SyncEvent) -> Result<(), ProofError> {
        let entry = event.entry();
        let job_id = entry.job_id();
        let step = entry.item.step();

        let events = match event {
            SyncEvent::Attempting { .. } => {
                if let Some(mirror) = self.mirrors.lock().get_mut(job_id) {
                    mirror.mark_uploading(&entry.id);
                }
                Vec::new()
            }
            SyncEvent::RetryWarning { attempts, .. } => vec![ProofEvent::SyncDelayed {
                job_id: job_id.clone(),
                item_id: entry.id.clone(),
                attempts: *attempts,
            }],
            SyncEvent::Acknowledged { photo_id, .. } => {
                let confirmed = {
                    let mut mirrors = self.mirrors.lock();
                    let Some(mirror) = mirrors.get_mut(job_id) else {
                        debug!(%job_id, item_id = %entry.id, "acknowledged item for unopened job");
                        return Ok(());
                    };
                    mirror.promote(&entry.id, photo_id.clone()).map(|_| mirror.confirmed().clone())
                };
                if let OutboxItem::Photo { file, .. } = &entry.item {
                    self.release_photo(file);
                }
                self.mark_settled();
                match confirmed {
                    Some(job) => self.store.save_job(&job)?,
                    None => debug!(%job_id, item_id = %entry.id, "acknowledged item already settled"),
                }
                vec![ProofEvent::ItemConfirmed {
                    job_id: job_id.clone(),
                    item_id: entry.id.clone(),
                    step,
                }]
            }
            SyncEvent::Rejected { reason, .. } => {
                let position = {
                    let mut mirrors = self.mirrors.lock();
                    let Some(mirror) = mirrors.get_mut(job_id) else {
                        return Ok(());
                    };
                    mirror.discard(&entry.id, reason).map(|_| mirror.position())
                };
                self.mark_settled();
                let Some(position) = position else {
                    return Ok(());
                };
                warn!(%job_id, item_id = %entry.id, %step, %reason, "change rolled back");
                vec![ProofEvent::ItemRolledBack {
                    job_id: job_id.clone(),
                    item_id: entry.id.clone(),
                    step,
                    reason: reason.clone(),
                    position,
                }]
            }
        };
        self.publish(events);
        Ok(())
    }

    /// Apply everything already waiting on `events`. Returns how many were applied.
    pub fn apply_pending(&self, events: &mut mpsc::UnboundedReceiver<SyncEvent>) -> usize {
        let mut applied = 0;
        while let Ok(event) = events.try_recv() {
            self.apply_logged(&event);
            applied += 1;
        }
        applied
    }

    /// Apply sync results as they arrive until cancelled or the sender closes.
    pub async fn reconcile(
        &self,
        mut events: mpsc::UnboundedReceiver<SyncEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.apply_pending(&mut events);
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => self.apply_logged(&event),
                    None => break,
                },
            }
        }
    }

    fn apply_logged(&self, event: &SyncEvent) {
        if let Err(e) = self.apply_sync_event(event) {
            let entry = event.entry();
            error!(job_id = %entry.job_id(), item_id = %entry.id, error = %e, "failed to apply sync result");
        }
    }
}
