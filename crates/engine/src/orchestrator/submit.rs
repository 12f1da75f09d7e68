// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step submission

use super::{position_events, JobOrchestrator};
use crate::error::ProofError;
use crate::events::{ProofEvent, StepPayload, StepReceipt};
use crate::idempotency::check_key;
use crate::sequencer::StepSequencer;
use cp_adapters::{LocationProvider, ProofApi};
use cp_core::{
    proof, CheckEvent, CheckKind, ChecklistUpdate, Clock, Job, JobId, OutboxItem, PendingChange,
    PhotoKind, PhotoMetadata, ProofStep,
};
use cp_storage::{JobStore, OutboxService};
use std::collections::HashSet;
use std::io;
use std::path::Path;
use tracing::{info, warn};

impl<S, A, L, C> JobOrchestrator<S, A, L, C>
where
    S: OutboxService + JobStore,
    A: ProofApi,
    L: LocationProvider,
    C: Clock,
{
    /// Submit the data for one proof step.
    ///
    /// The step must be the next incomplete one in the optimistic view; an
    /// out-of-order attempt fails before any network or outbox activity.
    /// Check-in and check-out return once the server has recorded them.
    /// Photos and checklist updates return once durably queued.
    pub async fn submit_step(
        &self,
        job_id: &JobId,
        payload: StepPayload,
    ) -> Result<StepReceipt, ProofError> {
        let _guard = self.submit_lock.lock().await;
        let view = self.view(job_id).ok_or_else(|| ProofError::JobNotFound(job_id.clone()))?;
        let step = StepSequencer::validate(&view, payload.step())?;

        match payload {
            StepPayload::CheckIn => self.submit_check(&view, CheckKind::CheckIn).await,
            StepPayload::CheckOut => {
                let pending = self.store.pending_for_job(job_id).len();
                if pending > 0 {
                    return Err(ProofError::SyncPending { job_id: job_id.clone(), pending });
                }
                self.submit_check(&view, CheckKind::CheckOut).await
            }
            StepPayload::Photo { kind, file } => self.queue_photo(&view, kind, &file).await,
            StepPayload::Checklist { updates } => {
                validate_updates(&view, &updates)?;
                let item = OutboxItem::ChecklistBulk { job_id: job_id.clone(), items: updates };
                self.queue(&view, step, item)
            }
        }
    }

    async fn submit_check(&self, view: &Job, kind: CheckKind) -> Result<StepReceipt, ProofError> {
        let job_id = &view.id;
        let step = ProofStep::from(kind);
        let fix = self.gps.check_fix(view, kind).await?;
        let event = CheckEvent::new(kind, self.clock.epoch_ms(), fix.coordinates, fix.approximate);

        let job = self
            .api
            .record_check(job_id, &event, &check_key(job_id, step))
            .await
            .map_err(|e| ProofError::from_api(job_id, e))?;
        self.store.save_job(&job)?;

        let before = proof::position(view);
        let after = {
            let mut mirrors = self.mirrors.lock();
            match mirrors.get_mut(job_id) {
                Some(mirror) => {
                    mirror.apply_server_snapshot(job);
                    mirror.position()
                }
                None => proof::position(&job),
            }
        };
        info!(%job_id, %kind, approximate = fix.approximate, "check event recorded");

        let mut events = Vec::new();
        if fix.approximate {
            events.push(ProofEvent::ApproximateLocation { job_id: job_id.clone(), kind });
        }
        events.extend(position_events(job_id, before, after));
        self.publish(events);

        Ok(StepReceipt { step, position: after, queued: None, approximate: fix.approximate })
    }

    async fn queue_photo(
        &self,
        view: &Job,
        kind: PhotoKind,
        source: &Path,
    ) -> Result<StepReceipt, ProofError> {
        let coordinates = self.gps.photo_fix().await;
        let metadata = PhotoMetadata { coordinates, taken_at_ms: self.clock.epoch_ms() };
        let file = self.spool.stage(source).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                ProofError::InvalidPayload(format!("photo file not found: {}", source.display()))
            }
            _ => ProofError::Io(e),
        })?;

        let item = OutboxItem::Photo {
            job_id: view.id.clone(),
            photo_kind: kind,
            file: file.clone(),
            metadata: Some(metadata),
        };
        self.queue(view, ProofStep::from(kind), item).inspect_err(|_| self.release_photo(&file))
    }

    /// Enqueue `item` and mirror it in the overlay.
    ///
    /// The mirrors lock is held across the enqueue so the reconciler can
    /// never see an acknowledgement before the overlay entry exists.
    fn queue(&self, view: &Job, step: ProofStep, item: OutboxItem) -> Result<StepReceipt, ProofError> {
        let job_id = &view.id;
        let before = proof::position(view);
        let (entry, after) = {
            let mut mirrors = self.mirrors.lock();
            let mirror =
                mirrors.get_mut(job_id).ok_or_else(|| ProofError::JobNotFound(job_id.clone()))?;
            let entry = self.store.enqueue(item).inspect_err(|e| {
                warn!(%job_id, %step, error = %e, "enqueue failed");
            })?;
            mirror.push_optimistic(entry.id.clone(), PendingChange::from(&entry.item));
            (entry, mirror.position())
        };
        self.wake.notify_one();
        info!(%job_id, %step, seq = entry.seq, item_id = %entry.id, "queued");

        let mut events =
            vec![ProofEvent::ItemQueued { job_id: job_id.clone(), item_id: entry.id.clone(), step }];
        events.extend(position_events(job_id, before, after));
        self.publish(events);

        Ok(StepReceipt { step, position: after, queued: Some(entry.id), approximate: false })
    }
}

fn validate_updates(view: &Job, updates: &[ChecklistUpdate]) -> Result<(), ProofError> {
    if updates.is_empty() {
        return Err(ProofError::InvalidPayload("checklist update has no items".to_string()));
    }
    let mut seen = HashSet::new();
    for update in updates {
        if view.checklist_item(&update.item_id).is_none() {
            return Err(ProofError::InvalidPayload(format!(
                "unknown checklist item {}",
                update.item_id
            )));
        }
        if !seen.insert(&update.item_id) {
            return Err(ProofError::InvalidPayload(format!(
                "checklist item {} listed twice",
                update.item_id
            )));
        }
    }
    Ok(())
}
