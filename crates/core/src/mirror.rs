// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-phase job mirror: a confirmed base plus an optimistic overlay.
//!
//! The confirmed base only ever holds server truth: a snapshot, or a change
//! the server acknowledged. Queued changes live in the overlay, keyed by the
//! outbox item that carries them, so rollback is dropping one overlay entry
//! and acknowledgement is folding one entry into the base.

use crate::job::Job;
use crate::outbox::{ChecklistUpdate, OutboxEntry, OutboxItem, OutboxItemId};
use crate::photo::{Photo, PhotoId, PhotoKind, PhotoMetadata, UploadStatus};
use crate::proof::{self, ProofStep, StepPosition};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A local change not yet confirmed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingChange {
    Checklist {
        updates: Vec<ChecklistUpdate>,
    },
    Photo {
        photo_kind: PhotoKind,
        local_path: PathBuf,
        metadata: Option<PhotoMetadata>,
    },
}

impl PendingChange {
    pub fn step(&self) -> ProofStep {
        match self {
            PendingChange::Checklist { .. } => ProofStep::Checklist,
            PendingChange::Photo { photo_kind, .. } => ProofStep::from(*photo_kind),
        }
    }

    /// Fold this change into server-confirmed state.
    pub fn confirm(&self, job: &mut Job, photo_id: Option<PhotoId>) {
        let PendingChange::Photo { photo_kind, metadata, .. } = self else {
            self.apply(job, UploadStatus::Uploaded);
            return;
        };
        let photo = match photo_id {
            // A refreshed snapshot may already include it
            Some(id) if job.photos.iter().any(|p| p.id.as_ref() == Some(&id)) => return,
            Some(id) => Photo::uploaded(id, *photo_kind, *metadata),
            None => Photo {
                id: None,
                kind: *photo_kind,
                local_path: None,
                metadata: *metadata,
                status: UploadStatus::Uploaded,
            },
        };
        job.photos.push(photo);
    }

    fn apply(&self, job: &mut Job, status: UploadStatus) {
        match self {
            PendingChange::Checklist { updates } => {
                for update in updates {
                    if let Some(item) = job.checklist.iter_mut().find(|i| i.id == update.item_id) {
                        item.completed = update.completed;
                    }
                }
            }
            PendingChange::Photo { photo_kind, local_path, metadata } => {
                let mut photo = Photo::pending(*photo_kind, local_path.clone(), *metadata);
                photo.status = status;
                job.photos.push(photo);
            }
        }
    }
}

impl From<&OutboxItem> for PendingChange {
    fn from(item: &OutboxItem) -> Self {
        match item {
            OutboxItem::ChecklistBulk { items, .. } => {
                PendingChange::Checklist { updates: items.clone() }
            }
            OutboxItem::Photo { photo_kind, file, metadata, .. } => PendingChange::Photo {
                photo_kind: *photo_kind,
                local_path: file.clone(),
                metadata: *metadata,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct OverlayEntry {
    item_id: OutboxItemId,
    change: PendingChange,
    #[serde(default)]
    uploading: bool,
}

/// A change the server refused, kept so the UI can show what failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedChange {
    pub item_id: OutboxItemId,
    pub change: PendingChange,
    pub reason: String,
}

impl RejectedChange {
    pub fn step(&self) -> ProofStep {
        self.change.step()
    }

    /// The refused photo with status `failed`, for photo changes.
    pub fn failed_photo(&self) -> Option<Photo> {
        match &self.change {
            PendingChange::Photo { photo_kind, local_path, metadata } => {
                let mut photo = Photo::pending(*photo_kind, local_path.clone(), *metadata);
                photo.status = UploadStatus::Failed;
                Some(photo)
            }
            PendingChange::Checklist { .. } => None,
        }
    }
}

/// Local mirror of one job's proof trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMirror {
    confirmed: Job,
    overlay: Vec<OverlayEntry>,
    rejected: Vec<RejectedChange>,
}

impl JobMirror {
    pub fn new(confirmed: Job) -> Self {
        Self { confirmed, overlay: Vec::new(), rejected: Vec::new() }
    }

    /// Rebuild a mirror from a confirmed snapshot and the job's queued items.
    pub fn restore<'a>(confirmed: Job, pending: impl IntoIterator<Item = &'a OutboxEntry>) -> Self {
        let mut mirror = Self::new(confirmed);
        for entry in pending {
            mirror.push_optimistic(entry.id.clone(), PendingChange::from(&entry.item));
        }
        mirror
    }

    /// Server truth only.
    pub fn confirmed(&self) -> &Job {
        &self.confirmed
    }

    /// Confirmed state with every queued change applied in enqueue order.
    pub fn view(&self) -> Job {
        let mut job = self.confirmed.clone();
        for entry in &self.overlay {
            let status =
                if entry.uploading { UploadStatus::Uploading } else { UploadStatus::Pending };
            entry.change.apply(&mut job, status);
        }
        job
    }

    pub fn next_step(&self) -> Option<ProofStep> {
        proof::next_step(&self.view())
    }

    pub fn position(&self) -> StepPosition {
        proof::position(&self.view())
    }

    /// Replace the confirmed base with a server snapshot.
    ///
    /// Queued changes stay in the overlay: the server has not seen them yet,
    /// so they still describe what the job will look like once delivered.
    pub fn apply_server_snapshot(&mut self, snapshot: Job) {
        self.confirmed = snapshot;
    }

    /// Record a change that has been queued for delivery.
    pub fn push_optimistic(&mut self, item_id: OutboxItemId, change: PendingChange) {
        if self.overlay.iter().any(|e| e.item_id == item_id) {
            return;
        }
        self.overlay.push(OverlayEntry { item_id, change, uploading: false });
    }

    /// Flag a queued change as in flight. Returns false if it is unknown.
    pub fn mark_uploading(&mut self, item_id: &OutboxItemId) -> bool {
        match self.overlay.iter_mut().find(|e| e.item_id == *item_id) {
            Some(entry) => {
                entry.uploading = true;
                true
            }
            None => false,
        }
    }

    /// Fold an acknowledged change into the confirmed base.
    pub fn promote(
        &mut self,
        item_id: &OutboxItemId,
        photo_id: Option<PhotoId>,
    ) -> Option<PendingChange> {
        let idx = self.overlay.iter().position(|e| e.item_id == *item_id)?;
        let entry = self.overlay.remove(idx);
        entry.change.confirm(&mut self.confirmed, photo_id);
        Some(entry.change)
    }

    /// Drop a refused change from the overlay, reverting the view.
    pub fn discard(&mut self, item_id: &OutboxItemId, reason: &str) -> Option<PendingChange> {
        let idx = self.overlay.iter().position(|e| e.item_id == *item_id)?;
        let entry = self.overlay.remove(idx);
        self.rejected.push(RejectedChange {
            item_id: entry.item_id,
            change: entry.change.clone(),
            reason: reason.to_string(),
        });
        Some(entry.change)
    }

    pub fn has_pending(&self) -> bool {
        !self.overlay.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.overlay.len()
    }

    pub fn is_pending(&self, item_id: &OutboxItemId) -> bool {
        self.overlay.iter().any(|e| e.item_id == *item_id)
    }

    pub fn rejected(&self) -> &[RejectedChange] {
        &self.rejected
    }

    pub fn clear_rejected(&mut self) {
        self.rejected.clear();
    }
}

#[cfg(test)]
#[path = "mirror_tests.rs"]
mod tests;
