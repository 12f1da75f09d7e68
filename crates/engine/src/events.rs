// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Submission payloads and the per-job event stream observed by the UI.

use cp_core::{
    CheckKind, ChecklistUpdate, JobId, OutboxItemId, PhotoKind, ProofStep, StepPosition,
};
use serde::Serialize;
use std::path::PathBuf;

/// Data for one step submission.
#[derive(Debug, Clone, PartialEq)]
pub enum StepPayload {
    CheckIn,
    CheckOut,
    Photo { kind: PhotoKind, file: PathBuf },
    Checklist { updates: Vec<ChecklistUpdate> },
}

impl StepPayload {
    pub fn step(&self) -> ProofStep {
        match self {
            StepPayload::CheckIn => ProofStep::CheckIn,
            StepPayload::CheckOut => ProofStep::CheckOut,
            StepPayload::Photo { kind, .. } => ProofStep::from(*kind),
            StepPayload::Checklist { .. } => ProofStep::Checklist,
        }
    }
}

/// What `submit_step` did with an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReceipt {
    pub step: ProofStep,
    /// Position of the optimistic view after the submission.
    pub position: StepPosition,
    /// Outbox item carrying the change; `None` for synchronous steps.
    pub queued: Option<OutboxItemId>,
    /// The check event used site coordinates instead of a device fix.
    pub approximate: bool,
}

/// Progress notifications for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProofEvent {
    StepAdvanced { job_id: JobId, position: StepPosition },
    ItemQueued { job_id: JobId, item_id: OutboxItemId, step: ProofStep },
    ItemConfirmed { job_id: JobId, item_id: OutboxItemId, step: ProofStep },
    /// The server refused a queued change; the view no longer includes it.
    ItemRolledBack {
        job_id: JobId,
        item_id: OutboxItemId,
        step: ProofStep,
        reason: String,
        position: StepPosition,
    },
    /// A check event fell back to site coordinates. Informational only.
    ApproximateLocation { job_id: JobId, kind: CheckKind },
    /// A queued item keeps failing with retryable errors.
    SyncDelayed { job_id: JobId, item_id: OutboxItemId, attempts: u32 },
    SnapshotApplied { job_id: JobId, position: StepPosition },
    Done { job_id: JobId },
}

impl ProofEvent {
    pub fn job_id(&self) -> &JobId {
        match self {
            ProofEvent::StepAdvanced { job_id, .. }
            | ProofEvent::ItemQueued { job_id, .. }
            | ProofEvent::ItemConfirmed { job_id, .. }
            | ProofEvent::ItemRolledBack { job_id, .. }
            | ProofEvent::ApproximateLocation { job_id, .. }
            | ProofEvent::SyncDelayed { job_id, .. }
            | ProofEvent::SnapshotApplied { job_id, .. }
            | ProofEvent::Done { job_id } => job_id,
        }
    }
}
