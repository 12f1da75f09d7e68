// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Proof steps and their completion predicates.
//!
//! Every predicate is a pure function of a [`Job`] value. Callers decide
//! whether that value is the confirmed server state or the optimistic view.

use crate::check::CheckKind;
use crate::job::Job;
use crate::photo::PhotoKind;
use serde::{Deserialize, Serialize};

/// One stage of a job's proof trail, in mandatory order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofStep {
    CheckIn,
    BeforePhoto,
    Checklist,
    AfterPhoto,
    CheckOut,
}

crate::simple_display! {
    ProofStep {
        CheckIn => "check_in",
        BeforePhoto => "before_photo",
        Checklist => "checklist",
        AfterPhoto => "after_photo",
        CheckOut => "check_out",
    }
}

impl ProofStep {
    /// All steps in submission order.
    pub const ALL: [ProofStep; 5] = [
        ProofStep::CheckIn,
        ProofStep::BeforePhoto,
        ProofStep::Checklist,
        ProofStep::AfterPhoto,
        ProofStep::CheckOut,
    ];

    /// Zero-based position in the sequence.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Check event recorded by this step, if it is a check step.
    pub fn check_kind(&self) -> Option<CheckKind> {
        match self {
            ProofStep::CheckIn => Some(CheckKind::CheckIn),
            ProofStep::CheckOut => Some(CheckKind::CheckOut),
            _ => None,
        }
    }

    /// Photo kind captured by this step, if it is a photo step.
    pub fn photo_kind(&self) -> Option<PhotoKind> {
        match self {
            ProofStep::BeforePhoto => Some(PhotoKind::Before),
            ProofStep::AfterPhoto => Some(PhotoKind::After),
            _ => None,
        }
    }

    /// Steps submitted synchronously; they never go through the outbox.
    pub fn is_synchronous(&self) -> bool {
        self.check_kind().is_some()
    }
}

impl From<CheckKind> for ProofStep {
    fn from(kind: CheckKind) -> Self {
        match kind {
            CheckKind::CheckIn => ProofStep::CheckIn,
            CheckKind::CheckOut => ProofStep::CheckOut,
        }
    }
}

impl From<PhotoKind> for ProofStep {
    fn from(kind: PhotoKind) -> Self {
        match kind {
            PhotoKind::Before => ProofStep::BeforePhoto,
            PhotoKind::After => ProofStep::AfterPhoto,
        }
    }
}

/// Where a job currently stands in its proof trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "step")]
pub enum StepPosition {
    NotStarted,
    At(ProofStep),
    Done,
}

impl std::fmt::Display for StepPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepPosition::NotStarted => f.write_str("not_started"),
            StepPosition::At(step) => write!(f, "{step}"),
            StepPosition::Done => f.write_str("done"),
        }
    }
}

/// Whether `step` is satisfied by `job`.
pub fn is_step_complete(job: &Job, step: ProofStep) -> bool {
    if let Some(kind) = step.check_kind() {
        return job.check_event(kind).is_some();
    }
    match step.photo_kind() {
        Some(kind) => job.photo_count(kind) >= job.required_photos(kind),
        None => job.checklist_satisfied(),
    }
}

/// The first incomplete step, or `None` once the trail is done.
pub fn next_step(job: &Job) -> Option<ProofStep> {
    ProofStep::ALL.into_iter().find(|step| !is_step_complete(job, *step))
}

pub fn position(job: &Job) -> StepPosition {
    match next_step(job) {
        None => StepPosition::Done,
        Some(ProofStep::CheckIn) => StepPosition::NotStarted,
        Some(step) => StepPosition::At(step),
    }
}

#[cfg(test)]
#[path = "proof_tests.rs"]
mod tests;
