// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{
    ChecklistUpdate, Coordinates, Job, JobId, OutboxEntry, OutboxItem, OutboxItemId, PhotoKind,
};
use std::path::PathBuf;

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for proof model types.
pub mod strategies {
    use crate::proof::ProofStep;
    use proptest::prelude::*;

    pub fn arb_step() -> impl Strategy<Value = ProofStep> {
        prop_oneof![
            Just(ProofStep::CheckIn),
            Just(ProofStep::BeforePhoto),
            Just(ProofStep::Checklist),
            Just(ProofStep::AfterPhoto),
            Just(ProofStep::CheckOut),
        ]
    }

    /// Random submission attempts, legal or not.
    pub fn arb_attempts() -> impl Strategy<Value = Vec<ProofStep>> {
        proptest::collection::vec(arb_step(), 0..20)
    }
}

// ── Fixtures ────────────────────────────────────────────────────────────

/// Job with three required checklist items, one before and one after photo.
pub fn standard_job(id: &str) -> Job {
    Job::builder()
        .id(id)
        .item("mop", true, false)
        .item("dust", true, false)
        .item("bins", true, false)
        .build()
}

pub fn site() -> Coordinates {
    Coordinates::new(55.7558, 37.6173)
}

pub fn checklist_item(job_id: &str, updates: &[(&str, bool)]) -> OutboxItem {
    OutboxItem::ChecklistBulk {
        job_id: JobId::new(job_id),
        items: updates.iter().map(|(id, done)| ChecklistUpdate::new(*id, *done)).collect(),
    }
}

pub fn photo_item(job_id: &str, kind: PhotoKind, file: &str) -> OutboxItem {
    OutboxItem::Photo {
        job_id: JobId::new(job_id),
        photo_kind: kind,
        file: PathBuf::from(file),
        metadata: None,
    }
}

pub fn outbox_entry(seq: u64, item: OutboxItem) -> OutboxEntry {
    OutboxEntry {
        seq,
        id: OutboxItemId::new(format!("item-{seq}")),
        item,
        enqueued_at_ms: 1_000_000 + seq,
    }
}
