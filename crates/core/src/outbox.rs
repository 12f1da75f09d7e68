// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queued server mutations.
//!
//! Only checklist updates and photo uploads are ever queued. Check-in and
//! check-out have no variant here: they gate step legality and must be
//! confirmed by the server synchronously.

use crate::job::{ChecklistItemId, JobId};
use crate::photo::{PhotoKind, PhotoMetadata};
use crate::proof::ProofStep;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::define_id! {
    /// Client-generated identity of a queued mutation. Stable across
    /// retries and restarts.
    pub struct OutboxItemId;
}

/// New completion flag for a single checklist item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistUpdate {
    #[serde(rename = "id")]
    pub item_id: ChecklistItemId,
    #[serde(rename = "is_completed")]
    pub completed: bool,
}

impl ChecklistUpdate {
    pub fn new(item_id: impl Into<ChecklistItemId>, completed: bool) -> Self {
        Self { item_id: item_id.into(), completed }
    }
}

/// A durable intent to mutate server state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboxItem {
    ChecklistBulk { job_id: JobId, items: Vec<ChecklistUpdate> },
    Photo {
        job_id: JobId,
        photo_kind: PhotoKind,
        file: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<PhotoMetadata>,
    },
}

crate::simple_display! {
    OutboxItem {
        ChecklistBulk { .. } => "checklist_bulk",
        Photo { .. } => "photo",
    }
}

impl OutboxItem {
    pub fn job_id(&self) -> &JobId {
        match self {
            OutboxItem::ChecklistBulk { job_id, .. } | OutboxItem::Photo { job_id, .. } => job_id,
        }
    }

    /// Proof step this mutation contributes to.
    pub fn step(&self) -> ProofStep {
        match self {
            OutboxItem::ChecklistBulk { .. } => ProofStep::Checklist,
            OutboxItem::Photo { photo_kind, .. } => ProofStep::from(*photo_kind),
        }
    }
}

/// An enqueued item with its queue position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
    /// Monotonic enqueue order; defines FIFO.
    pub seq: u64,
    pub id: OutboxItemId,
    pub item: OutboxItem,
    pub enqueued_at_ms: u64,
}

impl OutboxEntry {
    pub fn job_id(&self) -> &JobId {
        self.item.job_id()
    }
}

/// An entry the server refused; kept for display after removal from the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedEntry {
    pub entry: OutboxEntry,
    pub reason: String,
    pub rejected_at_ms: u64,
}
