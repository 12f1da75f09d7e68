// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator tests

mod reconcile;
mod restore;
mod submit;

use super::*;
use crate::events::{StepPayload, StepReceipt};
use crate::sync::SyncEvent;
use crate::test_helpers::{all_done, device, TestContext};
use cp_adapters::{ApiError, ApiOp, Outcome};
use cp_core::{ChecklistUpdate, CheckKind, JobStatus, PhotoKind, ProofStep, UploadStatus};

fn received(rx: &mut broadcast::Receiver<ProofEvent>) -> Vec<ProofEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn validation(status: u16) -> ApiError {
    ApiError::Validation { status, body: "refused".to_string() }
}

fn checklist(updates: &[(&str, bool)]) -> StepPayload {
    StepPayload::Checklist {
        updates: updates.iter().map(|(id, done)| ChecklistUpdate::new(*id, *done)).collect(),
    }
}

fn spooled_files(ctx: &TestContext) -> usize {
    std::fs::read_dir(ctx.dir.path().join(cp_storage::SPOOL_DIR)).map(|d| d.count()).unwrap_or(0)
}
