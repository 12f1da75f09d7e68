// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idempotency keys for server mutations.

use cp_core::{JobId, OutboxItemId, ProofStep};
use sha2::{Digest, Sha256};

/// Stable key for a queued mutation.
///
/// Derived only from persisted values, so every retry of the same outbox
/// item, before or after a restart, sends the same key.
pub fn idempotency_key(job_id: &JobId, step: ProofStep, item_id: &OutboxItemId) -> String {
    digest(job_id, step, item_id.as_str())
}

/// Key for a synchronous check event. One check-in and one check-out exist
/// per job, so the step alone identifies the record.
pub fn check_key(job_id: &JobId, step: ProofStep) -> String {
    digest(job_id, step, "")
}

fn digest(job_id: &JobId, step: ProofStep, item: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(job_id.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(step.to_string().as_bytes());
    hasher.update([0u8]);
    hasher.update(item.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
#[path = "idempotency_tests.rs"]
mod tests;
