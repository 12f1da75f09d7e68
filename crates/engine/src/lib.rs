// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cp-engine: step sequencing, sync and job completion orchestration

mod backoff;
mod error;
mod events;
mod gps;
mod idempotency;
mod orchestrator;
mod sequencer;
mod sync;

#[cfg(test)]
mod test_helpers;

pub use backoff::Backoff;
pub use error::ProofError;
pub use events::{ProofEvent, StepPayload, StepReceipt};
pub use gps::{FixStrategy, GpsCapture, GpsConfig, LocationFix};
pub use idempotency::{check_key, idempotency_key};
pub use orchestrator::{JobOrchestrator, OrchestratorDeps};
pub use sequencer::{OutOfOrderStep, StepSequencer};
pub use sync::{DrainReport, SyncConfig, SyncEngine, SyncEvent};
