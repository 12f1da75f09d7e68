// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local guard on proof step order.
//!
//! Pure and synchronous: a rejected attempt never reaches the network or
//! the outbox.

use cp_core::{proof, Job, ProofStep};
use thiserror::Error;

/// A submission for a step other than the one the job is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("step {attempted} is out of order (expected {})", expected_name(.expected))]
pub struct OutOfOrderStep {
    /// `None` once the job is done.
    pub expected: Option<ProofStep>,
    pub attempted: ProofStep,
}

fn expected_name(expected: &Option<ProofStep>) -> String {
    match expected {
        Some(step) => step.to_string(),
        None => "nothing, job is done".to_string(),
    }
}

pub struct StepSequencer;

impl StepSequencer {
    /// Accept `attempted` only if it is the next incomplete step of `view`.
    ///
    /// `view` is the optimistic job (confirmed base plus queued changes),
    /// so a photo that is captured but not yet uploaded already counts.
    pub fn validate(view: &Job, attempted: ProofStep) -> Result<ProofStep, OutOfOrderStep> {
        let expected = proof::next_step(view);
        if expected == Some(attempted) {
            Ok(attempted)
        } else {
            Err(OutOfOrderStep { expected, attempted })
        }
    }
}

#[cfg(test)]
#[path = "sequencer_tests.rs"]
mod tests;
