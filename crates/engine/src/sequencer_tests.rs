// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use cp_core::test_support::strategies::arb_attempts;
use cp_core::test_support::{site, standard_job};
use cp_core::{CheckEvent, CheckKind, Photo, PhotoId, PhotoKind};
use proptest::prelude::*;

/// Mark `step` complete on `job` the way a confirmed server snapshot would.
fn complete(job: &mut Job, step: ProofStep) {
    match step {
        ProofStep::CheckIn => {
            job.check_in = Some(CheckEvent::new(CheckKind::CheckIn, 1, site(), false))
        }
        ProofStep::BeforePhoto | ProofStep::AfterPhoto => {
            let kind = if step == ProofStep::BeforePhoto { PhotoKind::Before } else { PhotoKind::After };
            let id = PhotoId::new(format!("p{}", job.photos.len()));
            job.photos.push(Photo::uploaded(id, kind, None));
        }
        ProofStep::Checklist => job.checklist.iter_mut().for_each(|i| i.completed = true),
        ProofStep::CheckOut => {
            job.check_out = Some(CheckEvent::new(CheckKind::CheckOut, 2, site(), false))
        }
    }
}

#[test]
fn fresh_job_accepts_only_check_in() {
    let job = standard_job("j1");
    assert_eq!(StepSequencer::validate(&job, ProofStep::CheckIn), Ok(ProofStep::CheckIn));

    let err = StepSequencer::validate(&job, ProofStep::Checklist).unwrap_err();
    assert_eq!(err.expected, Some(ProofStep::CheckIn));
    assert_eq!(err.attempted, ProofStep::Checklist);
}

#[yare::parameterized(
    before_photo = { ProofStep::BeforePhoto },
    checklist    = { ProofStep::Checklist },
    after_photo  = { ProofStep::AfterPhoto },
    check_out    = { ProofStep::CheckOut },
)]
fn skipping_ahead_is_rejected(attempted: ProofStep) {
    let job = standard_job("j1");
    assert!(StepSequencer::validate(&job, attempted).is_err());
}

#[test]
fn repeating_a_completed_step_is_rejected() {
    let mut job = standard_job("j1");
    complete(&mut job, ProofStep::CheckIn);
    let err = StepSequencer::validate(&job, ProofStep::CheckIn).unwrap_err();
    assert_eq!(err.expected, Some(ProofStep::BeforePhoto));
}

#[test]
fn done_job_rejects_everything() {
    let mut job = standard_job("j1");
    for step in ProofStep::ALL {
        complete(&mut job, step);
    }
    for step in ProofStep::ALL {
        let err = StepSequencer::validate(&job, step).unwrap_err();
        assert_eq!(err.expected, None);
    }
}

#[test]
fn error_message_names_both_steps() {
    let err = OutOfOrderStep { expected: Some(ProofStep::CheckIn), attempted: ProofStep::CheckOut };
    assert_eq!(err.to_string(), "step check_out is out of order (expected check_in)");

    let done = OutOfOrderStep { expected: None, attempted: ProofStep::CheckOut };
    assert!(done.to_string().contains("job is done"));
}

proptest! {
    /// Whatever the attempts, the accepted ones are exactly the steps in order.
    #[test]
    fn accepted_attempts_form_the_step_order(attempts in arb_attempts()) {
        let mut job = standard_job("j1");
        let mut accepted = Vec::new();
        for attempted in attempts {
            match StepSequencer::validate(&job, attempted) {
                Ok(step) => {
                    prop_assert_eq!(step, attempted);
                    complete(&mut job, step);
                    accepted.push(step);
                }
                Err(err) => prop_assert_ne!(err.expected, Some(attempted)),
            }
        }
        prop_assert_eq!(&accepted[..], &ProofStep::ALL[..accepted.len()]);
    }
}
