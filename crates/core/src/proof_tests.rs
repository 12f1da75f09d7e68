// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::check::CheckEvent;
use crate::photo::{Photo, PhotoId};
use crate::test_support::{site, standard_job};

fn checked_in(job: Job) -> Job {
    Job { check_in: Some(CheckEvent::new(CheckKind::CheckIn, 1, site(), false)), ..job }
}

fn with_photo(mut job: Job, kind: PhotoKind) -> Job {
    let id = PhotoId::new(format!("p{}", job.photos.len()));
    job.photos.push(Photo::uploaded(id, kind, None));
    job
}

fn with_checklist_done(mut job: Job) -> Job {
    for item in &mut job.checklist {
        item.completed = true;
    }
    job
}

#[test]
fn fresh_job_starts_at_check_in() {
    let job = standard_job("j1");
    assert_eq!(next_step(&job), Some(ProofStep::CheckIn));
    assert_eq!(position(&job), StepPosition::NotStarted);
}

#[test]
fn steps_advance_in_order() {
    let job = checked_in(standard_job("j1"));
    assert_eq!(next_step(&job), Some(ProofStep::BeforePhoto));

    let job = with_photo(job, PhotoKind::Before);
    assert_eq!(next_step(&job), Some(ProofStep::Checklist));

    let job = with_checklist_done(job);
    assert_eq!(next_step(&job), Some(ProofStep::AfterPhoto));

    let job = with_photo(job, PhotoKind::After);
    assert_eq!(position(&job), StepPosition::At(ProofStep::CheckOut));

    let job = Job { check_out: Some(CheckEvent::new(CheckKind::CheckOut, 2, site(), false)), ..job };
    assert_eq!(next_step(&job), None);
    assert_eq!(position(&job), StepPosition::Done);
}

#[test]
fn earlier_gap_wins_over_later_completion() {
    // An after photo on the server does not skip the missing before photo
    let job = with_photo(checked_in(standard_job("j1")), PhotoKind::After);
    assert_eq!(next_step(&job), Some(ProofStep::BeforePhoto));
}

#[test]
fn empty_checklist_is_trivially_complete() {
    let job = with_photo(checked_in(Job::builder().build()), PhotoKind::Before);
    assert!(is_step_complete(&job, ProofStep::Checklist));
    assert_eq!(next_step(&job), Some(ProofStep::AfterPhoto));
}

#[test]
fn before_photo_needs_required_count() {
    let job = checked_in(Job::builder().required_before_photos(2).build());
    let job = with_photo(job, PhotoKind::Before);
    assert!(!is_step_complete(&job, ProofStep::BeforePhoto));
    let job = with_photo(job, PhotoKind::Before);
    assert!(is_step_complete(&job, ProofStep::BeforePhoto));
}

#[yare::parameterized(
    check_in     = { ProofStep::CheckIn, 0, "check_in" },
    before_photo = { ProofStep::BeforePhoto, 1, "before_photo" },
    checklist    = { ProofStep::Checklist, 2, "checklist" },
    after_photo  = { ProofStep::AfterPhoto, 3, "after_photo" },
    check_out    = { ProofStep::CheckOut, 4, "check_out" },
)]
fn step_index_and_name(step: ProofStep, index: usize, name: &str) {
    assert_eq!(step.index(), index);
    assert_eq!(step.to_string(), name);
    assert_eq!(serde_json::to_string(&step).unwrap(), format!("\"{name}\""));
}

#[test]
fn only_check_steps_are_synchronous() {
    let sync: Vec<_> = ProofStep::ALL.into_iter().filter(ProofStep::is_synchronous).collect();
    assert_eq!(sync, vec![ProofStep::CheckIn, ProofStep::CheckOut]);
}

#[test]
fn position_serializes_with_step() {
    let json = serde_json::to_value(StepPosition::At(ProofStep::Checklist)).unwrap();
    assert_eq!(json, serde_json::json!({"state": "at", "step": "checklist"}));
    assert_eq!(StepPosition::Done.to_string(), "done");
}
