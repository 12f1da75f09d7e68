// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::sequencer::OutOfOrderStep;
use cp_core::{Job, JobId, OutboxItem};

#[tokio::test]
async fn out_of_order_step_has_no_side_effects() {
    let ctx = TestContext::new();
    let j1 = TestContext::j1();

    let err = ctx.orchestrator.submit_step(&j1, all_done()).await.unwrap_err();

    assert!(matches!(
        err,
        ProofError::OutOfOrderStep(OutOfOrderStep {
            expected: Some(ProofStep::CheckIn),
            attempted: ProofStep::Checklist
        })
    ));
    assert!(ctx.api.calls().is_empty());
    assert!(ctx.store.is_empty());
    assert_eq!(ctx.location.requests(), 0);
}

#[tokio::test]
async fn skipping_check_in_is_rejected() {
    let ctx = TestContext::new();
    let payloads = [
        ctx.photo(PhotoKind::Before),
        ctx.photo(PhotoKind::After),
        StepPayload::CheckOut,
    ];

    for payload in payloads {
        let result = ctx.orchestrator.submit_step(&TestContext::j1(), payload).await;
        assert!(matches!(result, Err(ProofError::OutOfOrderStep(_))));
    }
    assert!(ctx.store.is_empty());
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let ctx = TestContext::new();
    let err = ctx.orchestrator.submit_step(&JobId::new("nope"), StepPayload::CheckIn).await;
    assert!(matches!(err, Err(ProofError::JobNotFound(id)) if id == "nope"));
}

#[tokio::test]
async fn check_in_is_recorded_synchronously() {
    let ctx = TestContext::new();
    let j1 = TestContext::j1();
    let mut rx = ctx.orchestrator.observe_job_state(&j1);

    let receipt = ctx.orchestrator.submit_step(&j1, StepPayload::CheckIn).await.unwrap();

    assert_eq!(
        receipt,
        StepReceipt {
            step: ProofStep::CheckIn,
            position: StepPosition::At(ProofStep::BeforePhoto),
            queued: None,
            approximate: false,
        }
    );
    let confirmed = ctx.orchestrator.confirmed(&j1).unwrap();
    assert_eq!(confirmed.status, JobStatus::InProgress);
    assert_eq!(confirmed.check_in.unwrap().coordinates(), device());
    assert!(ctx.store.load_job(&j1).unwrap().check_in.is_some());
    assert!(ctx.store.is_empty(), "check events never go through the outbox");
    assert_eq!(
        received(&mut rx),
        vec![ProofEvent::StepAdvanced {
            job_id: j1,
            position: StepPosition::At(ProofStep::BeforePhoto)
        }]
    );
}

#[tokio::test]
async fn denied_gps_checks_in_at_site_with_warning() {
    let ctx = TestContext::new();
    let j1 = TestContext::j1();
    ctx.location.deny();
    let mut rx = ctx.orchestrator.observe_job_state(&j1);

    let receipt = ctx.orchestrator.submit_step(&j1, StepPayload::CheckIn).await.unwrap();

    assert!(receipt.approximate);
    let server = ctx.api.job(&j1).unwrap().check_in.unwrap();
    assert!(server.approximate);
    assert_eq!(server.coordinates(), cp_core::test_support::site());
    let events = received(&mut rx);
    assert_eq!(
        events[0],
        ProofEvent::ApproximateLocation { job_id: j1, kind: CheckKind::CheckIn }
    );
}

#[tokio::test]
async fn no_location_at_all_blocks_check_in() {
    let ctx = TestContext::empty();
    let job = Job::builder().id("j2").item("mop", true, false).without_site().build();
    ctx.seed(job);
    ctx.location.deny();
    let j2 = JobId::new("j2");

    let err = ctx.orchestrator.submit_step(&j2, StepPayload::CheckIn).await.unwrap_err();

    assert!(matches!(err, ProofError::GpsUnavailable(CheckKind::CheckIn)));
    assert!(ctx.api.calls_to(ApiOp::Check(CheckKind::CheckIn)).is_empty());
    assert_eq!(ctx.orchestrator.position(&j2), Some(StepPosition::NotStarted));
}

#[tokio::test]
async fn failed_check_in_leaves_job_unchanged() {
    for (error, retryable) in [(ApiError::Network("down".to_string()), true), (validation(409), false)]
    {
        let ctx = TestContext::new();
        let j1 = TestContext::j1();
        ctx.api.script([Outcome::Fail(error)]);

        let err = ctx.orchestrator.submit_step(&j1, StepPayload::CheckIn).await.unwrap_err();

        assert_eq!(matches!(err, ProofError::NetworkRetryable(_)), retryable);
        assert_eq!(matches!(err, ProofError::ServerValidation(_)), !retryable);
        assert_eq!(ctx.orchestrator.position(&j1), Some(StepPosition::NotStarted));
        assert!(ctx.store.is_empty());
    }
}

#[tokio::test]
async fn photo_is_spooled_and_queued() {
    let ctx = TestContext::new();
    let j1 = TestContext::j1();
    ctx.orchestrator.submit_step(&j1, StepPayload::CheckIn).await.unwrap();
    let mut rx = ctx.orchestrator.observe_job_state(&j1);

    let receipt = ctx.orchestrator.submit_step(&j1, ctx.photo(PhotoKind::Before)).await.unwrap();

    assert_eq!(receipt.position, StepPosition::At(ProofStep::Checklist));
    let queued = ctx.store.pending();
    assert_eq!(queued.len(), 1);
    assert_eq!(Some(&queued[0].id), receipt.queued.as_ref());
    let OutboxItem::Photo { file, metadata, .. } = &queued[0].item else {
        panic!("expected a photo item");
    };
    assert!(file.starts_with(ctx.dir.path().join(cp_storage::SPOOL_DIR)));
    assert!(file.exists());
    assert_eq!(metadata.and_then(|m| m.coordinates), Some(device()));

    let view = ctx.orchestrator.view(&j1).unwrap();
    assert_eq!(view.photos[0].status, UploadStatus::Pending);
    assert!(ctx.orchestrator.confirmed(&j1).unwrap().photos.is_empty());
    assert!(ctx.api.calls_to(ApiOp::UploadPhoto).is_empty());

    let events = received(&mut rx);
    assert!(matches!(events[0], ProofEvent::ItemQueued { step: ProofStep::BeforePhoto, .. }));
    assert!(matches!(
        events[1],
        ProofEvent::StepAdvanced { position: StepPosition::At(ProofStep::Checklist), .. }
    ));
}

#[tokio::test]
async fn photo_without_device_fix_has_no_coordinates() {
    let ctx = TestContext::new();
    let j1 = TestContext::j1();
    ctx.orchestrator.submit_step(&j1, StepPayload::CheckIn).await.unwrap();
    ctx.location.deny();

    ctx.orchestrator.submit_step(&j1, ctx.photo(PhotoKind::Before)).await.unwrap();

    let queued = ctx.store.pending();
    let OutboxItem::Photo { metadata, .. } = &queued[0].item else {
        panic!("expected a photo item");
    };
    assert_eq!(metadata.and_then(|m| m.coordinates), None);
}

#[tokio::test]
async fn missing_photo_file_is_invalid() {
    let ctx = TestContext::new();
    let j1 = TestContext::j1();
    ctx.orchestrator.submit_step(&j1, StepPayload::CheckIn).await.unwrap();
    let payload = StepPayload::Photo { kind: PhotoKind::Before, file: "/no/such.jpg".into() };

    let err = ctx.orchestrator.submit_step(&j1, payload).await.unwrap_err();

    assert!(matches!(err, ProofError::InvalidPayload(_)));
    assert!(ctx.store.is_empty());
}

#[tokio::test]
async fn failed_enqueue_releases_spooled_photo() {
    let ctx = TestContext::new();
    let j1 = TestContext::j1();
    ctx.orchestrator.submit_step(&j1, StepPayload::CheckIn).await.unwrap();
    ctx.store.fail_enqueue(true);

    let err = ctx.orchestrator.submit_step(&j1, ctx.photo(PhotoKind::Before)).await.unwrap_err();

    assert!(matches!(err, ProofError::Storage(_)));
    assert_eq!(spooled_files(&ctx), 0);
    assert_eq!(ctx.orchestrator.position(&j1), Some(StepPosition::At(ProofStep::BeforePhoto)));
}

#[tokio::test]
async fn bad_checklist_updates_are_invalid() {
    let ctx = TestContext::new();
    let j1 = TestContext::j1();
    ctx.orchestrator.submit_step(&j1, StepPayload::CheckIn).await.unwrap();
    ctx.orchestrator.submit_step(&j1, ctx.photo(PhotoKind::Before)).await.unwrap();
    let cases: [&[(&str, bool)]; 3] =
        [&[], &[("mop", true), ("windows", true)], &[("mop", true), ("mop", false)]];

    for updates in cases {
        let err = ctx.orchestrator.submit_step(&j1, checklist(updates)).await.unwrap_err();
        assert!(matches!(err, ProofError::InvalidPayload(_)), "{updates:?}");
    }
    assert_eq!(ctx.store.len(), 1);
}

#[tokio::test]
async fn partial_checklist_stays_on_checklist() {
    let ctx = TestContext::new();
    let j1 = TestContext::j1();
    ctx.orchestrator.submit_step(&j1, StepPayload::CheckIn).await.unwrap();
    ctx.orchestrator.submit_step(&j1, ctx.photo(PhotoKind::Before)).await.unwrap();

    let first = ctx.orchestrator.submit_step(&j1, checklist(&[("mop", true)])).await.unwrap();
    assert_eq!(first.position, StepPosition::At(ProofStep::Checklist));

    let rest = checklist(&[("dust", true), ("bins", true)]);
    let second = ctx.orchestrator.submit_step(&j1, rest).await.unwrap();
    assert_eq!(second.position, StepPosition::At(ProofStep::AfterPhoto));
    assert_eq!(ctx.store.len(), 3);
}

#[tokio::test]
async fn check_out_waits_for_queue_to_drain() {
    let mut ctx = TestContext::new();
    let j1 = TestContext::j1();
    ctx.advance_to_after_photo(&j1).await;
    ctx.orchestrator.submit_step(&j1, ctx.photo(PhotoKind::After)).await.unwrap();
    assert_eq!(ctx.orchestrator.position(&j1), Some(StepPosition::At(ProofStep::CheckOut)));

    let err = ctx.orchestrator.submit_step(&j1, StepPayload::CheckOut).await.unwrap_err();
    assert!(matches!(err, ProofError::SyncPending { pending: 3, .. }));
    assert!(ctx.api.calls_to(ApiOp::Check(CheckKind::CheckOut)).is_empty());

    ctx.sync().await;
    let mut rx = ctx.orchestrator.observe_job_state(&j1);
    let receipt = ctx.orchestrator.submit_step(&j1, StepPayload::CheckOut).await.unwrap();

    assert_eq!(receipt.position, StepPosition::Done);
    assert_eq!(ctx.orchestrator.confirmed(&j1).unwrap().status, JobStatus::Completed);
    let events = received(&mut rx);
    assert_eq!(events.last(), Some(&ProofEvent::Done { job_id: j1 }));
}

#[tokio::test]
async fn done_job_rejects_further_steps() {
    let mut ctx = TestContext::new();
    let j1 = TestContext::j1();
    ctx.advance_to_after_photo(&j1).await;
    ctx.orchestrator.submit_step(&j1, ctx.photo(PhotoKind::After)).await.unwrap();
    ctx.sync().await;
    ctx.orchestrator.submit_step(&j1, StepPayload::CheckOut).await.unwrap();

    let err = ctx.orchestrator.submit_step(&j1, StepPayload::CheckOut).await.unwrap_err();

    assert!(matches!(err, ProofError::OutOfOrderStep(OutOfOrderStep { expected: None, .. })));
}
