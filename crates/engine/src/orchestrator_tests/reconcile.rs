// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use cp_core::test_support::{checklist_item, outbox_entry};
use cp_core::PhotoId;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn acknowledged_photo_is_promoted_and_released() {
    let mut ctx = TestContext::new();
    let j1 = TestContext::j1();
    ctx.orchestrator.submit_step(&j1, StepPayload::CheckIn).await.unwrap();
    ctx.orchestrator.submit_step(&j1, ctx.photo(PhotoKind::Before)).await.unwrap();
    let mut rx = ctx.orchestrator.observe_job_state(&j1);

    let report = ctx.sync().await;

    assert_eq!(report.acknowledged, 1);
    let confirmed = ctx.orchestrator.confirmed(&j1).unwrap();
    assert_eq!(confirmed.photos[0].id, Some(PhotoId::new("photo-1")));
    assert_eq!(ctx.orchestrator.pending_count(&j1), 0);
    assert_eq!(ctx.store.load_job(&j1).unwrap().photos.len(), 1);
    assert_eq!(spooled_files(&ctx), 0);
    assert!(received(&mut rx)
        .iter()
        .any(|e| matches!(e, ProofEvent::ItemConfirmed { step: ProofStep::BeforePhoto, .. })));
}

#[tokio::test]
async fn attempt_marks_photo_uploading() {
    let ctx = TestContext::new();
    let j1 = TestContext::j1();
    ctx.orchestrator.submit_step(&j1, StepPayload::CheckIn).await.unwrap();
    ctx.orchestrator.submit_step(&j1, ctx.photo(PhotoKind::Before)).await.unwrap();
    let entry = ctx.store.pending().remove(0);

    ctx.orchestrator.apply_sync_event(&SyncEvent::Attempting { entry, attempt: 1 }).unwrap();

    let view = ctx.orchestrator.view(&j1).unwrap();
    assert_eq!(view.photos[0].status, UploadStatus::Uploading);
}

#[tokio::test]
async fn rejected_checklist_rolls_back_view() {
    let mut ctx = TestContext::new();
    let j1 = TestContext::j1();
    ctx.orchestrator.submit_step(&j1, StepPayload::CheckIn).await.unwrap();
    ctx.orchestrator.submit_step(&j1, ctx.photo(PhotoKind::Before)).await.unwrap();
    ctx.orchestrator.submit_step(&j1, all_done()).await.unwrap();
    assert_eq!(ctx.orchestrator.position(&j1), Some(StepPosition::At(ProofStep::AfterPhoto)));
    ctx.api.script([Outcome::Ok, Outcome::Fail(validation(422))]);
    let mut rx = ctx.orchestrator.observe_job_state(&j1);

    let report = ctx.sync().await;

    assert_eq!((report.acknowledged, report.rejected), (1, 1));
    let view = ctx.orchestrator.view(&j1).unwrap();
    assert!(view.checklist.iter().all(|item| !item.completed));
    assert_eq!(ctx.orchestrator.position(&j1), Some(StepPosition::At(ProofStep::Checklist)));
    let rejected = ctx.orchestrator.rejected(&j1);
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].step(), ProofStep::Checklist);
    assert!(received(&mut rx).iter().any(|e| matches!(
        e,
        ProofEvent::ItemRolledBack {
            step: ProofStep::Checklist,
            position: StepPosition::At(ProofStep::Checklist),
            ..
        }
    )));

    // The user can resubmit once the rollback is visible
    ctx.orchestrator.submit_step(&j1, all_done()).await.unwrap();
    ctx.orchestrator.dismiss_rejected(&j1);
    assert!(ctx.orchestrator.rejected(&j1).is_empty());
}

#[tokio::test]
async fn retry_warning_surfaces_as_sync_delayed() {
    let ctx = TestContext::new();
    let j1 = TestContext::j1();
    let mut rx = ctx.orchestrator.observe_job_state(&j1);
    let entry = outbox_entry(7, checklist_item("j1", &[("mop", true)]));

    let event = SyncEvent::RetryWarning { entry, attempts: 5, error: "timeout".to_string() };
    ctx.orchestrator.apply_sync_event(&event).unwrap();

    assert_eq!(
        received(&mut rx),
        vec![ProofEvent::SyncDelayed { job_id: j1, item_id: "item-7".into(), attempts: 5 }]
    );
}

#[tokio::test]
async fn duplicate_acknowledgement_is_harmless() {
    let ctx = TestContext::new();
    let j1 = TestContext::j1();
    ctx.orchestrator.submit_step(&j1, StepPayload::CheckIn).await.unwrap();
    ctx.orchestrator.submit_step(&j1, ctx.photo(PhotoKind::Before)).await.unwrap();
    let entry = ctx.store.pending().remove(0);
    let ack = SyncEvent::Acknowledged { entry, photo_id: Some(PhotoId::new("p-1")) };

    ctx.orchestrator.apply_sync_event(&ack).unwrap();
    ctx.orchestrator.apply_sync_event(&ack).unwrap();

    assert_eq!(ctx.orchestrator.confirmed(&j1).unwrap().photos.len(), 1);
}

#[tokio::test]
async fn wait_for_sync_resolves_after_background_delivery() {
    let mut ctx = TestContext::new();
    let j1 = TestContext::j1();
    ctx.orchestrator.submit_step(&j1, StepPayload::CheckIn).await.unwrap();
    ctx.orchestrator.submit_step(&j1, ctx.photo(PhotoKind::Before)).await.unwrap();
    assert_eq!(ctx.orchestrator.pending_count(&j1), 1);

    let cancel = CancellationToken::new();
    let (_, placeholder) = tokio::sync::mpsc::unbounded_channel();
    let sync_rx = std::mem::replace(&mut ctx.sync_rx, placeholder);
    let engine = Arc::clone(&ctx.engine);
    let orchestrator = Arc::clone(&ctx.orchestrator);
    let sync_task = tokio::spawn({
        let cancel = cancel.clone();
        async move { engine.run(cancel).await }
    });
    let reconcile_task = tokio::spawn({
        let cancel = cancel.clone();
        async move { orchestrator.reconcile(sync_rx, cancel).await }
    });

    tokio::time::timeout(Duration::from_secs(5), ctx.orchestrator.wait_for_sync(&j1))
        .await
        .unwrap();

    assert_eq!(ctx.orchestrator.pending_count(&j1), 0);
    assert_eq!(ctx.api.calls_to(ApiOp::UploadPhoto).len(), 1);
    cancel.cancel();
    sync_task.await.unwrap();
    reconcile_task.await.unwrap();
}

#[tokio::test]
async fn wait_for_sync_returns_immediately_when_settled() {
    let ctx = TestContext::new();
    tokio::time::timeout(Duration::from_secs(1), ctx.orchestrator.wait_for_sync(&TestContext::j1()))
        .await
        .unwrap();
}
