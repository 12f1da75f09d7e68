// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn restart_rebuilds_overlay_and_resumes_delivery() {
    let ctx = TestContext::new();
    let j1 = TestContext::j1();
    ctx.orchestrator.submit_step(&j1, StepPayload::CheckIn).await.unwrap();
    ctx.orchestrator.submit_step(&j1, ctx.photo(PhotoKind::Before)).await.unwrap();
    ctx.orchestrator.submit_step(&j1, all_done()).await.unwrap();
    let TestContext { store, api, dir, .. } = ctx;

    let mut ctx = TestContext::build(store, api, dir);
    assert_eq!(ctx.orchestrator.restore().unwrap(), 1);

    assert_eq!(ctx.orchestrator.position(&j1), Some(StepPosition::At(ProofStep::AfterPhoto)));
    assert_eq!(ctx.orchestrator.pending_count(&j1), 2);
    assert_eq!(spooled_files(&ctx), 1);

    let report = ctx.sync().await;

    assert_eq!(report.acknowledged, 2);
    let confirmed = ctx.orchestrator.confirmed(&j1).unwrap();
    assert!(confirmed.checklist_satisfied());
    assert_eq!(confirmed.photos.len(), 1);
}

#[tokio::test]
async fn restore_prunes_orphaned_spool_files() {
    let ctx = TestContext::new();
    let spool = ctx.dir.path().join(cp_storage::SPOOL_DIR);
    std::fs::create_dir_all(&spool).unwrap();
    std::fs::write(spool.join("orphan.jpg"), b"x").unwrap();

    ctx.orchestrator.restore().unwrap();

    assert_eq!(spooled_files(&ctx), 0);
}

#[tokio::test]
async fn refresh_keeps_queued_changes_on_new_base() {
    let ctx = TestContext::new();
    let j1 = TestContext::j1();
    ctx.orchestrator.submit_step(&j1, StepPayload::CheckIn).await.unwrap();
    ctx.orchestrator.submit_step(&j1, ctx.photo(PhotoKind::Before)).await.unwrap();
    let mut server = ctx.api.job(&j1).unwrap();
    server.cleaner = Some("Dana".to_string());
    ctx.api.insert_job(server);
    let mut rx = ctx.orchestrator.observe_job_state(&j1);

    let position = ctx.orchestrator.refresh(&j1).await.unwrap();

    assert_eq!(position, StepPosition::At(ProofStep::Checklist));
    assert_eq!(ctx.orchestrator.confirmed(&j1).unwrap().cleaner.as_deref(), Some("Dana"));
    assert_eq!(ctx.orchestrator.pending_count(&j1), 1);
    assert_eq!(
        received(&mut rx),
        vec![ProofEvent::SnapshotApplied { job_id: j1, position }]
    );
}

#[tokio::test]
async fn refresh_of_unknown_job_is_not_found() {
    let ctx = TestContext::new();
    let err = ctx.orchestrator.refresh(&"ghost".into()).await.unwrap_err();
    assert!(matches!(err, ProofError::JobNotFound(_)));
}

#[tokio::test]
async fn opening_a_finished_job_reports_done() {
    let mut ctx = TestContext::new();
    let j1 = TestContext::j1();
    ctx.advance_to_after_photo(&j1).await;
    ctx.orchestrator.submit_step(&j1, ctx.photo(PhotoKind::After)).await.unwrap();
    ctx.sync().await;
    ctx.orchestrator.submit_step(&j1, StepPayload::CheckOut).await.unwrap();
    let TestContext { store, api, dir, .. } = ctx;

    let ctx = TestContext::build(store, api.clone(), dir);
    ctx.orchestrator.restore().unwrap();
    let mut rx = ctx.orchestrator.observe_job_state(&j1);
    ctx.orchestrator.open_job(api.job(&j1).unwrap()).unwrap();

    assert_eq!(ctx.orchestrator.position(&j1), Some(StepPosition::Done));
    assert!(received(&mut rx).contains(&ProofEvent::Done { job_id: j1 }));
}
