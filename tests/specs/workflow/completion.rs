// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A job reaches `done` with exactly one server record per step.

use crate::prelude::*;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn flaky_network_completes_with_one_record_per_step() {
    let dir = TempDir::new().unwrap();
    let mut field = Field::memory(dir.path());
    let j1 = field.open(standard_job("j1"));
    // Half of all first attempts fail; half of those after the server applied them
    field.api.script(
        [Outcome::Fail(network()), Outcome::Ok, Outcome::LoseResponse, Outcome::Ok]
            .into_iter()
            .cycle()
            .take(40),
    );

    field.submit_retrying(&j1, StepPayload::CheckIn).await;
    field.submit_retrying(&j1, field.photo(PhotoKind::Before)).await;
    field.submit_retrying(&j1, all_done()).await;
    field.submit_retrying(&j1, field.photo(PhotoKind::After)).await;
    field.sync_until_empty().await;
    let receipt = field.submit_retrying(&j1, StepPayload::CheckOut).await;

    assert_eq!(receipt.position, StepPosition::Done);
    let records = field.api.records();
    let steps: Vec<_> = records.iter().map(|r| r.step).collect();
    assert_eq!(steps, ProofStep::ALL.to_vec());

    let server = field.api.job(&j1).unwrap();
    assert_eq!(server.status, JobStatus::Completed);
    assert_eq!(server.photos.len(), 2);
    assert!(server.checklist.iter().all(|item| item.completed));
    assert_eq!(field.orchestrator.confirmed(&j1), Some(server));
}

#[tokio::test]
async fn every_resend_reuses_its_idempotency_key() {
    let dir = TempDir::new().unwrap();
    let mut field = Field::memory(dir.path());
    let j1 = field.open(standard_job("j1"));
    field.submit(&j1, StepPayload::CheckIn).await.unwrap();
    field.api.script([Outcome::LoseResponse, Outcome::Fail(network())]);

    let receipt = field.submit(&j1, field.photo(PhotoKind::Before)).await.unwrap();
    field.sync_until_empty().await;

    let expected = idempotency_key(&j1, ProofStep::BeforePhoto, &receipt.queued.unwrap());
    let uploads = field.api.calls_to(ApiOp::UploadPhoto);
    assert_eq!(uploads.len(), 3);
    assert!(uploads.iter().all(|c| c.idempotency_key.as_deref() == Some(expected.as_str())));
    assert_eq!(field.api.records().len(), 2, "check-in and one photo");
}

#[tokio::test]
async fn background_sync_settles_queued_steps() {
    let dir = TempDir::new().unwrap();
    let mut field = Field::memory(dir.path());
    let j1 = field.open(standard_job("j1"));
    field.submit(&j1, StepPayload::CheckIn).await.unwrap();
    let mut rx = field.observe(&j1);

    let cancel = CancellationToken::new();
    let engine = std::sync::Arc::clone(&field.engine);
    let orchestrator = std::sync::Arc::clone(&field.orchestrator);
    let events = field.events.take().unwrap();
    let sync = tokio::spawn({
        let cancel = cancel.clone();
        async move { engine.run(cancel).await }
    });
    let reconcile = tokio::spawn({
        let cancel = cancel.clone();
        async move { orchestrator.reconcile(events, cancel).await }
    });

    field.api.script([Outcome::Fail(network())]);
    field.submit(&j1, field.photo(PhotoKind::Before)).await.unwrap();
    field.submit(&j1, all_done()).await.unwrap();
    field.submit(&j1, field.photo(PhotoKind::After)).await.unwrap();
    tokio::time::timeout(std::time::Duration::from_secs(5), field.orchestrator.wait_for_sync(&j1))
        .await
        .unwrap();

    let receipt = field.submit(&j1, StepPayload::CheckOut).await.unwrap();
    cancel.cancel();
    sync.await.unwrap();
    reconcile.await.unwrap();

    assert_eq!(receipt.position, StepPosition::Done);
    let confirmed = received(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, ProofEvent::ItemConfirmed { .. }))
        .count();
    assert_eq!(confirmed, 3);
    assert!(field.store.is_empty());
}
