// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queued steps survive a restart and deliver afterwards.

use crate::prelude::*;

#[tokio::test]
async fn queued_steps_survive_restart() {
    let dir = TempDir::new().unwrap();
    let api = FakeProofApi::new();
    let j1 = {
        let field = Field::durable(dir.path(), api.clone());
        let j1 = field.open(standard_job("j1"));
        field.submit(&j1, StepPayload::CheckIn).await.unwrap();
        api.set_offline(true);
        field.submit(&j1, field.photo(PhotoKind::Before)).await.unwrap();
        field.submit(&j1, checklist(&[("mop", true), ("dust", true)])).await.unwrap();
        assert_eq!(field.store.len(), 2);
        j1
    };

    let mut field = Field::durable(dir.path(), api.clone());

    assert_eq!(field.store.len(), 2);
    let view = field.orchestrator.view(&j1).unwrap();
    assert_eq!(view.photos.len(), 1);
    assert_eq!(view.checklist.iter().filter(|i| i.completed).count(), 2);
    assert_eq!(field.orchestrator.position(&j1), Some(StepPosition::At(ProofStep::Checklist)));
    let queued = field.store.pending();
    let OutboxItem::Photo { file, .. } = &queued[0].item else {
        panic!("photo should be first in the queue");
    };
    assert!(file.exists(), "spooled photo kept for delivery");

    api.set_offline(false);
    field.sync_until_empty().await;

    let server = api.job(&j1).unwrap();
    assert_eq!(server.photos.len(), 1);
    assert_eq!(server.checklist.iter().filter(|i| i.completed).count(), 2);
    assert!(!file.exists(), "spooled photo released once uploaded");
    assert_eq!(field.orchestrator.pending_count(&j1), 0);
}

#[tokio::test]
async fn confirmed_progress_is_cached_for_offline_start() {
    let dir = TempDir::new().unwrap();
    let api = FakeProofApi::new();
    {
        let mut field = Field::durable(dir.path(), api.clone());
        let j1 = field.open(standard_job("j1"));
        field.submit(&j1, StepPayload::CheckIn).await.unwrap();
        field.submit(&j1, field.photo(PhotoKind::Before)).await.unwrap();
        field.sync_until_empty().await;
    }
    api.set_offline(true);

    let field = Field::durable(dir.path(), api.clone());
    let j1 = JobId::new("j1");

    assert_eq!(field.orchestrator.position(&j1), Some(StepPosition::At(ProofStep::Checklist)));
    let cached = field.store.load_job(&j1).unwrap();
    assert!(cached.check_in.is_some());
    assert_eq!(cached.photos.len(), 1);
}

#[tokio::test]
async fn checkpoint_then_restart_keeps_queue_order() {
    let dir = TempDir::new().unwrap();
    let api = FakeProofApi::new();
    {
        let field = Field::durable(dir.path(), api.clone());
        let j1 = field.open(standard_job("j1"));
        field.submit(&j1, StepPayload::CheckIn).await.unwrap();
        field.submit(&j1, field.photo(PhotoKind::Before)).await.unwrap();
        field.store.checkpoint().unwrap();
        field.submit(&j1, checklist(&[("mop", true)])).await.unwrap();
    }

    let field = Field::durable(dir.path(), api);
    let steps: Vec<_> = field.store.pending().iter().map(|e| e.item.step()).collect();

    assert_eq!(steps, vec![ProofStep::BeforePhoto, ProofStep::Checklist]);
}

#[tokio::test]
async fn acknowledged_step_stays_done_when_restart_beats_reconcile() {
    let dir = TempDir::new().unwrap();
    let api = FakeProofApi::new();
    let j1 = {
        let field = Field::durable(dir.path(), api.clone());
        let j1 = field.open(standard_job("j1"));
        field.submit(&j1, StepPayload::CheckIn).await.unwrap();
        field.submit(&j1, field.photo(PhotoKind::Before)).await.unwrap();
        let report = field.engine.drain_once().await;
        assert_eq!(report.acknowledged, 1);
        // Dropped before the sync result reaches the orchestrator
        j1
    };

    let field = Field::durable(dir.path(), api.clone());

    assert!(field.store.is_empty());
    assert_eq!(field.orchestrator.position(&j1), Some(StepPosition::At(ProofStep::Checklist)));
    let err = field.submit(&j1, field.photo(PhotoKind::Before)).await.unwrap_err();
    assert!(matches!(err, ProofError::OutOfOrderStep(_)));
    let server = api.job(&j1).unwrap();
    assert_eq!(server.photos.iter().filter(|p| p.kind == PhotoKind::Before).count(), 1);
}
