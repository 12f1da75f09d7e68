// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminally refused changes are rolled back out of the view.

use crate::prelude::*;

#[tokio::test]
async fn refused_checklist_update_is_rolled_back() {
    let dir = TempDir::new().unwrap();
    let mut field = Field::memory(dir.path());
    let j1 = field.open(standard_job("j1"));
    field.submit(&j1, StepPayload::CheckIn).await.unwrap();
    field.submit(&j1, field.photo(PhotoKind::Before)).await.unwrap();
    field.sync_until_empty().await;
    let mut rx = field.observe(&j1);

    field.api.script([Outcome::Fail(validation(422))]);
    let receipt = field.submit(&j1, all_done()).await.unwrap();
    assert_eq!(receipt.position, StepPosition::At(ProofStep::AfterPhoto));
    let report = field.sync().await;

    assert_eq!(report.rejected, 1);
    assert_eq!(field.orchestrator.position(&j1), Some(StepPosition::At(ProofStep::Checklist)));
    let view = field.orchestrator.view(&j1).unwrap();
    assert!(view.checklist.iter().all(|item| !item.completed));
    let rejected = field.orchestrator.rejected(&j1);
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].step(), ProofStep::Checklist);
    assert!(rejected[0].reason.contains("422"));
    assert_eq!(field.store.rejected().len(), 1);

    let events = received(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        ProofEvent::ItemRolledBack {
            step: ProofStep::Checklist,
            position: StepPosition::At(ProofStep::Checklist),
            ..
        }
    )));

    // The cleaner can correct and resubmit
    field.submit(&j1, all_done()).await.unwrap();
    field.sync().await;
    assert_eq!(field.orchestrator.position(&j1), Some(StepPosition::At(ProofStep::AfterPhoto)));
}

#[tokio::test]
async fn refusal_does_not_block_later_items() {
    let dir = TempDir::new().unwrap();
    let mut field = Field::memory(dir.path());
    let j1 = field.open(standard_job("j1"));
    field.submit(&j1, StepPayload::CheckIn).await.unwrap();
    field.submit(&j1, field.photo(PhotoKind::Before)).await.unwrap();
    field.submit(&j1, checklist(&[("mop", true)])).await.unwrap();
    field.api.script([Outcome::Fail(validation(413))]);

    let report = field.sync().await;

    assert_eq!((report.rejected, report.acknowledged, report.remaining), (1, 1, 0));
    let view = field.orchestrator.view(&j1).unwrap();
    assert!(view.photos.is_empty());
    assert!(view.checklist_item(&"mop".into()).unwrap().completed);
    assert_eq!(field.orchestrator.position(&j1), Some(StepPosition::At(ProofStep::BeforePhoto)));
}
