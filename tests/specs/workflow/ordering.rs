// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Steps are accepted in order only, and queued items deliver in FIFO order.

use crate::prelude::*;

#[tokio::test]
async fn out_of_order_steps_have_no_effect() {
    let dir = TempDir::new().unwrap();
    let field = Field::memory(dir.path());
    let j1 = field.open(standard_job("j1"));
    let attempts = [
        field.photo(PhotoKind::Before),
        all_done(),
        field.photo(PhotoKind::After),
        StepPayload::CheckOut,
    ];

    for payload in attempts {
        let err = field.submit(&j1, payload).await.unwrap_err();
        assert!(matches!(err, ProofError::OutOfOrderStep(_)), "{err}");
    }

    assert!(field.api.calls().is_empty());
    assert!(field.store.is_empty());
    assert_eq!(field.orchestrator.position(&j1), Some(StepPosition::NotStarted));
}

#[tokio::test]
async fn queued_items_deliver_in_enqueue_order_despite_retries() {
    let dir = TempDir::new().unwrap();
    let mut field = Field::memory(dir.path());
    let j1 = field.open(standard_job("j1"));
    let j2 = field.open(standard_job("j2"));
    field.submit(&j1, StepPayload::CheckIn).await.unwrap();
    field.submit(&j2, StepPayload::CheckIn).await.unwrap();

    let mut keys = Vec::new();
    for (job, payload) in [
        (&j1, field.photo(PhotoKind::Before)),
        (&j2, field.photo(PhotoKind::Before)),
        (&j1, checklist(&[("mop", true)])),
        (&j2, checklist(&[("dust", true)])),
    ] {
        let step = payload.step();
        let receipt = field.submit(job, payload).await.unwrap();
        keys.push(idempotency_key(job, step, &receipt.queued.unwrap()));
    }
    field.api.script(
        [Outcome::Fail(network()), Outcome::LoseResponse, Outcome::Ok].into_iter().cycle().take(30),
    );

    field.sync_until_empty().await;

    // Each key is only sent once everything before it has been acknowledged
    let sent: Vec<String> = field
        .api
        .calls()
        .into_iter()
        .filter(|c| matches!(c.op, ApiOp::UploadPhoto | ApiOp::UpdateChecklist))
        .filter_map(|c| c.idempotency_key)
        .collect();
    let mut order: Vec<&String> = Vec::new();
    for key in &sent {
        if order.last() != Some(&key) {
            assert!(!order.contains(&key), "{key} resent after a later item");
            order.push(key);
        }
    }
    assert_eq!(order, keys.iter().collect::<Vec<_>>());

    let applied: Vec<_> = field
        .api
        .records()
        .into_iter()
        .filter(|r| r.step != ProofStep::CheckIn)
        .map(|r| r.idempotency_key)
        .collect();
    assert_eq!(applied, keys);
}
