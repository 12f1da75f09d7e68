// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Check events always carry a location; photos only ever a device fix.

use crate::prelude::*;

#[tokio::test]
async fn device_fix_is_used_when_available() {
    let dir = TempDir::new().unwrap();
    let field = Field::memory(dir.path());
    let j1 = field.open(standard_job("j1"));

    let receipt = field.submit(&j1, StepPayload::CheckIn).await.unwrap();

    assert!(!receipt.approximate);
    let check_in = field.api.job(&j1).unwrap().check_in.unwrap();
    assert_eq!(check_in.coordinates(), device());
    assert!(!check_in.approximate);
}

#[tokio::test]
async fn denied_permission_falls_back_to_site() {
    let dir = TempDir::new().unwrap();
    let field = Field::memory(dir.path());
    let j1 = field.open(standard_job("j1"));
    field.location.deny();
    let mut rx = field.observe(&j1);

    let receipt = field.submit(&j1, StepPayload::CheckIn).await.unwrap();

    assert!(receipt.approximate);
    let check_in = field.api.job(&j1).unwrap().check_in.unwrap();
    assert_eq!(check_in.coordinates(), site());
    assert!(check_in.approximate);
    assert!(received(&mut rx).contains(&ProofEvent::ApproximateLocation {
        job_id: j1.clone(),
        kind: CheckKind::CheckIn
    }));

    field.submit(&j1, field.photo(PhotoKind::Before)).await.unwrap();
    let queued = field.store.pending();
    let OutboxItem::Photo { metadata, .. } = &queued[0].item else {
        panic!("expected a photo");
    };
    assert_eq!(metadata.and_then(|m| m.coordinates), None, "site never stands in for photos");
}

#[tokio::test]
async fn no_fix_and_no_site_blocks_check_in() {
    let dir = TempDir::new().unwrap();
    let field = Field::memory(dir.path());
    let job = Job::builder().id("j2").item("mop", true, false).without_site().build();
    let j2 = field.open(job);
    field.location.deny();

    let err = field.submit(&j2, StepPayload::CheckIn).await.unwrap_err();

    assert!(matches!(err, ProofError::GpsUnavailable(CheckKind::CheckIn)));
    assert!(field.api.calls_to(ApiOp::Check(CheckKind::CheckIn)).is_empty());
    assert_eq!(field.orchestrator.position(&j2), Some(StepPosition::NotStarted));
}
