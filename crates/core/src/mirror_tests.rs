// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::check::{CheckEvent, CheckKind};
use crate::test_support::{checklist_item, outbox_entry, photo_item, site, standard_job};

fn checklist_change(updates: &[(&str, bool)]) -> PendingChange {
    PendingChange::from(&checklist_item("j1", updates))
}

fn checked_in_mirror() -> JobMirror {
    let mut job = standard_job("j1");
    job.check_in = Some(CheckEvent::new(CheckKind::CheckIn, 1, site(), false));
    JobMirror::new(job)
}

fn completed(job: &Job, id: &str) -> bool {
    job.checklist.iter().find(|i| i.id == id).map(|i| i.completed).unwrap_or(false)
}

#[test]
fn view_applies_overlay_without_touching_confirmed() {
    let mut mirror = checked_in_mirror();
    mirror.push_optimistic("a".into(), checklist_change(&[("mop", true)]));

    assert!(completed(&mirror.view(), "mop"));
    assert!(!completed(mirror.confirmed(), "mop"));
    assert_eq!(mirror.pending_count(), 1);
}

#[test]
fn overlay_applies_in_enqueue_order() {
    let mut mirror = checked_in_mirror();
    mirror.push_optimistic("a".into(), checklist_change(&[("mop", true)]));
    mirror.push_optimistic("b".into(), checklist_change(&[("mop", false)]));
    assert!(!completed(&mirror.view(), "mop"));
}

#[test]
fn discard_reverts_to_pre_submission_values() {
    let mut mirror = checked_in_mirror();
    mirror.push_optimistic("a".into(), checklist_change(&[("mop", true), ("dust", true)]));

    let dropped = mirror.discard(&"a".into(), "422 item locked");

    assert!(dropped.is_some());
    let view = mirror.view();
    assert!(!completed(&view, "mop"));
    assert!(!completed(&view, "dust"));
    assert_eq!(mirror.rejected().len(), 1);
    assert_eq!(mirror.rejected()[0].reason, "422 item locked");
    assert_eq!(mirror.rejected()[0].step(), ProofStep::Checklist);
}

#[test]
fn discard_keeps_later_pending_changes() {
    let mut mirror = checked_in_mirror();
    mirror.push_optimistic("a".into(), checklist_change(&[("mop", true)]));
    mirror.push_optimistic("b".into(), checklist_change(&[("dust", true)]));

    mirror.discard(&"a".into(), "rejected");

    let view = mirror.view();
    assert!(!completed(&view, "mop"));
    assert!(completed(&view, "dust"));
}

#[test]
fn promote_folds_change_into_confirmed() {
    let mut mirror = checked_in_mirror();
    mirror.push_optimistic("a".into(), checklist_change(&[("mop", true)]));

    mirror.promote(&"a".into(), None);

    assert!(completed(mirror.confirmed(), "mop"));
    assert!(!mirror.has_pending());
}

#[test]
fn promoted_photo_gets_server_id() {
    let mut mirror = checked_in_mirror();
    let change = PendingChange::from(&photo_item("j1", PhotoKind::Before, "/spool/a.jpg"));
    mirror.push_optimistic("a".into(), change);
    assert_eq!(mirror.view().photos[0].status, UploadStatus::Pending);

    mirror.promote(&"a".into(), Some(PhotoId::new("srv-9")));

    let photo = &mirror.confirmed().photos[0];
    assert_eq!(photo.id, Some(PhotoId::new("srv-9")));
    assert_eq!(photo.status, UploadStatus::Uploaded);
    assert!(photo.local_path.is_none());
}

#[test]
fn promote_skips_photo_already_in_snapshot() {
    let mut mirror = checked_in_mirror();
    let change = PendingChange::from(&photo_item("j1", PhotoKind::Before, "/spool/a.jpg"));
    mirror.push_optimistic("a".into(), change);
    let mut snapshot = mirror.confirmed().clone();
    snapshot.photos.push(Photo::uploaded(PhotoId::new("srv-9"), PhotoKind::Before, None));
    mirror.apply_server_snapshot(snapshot);

    assert!(mirror.promote(&"a".into(), Some(PhotoId::new("srv-9"))).is_some());

    assert_eq!(mirror.confirmed().photos.len(), 1);
    assert!(!mirror.has_pending());
}

#[test]
fn uploading_flag_shows_in_view() {
    let mut mirror = checked_in_mirror();
    let change = PendingChange::from(&photo_item("j1", PhotoKind::Before, "/spool/a.jpg"));
    mirror.push_optimistic("a".into(), change);

    assert!(mirror.mark_uploading(&"a".into()));
    assert!(!mirror.mark_uploading(&"missing".into()));
    assert_eq!(mirror.view().photos[0].status, UploadStatus::Uploading);
}

#[test]
fn pending_photo_advances_optimistic_position() {
    let mut mirror = checked_in_mirror();
    assert_eq!(mirror.next_step(), Some(ProofStep::BeforePhoto));

    let change = PendingChange::from(&photo_item("j1", PhotoKind::Before, "/spool/a.jpg"));
    mirror.push_optimistic("a".into(), change);

    assert_eq!(mirror.next_step(), Some(ProofStep::Checklist));
    assert_eq!(proof::next_step(mirror.confirmed()), Some(ProofStep::BeforePhoto));
}

#[test]
fn rejected_photo_is_reported_as_failed() {
    let mut mirror = checked_in_mirror();
    let change = PendingChange::from(&photo_item("j1", PhotoKind::Before, "/spool/a.jpg"));
    mirror.push_optimistic("a".into(), change);
    mirror.discard(&"a".into(), "413 too large");

    assert!(mirror.view().photos.is_empty());
    let failed = mirror.rejected()[0].failed_photo().unwrap();
    assert_eq!(failed.status, UploadStatus::Failed);
    mirror.clear_rejected();
    assert!(mirror.rejected().is_empty());
}

#[test]
fn snapshot_replaces_confirmed_and_keeps_queued_overlay() {
    let mut mirror = checked_in_mirror();
    mirror.push_optimistic("a".into(), checklist_change(&[("mop", true)]));

    let mut snapshot = standard_job("j1");
    snapshot.status = crate::job::JobStatus::InProgress;
    for item in &mut snapshot.checklist {
        if item.id == "dust" {
            item.completed = true;
        }
    }
    mirror.apply_server_snapshot(snapshot);

    let view = mirror.view();
    assert_eq!(view.status, crate::job::JobStatus::InProgress);
    assert!(view.check_in.is_none(), "server truth wins for untouched fields");
    assert!(completed(&view, "dust"));
    assert!(completed(&view, "mop"));
}

#[test]
fn restore_rebuilds_overlay_from_pending_entries() {
    let entries = vec![
        outbox_entry(1, photo_item("j1", PhotoKind::Before, "/spool/a.jpg")),
        outbox_entry(2, checklist_item("j1", &[("mop", true)])),
    ];
    let mirror = JobMirror::restore(standard_job("j1"), &entries);

    assert_eq!(mirror.pending_count(), 2);
    assert!(mirror.is_pending(&OutboxItemId::new("item-2")));
    assert!(completed(&mirror.view(), "mop"));
}

#[test]
fn push_optimistic_is_idempotent() {
    let mut mirror = checked_in_mirror();
    mirror.push_optimistic("a".into(), checklist_change(&[("mop", true)]));
    mirror.push_optimistic("a".into(), checklist_change(&[("mop", true)]));
    assert_eq!(mirror.pending_count(), 1);
}
