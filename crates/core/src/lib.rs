// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cp-core: proof event model for the CleanProof field client

pub mod macros;

pub mod check;
pub mod clock;
pub mod event;
pub mod id;
pub mod job;
pub mod mirror;
pub mod outbox;
pub mod photo;
pub mod proof;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use check::{CheckEvent, CheckKind};
pub use clock::{Clock, FakeClock, SystemClock};
pub use event::Event;
pub use id::{short, IdGen, SequentialIdGen, UuidIdGen};
#[cfg(any(test, feature = "test-support"))]
pub use job::JobBuilder;
pub use job::{ChecklistItem, ChecklistItemId, Coordinates, Job, JobId, JobStatus, Location};
pub use mirror::{JobMirror, PendingChange, RejectedChange};
pub use outbox::{ChecklistUpdate, OutboxEntry, OutboxItem, OutboxItemId, RejectedEntry};
pub use photo::{Photo, PhotoId, PhotoKind, PhotoMetadata, UploadStatus};
pub use proof::{is_step_complete, next_step, position, ProofStep, StepPosition};
