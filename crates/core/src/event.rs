// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events persisted to the local write-ahead log.
//!
//! Local state is derived by replaying these events in order; they are
//! facts about what the client did, never requests to the server.

use crate::job::{Job, JobId};
use crate::outbox::OutboxEntry;
use crate::photo::PhotoId;
use serde::{Deserialize, Serialize};

/// Serializes with `{"type": "scope:name", ...fields}` format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A mutation was appended to the outbox.
    #[serde(rename = "outbox:enqueued")]
    OutboxEnqueued { entry: OutboxEntry },

    /// The server acknowledged the item at `seq`. Applying it also folds the
    /// change into the job's confirmed snapshot.
    #[serde(rename = "outbox:acked")]
    OutboxAcked {
        seq: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        photo_id: Option<PhotoId>,
    },

    /// The server refused the item at `seq`; it leaves the queue.
    #[serde(rename = "outbox:rejected")]
    OutboxRejected { seq: u64, reason: String, at_ms: u64 },

    /// A confirmed server snapshot of a job.
    #[serde(rename = "job:snapshot")]
    JobSnapshot { job: Box<Job> },

    /// The job is no longer cached locally.
    #[serde(rename = "job:forgotten")]
    JobForgotten { id: JobId },
}

impl Event {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Event::OutboxEnqueued { .. } => "outbox:enqueued",
            Event::OutboxAcked { .. } => "outbox:acked",
            Event::OutboxRejected { .. } => "outbox:rejected",
            Event::JobSnapshot { .. } => "job:snapshot",
            Event::JobForgotten { .. } => "job:forgotten",
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
