// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors surfaced to callers of the orchestrator.

use crate::sequencer::OutOfOrderStep;
use cp_adapters::ApiError;
use cp_core::{CheckKind, JobId};
use cp_storage::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProofError {
    #[error(transparent)]
    OutOfOrderStep(#[from] OutOfOrderStep),

    /// Neither a device fix nor site coordinates exist.
    #[error("no location available for {0}")]
    GpsUnavailable(CheckKind),

    /// The request may succeed if retried later.
    #[error("server unreachable, try again: {0}")]
    NetworkRetryable(ApiError),

    /// The server refused the submission.
    #[error("server refused submission: {0}")]
    ServerValidation(ApiError),

    #[error("acknowledge called without a pending outbox item")]
    NoPendingItem,

    /// Check-out while items for the job are still queued.
    #[error("{pending} queued item(s) for job {job_id} have not synced yet")]
    SyncPending { job_id: JobId, pending: usize },

    #[error("job not found: {0}")]
    JobNotFound(JobId),

    #[error("invalid submission: {0}")]
    InvalidPayload(String),

    #[error("storage error: {0}")]
    Storage(StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for ProofError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NoPendingItem => ProofError::NoPendingItem,
            other => ProofError::Storage(other),
        }
    }
}

impl From<ApiError> for ProofError {
    fn from(e: ApiError) -> Self {
        if e.is_retryable() {
            ProofError::NetworkRetryable(e)
        } else {
            ProofError::ServerValidation(e)
        }
    }
}

impl ProofError {
    /// Map an API failure for a specific job, turning 404 into `JobNotFound`.
    pub(crate) fn from_api(job_id: &JobId, e: ApiError) -> Self {
        match e {
            ApiError::Validation { status: 404, .. } => ProofError::JobNotFound(job_id.clone()),
            other => other.into(),
        }
    }
}
