// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! REST backend seam.
//!
//! The server owns all business logic. This adapter only moves proof
//! records over the wire and classifies failures into retryable and
//! terminal.

mod http;

pub use http::{HttpProofApi, IDEMPOTENCY_HEADER};

use async_trait::async_trait;
use cp_core::{CheckEvent, ChecklistUpdate, Job, JobId, PhotoId, PhotoKind, PhotoMetadata};
use std::path::Path;
use thiserror::Error;

/// Failure talking to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("server error {status}: {body}")]
    Server { status: u16, body: String },
    #[error("rejected by server {status}: {body}")]
    Validation { status: u16, body: String },
    #[error("unreadable response: {0}")]
    Decode(String),
    #[error("local file unreadable: {0}")]
    LocalFile(String),
}

impl ApiError {
    /// Whether the same request may succeed if sent again later.
    ///
    /// Connectivity failures, timeouts, 5xx, 408 and 429 are transient.
    /// Every other 4xx is the server refusing the content.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::Timeout | ApiError::Server { .. })
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        if status >= 500 || status == 408 || status == 429 {
            ApiError::Server { status, body }
        } else {
            ApiError::Validation { status, body }
        }
    }
}

/// Calls the field client makes against the backend.
///
/// Every mutation carries an idempotency key; repeating a call with the
/// same key must not create a second server-side record.
#[async_trait]
pub trait ProofApi: Clone + Send + Sync + 'static {
    /// `GET /jobs/{id}`
    async fn fetch_job(&self, job_id: &JobId) -> Result<Job, ApiError>;

    /// `POST /jobs/{id}/check-in` or `/check-out`, returning the updated job.
    async fn record_check(
        &self,
        job_id: &JobId,
        event: &CheckEvent,
        idempotency_key: &str,
    ) -> Result<Job, ApiError>;

    /// `PATCH /jobs/{id}/checklist`
    async fn update_checklist(
        &self,
        job_id: &JobId,
        items: &[ChecklistUpdate],
        idempotency_key: &str,
    ) -> Result<(), ApiError>;

    /// `POST /jobs/{id}/photos` (multipart), returning the assigned id.
    async fn upload_photo(
        &self,
        job_id: &JobId,
        kind: PhotoKind,
        file: &Path,
        metadata: Option<&PhotoMetadata>,
        idempotency_key: &str,
    ) -> Result<PhotoId, ApiError>;
}

#[cfg(any(test, feature = "test-support"))]
mod fake;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{ApiCall, ApiOp, FakeProofApi, Outcome, ServerRecord};

#[cfg(test)]
#[path = "../api_tests.rs"]
mod tests;
