// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process stand-in for the backend.
//!
//! Keeps a server-side copy of each job, dedupes mutations by idempotency
//! key, and lets tests script failures per call: plain errors, responses
//! lost after the server applied the change, and requests that never
//! complete.

use super::{ApiError, ProofApi};
use async_trait::async_trait;
use cp_core::{
    CheckEvent, CheckKind, ChecklistUpdate, Job, JobId, JobStatus, Photo, PhotoId, PhotoKind,
    PhotoMetadata, ProofStep,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Which endpoint a call hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiOp {
    FetchJob,
    Check(CheckKind),
    UpdateChecklist,
    UploadPhoto,
}

/// Recorded call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCall {
    pub op: ApiOp,
    pub job_id: JobId,
    pub idempotency_key: Option<String>,
}

/// A mutation the fake server actually applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerRecord {
    pub job_id: JobId,
    pub step: ProofStep,
    pub idempotency_key: String,
}

/// Scripted result for the next call.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Handle the call normally.
    Ok,
    /// Fail before the server does anything.
    Fail(ApiError),
    /// Apply the change, then fail as if the response was dropped.
    LoseResponse,
    /// Never respond.
    Stall,
}

#[derive(Debug, Clone)]
enum Reply {
    Job(Box<Job>),
    Done,
    Photo(PhotoId),
}

#[derive(Default)]
struct FakeApiState {
    jobs: HashMap<JobId, Job>,
    calls: Vec<ApiCall>,
    records: Vec<ServerRecord>,
    replies: HashMap<String, Reply>,
    script: VecDeque<Outcome>,
    uploads: Vec<PathBuf>,
    offline: bool,
    next_photo: u64,
}

/// Fake backend for testing
#[derive(Clone, Default)]
pub struct FakeProofApi {
    inner: Arc<Mutex<FakeApiState>>,
}

impl FakeProofApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed (or replace) the server's copy of a job.
    pub fn insert_job(&self, job: Job) {
        self.inner.lock().jobs.insert(job.id.clone(), job);
    }

    pub fn job(&self, id: &JobId) -> Option<Job> {
        self.inner.lock().jobs.get(id).cloned()
    }

    /// Queue outcomes consumed one per call, in order.
    pub fn script(&self, outcomes: impl IntoIterator<Item = Outcome>) {
        self.inner.lock().script.extend(outcomes);
    }

    /// Fail every call with a network error until turned back off.
    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().offline = offline;
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.inner.lock().calls.clone()
    }

    /// Calls for one endpoint
    pub fn calls_to(&self, op: ApiOp) -> Vec<ApiCall> {
        self.inner.lock().calls.iter().filter(|c| c.op == op).cloned().collect()
    }

    /// Mutations applied server-side, one per distinct idempotency key.
    pub fn records(&self) -> Vec<ServerRecord> {
        self.inner.lock().records.clone()
    }

    /// Local files the server read during uploads.
    pub fn uploads(&self) -> Vec<PathBuf> {
        self.inner.lock().uploads.clone()
    }

    /// Record the call and decide how it ends before touching server state.
    fn begin(&self, op: ApiOp, job_id: &JobId, key: Option<&str>) -> Outcome {
        let mut state = self.inner.lock();
        state.calls.push(ApiCall {
            op,
            job_id: job_id.clone(),
            idempotency_key: key.map(str::to_string),
        });
        if state.offline {
            return Outcome::Fail(ApiError::Network("connection refused".to_string()));
        }
        state.script.pop_front().unwrap_or(Outcome::Ok)
    }

    async fn run<F>(&self, op: ApiOp, job_id: &JobId, key: &str, apply: F) -> Result<Reply, ApiError>
    where
        F: FnOnce(&mut FakeApiState) -> Result<Reply, ApiError>,
    {
        let lose_response = match self.begin(op, job_id, Some(key)) {
            Outcome::Ok => false,
            Outcome::LoseResponse => true,
            Outcome::Fail(err) => return Err(err),
            Outcome::Stall => std::future::pending().await,
        };

        let reply = {
            let mut state = self.inner.lock();
            let cached = state.replies.get(key).cloned();
            match cached {
                Some(reply) => reply,
                None => {
                    let reply = apply(&mut *state)?;
                    state.replies.insert(key.to_string(), reply.clone());
                    reply
                }
            }
        };

        if lose_response {
            return Err(ApiError::Network("connection reset".to_string()));
        }
        Ok(reply)
    }
}

fn not_found(job_id: &JobId) -> ApiError {
    ApiError::Validation { status: 404, body: format!("job {job_id} not found") }
}

fn apply_check(
    state: &mut FakeApiState,
    job_id: &JobId,
    event: &CheckEvent,
    key: &str,
) -> Result<Reply, ApiError> {
    let job = state.jobs.get_mut(job_id).ok_or_else(|| not_found(job_id))?;
    let slot = match event.kind {
        CheckKind::CheckIn => &mut job.check_in,
        CheckKind::CheckOut => &mut job.check_out,
    };
    // At most one of each per job, whatever the key
    if slot.is_none() {
        *slot = Some(event.clone());
        job.status = match event.kind {
            CheckKind::CheckIn => JobStatus::InProgress,
            CheckKind::CheckOut => JobStatus::Completed,
        };
        let job_id = job.id.clone();
        state.records.push(ServerRecord {
            job_id,
            step: ProofStep::from(event.kind),
            idempotency_key: key.to_string(),
        });
    }
    let job = state.jobs.get(job_id).cloned().ok_or_else(|| not_found(job_id))?;
    Ok(Reply::Job(Box::new(job)))
}

fn apply_checklist(
    state: &mut FakeApiState,
    job_id: &JobId,
    items: &[ChecklistUpdate],
    key: &str,
) -> Result<Reply, ApiError> {
    let job = state.jobs.get_mut(job_id).ok_or_else(|| not_found(job_id))?;
    if let Some(unknown) = items.iter().find(|u| job.checklist_item(&u.item_id).is_none()) {
        return Err(ApiError::Validation {
            status: 422,
            body: format!("unknown checklist item {}", unknown.item_id),
        });
    }
    for update in items {
        if let Some(item) = job.checklist.iter_mut().find(|i| i.id == update.item_id) {
            item.completed = update.completed;
        }
    }
    state.records.push(ServerRecord {
        job_id: job_id.clone(),
        step: ProofStep::Checklist,
        idempotency_key: key.to_string(),
    });
    Ok(Reply::Done)
}

fn apply_photo(
    state: &mut FakeApiState,
    job_id: &JobId,
    kind: PhotoKind,
    file: &Path,
    metadata: Option<&PhotoMetadata>,
    key: &str,
) -> Result<Reply, ApiError> {
    if !file.exists() {
        return Err(ApiError::LocalFile(file.display().to_string()));
    }
    state.next_photo += 1;
    let id = PhotoId::new(format!("photo-{}", state.next_photo));
    let job = state.jobs.get_mut(job_id).ok_or_else(|| not_found(job_id))?;
    job.photos.push(Photo::uploaded(id.clone(), kind, metadata.copied()));
    state.uploads.push(file.to_path_buf());
    state.records.push(ServerRecord {
        job_id: job_id.clone(),
        step: ProofStep::from(kind),
        idempotency_key: key.to_string(),
    });
    Ok(Reply::Photo(id))
}

fn unexpected(reply: Reply) -> ApiError {
    ApiError::Decode(format!("unexpected reply {reply:?}"))
}

#[async_trait]
impl ProofApi for FakeProofApi {
    async fn fetch_job(&self, job_id: &JobId) -> Result<Job, ApiError> {
        match self.begin(ApiOp::FetchJob, job_id, None) {
            Outcome::Stall => std::future::pending().await,
            Outcome::Fail(err) => Err(err),
            Outcome::LoseResponse => Err(ApiError::Network("connection reset".to_string())),
            Outcome::Ok => self.job(job_id).ok_or_else(|| not_found(job_id)),
        }
    }

    async fn record_check(
        &self,
        job_id: &JobId,
        event: &CheckEvent,
        idempotency_key: &str,
    ) -> Result<Job, ApiError> {
        let op = ApiOp::Check(event.kind);
        match self
            .run(op, job_id, idempotency_key, |s| apply_check(s, job_id, event, idempotency_key))
            .await?
        {
            Reply::Job(job) => Ok(*job),
            other => Err(unexpected(other)),
        }
    }

    async fn update_checklist(
        &self,
        job_id: &JobId,
        items: &[ChecklistUpdate],
        idempotency_key: &str,
    ) -> Result<(), ApiError> {
        match self
            .run(ApiOp::UpdateChecklist, job_id, idempotency_key, |s| {
                apply_checklist(s, job_id, items, idempotency_key)
            })
            .await?
        {
            Reply::Done => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn upload_photo(
        &self,
        job_id: &JobId,
        kind: PhotoKind,
        file: &Path,
        metadata: Option<&PhotoMetadata>,
        idempotency_key: &str,
    ) -> Result<PhotoId, ApiError> {
        match self
            .run(ApiOp::UploadPhoto, job_id, idempotency_key, |s| {
                apply_photo(s, job_id, kind, file, metadata, idempotency_key)
            })
            .await?
        {
            Reply::Photo(id) => Ok(id),
            other => Err(unexpected(other)),
        }
    }
}
