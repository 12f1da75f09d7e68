// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Field client harness shared by the specs.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub use cp_adapters::{ApiError, ApiOp, FakeLocationProvider, FakeProofApi, Outcome};
pub use cp_core::test_support::{site, standard_job};
pub use cp_core::{
    CheckKind, ChecklistUpdate, Coordinates, FakeClock, Job, JobId, JobStatus, OutboxItem,
    PhotoKind, ProofStep, StepPosition,
};
pub use cp_engine::{
    idempotency_key, DrainReport, GpsConfig, JobOrchestrator, OrchestratorDeps, ProofError,
    ProofEvent, StepPayload, StepReceipt, SyncConfig, SyncEngine, SyncEvent,
};
pub use cp_storage::{DurableStore, JobStore, MemoryStore, OutboxService, PhotoSpool, StoreConfig};
pub use tempfile::TempDir;
use tokio::sync::{broadcast, mpsc, Notify};

pub type Orchestrator<S> = JobOrchestrator<S, FakeProofApi, FakeLocationProvider, FakeClock>;

pub fn device() -> Coordinates {
    Coordinates::new(55.7500, 37.6100)
}

/// Backoff short enough for specs that run the engine in the background.
pub fn fast_sync() -> SyncConfig {
    SyncConfig::default()
        .base_backoff(Duration::from_millis(1))
        .max_backoff(Duration::from_millis(5))
}

/// One field device: orchestrator, sync engine and their shared store.
pub struct Field<S> {
    pub orchestrator: Arc<Orchestrator<S>>,
    pub engine: Arc<SyncEngine<S, FakeProofApi>>,
    pub store: Arc<S>,
    pub api: FakeProofApi,
    pub location: FakeLocationProvider,
    pub events: Option<mpsc::UnboundedReceiver<SyncEvent>>,
    state_dir: PathBuf,
}

impl Field<MemoryStore> {
    pub fn memory(state_dir: &Path) -> Self {
        Self::start(Arc::new(MemoryStore::new()), FakeProofApi::new(), state_dir)
    }
}

impl Field<DurableStore> {
    /// Open (or reopen after a restart) the durable state in `state_dir`.
    pub fn durable(state_dir: &Path, api: FakeProofApi) -> Self {
        let store = DurableStore::open(state_dir, StoreConfig::default()).unwrap();
        Self::start(Arc::new(store), api, state_dir)
    }
}

impl<S: OutboxService + JobStore> Field<S> {
    pub fn start(store: Arc<S>, api: FakeProofApi, state_dir: &Path) -> Self {
        let location = FakeLocationProvider::at(device());
        let wake = Arc::new(Notify::new());
        let deps = OrchestratorDeps {
            store: Arc::clone(&store),
            api: api.clone(),
            location: location.clone(),
            spool: PhotoSpool::new(state_dir),
            wake: Arc::clone(&wake),
        };
        let orchestrator =
            Arc::new(JobOrchestrator::new(deps, FakeClock::new(), GpsConfig::default()));
        orchestrator.restore().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let engine =
            Arc::new(SyncEngine::new(Arc::clone(&store), api.clone(), fast_sync(), wake, tx));
        Self {
            orchestrator,
            engine,
            store,
            api,
            location,
            events: Some(rx),
            state_dir: state_dir.to_path_buf(),
        }
    }

    /// Put `job` on the server and open it on the device.
    pub fn open(&self, job: Job) -> JobId {
        let id = job.id.clone();
        self.api.insert_job(job.clone());
        self.orchestrator.open_job(job).unwrap();
        id
    }

    pub fn observe(&self, job_id: &JobId) -> broadcast::Receiver<ProofEvent> {
        self.orchestrator.observe_job_state(job_id)
    }

    pub async fn submit(
        &self,
        job_id: &JobId,
        payload: StepPayload,
    ) -> Result<StepReceipt, ProofError> {
        self.orchestrator.submit_step(job_id, payload).await
    }

    /// Submit, resending while the failure is retryable.
    pub async fn submit_retrying(&self, job_id: &JobId, payload: StepPayload) -> StepReceipt {
        for _ in 0..10 {
            match self.submit(job_id, payload.clone()).await {
                Ok(receipt) => return receipt,
                Err(ProofError::NetworkRetryable(_)) => continue,
                Err(e) => panic!("{} failed: {e}", payload.step()),
            }
        }
        panic!("{} never succeeded", payload.step());
    }

    /// One delivery pass with results applied.
    pub async fn sync(&mut self) -> DrainReport {
        let report = self.engine.drain_once().await;
        if let Some(events) = self.events.as_mut() {
            self.orchestrator.apply_pending(events);
        }
        report
    }

    /// Drain repeatedly until nothing is queued.
    pub async fn sync_until_empty(&mut self) {
        for _ in 0..50 {
            let report = self.sync().await;
            if report.remaining == 0 {
                return;
            }
        }
        panic!("outbox never drained: {} left", self.store.len());
    }

    /// A camera image outside the spool.
    pub fn photo(&self, kind: PhotoKind) -> StepPayload {
        let camera = self.state_dir.join("camera");
        std::fs::create_dir_all(&camera).unwrap();
        let file = camera.join(format!("{kind}-{}.jpg", self.store.len()));
        std::fs::write(&file, b"\xff\xd8jpeg").unwrap();
        StepPayload::Photo { kind, file }
    }
}

pub fn checklist(updates: &[(&str, bool)]) -> StepPayload {
    StepPayload::Checklist {
        updates: updates.iter().map(|(id, done)| ChecklistUpdate::new(*id, *done)).collect(),
    }
}

/// Every item of `standard_job` done.
pub fn all_done() -> StepPayload {
    checklist(&[("mop", true), ("dust", true), ("bins", true)])
}

pub fn validation(status: u16) -> ApiError {
    ApiError::Validation { status, body: "refused".to_string() }
}

pub fn network() -> ApiError {
    ApiError::Network("connection refused".to_string())
}

/// Events already published on `rx`.
pub fn received(rx: &mut broadcast::Receiver<ProofEvent>) -> Vec<ProofEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
