// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

use crate::events::StepPayload;
use crate::gps::GpsConfig;
use crate::orchestrator::{JobOrchestrator, OrchestratorDeps};
use crate::sync::{DrainReport, SyncConfig, SyncEngine, SyncEvent};
use cp_adapters::{FakeLocationProvider, FakeProofApi};
use cp_core::test_support::standard_job;
use cp_core::{ChecklistUpdate, Coordinates, FakeClock, Job, JobId, PhotoKind};
use cp_storage::{MemoryStore, PhotoSpool};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::{mpsc, Notify};

pub(crate) type TestOrchestrator =
    JobOrchestrator<MemoryStore, FakeProofApi, FakeLocationProvider, FakeClock>;

pub(crate) struct TestContext {
    pub orchestrator: Arc<TestOrchestrator>,
    pub engine: Arc<SyncEngine<MemoryStore, FakeProofApi>>,
    pub store: Arc<MemoryStore>,
    pub api: FakeProofApi,
    pub location: FakeLocationProvider,
    pub clock: FakeClock,
    pub sync_rx: mpsc::UnboundedReceiver<SyncEvent>,
    pub dir: TempDir,
}

pub(crate) fn device() -> Coordinates {
    Coordinates::new(55.7500, 37.6100)
}

impl TestContext {
    /// Orchestrator over fakes with `standard_job("j1")` seeded on the
    /// server and opened locally.
    pub fn new() -> Self {
        let ctx = Self::empty();
        ctx.seed(standard_job("j1"));
        ctx
    }

    /// No jobs seeded or opened.
    pub fn empty() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::with_store(store, TempDir::new().unwrap())
    }

    /// Reuse `store` and `dir`, as after a restart.
    pub fn with_store(store: Arc<MemoryStore>, dir: TempDir) -> Self {
        Self::build(store, FakeProofApi::new(), dir)
    }

    pub fn build(store: Arc<MemoryStore>, api: FakeProofApi, dir: TempDir) -> Self {
        let location = FakeLocationProvider::at(device());
        let clock = FakeClock::new();
        let wake = Arc::new(Notify::new());
        let deps = OrchestratorDeps {
            store: Arc::clone(&store),
            api: api.clone(),
            location: location.clone(),
            spool: PhotoSpool::new(dir.path()),
            wake: Arc::clone(&wake),
        };
        let orchestrator = Arc::new(JobOrchestrator::new(deps, clock.clone(), GpsConfig::default()));
        let (tx, sync_rx) = mpsc::unbounded_channel();
        let engine = Arc::new(SyncEngine::new(
            Arc::clone(&store),
            api.clone(),
            SyncConfig::default(),
            wake,
            tx,
        ));
        Self { orchestrator, engine, store, api, location, clock, sync_rx, dir }
    }

    /// Put `job` on the fake server and open it locally.
    pub fn seed(&self, job: Job) {
        self.api.insert_job(job.clone());
        self.orchestrator.open_job(job).unwrap();
    }

    pub fn j1() -> JobId {
        JobId::new("j1")
    }

    /// One deterministic delivery pass, with results applied.
    pub async fn sync(&mut self) -> DrainReport {
        let report = self.engine.drain_once().await;
        self.orchestrator.apply_pending(&mut self.sync_rx);
        report
    }

    /// A camera file outside the spool.
    pub fn photo_file(&self, name: &str) -> PathBuf {
        let camera = self.dir.path().join("camera");
        std::fs::create_dir_all(&camera).unwrap();
        let path = camera.join(name);
        std::fs::write(&path, b"\xff\xd8jpeg").unwrap();
        path
    }

    pub fn photo(&self, kind: PhotoKind) -> StepPayload {
        StepPayload::Photo { kind, file: self.photo_file(&format!("{kind}.jpg")) }
    }

    /// Drive `job_id` through check-in, before photo and a complete checklist.
    pub async fn advance_to_after_photo(&mut self, job_id: &JobId) {
        let o = Arc::clone(&self.orchestrator);
        o.submit_step(job_id, StepPayload::CheckIn).await.unwrap();
        o.submit_step(job_id, self.photo(PhotoKind::Before)).await.unwrap();
        o.submit_step(job_id, all_done()).await.unwrap();
    }
}

pub(crate) fn all_done() -> StepPayload {
    StepPayload::Checklist {
        updates: vec![
            ChecklistUpdate::new("mop", true),
            ChecklistUpdate::new("dust", true),
            ChecklistUpdate::new("bins", true),
        ],
    }
}
