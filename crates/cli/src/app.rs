// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wiring of the durable store, backend client and engine for one
//! command invocation.

use std::sync::Arc;

use clap::Args;
use cp_adapters::{FixedLocation, HttpProofApi};
use cp_core::{Coordinates, JobId, JobMirror, SystemClock};
use cp_engine::{DrainReport, JobOrchestrator, OrchestratorDeps, SyncEngine, SyncEvent};
use cp_storage::{DurableStore, OutboxService, PhotoSpool};
use tokio::sync::{mpsc, Notify};
use tracing::debug;

use crate::config::Settings;
use crate::exit_error::{self, ExitError};

pub type Orchestrator =
    JobOrchestrator<DurableStore, HttpProofApi, Option<FixedLocation>, SystemClock>;
pub type Engine = SyncEngine<DurableStore, HttpProofApi>;

/// Device position for commands that capture one.
#[derive(Args, Debug, Clone, Default)]
pub struct LocationArgs {
    /// Device latitude; without a fix, check events use the job site
    #[arg(long, global = true, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Device longitude
    #[arg(long, global = true, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Record check events at the job site regardless of device position
    #[cfg(feature = "dev-location-override")]
    #[arg(long, global = true)]
    pub site_location: bool,
}

impl LocationArgs {
    pub fn provider(&self) -> Option<FixedLocation> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(FixedLocation(Coordinates::new(lat, lon))),
            _ => None,
        }
    }
}

pub fn open_store(settings: &Settings) -> Result<Arc<DurableStore>, ExitError> {
    let store = DurableStore::open(&settings.state_dir, settings.store).map_err(|e| {
        ExitError::new(
            exit_error::FAILURE,
            format!("cannot open state in {}: {e}", settings.state_dir.display()),
        )
    })?;
    Ok(Arc::new(store))
}

/// Look up a locally cached job by id or unique prefix.
pub fn resolve_job(store: &DurableStore, query: &str) -> Result<JobId, ExitError> {
    store.state().get_job(query).map(|job| job.id.clone()).ok_or_else(|| {
        ExitError::new(
            exit_error::NOT_FOUND,
            format!("job not found locally: {query} (run `cleanproof pull {query}` first)"),
        )
    })
}

/// Optimistic view of a cached job without touching the network.
pub fn local_mirror(store: &DurableStore, job_id: &JobId) -> Option<JobMirror> {
    let job = store.state().jobs.get(job_id)?.clone();
    Some(JobMirror::restore(job, &store.pending_for_job(job_id)))
}

/// Everything needed to submit steps and deliver the outbox.
pub struct App {
    pub store: Arc<DurableStore>,
    pub orchestrator: Arc<Orchestrator>,
    pub engine: Arc<Engine>,
    pub sync_rx: mpsc::UnboundedReceiver<SyncEvent>,
}

impl App {
    pub fn connect(settings: &Settings, location: &LocationArgs) -> Result<Self, ExitError> {
        let store = open_store(settings)?;
        let api = HttpProofApi::new(
            settings.require_api_url()?,
            settings.api_token.clone(),
            settings.request_timeout,
        )
        .map_err(|e| ExitError::new(exit_error::CONFIG, format!("cannot build HTTP client: {e}")))?;

        let wake = Arc::new(Notify::new());
        let deps = OrchestratorDeps {
            store: Arc::clone(&store),
            api: api.clone(),
            location: location.provider(),
            spool: PhotoSpool::new(&settings.state_dir),
            wake: Arc::clone(&wake),
        };
        let orchestrator = JobOrchestrator::new(deps, SystemClock, settings.gps);
        #[cfg(feature = "dev-location-override")]
        let orchestrator = if location.site_location {
            orchestrator.with_fix_strategy(cp_engine::FixStrategy::SiteOverride)
        } else {
            orchestrator
        };
        let orchestrator = Arc::new(orchestrator);
        let restored = orchestrator.restore()?;
        debug!(restored, "orchestrator ready");

        let (tx, sync_rx) = mpsc::unbounded_channel();
        let engine = Arc::new(SyncEngine::new(Arc::clone(&store), api, settings.sync, wake, tx));
        Ok(Self { store, orchestrator, engine, sync_rx })
    }

    pub fn resolve(&self, query: &str) -> Result<JobId, ExitError> {
        resolve_job(&self.store, query)
    }

    /// One delivery pass with results folded into the job mirrors.
    pub async fn sync(&mut self) -> DrainReport {
        let report = self.engine.drain_once().await;
        self.orchestrator.apply_pending(&mut self.sync_rx);
        report
    }
}
