// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cleanproof pull` and `cleanproof status`

use anyhow::Result;
use cp_core::JobId;
use cp_storage::OutboxService;
use serde::Serialize;

use crate::app::{self, App, LocationArgs};
use crate::color;
use crate::config::Settings;
use crate::exit_error::{self, ExitError};
use crate::output::{describe_position, format_or_json, step_label, OutputFormat, StatusReport};

#[derive(Serialize)]
struct StatusOutput<'a> {
    #[serde(flatten)]
    report: &'a StatusReport,
    rejected: Vec<RejectedOutput>,
}

#[derive(Serialize)]
struct RejectedOutput {
    item_id: String,
    step: cp_core::ProofStep,
    reason: String,
}

/// Fetch the server's copy of a job and cache it for offline use.
pub async fn pull(settings: &Settings, id: &str, format: OutputFormat) -> Result<()> {
    let app = App::connect(settings, &LocationArgs::default())?;
    // Refresh a cached job by prefix; otherwise take the id as given
    let job_id = app.resolve(id).unwrap_or_else(|_| JobId::new(id));
    let position = app.orchestrator.refresh(&job_id).await.map_err(ExitError::from)?;
    let queued = app.orchestrator.pending_count(&job_id);

    let data = serde_json::json!({ "job_id": job_id, "position": position, "queued": queued });
    format_or_json(format, &data, || {
        let next = describe_position(position);
        println!("Pulled job {} (next: {next})", color::header(job_id.as_str()));
        if queued > 0 {
            println!("{} local change(s) still waiting to sync", queued);
        }
    })
}

/// Show a cached job as the field client sees it, offline.
pub fn status(settings: &Settings, id: &str, format: OutputFormat) -> Result<()> {
    let store = app::open_store(settings)?;
    let job_id = app::resolve_job(&store, id)?;
    let mirror = app::local_mirror(&store, &job_id)
        .ok_or_else(|| ExitError::new(exit_error::NOT_FOUND, format!("job not found: {id}")))?;
    let report = StatusReport::new(&mirror.view(), mirror.pending_count());
    let rejected: Vec<_> = store
        .rejected()
        .into_iter()
        .filter(|r| r.entry.job_id() == &job_id)
        .map(|r| RejectedOutput {
            item_id: r.entry.id.to_string(),
            step: r.entry.item.step(),
            reason: r.reason,
        })
        .collect();

    let data = StatusOutput { report: &report, rejected };
    format_or_json(format, &data, || {
        let mut out = std::io::stdout();
        if let Err(e) = report.render(&mut out) {
            tracing::warn!(error = %e, "failed to write status");
        }
        for r in &data.rejected {
            println!("  {} {}: {}", color::fail("refused"), step_label(r.step), r.reason);
        }
    })
}
