// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Proof step submission: `check-in`, `photo`, `checklist`, `check-out`

use std::path::PathBuf;

use anyhow::Result;
use clap::ValueEnum;
use cp_core::{ChecklistUpdate, JobId, PhotoKind};
use cp_engine::{DrainReport, StepPayload, StepReceipt};
use serde::Serialize;
use tracing::info;

use crate::app::App;
use crate::color;
use crate::exit_error::ExitError;
use crate::output::{describe_position, format_or_json, step_label, OutputFormat};

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PhotoArg {
    Before,
    After,
}

impl From<PhotoArg> for PhotoKind {
    fn from(arg: PhotoArg) -> Self {
        match arg {
            PhotoArg::Before => PhotoKind::Before,
            PhotoArg::After => PhotoKind::After,
        }
    }
}

/// Parse `item=true|false` for clap's value_parser.
pub(crate) fn parse_update(s: &str) -> Result<ChecklistUpdate, String> {
    let (item, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid checklist update '{}': must be item=true|false", s))?;
    if item.is_empty() {
        return Err(format!("invalid checklist update '{}': missing item id", s));
    }
    let completed = match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "done" | "1" => true,
        "false" | "no" | "undone" | "0" => false,
        other => return Err(format!("invalid completion '{}' for item '{}'", other, item)),
    };
    Ok(ChecklistUpdate::new(item, completed))
}

#[derive(Serialize)]
struct SubmitOutput<'a> {
    job_id: &'a JobId,
    #[serde(flatten)]
    receipt: &'a StepReceipt,
    #[serde(skip_serializing_if = "Option::is_none")]
    sync: Option<&'a DrainReport>,
}

pub async fn check_in(app: &mut App, id: &str, format: OutputFormat) -> Result<()> {
    submit(app, id, StepPayload::CheckIn, false, format).await
}

pub async fn photo(
    app: &mut App,
    id: &str,
    kind: PhotoArg,
    file: PathBuf,
    no_sync: bool,
    format: OutputFormat,
) -> Result<()> {
    let payload = StepPayload::Photo { kind: kind.into(), file };
    submit(app, id, payload, !no_sync, format).await
}

pub async fn checklist(
    app: &mut App,
    id: &str,
    updates: Vec<ChecklistUpdate>,
    no_sync: bool,
    format: OutputFormat,
) -> Result<()> {
    submit(app, id, StepPayload::Checklist { updates }, !no_sync, format).await
}

/// Deliver anything queued for the job first, then check out.
pub async fn check_out(app: &mut App, id: &str, format: OutputFormat) -> Result<()> {
    let job_id = app.resolve(id)?;
    if app.orchestrator.pending_count(&job_id) > 0 {
        let report = app.sync().await;
        info!(
            %job_id,
            acknowledged = report.acknowledged,
            remaining = report.remaining,
            "synced before check-out"
        );
    }
    submit(app, id, StepPayload::CheckOut, false, format).await
}

async fn submit(
    app: &mut App,
    id: &str,
    payload: StepPayload,
    sync_after: bool,
    format: OutputFormat,
) -> Result<()> {
    let job_id = app.resolve(id)?;
    let receipt =
        app.orchestrator.submit_step(&job_id, payload).await.map_err(ExitError::from)?;
    let sync = if sync_after && receipt.queued.is_some() {
        Some(app.sync().await)
    } else {
        None
    };
    let pending = app.orchestrator.pending_count(&job_id);

    let data = SubmitOutput { job_id: &job_id, receipt: &receipt, sync: sync.as_ref() };
    format_or_json(format, &data, || {
        let label = capitalize(step_label(receipt.step));
        let mut line = format!("{label} recorded for job {job_id}");
        if receipt.approximate {
            line.push_str(&format!(" {}", color::warn("(site location, no device fix)")));
        }
        println!("{line}");
        if pending > 0 {
            let stopped = sync.as_ref().and_then(|r| r.stopped_by.as_deref());
            match stopped {
                Some(reason) => println!(
                    "{} change(s) queued, will sync later: {}",
                    pending,
                    color::warn(reason)
                ),
                None => println!("{} change(s) queued", pending),
            }
        }
        for rejected in app.orchestrator.rejected(&job_id) {
            println!(
                "{} {}: {}",
                color::fail("Server refused"),
                step_label(rejected.step()),
                rejected.reason
            );
        }
        let position = app.orchestrator.position(&job_id).unwrap_or(receipt.position);
        println!("Next: {}", describe_position(position));
    })
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
