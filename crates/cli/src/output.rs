// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use clap::ValueEnum;
use cp_core::{CheckEvent, Job, JobStatus, PhotoKind, ProofStep, StepPosition, UploadStatus};
use serde::Serialize;

use crate::color;

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Format elapsed seconds as a short relative time (e.g., "5s", "2m", "1h", "3d")
pub fn format_elapsed(secs: u64) -> String {
    match secs {
        0..=59 => format!("{secs}s"),
        60..=3599 => format!("{}m", secs / 60),
        3600..=86_399 => format!("{}h", secs / 3600),
        _ => format!("{}d", secs / 86_400),
    }
}

/// Format a timestamp as relative time against `now_ms`.
pub fn format_time_ago(epoch_ms: u64, now_ms: u64) -> String {
    if epoch_ms == 0 {
        return "-".to_string();
    }
    format_elapsed(now_ms.saturating_sub(epoch_ms) / 1000)
}

/// Print a list as JSON, or as text through `render_text`.
pub fn handle_list<T: Serialize>(
    format: OutputFormat,
    items: &[T],
    empty_msg: &str,
    render_text: impl FnOnce(&[T], &mut dyn Write) -> std::io::Result<()>,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items)?);
        }
        OutputFormat::Text => {
            if items.is_empty() {
                println!("{}", empty_msg);
            } else {
                render_text(items, &mut std::io::stdout())?;
            }
        }
    }
    Ok(())
}

/// Format-branch helper for non-list commands.
pub fn format_or_json<T: Serialize>(
    format: OutputFormat,
    data: &T,
    text_fn: impl FnOnce(),
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
        OutputFormat::Text => {
            text_fn();
        }
    }
    Ok(())
}

/// Progress of one photo step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoProgress {
    pub required: u32,
    pub uploaded: usize,
    pub pending: usize,
    pub failed: usize,
}

/// Everything `status` shows about a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub id: String,
    pub site: String,
    pub status: JobStatus,
    pub position: StepPosition,
    pub check_in: Option<CheckEvent>,
    pub check_out: Option<CheckEvent>,
    pub before_photos: PhotoProgress,
    pub after_photos: PhotoProgress,
    pub checklist_done: usize,
    pub checklist_total: usize,
    pub missing_required: Vec<String>,
    /// Local changes not yet confirmed by the server.
    pub queued: usize,
}

impl StatusReport {
    /// Summarize the optimistic view of a job.
    pub fn new(view: &Job, queued: usize) -> Self {
        let photos = |kind: PhotoKind| {
            let of_kind = || view.photos.iter().filter(move |p| p.kind == kind);
            PhotoProgress {
                required: view.required_photos(kind),
                uploaded: of_kind().filter(|p| p.status == UploadStatus::Uploaded).count(),
                pending: of_kind()
                    .filter(|p| matches!(p.status, UploadStatus::Pending | UploadStatus::Uploading))
                    .count(),
                failed: of_kind().filter(|p| p.status == UploadStatus::Failed).count(),
            }
        };
        Self {
            id: view.id.to_string(),
            site: view.location.name.clone(),
            status: view.status,
            position: cp_core::position(view),
            check_in: view.check_in.clone(),
            check_out: view.check_out.clone(),
            before_photos: photos(PhotoKind::Before),
            after_photos: photos(PhotoKind::After),
            checklist_done: view.checklist.iter().filter(|i| i.completed).count(),
            checklist_total: view.checklist.len(),
            missing_required: view
                .checklist
                .iter()
                .filter(|i| i.required && !i.completed)
                .map(|i| i.text.clone())
                .collect(),
            queued,
        }
    }

    pub fn render(&self, out: &mut dyn Write) -> std::io::Result<()> {
        writeln!(out, "{} {} ({})", color::header("Job"), self.id, self.status)?;
        if !self.site.is_empty() {
            writeln!(out, "  site:      {}", self.site)?;
        }
        writeln!(out, "  next:      {}", describe_position(self.position))?;
        writeln!(out, "  check-in:  {}", describe_check(self.check_in.as_ref()))?;
        writeln!(out, "  before:    {}", describe_photos(&self.before_photos))?;
        writeln!(out, "  checklist: {}/{}", self.checklist_done, self.checklist_total)?;
        for text in &self.missing_required {
            writeln!(out, "    {} {}", color::muted("[ ]"), text)?;
        }
        writeln!(out, "  after:     {}", describe_photos(&self.after_photos))?;
        writeln!(out, "  check-out: {}", describe_check(self.check_out.as_ref()))?;
        if self.queued > 0 {
            let waiting = format!("{} change(s) waiting to sync", self.queued);
            writeln!(out, "  {}", color::context(&waiting))?;
        }
        Ok(())
    }
}

pub fn describe_position(position: StepPosition) -> String {
    match position {
        StepPosition::NotStarted => step_label(ProofStep::CheckIn).to_string(),
        StepPosition::At(step) => step_label(step).to_string(),
        StepPosition::Done => "done".to_string(),
    }
}

pub fn step_label(step: ProofStep) -> &'static str {
    match step {
        ProofStep::CheckIn => "check in",
        ProofStep::BeforePhoto => "before photo",
        ProofStep::Checklist => "checklist",
        ProofStep::AfterPhoto => "after photo",
        ProofStep::CheckOut => "check out",
    }
}

fn describe_check(event: Option<&CheckEvent>) -> String {
    match event {
        None => "-".to_string(),
        Some(e) if e.approximate => format!("{} {}", e.coordinates(), color::warn("(approximate)")),
        Some(e) => e.coordinates().to_string(),
    }
}

fn describe_photos(p: &PhotoProgress) -> String {
    let mut text = format!("{}/{}", p.uploaded + p.pending, p.required);
    if p.pending > 0 {
        text.push_str(&format!(", {} uploading", p.pending));
    }
    if p.failed > 0 {
        text.push_str(&format!(", {}", color::fail(&format!("{} failed", p.failed))));
    }
    text
}
