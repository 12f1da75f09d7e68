// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cleanproof outbox` - inspect queued and refused changes

use std::io::Write;

use anyhow::Result;
use clap::{Args, Subcommand};
use cp_core::{OutboxEntry, OutboxItem};
use cp_storage::{DurableStore, OutboxService};

use crate::color;
use crate::output::{format_time_ago, handle_list, OutputFormat};

#[cfg(test)]
#[path = "outbox_tests.rs"]
mod tests;

#[derive(Args)]
pub struct OutboxArgs {
    #[command(subcommand)]
    pub command: OutboxCommand,
}

#[derive(Subcommand)]
pub enum OutboxCommand {
    /// List changes waiting to sync, oldest first
    List,
    /// List changes the server refused
    Rejected,
}

pub fn handle(command: OutboxCommand, store: &DurableStore, format: OutputFormat) -> Result<()> {
    let now_ms = now_ms();
    match command {
        OutboxCommand::List => {
            let pending = store.pending();
            handle_list(format, &pending, "Outbox empty", |items, out| {
                for entry in items {
                    writeln!(out, "{}", format_entry(entry, now_ms))?;
                }
                Ok(())
            })
        }
        OutboxCommand::Rejected => {
            let rejected = store.rejected();
            handle_list(format, &rejected, "No refused changes", |items, out| {
                for r in items {
                    let line = format_entry(&r.entry, now_ms);
                    writeln!(out, "{}  {}", line, color::fail(&r.reason))?;
                }
                Ok(())
            })
        }
    }
}

/// One line per entry: seq, job, step, detail and age.
pub(crate) fn format_entry(entry: &OutboxEntry, now_ms: u64) -> String {
    let detail = match &entry.item {
        OutboxItem::ChecklistBulk { items, .. } => items
            .iter()
            .map(|u| format!("{}={}", u.item_id, u.completed))
            .collect::<Vec<_>>()
            .join(","),
        OutboxItem::Photo { file, .. } => {
            file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
        }
    };
    format!(
        "#{:<4} {:<12} {:<13} {}  {}",
        entry.seq,
        entry.job_id().to_string(),
        entry.item.step().to_string(),
        detail,
        color::muted(&format_time_ago(entry.enqueued_at_ms, now_ms))
    )
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
