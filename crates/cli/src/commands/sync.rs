// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cleanproof sync`

use std::sync::Arc;

use anyhow::Result;
use cp_storage::OutboxService;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::app::App;
use crate::color;
use crate::output::{format_or_json, OutputFormat};

/// Deliver queued changes once, stopping at the first retryable failure.
pub async fn once(mut app: App, format: OutputFormat) -> Result<()> {
    let report = app.sync().await;
    format_or_json(format, &report, || {
        println!("{} delivered, {} refused", report.acknowledged, report.rejected);
        match &report.stopped_by {
            Some(reason) => {
                println!("{} still queued: {}", report.remaining, color::warn(reason));
            }
            None if report.remaining > 0 => println!("{} still queued", report.remaining),
            None => println!("Outbox empty"),
        }
    })
}

/// Keep delivering with backoff until interrupted.
pub async fn watch(app: App) -> Result<()> {
    let App { store, orchestrator, engine, sync_rx } = app;
    let cancel = CancellationToken::new();
    println!("Syncing {} queued change(s); Ctrl-C to stop", store.len());

    let sync_task = tokio::spawn({
        let engine = Arc::clone(&engine);
        let cancel = cancel.clone();
        async move { engine.run(cancel).await }
    });
    let reconcile_task = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        let cancel = cancel.clone();
        async move { orchestrator.reconcile(sync_rx, cancel).await }
    });

    tokio::signal::ctrl_c().await?;
    info!("interrupted, stopping sync");
    cancel.cancel();
    sync_task.await?;
    reconcile_task.await?;

    println!("{} change(s) still queued", store.len());
    Ok(())
}
