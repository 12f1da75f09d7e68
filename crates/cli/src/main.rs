// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cleanproof: headless field client for job completion proof

mod app;
mod color;
mod commands;
mod config;
mod env;
mod exit_error;
mod logging;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cp_core::ChecklistUpdate;

use crate::app::{App, LocationArgs};
use crate::commands::outbox::OutboxArgs;
use crate::commands::step::{parse_update, PhotoArg};
use crate::config::Settings;
use crate::exit_error::ExitError;
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "cleanproof",
    version = env::VERSION,
    about = "Record check-in, photos, checklist and check-out for cleaning jobs, online or off",
    styles = color::styles(),
)]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t, global = true)]
    output: OutputFormat,

    #[command(flatten)]
    location: LocationArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a job from the server and cache it for offline work
    Pull {
        /// Job ID (prefix match for cached jobs)
        job: String,
    },
    /// Show a cached job's proof progress
    Status {
        /// Job ID or unique prefix
        job: String,
    },
    /// Check in at the job site
    CheckIn {
        /// Job ID or unique prefix
        job: String,
    },
    /// Queue a before or after photo
    Photo {
        /// Job ID or unique prefix
        job: String,
        #[arg(value_enum)]
        kind: PhotoArg,
        /// Image file to upload
        file: PathBuf,
        /// Only queue; do not try to deliver now
        #[arg(long)]
        no_sync: bool,
    },
    /// Queue checklist updates (item=true|false)
    Checklist {
        /// Job ID or unique prefix
        job: String,
        #[arg(required = true, value_parser = parse_update)]
        updates: Vec<ChecklistUpdate>,
        /// Only queue; do not try to deliver now
        #[arg(long)]
        no_sync: bool,
    },
    /// Check out once everything has synced
    CheckOut {
        /// Job ID or unique prefix
        job: String,
    },
    /// Deliver queued changes to the server
    Sync {
        /// Keep retrying with backoff until interrupted
        #[arg(long)]
        watch: bool,
    },
    /// Inspect the outbox
    Outbox(OutboxArgs),
    /// Compact the local event log into a snapshot
    Checkpoint,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => match e.downcast_ref::<ExitError>() {
            Some(exit) => {
                eprintln!("error: {}", exit.message);
                exit.code
            }
            None => {
                eprintln!("error: {e:#}");
                exit_error::FAILURE
            }
        },
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<()> {
    let state_dir = env::state_dir()?;
    let _log_guard = logging::init(&state_dir)?;
    let settings = Settings::load(state_dir)?;
    let format = cli.output;

    match cli.command {
        Commands::Pull { job } => commands::job::pull(&settings, &job, format).await,
        Commands::Status { job } => commands::job::status(&settings, &job, format),
        Commands::CheckIn { job } => {
            let mut app = App::connect(&settings, &cli.location)?;
            commands::step::check_in(&mut app, &job, format).await
        }
        Commands::Photo { job, kind, file, no_sync } => {
            let mut app = App::connect(&settings, &cli.location)?;
            commands::step::photo(&mut app, &job, kind, file, no_sync, format).await
        }
        Commands::Checklist { job, updates, no_sync } => {
            let mut app = App::connect(&settings, &cli.location)?;
            commands::step::checklist(&mut app, &job, updates, no_sync, format).await
        }
        Commands::CheckOut { job } => {
            let mut app = App::connect(&settings, &cli.location)?;
            commands::step::check_out(&mut app, &job, format).await
        }
        Commands::Sync { watch } => {
            let app = App::connect(&settings, &cli.location)?;
            if watch {
                commands::sync::watch(app).await
            } else {
                commands::sync::once(app, format).await
            }
        }
        Commands::Outbox(args) => {
            let store = app::open_store(&settings)?;
            commands::outbox::handle(args.command, &store, format)
        }
        Commands::Checkpoint => {
            let store = app::open_store(&settings)?;
            let seq = store.checkpoint().map_err(|e| {
                ExitError::new(exit_error::FAILURE, format!("checkpoint failed: {e}"))
            })?;
            output::format_or_json(format, &serde_json::json!({ "seq": seq }), || {
                println!("Checkpoint written at seq {seq}");
            })
        }
    }
}
