// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured logs go to `<state_dir>/cleanproof.log`; stdout stays
//! reserved for command output.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::env;
use crate::exit_error::{self, ExitError};

pub const LOG_FILE: &str = "cleanproof.log";

/// Install the global subscriber. Keep the guard alive until exit so
/// buffered lines are flushed.
pub fn init(state_dir: &Path) -> Result<WorkerGuard, ExitError> {
    std::fs::create_dir_all(state_dir).map_err(|e| {
        ExitError::new(exit_error::CONFIG, format!("cannot create {}: {e}", state_dir.display()))
    })?;
    let filter = EnvFilter::try_new(env::log_filter())
        .map_err(|e| ExitError::new(exit_error::CONFIG, format!("invalid CP_LOG: {e}")))?;

    let appender = tracing_appender::rolling::never(state_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| ExitError::new(exit_error::FAILURE, format!("logging already set up: {e}")))?;
    Ok(guard)
}
