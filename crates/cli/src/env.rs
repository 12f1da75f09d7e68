// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI.

use std::path::PathBuf;
use std::time::Duration;

use crate::exit_error::ExitError;

/// Version string including the build's git hash.
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH"));

/// Resolve state directory: CP_STATE_DIR > XDG_STATE_HOME/cleanproof > ~/.local/state/cleanproof
pub fn state_dir() -> Result<PathBuf, ExitError> {
    if let Ok(dir) = std::env::var("CP_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("cleanproof"));
    }
    let home = std::env::var("HOME").map_err(|_| {
        ExitError::new(crate::exit_error::CONFIG, "cannot locate state directory: set CP_STATE_DIR")
    })?;
    Ok(PathBuf::from(home).join(".local/state/cleanproof"))
}

/// Backend base URL override
pub fn api_url() -> Option<String> {
    std::env::var("CP_API_URL").ok().filter(|s| !s.is_empty())
}

/// Bearer token for the backend
pub fn api_token() -> Option<String> {
    std::env::var("CP_API_TOKEN").ok().filter(|s| !s.is_empty())
}

/// Per-request timeout override
pub fn request_timeout() -> Option<Duration> {
    millis("CP_REQUEST_TIMEOUT_MS")
}

/// Device fix timeout override
pub fn gps_timeout() -> Option<Duration> {
    millis("CP_GPS_TIMEOUT_MS")
}

/// Log filter directives, `tracing_subscriber::EnvFilter` syntax.
pub fn log_filter() -> String {
    std::env::var("CP_LOG").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| "info".to_string())
}

fn millis(var: &str) -> Option<Duration> {
    std::env::var(var).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
