// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client settings: optional `config.toml` in the state directory,
//! overridden by environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cp_engine::{GpsConfig, SyncConfig};
use cp_storage::StoreConfig;
use serde::Deserialize;

use crate::env;
use crate::exit_error::{self, ExitError};

pub const CONFIG_FILE: &str = "config.toml";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Shape of `config.toml`. Every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub checkpoint_every: Option<u64>,
    pub sync: SyncSection,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSection {
    pub base_backoff_ms: Option<u64>,
    pub max_backoff_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub warn_after_attempts: Option<u32>,
    pub gps_timeout_ms: Option<u64>,
}

impl FileConfig {
    pub fn parse(text: &str) -> Result<Self, ExitError> {
        toml::from_str(text)
            .map_err(|e| ExitError::new(exit_error::CONFIG, format!("invalid {CONFIG_FILE}: {e}")))
    }

    /// Read `<state_dir>/config.toml`, or defaults when absent.
    pub fn load(state_dir: &Path) -> Result<Self, ExitError> {
        let path = state_dir.join(CONFIG_FILE);
        match std::fs::read_to_string(&path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ExitError::new(
                exit_error::CONFIG,
                format!("cannot read {}: {e}", path.display()),
            )),
        }
    }
}

/// Values taken from the environment, applied over the file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnvOverrides {
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub request_timeout: Option<Duration>,
    pub gps_timeout: Option<Duration>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            api_url: env::api_url(),
            api_token: env::api_token(),
            request_timeout: env::request_timeout(),
            gps_timeout: env::gps_timeout(),
        }
    }
}

/// Fully resolved client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub state_dir: PathBuf,
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub request_timeout: Duration,
    pub store: StoreConfig,
    pub sync: SyncConfig,
    pub gps: GpsConfig,
}

impl Settings {
    pub fn load(state_dir: PathBuf) -> Result<Self, ExitError> {
        let file = FileConfig::load(&state_dir)?;
        Ok(Self::resolve(state_dir, file, EnvOverrides::from_env()))
    }

    pub fn resolve(state_dir: PathBuf, file: FileConfig, env: EnvOverrides) -> Self {
        let ms = |v: Option<u64>| v.map(Duration::from_millis);
        let request_timeout = env
            .request_timeout
            .or(ms(file.sync.request_timeout_ms))
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let mut sync = SyncConfig::default().request_timeout(request_timeout);
        if let Some(base) = ms(file.sync.base_backoff_ms) {
            sync = sync.base_backoff(base);
        }
        if let Some(max) = ms(file.sync.max_backoff_ms) {
            sync = sync.max_backoff(max);
        }
        if let Some(n) = file.sync.warn_after_attempts {
            sync = sync.warn_after_attempts(n);
        }

        let mut gps = GpsConfig::default();
        if let Some(timeout) = env.gps_timeout.or(ms(file.sync.gps_timeout_ms)) {
            gps = gps.fix_timeout(timeout);
        }

        let mut store = StoreConfig::default();
        if let Some(n) = file.checkpoint_every {
            store = store.checkpoint_every(n);
        }

        Self {
            state_dir,
            api_url: env.api_url.or(file.api_url),
            api_token: env.api_token,
            request_timeout,
            store,
            sync,
            gps,
        }
    }

    /// Backend URL, required by commands that talk to the server.
    pub fn require_api_url(&self) -> Result<&str, ExitError> {
        self.api_url.as_deref().ok_or_else(|| {
            ExitError::new(
                exit_error::CONFIG,
                format!("no backend configured: set CP_API_URL or api_url in {CONFIG_FILE}"),
            )
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
