// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Location fixes for check events and photo metadata.

use crate::error::ProofError;
use cp_adapters::{LocationError, LocationProvider};
use cp_core::{CheckKind, Coordinates, Job};
use std::time::Duration;
use tracing::{debug, warn};

/// Tuning for [`GpsCapture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpsConfig {
    /// Upper bound on waiting for a device fix.
    pub fix_timeout: Duration,
}

impl Default for GpsConfig {
    fn default() -> Self {
        Self { fix_timeout: Duration::from_secs(10) }
    }
}

impl GpsConfig {
    cp_core::setters! { fix_timeout: Duration }
}

/// How check-event locations are chosen. Fixed at build time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FixStrategy {
    /// Device fix, falling back to site coordinates.
    #[default]
    DeviceFirst,
    /// Always use site coordinates. Development builds only.
    #[cfg(feature = "dev-location-override")]
    SiteOverride,
}

/// A location to attach to a check event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    pub coordinates: Coordinates,
    /// True when the job site stood in for a device fix.
    pub approximate: bool,
}

pub struct GpsCapture<L> {
    provider: L,
    config: GpsConfig,
    strategy: FixStrategy,
}

impl<L: LocationProvider> GpsCapture<L> {
    pub fn new(provider: L, config: GpsConfig) -> Self {
        Self { provider, config, strategy: FixStrategy::default() }
    }

    #[cfg(feature = "dev-location-override")]
    pub fn with_strategy(mut self, strategy: FixStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> FixStrategy {
        self.strategy
    }

    /// Location for a check-in or check-out.
    ///
    /// Falls back to the job's site coordinates, flagged approximate, when
    /// the device cannot produce a fix in time. Fails only when neither is
    /// available; no check event may be recorded without a location.
    pub async fn check_fix(&self, job: &Job, kind: CheckKind) -> Result<LocationFix, ProofError> {
        #[cfg(feature = "dev-location-override")]
        if self.strategy == FixStrategy::SiteOverride {
            return job
                .site_coordinates()
                .map(|coordinates| LocationFix { coordinates, approximate: true })
                .ok_or(ProofError::GpsUnavailable(kind));
        }

        match self.device_fix().await {
            Ok(coordinates) => Ok(LocationFix { coordinates, approximate: false }),
            Err(reason) => match job.site_coordinates() {
                Some(coordinates) => {
                    warn!(job_id = %job.id, %kind, %reason, "using site coordinates");
                    Ok(LocationFix { coordinates, approximate: true })
                }
                None => {
                    warn!(job_id = %job.id, %kind, %reason, "no location available");
                    Err(ProofError::GpsUnavailable(kind))
                }
            },
        }
    }

    /// Device location for photo metadata. Never substitutes the site.
    pub async fn photo_fix(&self) -> Option<Coordinates> {
        match self.device_fix().await {
            Ok(coordinates) => Some(coordinates),
            Err(reason) => {
                debug!(%reason, "photo taken without location");
                None
            }
        }
    }

    async fn device_fix(&self) -> Result<Coordinates, LocationError> {
        let request = self.provider.current_position();
        match tokio::time::timeout(self.config.fix_timeout, request).await {
            Ok(Ok(coordinates)) if coordinates.is_valid() => Ok(coordinates),
            Ok(Ok(coordinates)) => {
                Err(LocationError::Unavailable(format!("invalid fix {coordinates}")))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(LocationError::Unavailable(format!(
                "no fix within {}ms",
                self.config.fix_timeout.as_millis()
            ))),
        }
    }
}

#[cfg(test)]
#[path = "gps_tests.rs"]
mod tests;
