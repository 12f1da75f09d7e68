// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device location seam.

use async_trait::async_trait;
use cp_core::Coordinates;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location unavailable: {0}")]
    Unavailable(String),
}

/// Source of device position fixes
#[async_trait]
pub trait LocationProvider: Clone + Send + Sync + 'static {
    /// Current position. May take arbitrarily long; callers bound it.
    async fn current_position(&self) -> Result<Coordinates, LocationError>;
}

/// A position supplied up front, e.g. from command-line flags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedLocation(pub Coordinates);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        if self.0.is_valid() {
            Ok(self.0)
        } else {
            Err(LocationError::Unavailable(format!("invalid coordinates {}", self.0)))
        }
    }
}

/// `None` stands for a device without positioning hardware.
#[async_trait]
impl<L: LocationProvider> LocationProvider for Option<L> {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        match self {
            Some(provider) => provider.current_position().await,
            None => Err(LocationError::Unavailable("no location source".to_string())),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{LocationError, LocationProvider};
    use async_trait::async_trait;
    use cp_core::Coordinates;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Clone)]
    enum Behaviour {
        Fix(Coordinates),
        Fail(LocationError),
        Stall,
    }

    struct FakeLocationState {
        behaviour: Behaviour,
        requests: usize,
    }

    /// Fake location provider for testing
    #[derive(Clone)]
    pub struct FakeLocationProvider {
        inner: Arc<Mutex<FakeLocationState>>,
    }

    impl FakeLocationProvider {
        /// Provider that reports `at` on every request.
        pub fn at(at: Coordinates) -> Self {
            Self::with(Behaviour::Fix(at))
        }

        pub fn denied() -> Self {
            Self::with(Behaviour::Fail(LocationError::PermissionDenied))
        }

        pub fn unavailable() -> Self {
            Self::with(Behaviour::Fail(LocationError::Unavailable("no satellites".to_string())))
        }

        /// Provider whose requests never complete.
        pub fn stalled() -> Self {
            Self::with(Behaviour::Stall)
        }

        fn with(behaviour: Behaviour) -> Self {
            Self { inner: Arc::new(Mutex::new(FakeLocationState { behaviour, requests: 0 })) }
        }

        pub fn set_fix(&self, at: Coordinates) {
            self.inner.lock().behaviour = Behaviour::Fix(at);
        }

        pub fn deny(&self) {
            self.inner.lock().behaviour = Behaviour::Fail(LocationError::PermissionDenied);
        }

        /// Number of position requests made
        pub fn requests(&self) -> usize {
            self.inner.lock().requests
        }
    }

    #[async_trait]
    impl LocationProvider for FakeLocationProvider {
        async fn current_position(&self) -> Result<Coordinates, LocationError> {
            let behaviour = {
                let mut state = self.inner.lock();
                state.requests += 1;
                state.behaviour.clone()
            };
            match behaviour {
                Behaviour::Fix(at) => Ok(at),
                Behaviour::Fail(err) => Err(err),
                Behaviour::Stall => std::future::pending().await,
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeLocationProvider;

#[cfg(test)]
#[path = "location_tests.rs"]
mod tests;
