// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cp-adapters: backend and device seams

pub mod api;
pub mod location;

pub use api::{ApiError, HttpProofApi, ProofApi, IDEMPOTENCY_HEADER};
pub use location::{FixedLocation, LocationError, LocationProvider};

#[cfg(any(test, feature = "test-support"))]
pub use api::{ApiCall, ApiOp, FakeProofApi, Outcome, ServerRecord};
#[cfg(any(test, feature = "test-support"))]
pub use location::FakeLocationProvider;
