// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Custom error type that carries a process exit code.
//!
//! Commands return `ExitError` instead of calling `std::process::exit()`
//! directly, allowing `main()` to handle process termination.

use cp_engine::ProofError;
use std::fmt;

pub const FAILURE: i32 = 1;
pub const CONFIG: i32 = 2;
pub const INVALID_STEP: i32 = 3;
pub const NO_LOCATION: i32 = 4;
pub const OFFLINE: i32 = 5;
pub const REFUSED: i32 = 6;
pub const SYNC_PENDING: i32 = 7;
pub const NOT_FOUND: i32 = 8;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

impl From<ProofError> for ExitError {
    fn from(e: ProofError) -> Self {
        let code = match &e {
            ProofError::OutOfOrderStep(_) | ProofError::InvalidPayload(_) => INVALID_STEP,
            ProofError::GpsUnavailable(_) => NO_LOCATION,
            ProofError::NetworkRetryable(_) => OFFLINE,
            ProofError::ServerValidation(_) => REFUSED,
            ProofError::SyncPending { .. } => SYNC_PENDING,
            ProofError::JobNotFound(_) => NOT_FOUND,
            ProofError::NoPendingItem | ProofError::Storage(_) | ProofError::Io(_) => FAILURE,
        };
        Self::new(code, e.to_string())
    }
}

#[cfg(test)]
#[path = "exit_error_tests.rs"]
mod tests;
