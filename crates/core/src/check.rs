// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Check-in and check-out events.

use crate::job::Coordinates;
use serde::{Deserialize, Serialize};

/// Which end of the visit a check event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    CheckIn,
    CheckOut,
}

crate::simple_display! {
    CheckKind {
        CheckIn => "check_in",
        CheckOut => "check_out",
    }
}

impl CheckKind {
    /// URL path segment of the REST endpoint.
    pub fn path_segment(&self) -> &'static str {
        match self {
            CheckKind::CheckIn => "check-in",
            CheckKind::CheckOut => "check-out",
        }
    }
}

/// A recorded arrival or departure. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckEvent {
    #[serde(rename = "event_type")]
    pub kind: CheckKind,
    #[serde(rename = "timestamp")]
    pub timestamp_ms: u64,
    pub latitude: f64,
    pub longitude: f64,
    /// Location came from the job site rather than a device fix.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub approximate: bool,
}

impl CheckEvent {
    pub fn new(kind: CheckKind, timestamp_ms: u64, at: Coordinates, approximate: bool) -> Self {
        Self {
            kind,
            timestamp_ms,
            latitude: at.latitude,
            longitude: at.longitude,
            approximate,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}
