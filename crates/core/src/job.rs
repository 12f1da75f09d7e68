// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-side mirror of a server-owned cleaning job.
//!
//! The server is authoritative for every field here. The client only ever
//! replaces a `Job` wholesale from a snapshot, or folds in a change the
//! server has acknowledged (see [`crate::mirror::JobMirror`]).

use crate::check::{CheckEvent, CheckKind};
use crate::photo::{Photo, PhotoKind, UploadStatus};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Server-assigned identifier of a scheduled cleaning job.
    pub struct JobId;
}

crate::define_id! {
    /// Server-assigned identifier of a checklist item within a job.
    pub struct ChecklistItemId;
}

/// Server-side lifecycle of a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
}

crate::simple_display! {
    JobStatus {
        Scheduled => "scheduled",
        InProgress => "in_progress",
        Completed => "completed",
    }
}

/// A WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Both components are finite and inside their valid ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// Site the job takes place at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

/// One entry of a job's cleaning checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: ChecklistItemId,
    pub text: String,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(rename = "is_completed", default)]
    pub completed: bool,
}

fn default_true() -> bool {
    true
}

fn default_photo_count() -> u32 {
    1
}

/// A scheduled cleaning engagement, as last reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub scheduled_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_end: Option<String>,
    #[serde(default)]
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleaner: Option<String>,
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    #[serde(default)]
    pub photos: Vec<Photo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_in: Option<CheckEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_out: Option<CheckEvent>,
    /// Minimum number of before photos; values below 1 are treated as 1.
    #[serde(default = "default_photo_count")]
    pub required_before_photos: u32,
    /// Minimum number of after photos; values below 1 are treated as 1.
    #[serde(default = "default_photo_count")]
    pub required_after_photos: u32,
}

impl Job {
    /// Known site coordinates, if the server supplied valid ones.
    pub fn site_coordinates(&self) -> Option<Coordinates> {
        self.location.coordinates.filter(Coordinates::is_valid)
    }

    /// Number of photos of `kind` that count toward the step.
    ///
    /// Failed uploads never count.
    pub fn photo_count(&self, kind: PhotoKind) -> u32 {
        self.photos
            .iter()
            .filter(|p| p.kind == kind && p.status != UploadStatus::Failed)
            .count() as u32
    }

    /// Minimum photo count for `kind`, never less than one.
    pub fn required_photos(&self, kind: PhotoKind) -> u32 {
        let raw = match kind {
            PhotoKind::Before => self.required_before_photos,
            PhotoKind::After => self.required_after_photos,
        };
        raw.max(1)
    }

    /// The recorded check event of `kind`, if any.
    pub fn check_event(&self, kind: CheckKind) -> Option<&CheckEvent> {
        match kind {
            CheckKind::CheckIn => self.check_in.as_ref(),
            CheckKind::CheckOut => self.check_out.as_ref(),
        }
    }

    pub fn checklist_item(&self, id: &ChecklistItemId) -> Option<&ChecklistItem> {
        self.checklist.iter().find(|item| item.id == *id)
    }

    /// True once every required checklist item is completed.
    pub fn checklist_satisfied(&self) -> bool {
        self.checklist.iter().filter(|item| item.required).all(|item| item.completed)
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        into {
            id: JobId = "job-1",
            scheduled_date: String = "2026-10-16",
        }
        set {
            status: JobStatus = JobStatus::Scheduled,
            location: Location = Location {
                name: "Head office".to_string(),
                address: "1 Main St".to_string(),
                coordinates: Some(Coordinates::new(55.7558, 37.6173)),
            },
            checklist: Vec<ChecklistItem> = Vec::new(),
            photos: Vec<Photo> = Vec::new(),
            required_before_photos: u32 = 1,
            required_after_photos: u32 = 1,
        }
        option {
            scheduled_start: String = None,
            scheduled_end: String = None,
            cleaner: String = None,
            check_in: CheckEvent = None,
            check_out: CheckEvent = None,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl JobBuilder {
    /// Add a checklist item with the given completion state.
    pub fn item(mut self, id: &str, required: bool, completed: bool) -> Self {
        self.checklist.push(ChecklistItem {
            id: ChecklistItemId::new(id),
            text: format!("task {id}"),
            required,
            completed,
        });
        self
    }

    /// Drop the site coordinates.
    pub fn without_site(mut self) -> Self {
        self.location.coordinates = None;
        self
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
