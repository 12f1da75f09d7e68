// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Proof photos.

use crate::job::Coordinates;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::define_id! {
    /// Server-assigned photo identifier. Absent while an upload is pending.
    pub struct PhotoId;
}

/// Whether the photo documents the site before or after cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoKind {
    Before,
    After,
}

crate::simple_display! {
    PhotoKind {
        Before => "before",
        After => "after",
    }
}

/// Upload progress of a photo as seen by the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    #[default]
    Pending,
    Uploading,
    Uploaded,
    Failed,
}

crate::simple_display! {
    UploadStatus {
        Pending => "pending",
        Uploading => "uploading",
        Uploaded => "uploaded",
        Failed => "failed",
    }
}

/// Metadata captured alongside the image.
///
/// Coordinates are only ever a device fix; site coordinates are never
/// substituted here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhotoMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    pub taken_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PhotoId>,
    #[serde(rename = "photo_type")]
    pub kind: PhotoKind,
    /// Local file kept until the server assigns an id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PhotoMetadata>,
    #[serde(default = "uploaded")]
    pub status: UploadStatus,
}

// Photos in a server snapshot have, by definition, been uploaded.
fn uploaded() -> UploadStatus {
    UploadStatus::Uploaded
}

impl Photo {
    /// A locally captured photo that has not reached the server.
    pub fn pending(kind: PhotoKind, local_path: PathBuf, metadata: Option<PhotoMetadata>) -> Self {
        Self { id: None, kind, local_path: Some(local_path), metadata, status: UploadStatus::Pending }
    }

    /// A photo the server has stored under `id`.
    pub fn uploaded(id: PhotoId, kind: PhotoKind, metadata: Option<PhotoMetadata>) -> Self {
        Self { id: Some(id), kind, local_path: None, metadata, status: UploadStatus::Uploaded }
    }
}
