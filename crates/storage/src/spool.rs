// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local copies of captured photos awaiting upload.
//!
//! The camera's temp file may vanish before the upload runs, so each photo
//! is copied into the state directory first and the outbox item points at
//! the copy.

use cp_core::{IdGen, UuidIdGen};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const SPOOL_DIR: &str = "photos";

#[derive(Debug, Clone)]
pub struct PhotoSpool {
    dir: PathBuf,
}

impl PhotoSpool {
    pub fn new(state_dir: &Path) -> Self {
        Self { dir: state_dir.join(SPOOL_DIR) }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy `source` into the spool and return the spooled path.
    pub fn stage(&self, source: &Path) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let name = match source.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}.{ext}", UuidIdGen.next()),
            None => UuidIdGen.next(),
        };
        let dest = self.dir.join(name);
        fs::copy(source, &dest)?;
        let file = fs::File::open(&dest)?;
        file.sync_all()?;
        debug!(source = %source.display(), spooled = %dest.display(), "photo spooled");
        Ok(dest)
    }

    pub fn contains(&self, path: &Path) -> bool {
        path.parent() == Some(self.dir.as_path())
    }

    /// Delete a spooled file once the server holds the photo.
    ///
    /// Paths outside the spool are never touched.
    pub fn release(&self, path: &Path) {
        if !self.contains(path) {
            return;
        }
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "failed to release spooled photo");
            }
        }
    }

    /// Remove spooled files not in `keep`. Returns how many were removed.
    pub fn prune<'a>(&self, keep: impl IntoIterator<Item = &'a Path>) -> io::Result<usize> {
        let keep: HashSet<&Path> = keep.into_iter().collect();
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };
        let mut removed = 0;
        for entry in entries {
            let path = entry?.path();
            if !keep.contains(path.as_path()) {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
#[path = "spool_tests.rs"]
mod tests;
