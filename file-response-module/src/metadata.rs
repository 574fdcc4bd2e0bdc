// Copyright 2024 Wladimir Palant
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! File metadata handling

use httpdate::fmt_http_date;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::etag::EntityTag;

/// Snapshot of file metadata taken once per request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    exists: bool,
    length: u64,
    last_modified: SystemTime,
    physical_path: Option<PathBuf>,
}

impl FileMetadata {
    /// Creates metadata for an existing file. The modification time is truncated to whole seconds
    /// since HTTP dates don’t have a higher precision.
    pub fn new(length: u64, last_modified: SystemTime) -> Self {
        Self {
            exists: true,
            length,
            last_modified: truncate_to_seconds(last_modified),
            physical_path: None,
        }
    }

    /// Creates metadata for a file that doesn’t exist.
    pub fn not_found() -> Self {
        Self {
            exists: false,
            length: 0,
            last_modified: UNIX_EPOCH,
            physical_path: None,
        }
    }

    /// Attaches the path of the file on disk, making zero-copy transfers possible.
    pub fn with_physical_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.physical_path = Some(path.into());
        self
    }

    /// Whether the file exists
    pub fn exists(&self) -> bool {
        self.exists
    }

    /// File size in bytes
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Last modified time, truncated to whole seconds
    pub fn last_modified(&self) -> SystemTime {
        self.last_modified
    }

    /// Last modified time in the format `Fri, 15 May 2015 15:34:21 GMT`
    pub fn last_modified_str(&self) -> String {
        fmt_http_date(self.last_modified)
    }

    /// Path of the file on disk if the file provider exposes one
    pub fn physical_path(&self) -> Option<&Path> {
        self.physical_path.as_deref()
    }

    /// Entity tag encoding last modified time and file size
    pub fn etag(&self) -> EntityTag {
        EntityTag::compute(self.length, self.last_modified)
    }
}

fn truncate_to_seconds(time: SystemTime) -> SystemTime {
    match time.duration_since(UNIX_EPOCH) {
        Ok(duration) => UNIX_EPOCH + Duration::from_secs(duration.as_secs()),
        // HTTP dates cannot express times before the epoch.
        Err(_) => UNIX_EPOCH,
    }
}
