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

//! File and content type lookup

use async_trait::async_trait;
use log::{debug, warn};
use std::collections::HashMap;
use std::fmt::Debug;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tokio::io::{AsyncRead, AsyncSeek};

use crate::metadata::FileMetadata;
use crate::path::resolve_sub_path;

/// A readable and seekable file stream
pub trait FileSource: AsyncRead + AsyncSeek + Send + Unpin {}

impl<T: AsyncRead + AsyncSeek + Send + Unpin> FileSource for T {}

/// Resolves sub-paths to files
#[async_trait]
pub trait FileProvider: Debug + Send + Sync {
    /// Retrieves the metadata of the file at the given sub-path. Files that don’t exist or cannot
    /// be served (e.g. directories) are reported via [`FileMetadata::not_found`].
    fn file_metadata(&self, sub_path: &str) -> FileMetadata;

    /// Opens the file at the given sub-path for reading.
    async fn open(&self, sub_path: &str) -> io::Result<Box<dyn FileSource>>;
}

/// File provider serving files from a directory on disk
#[derive(Debug, Clone)]
pub struct PhysicalFileProvider {
    root: PathBuf,
}

impl PhysicalFileProvider {
    /// Creates a provider for the given root directory. The path is expected to be canonical
    /// already.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory of this provider
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, sub_path: &str) -> io::Result<PathBuf> {
        resolve_sub_path(sub_path, &self.root)
    }
}

#[async_trait]
impl FileProvider for PhysicalFileProvider {
    fn file_metadata(&self, sub_path: &str) -> FileMetadata {
        let path = match self.resolve(sub_path) {
            Ok(path) => path,
            Err(err) => {
                match err.kind() {
                    ErrorKind::InvalidData => {
                        warn!("Requested path outside root directory: {sub_path}");
                    }
                    ErrorKind::NotFound | ErrorKind::InvalidInput => {}
                    _ => debug!("failed resolving path {sub_path}: {err}"),
                }
                return FileMetadata::not_found();
            }
        };

        let meta = match path.metadata() {
            Ok(meta) => meta,
            Err(err) => {
                debug!("failed retrieving metadata for path {path:?}: {err}");
                return FileMetadata::not_found();
            }
        };

        if !meta.is_file() {
            debug!("path {path:?} is not a regular file");
            return FileMetadata::not_found();
        }

        let modified = meta.modified().unwrap_or(UNIX_EPOCH);
        FileMetadata::new(meta.len(), modified).with_physical_path(path)
    }

    async fn open(&self, sub_path: &str) -> io::Result<Box<dyn FileSource>> {
        let path = self.resolve(sub_path)?;
        let file = tokio::fs::File::open(path).await?;
        Ok(Box::new(file))
    }
}

/// Maps sub-paths to MIME types
pub trait ContentTypeProvider: Debug + Send + Sync {
    /// Returns the MIME type for the given sub-path or `None` if unknown.
    fn content_type(&self, sub_path: &str) -> Option<String>;
}

/// Content type provider using the file extension. Explicitly configured mappings take precedence
/// over the built-in extension list.
#[derive(Debug, Clone, Default)]
pub struct FileExtensionContentTypeProvider {
    mappings: HashMap<String, String>,
}

impl FileExtensionContentTypeProvider {
    /// Creates a provider with additional extension to MIME type mappings. Extensions are given
    /// without the leading dot and matched case-insensitively.
    pub fn new(mappings: &HashMap<String, String>) -> Self {
        Self {
            mappings: mappings
                .iter()
                .map(|(extension, mime)| {
                    let extension = extension.strip_prefix('.').unwrap_or(extension);
                    (extension.to_ascii_lowercase(), mime.clone())
                })
                .collect(),
        }
    }
}

impl ContentTypeProvider for FileExtensionContentTypeProvider {
    fn content_type(&self, sub_path: &str) -> Option<String> {
        let file_name = sub_path.rsplit('/').next().unwrap_or(sub_path);
        let (_, extension) = file_name.rsplit_once('.')?;
        if extension.is_empty() {
            return None;
        }

        let extension = extension.to_ascii_lowercase();
        if let Some(mime) = self.mappings.get(&extension) {
            return Some(mime.clone());
        }

        mime_guess::from_ext(&extension)
            .first()
            .map(|mime| mime.to_string())
    }
}
