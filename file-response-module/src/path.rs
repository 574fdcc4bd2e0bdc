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

//! Path matching and resolution logic

use percent_encoding::percent_decode_str;
use std::borrow::Cow;
use std::io::{Error, ErrorKind};
use std::path::{Path, PathBuf};

/// Percent-decodes a request path. Returns `None` if the result isn’t valid UTF-8.
pub fn decode_path(uri_path: &str) -> Option<Cow<'_, str>> {
    percent_decode_str(uri_path).decode_utf8().ok()
}

/// Matches a request path against the mount prefix, returning the remaining sub-path.
///
/// The prefix has to match whole path segments, ASCII case-insensitively: prefix `/static`
/// matches `/static` and `/Static/file.txt` but not `/staticfile.txt`. The sub-path keeps its
/// leading slash, it is empty if the request path is identical to the prefix. An empty prefix
/// (or `/`) matches every path.
pub fn match_prefix<'a>(request_path: &'a str, prefix: &str) -> Option<&'a str> {
    let prefix = prefix.strip_suffix('/').unwrap_or(prefix);
    if prefix.is_empty() {
        return Some(request_path);
    }

    if request_path.len() < prefix.len()
        || !request_path.is_char_boundary(prefix.len())
        || !request_path[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        return None;
    }

    let rest = &request_path[prefix.len()..];
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// Resolves an already decoded sub-path against the path to a root directory.
///
/// This will return an error under the following conditions:
///
/// * Invalid path, not starting with a slash (/): results in [`ErrorKind::InvalidInput`]
/// * Resolved path outside the root directory: results in [`ErrorKind::InvalidData`]
/// * [`std::fs::canonicalize()`] failed: results in [`ErrorKind::NotFound`],
///   [`ErrorKind::PermissionDenied`] and other errors
pub fn resolve_sub_path(sub_path: &str, root: &Path) -> Result<PathBuf, Error> {
    let sub_path = sub_path.strip_prefix('/').ok_or(ErrorKind::InvalidInput)?;

    let mut path = root.to_path_buf();
    for component in sub_path.split('/') {
        path.push(component);
    }

    let path = path.canonicalize()?;

    if path.starts_with(root) {
        Ok(path)
    } else {
        Err(ErrorKind::InvalidData.into())
    }
}
