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

//! Byte range processing (`Range` and `If-Range` HTTP headers)

use log::debug;

use crate::conditions::{ByteRangeSpec, IfRange, RangeSpecifier, RequestConditions};
use crate::etag::EntityTag;
use crate::metadata::FileMetadata;

/// A byte range resolved against the file size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedRange {
    /// Offset of the first byte
    pub start: u64,
    /// Number of bytes, never zero
    pub length: u64,
}

impl NormalizedRange {
    /// Offset of the last byte (inclusive)
    pub fn end(&self) -> u64 {
        self.start + self.length - 1
    }
}

/// Result of evaluating the `Range` header for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeState {
    /// No range requested, or the range has to be ignored. The entire file should be produced.
    Full,
    /// A single range can be produced
    Satisfiable(NormalizedRange),
    /// The requested range has no overlap with the file
    Unsatisfiable,
}

impl ByteRangeSpec {
    /// Resolves the range against the file size. Returns `None` if the range is unsatisfiable.
    pub fn normalize(&self, file_size: u64) -> Option<NormalizedRange> {
        if file_size == 0 {
            return None;
        }

        let (start, end) = match *self {
            Self::FromTo(start, end) => (start, end.min(file_size - 1)),
            Self::From(start) => (start, file_size - 1),
            Self::Suffix(0) => return None,
            Self::Suffix(len) => (file_size.saturating_sub(len), file_size - 1),
        };

        if start >= file_size || start > end {
            None
        } else {
            Some(NormalizedRange {
                start,
                length: end - start + 1,
            })
        }
    }
}

/// Checks the `If-Range` header. Returns `true` if the `Range` header should be honored.
fn if_range_holds(if_range: Option<&IfRange>, meta: &FileMetadata, etag: &EntityTag) -> bool {
    match if_range {
        None => true,
        Some(IfRange::Date(date)) => *date >= meta.last_modified(),
        Some(IfRange::Tag(tag)) => tag.strong_eq(etag),
        Some(IfRange::Invalid) => false,
    }
}

/// Processes the `Range` and `If-Range` request headers to determine which part of the file should
/// be produced.
///
/// Only `GET` requests can produce partial content, for `HEAD` requests this always returns
/// [`RangeState::Full`]. The same goes for requests with multiple ranges or ranges that cannot be
/// parsed, as well as ranges overruled by the `If-Range` header.
pub fn evaluate_range(
    is_get: bool,
    conditions: &RequestConditions,
    meta: &FileMetadata,
    etag: &EntityTag,
) -> RangeState {
    if !is_get {
        return RangeState::Full;
    }

    let spec = match conditions.range {
        None => return RangeState::Full,
        Some(RangeSpecifier::Multiple) => {
            debug!("multiple ranges requested, ignoring Range header");
            return RangeState::Full;
        }
        Some(RangeSpecifier::Malformed) => {
            debug!("failed parsing Range header, ignoring it");
            return RangeState::Full;
        }
        Some(RangeSpecifier::Single(spec)) => spec,
    };

    if !if_range_holds(conditions.if_range.as_ref(), meta, etag) {
        debug!("If-Range condition doesn’t match, ignoring Range header");
        return RangeState::Full;
    }

    match spec.normalize(meta.length()) {
        Some(range) => RangeState::Satisfiable(range),
        None => RangeState::Unsatisfiable,
    }
}
