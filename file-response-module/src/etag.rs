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

//! Entity tags (`ETag` HTTP header and the values of `If-Match`, `If-None-Match`, `If-Range`)

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// An entity tag as sent in the `ETag` header or received in conditional request headers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityTag {
    weak: bool,
    opaque: String,
}

impl EntityTag {
    /// Creates a strong entity tag from its opaque value (without quotes).
    pub fn strong(opaque: impl Into<String>) -> Self {
        Self {
            weak: false,
            opaque: opaque.into(),
        }
    }

    /// Creates a weak entity tag from its opaque value (without quotes).
    pub fn weak(opaque: impl Into<String>) -> Self {
        Self {
            weak: true,
            opaque: opaque.into(),
        }
    }

    /// Derives the entity tag of a file from its size and last modified time. The time is expected
    /// to be truncated to whole seconds already.
    ///
    /// The seconds since Unix epoch are combined with the file size via XOR and rendered as a
    /// quoted hexadecimal number. Times before the epoch are treated as the epoch itself.
    pub fn compute(length: u64, last_modified: SystemTime) -> Self {
        let secs = last_modified
            .duration_since(UNIX_EPOCH)
            .map_or(0, |duration| duration.as_secs());
        Self::strong(format!("{:x}", secs ^ length))
    }

    /// Parses a single entity tag like `"abc"` or `W/"abc"`. Surrounding whitespace is ignored.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let (weak, quoted) = match value.strip_prefix("W/") {
            Some(quoted) => (true, quoted),
            None => (false, value),
        };

        let opaque = quoted.strip_prefix('"')?.strip_suffix('"')?;
        if opaque.contains('"') {
            return None;
        }

        Some(Self {
            weak,
            opaque: opaque.to_owned(),
        })
    }

    /// Whether this is a weak entity tag
    pub fn is_weak(&self) -> bool {
        self.weak
    }

    /// The opaque value of the tag without quotes
    pub fn opaque(&self) -> &str {
        &self.opaque
    }

    /// Strong comparison: both tags have to be strong and their opaque values identical.
    pub fn strong_eq(&self, other: &Self) -> bool {
        !self.weak && !other.weak && self.opaque == other.opaque
    }
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.weak {
            write!(f, "W/\"{}\"", self.opaque)
        } else {
            write!(f, "\"{}\"", self.opaque)
        }
    }
}

/// One entry of an `If-Match` or `If-None-Match` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityTagCondition {
    /// The wildcard `*` matching any entity tag
    Any,
    /// A specific entity tag
    Tag(EntityTag),
}

impl EntityTagCondition {
    /// Checks whether the condition matches the current entity tag of the file. Uses strong
    /// comparison.
    pub fn matches(&self, etag: &EntityTag) -> bool {
        match self {
            Self::Any => true,
            Self::Tag(tag) => tag.strong_eq(etag),
        }
    }

    /// Parses a comma-separated list of entity tags. Entries that cannot be parsed are skipped.
    pub(crate) fn parse_list(value: &str, result: &mut Vec<Self>) {
        // Entity tags cannot contain commas, so splitting is safe for valid values.
        for entry in value.split(',').map(str::trim) {
            if entry.is_empty() {
                continue;
            }

            if entry == "*" {
                result.push(Self::Any);
            } else if let Some(tag) = EntityTag::parse(entry) {
                result.push(Self::Tag(tag));
            }
        }
    }
}
