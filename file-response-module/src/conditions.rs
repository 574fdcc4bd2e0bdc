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

//! Collecting conditional request headers

use http::header::{self, HeaderMap, HeaderName};
use httpdate::parse_http_date;
use std::time::SystemTime;

use crate::etag::{EntityTag, EntityTagCondition};

/// A single byte range as requested via the `Range` header, not resolved against the file size yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRangeSpec {
    /// `start-end`, both bounds inclusive
    FromTo(u64, u64),
    /// `start-`, everything starting with the given offset
    From(u64),
    /// `-length`, the given number of bytes at the end of the file
    Suffix(u64),
}

impl ByteRangeSpec {
    /// Parses the value of a `Range` HTTP header containing exactly one range. Unsupported units,
    /// multiple ranges and syntax errors (including `start` being larger than `end`) result in
    /// `None`.
    pub fn parse(range: &str) -> Option<Self> {
        let (units, range) = range.trim().split_once('=')?;
        if !units.trim_end().eq_ignore_ascii_case("bytes") {
            return None;
        }

        let (start, end) = range.trim().split_once('-')?;
        let (start, end) = (start.trim(), end.trim());
        if start.is_empty() {
            Some(Self::Suffix(parse_number(end)?))
        } else if end.is_empty() {
            Some(Self::From(parse_number(start)?))
        } else {
            let (start, end) = (parse_number(start)?, parse_number(end)?);
            if start > end {
                return None;
            }
            Some(Self::FromTo(start, end))
        }
    }
}

fn parse_number(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// Classification of the `Range` request header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpecifier {
    /// Exactly one syntactically valid byte range
    Single(ByteRangeSpec),
    /// Multiple ranges requested, either via multiple headers or a comma-separated list
    Multiple,
    /// The header value could not be parsed
    Malformed,
}

/// Value of the `If-Range` request header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IfRange {
    /// An HTTP date
    Date(SystemTime),
    /// An entity tag
    Tag(EntityTag),
    /// Neither a date nor an entity tag
    Invalid,
}

impl IfRange {
    /// Parses the value of an `If-Range` header.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.starts_with('"') || value.starts_with("W/") {
            EntityTag::parse(value).map_or(Self::Invalid, Self::Tag)
        } else {
            parse_http_date(value).map_or(Self::Invalid, Self::Date)
        }
    }
}

/// Conditional request headers relevant for serving a file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestConditions {
    /// Entries of all `If-Match` headers, empty if the header is absent or has no valid entries
    pub if_match: Vec<EntityTagCondition>,
    /// Entries of all `If-None-Match` headers, empty if the header is absent or has no valid
    /// entries
    pub if_none_match: Vec<EntityTagCondition>,
    /// Parsed `If-Modified-Since` header
    pub if_modified_since: Option<SystemTime>,
    /// Parsed `If-Unmodified-Since` header
    pub if_unmodified_since: Option<SystemTime>,
    /// Parsed `If-Range` header
    pub if_range: Option<IfRange>,
    /// Classified `Range` header
    pub range: Option<RangeSpecifier>,
}

impl RequestConditions {
    /// Collects the conditions from request headers. Values that cannot be parsed are treated like
    /// absent headers, with the exception of `Range` and `If-Range` which keep track of their
    /// parsing failures.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            if_match: tag_list(headers, &header::IF_MATCH),
            if_none_match: tag_list(headers, &header::IF_NONE_MATCH),
            if_modified_since: date(headers, &header::IF_MODIFIED_SINCE),
            if_unmodified_since: date(headers, &header::IF_UNMODIFIED_SINCE),
            if_range: headers
                .get(header::IF_RANGE)
                .map(|value| value.to_str().map_or(IfRange::Invalid, IfRange::parse)),
            range: range(headers),
        }
    }
}

fn tag_list(headers: &HeaderMap, name: &HeaderName) -> Vec<EntityTagCondition> {
    let mut result = Vec::new();
    for value in headers.get_all(name) {
        if let Ok(value) = value.to_str() {
            EntityTagCondition::parse_list(value, &mut result);
        }
    }
    result
}

fn date(headers: &HeaderMap, name: &HeaderName) -> Option<SystemTime> {
    let value = headers.get(name)?.to_str().ok()?;
    parse_http_date(value.trim()).ok()
}

fn range(headers: &HeaderMap) -> Option<RangeSpecifier> {
    let mut values = headers.get_all(header::RANGE).iter();
    let value = values.next()?;
    if values.next().is_some() {
        return Some(RangeSpecifier::Multiple);
    }

    let Ok(value) = value.to_str() else {
        return Some(RangeSpecifier::Malformed);
    };

    if value.contains(',') {
        Some(RangeSpecifier::Multiple)
    } else {
        Some(
            ByteRangeSpec::parse(value)
                .map_or(RangeSpecifier::Malformed, RangeSpecifier::Single),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use http::HeaderValue;
    use std::time::{Duration, UNIX_EPOCH};
    use test_log::test;

    fn headers(list: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in list {
            headers.append(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_static(*value),
            );
        }
        headers
    }

    #[test]
    fn range_spec() {
        assert_eq!(
            ByteRangeSpec::parse("bytes=0-499"),
            Some(ByteRangeSpec::FromTo(0, 499))
        );
        assert_eq!(
            ByteRangeSpec::parse("Bytes = 10 - 20"),
            Some(ByteRangeSpec::FromTo(10, 20))
        );
        assert_eq!(
            ByteRangeSpec::parse("bytes=500-"),
            Some(ByteRangeSpec::From(500))
        );
        assert_eq!(
            ByteRangeSpec::parse("bytes=-10"),
            Some(ByteRangeSpec::Suffix(10))
        );
        assert_eq!(ByteRangeSpec::parse("eur=0-499"), None);
        assert_eq!(ByteRangeSpec::parse("bytes=23-22"), None);
        assert_eq!(ByteRangeSpec::parse("bytes=-"), None);
        assert_eq!(ByteRangeSpec::parse("bytes=+1-2"), None);
        assert_eq!(ByteRangeSpec::parse("bytes=a-b"), None);
        assert_eq!(ByteRangeSpec::parse("bytes 0-1"), None);
    }

    #[test]
    fn range_header() {
        assert_eq!(RequestConditions::from_headers(&headers(&[])).range, None);
        assert_eq!(
            RequestConditions::from_headers(&headers(&[("Range", "bytes=0-10")])).range,
            Some(RangeSpecifier::Single(ByteRangeSpec::FromTo(0, 10)))
        );
        assert_eq!(
            RequestConditions::from_headers(&headers(&[("Range", "bytes=0-10,20-30")])).range,
            Some(RangeSpecifier::Multiple)
        );
        assert_eq!(
            RequestConditions::from_headers(&headers(&[
                ("Range", "bytes=0-10"),
                ("Range", "bytes=20-30")
            ]))
            .range,
            Some(RangeSpecifier::Multiple)
        );
        assert_eq!(
            RequestConditions::from_headers(&headers(&[("Range", "bytes=x")])).range,
            Some(RangeSpecifier::Malformed)
        );
    }

    #[test]
    fn if_range() {
        assert_eq!(
            IfRange::parse("\"abc\""),
            IfRange::Tag(EntityTag::strong("abc"))
        );
        assert_eq!(
            IfRange::parse("W/\"abc\""),
            IfRange::Tag(EntityTag::weak("abc"))
        );
        assert_eq!(
            IfRange::parse("Fri, 15 May 2015 15:34:21 GMT"),
            IfRange::Date(UNIX_EPOCH + Duration::from_secs(1_431_704_061))
        );
        assert_eq!(IfRange::parse("bogus"), IfRange::Invalid);
        assert_eq!(IfRange::parse("\"unterminated"), IfRange::Invalid);
    }

    #[test]
    fn preconditions() {
        let conditions = RequestConditions::from_headers(&headers(&[
            ("If-Match", "\"a\", \"b\""),
            ("If-Match", "*"),
            ("If-None-Match", "W/\"c\""),
            ("If-Modified-Since", "Fri, 15 May 2015 15:34:21 GMT"),
            ("If-Unmodified-Since", "not a date"),
        ]));

        assert_eq!(
            conditions.if_match,
            vec![
                EntityTagCondition::Tag(EntityTag::strong("a")),
                EntityTagCondition::Tag(EntityTag::strong("b")),
                EntityTagCondition::Any,
            ]
        );
        assert_eq!(
            conditions.if_none_match,
            vec![EntityTagCondition::Tag(EntityTag::weak("c"))]
        );
        assert_eq!(
            conditions.if_modified_since,
            Some(UNIX_EPOCH + Duration::from_secs(1_431_704_061))
        );
        assert_eq!(conditions.if_unmodified_since, None);
        assert_eq!(conditions.if_range, None);
    }
}
