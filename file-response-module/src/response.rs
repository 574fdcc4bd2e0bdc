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

//! Response outcomes and header assembly

use http::{header, status::StatusCode, HeaderValue};
use std::fmt;

use crate::error::{Error, ErrorType};
use crate::etag::EntityTag;
use crate::metadata::FileMetadata;
use crate::range::NormalizedRange;
use crate::transport::{RequestHeader, ResponseHeader};

/// Terminal decision on how a request is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// Request wasn’t handled, the next handler should process it
    Decline,
    /// `200 OK`
    Ok,
    /// `206 Partial Content`
    PartialContent,
    /// `304 Not Modified`
    NotModified,
    /// `412 Precondition Failed`
    PreconditionFailed,
    /// `416 Range Not Satisfiable`
    RangeNotSatisfiable,
}

impl ResponseOutcome {
    /// Status code of the response, `None` for [`ResponseOutcome::Decline`]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Decline => None,
            Self::Ok => Some(StatusCode::OK),
            Self::PartialContent => Some(StatusCode::PARTIAL_CONTENT),
            Self::NotModified => Some(StatusCode::NOT_MODIFIED),
            Self::PreconditionFailed => Some(StatusCode::PRECONDITION_FAILED),
            Self::RangeNotSatisfiable => Some(StatusCode::RANGE_NOT_SATISFIABLE),
        }
    }
}

/// Data passed to the response preparation hook
pub struct PrepareResponseContext<'a> {
    /// The request being answered
    pub request: &'a RequestHeader,
    /// Response header about to be written, can be modified
    pub response: &'a mut ResponseHeader,
    /// Metadata of the file being served
    pub file: &'a FileMetadata,
}

impl fmt::Debug for PrepareResponseContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrepareResponseContext")
            .field("uri", &self.request.uri)
            .field("status", &self.response.status())
            .field("file", &self.file)
            .finish()
    }
}

/// Response preparation hook, called once for every response right before its header is written
pub type PrepareResponse = dyn Fn(&mut PrepareResponseContext<'_>) + Send + Sync;

fn header_value(value: impl AsRef<str>) -> Result<HeaderValue, Box<Error>> {
    HeaderValue::from_str(value.as_ref()).map_err(|err| {
        Error::because(ErrorType::InvalidHeader, "invalid header value", err)
    })
}

/// Produces response headers for a file
#[derive(Debug)]
pub(crate) struct HeaderBuilder<'a> {
    pub(crate) meta: &'a FileMetadata,
    pub(crate) etag: &'a EntityTag,
    pub(crate) content_type: Option<&'a str>,
}

impl HeaderBuilder<'_> {
    /// Creates the response header for the given outcome. The range is required for `206 Partial
    /// Content` responses.
    ///
    /// Successful and `304 Not Modified` responses get `Content-Type`, `Last-Modified`, `ETag` and
    /// `Accept-Ranges` headers. `Content-Length` is only set where a body or its length is known.
    pub(crate) fn build(
        &self,
        status: StatusCode,
        range: Option<NormalizedRange>,
    ) -> Result<ResponseHeader, Box<Error>> {
        let mut response = ResponseHeader::new(());
        *response.status_mut() = status;
        let headers = response.headers_mut();

        if status == StatusCode::OK {
            headers.insert(header::CONTENT_LENGTH, self.meta.length().into());
        } else if status == StatusCode::PARTIAL_CONTENT {
            if let Some(range) = range {
                headers.insert(
                    header::CONTENT_RANGE,
                    header_value(format!(
                        "bytes {}-{}/{}",
                        range.start,
                        range.end(),
                        self.meta.length()
                    ))?,
                );
                headers.insert(header::CONTENT_LENGTH, range.length.into());
            }
        } else if status == StatusCode::RANGE_NOT_SATISFIABLE {
            headers.insert(
                header::CONTENT_RANGE,
                header_value(format!("bytes */{}", self.meta.length()))?,
            );
        }

        if status.as_u16() < 400 {
            if let Some(content_type) = self.content_type {
                headers.insert(header::CONTENT_TYPE, header_value(content_type)?);
            }
            headers.insert(
                header::LAST_MODIFIED,
                header_value(self.meta.last_modified_str())?,
            );
            headers.insert(header::ETAG, header_value(self.etag.to_string())?);
            headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        }

        Ok(response)
    }
}
