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

//! Per-request state, built stage by stage from the request and file metadata

use http::Method;
use std::time::SystemTime;

use crate::conditions::RequestConditions;
use crate::etag::EntityTag;
use crate::metadata::FileMetadata;
use crate::path::{decode_path, match_prefix};
use crate::precondition::{PreconditionState, PreconditionStates};
use crate::provider::{ContentTypeProvider, FileProvider};
use crate::range::{evaluate_range, RangeState};
use crate::response::ResponseOutcome;
use crate::transport::RequestHeader;

/// Request methods that can be served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedMethod {
    /// `GET`: headers and body
    Get,
    /// `HEAD`: headers only
    Head,
}

impl ServedMethod {
    /// Maps the request method, `None` for methods other than `GET` and `HEAD`.
    pub fn from_method(method: &Method) -> Option<Self> {
        if method == Method::GET {
            Some(Self::Get)
        } else if method == Method::HEAD {
            Some(Self::Head)
        } else {
            None
        }
    }
}

/// Reason for leaving a request to the next handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    /// Request method other than `GET` or `HEAD`
    UnsupportedMethod,
    /// Request path is outside the mount prefix or cannot be decoded
    PathMismatch,
    /// Unknown file type and serving unknown file types is disabled
    UnknownContentType,
    /// The file doesn’t exist
    FileNotFound,
}

/// Settings of the validation stages
#[derive(Debug, Clone, Copy)]
pub struct ValidationSettings<'a> {
    /// Mount prefix of the handler
    pub request_path: &'a str,
    /// Whether files with unknown extensions are served
    pub serve_unknown_file_types: bool,
    /// Content type to use for unknown extensions
    pub default_content_type: Option<&'a str>,
}

/// All data collected about a request before producing the response
#[derive(Debug, Clone)]
pub struct FileContext {
    /// Request method
    pub method: ServedMethod,
    /// Decoded request path relative to the mount prefix
    pub sub_path: String,
    /// Content type of the file if known
    pub content_type: Option<String>,
    /// File metadata snapshot
    pub meta: FileMetadata,
    /// Entity tag of the file
    pub etag: EntityTag,
    /// Conditional request headers
    pub conditions: RequestConditions,
    /// Evaluation results of the precondition headers
    pub preconditions: PreconditionStates,
    /// Requested byte range
    pub range: RangeState,
}

impl FileContext {
    /// Runs the validation stages (method, path, content type, file metadata) and evaluates the
    /// conditional headers. None of the stages block on I/O other than the file metadata lookup.
    pub fn from_request(
        request: &RequestHeader,
        settings: ValidationSettings<'_>,
        file_provider: &dyn FileProvider,
        content_type_provider: &dyn ContentTypeProvider,
        now: SystemTime,
    ) -> Result<Self, DeclineReason> {
        let method =
            ServedMethod::from_method(&request.method).ok_or(DeclineReason::UnsupportedMethod)?;

        let path = decode_path(request.uri.path()).ok_or(DeclineReason::PathMismatch)?;
        let sub_path = match_prefix(&path, settings.request_path)
            .ok_or(DeclineReason::PathMismatch)?
            .to_owned();

        let content_type = match content_type_provider.content_type(&sub_path) {
            Some(content_type) => Some(content_type),
            None if settings.serve_unknown_file_types => {
                settings.default_content_type.map(str::to_owned)
            }
            None => return Err(DeclineReason::UnknownContentType),
        };

        let meta = file_provider.file_metadata(&sub_path);
        if !meta.exists() {
            return Err(DeclineReason::FileNotFound);
        }

        let etag = meta.etag();
        let conditions = RequestConditions::from_headers(&request.headers);
        let preconditions = PreconditionStates::evaluate(&conditions, &meta, &etag, now);
        let range = evaluate_range(method == ServedMethod::Get, &conditions, &meta, &etag);

        Ok(Self {
            method,
            sub_path,
            content_type,
            meta,
            etag,
            conditions,
            preconditions,
            range,
        })
    }

    /// The final precondition decision
    pub fn precondition_state(&self) -> PreconditionState {
        self.preconditions.reduce()
    }

    /// Decides how the request should be answered.
    pub fn outcome(&self) -> ResponseOutcome {
        match self.precondition_state() {
            PreconditionState::Unspecified | PreconditionState::ShouldProcess => {
                match (self.method, self.range) {
                    (ServedMethod::Head, _) | (ServedMethod::Get, RangeState::Full) => {
                        ResponseOutcome::Ok
                    }
                    (ServedMethod::Get, RangeState::Satisfiable(_)) => {
                        ResponseOutcome::PartialContent
                    }
                    (ServedMethod::Get, RangeState::Unsatisfiable) => {
                        ResponseOutcome::RangeNotSatisfiable
                    }
                }
            }
            PreconditionState::NotModified => ResponseOutcome::NotModified,
            PreconditionState::PreconditionFailed => ResponseOutcome::PreconditionFailed,
        }
    }

    /// Byte window to be sent as response body for the given outcome: offset and length
    pub fn body_window(&self, outcome: ResponseOutcome) -> Option<(u64, u64)> {
        if self.method != ServedMethod::Get {
            return None;
        }

        match (outcome, self.range) {
            (ResponseOutcome::Ok, _) => Some((0, self.meta.length())),
            (ResponseOutcome::PartialContent, RangeState::Satisfiable(range)) => {
                Some((range.start, range.length))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use http::Request;
    use std::io;
    use std::time::{Duration, UNIX_EPOCH};
    use test_log::test;

    use crate::provider::{FileExtensionContentTypeProvider, FileSource};
    use crate::range::NormalizedRange;

    const MODIFIED: u64 = 1_431_704_061;

    #[derive(Debug)]
    struct StaticProvider;

    #[async_trait]
    impl FileProvider for StaticProvider {
        fn file_metadata(&self, sub_path: &str) -> FileMetadata {
            if sub_path == "/file.txt" || sub_path == "/file.unknownext" {
                FileMetadata::new(500, UNIX_EPOCH + Duration::from_secs(MODIFIED))
            } else {
                FileMetadata::not_found()
            }
        }

        async fn open(&self, _sub_path: &str) -> io::Result<Box<dyn FileSource>> {
            Err(io::ErrorKind::Unsupported.into())
        }
    }

    fn settings() -> ValidationSettings<'static> {
        ValidationSettings {
            request_path: "/static",
            serve_unknown_file_types: false,
            default_content_type: None,
        }
    }

    fn context(
        request: Request<()>,
        settings: ValidationSettings<'_>,
    ) -> Result<FileContext, DeclineReason> {
        let (request, _) = request.into_parts();
        FileContext::from_request(
            &request,
            settings,
            &StaticProvider,
            &FileExtensionContentTypeProvider::default(),
            UNIX_EPOCH + Duration::from_secs(MODIFIED + 1000),
        )
    }

    fn request(method: &str, path: &str) -> http::request::Builder {
        Request::builder().method(method).uri(path)
    }

    #[test]
    fn declines() {
        assert_eq!(
            context(request("POST", "/static/file.txt").body(()).unwrap(), settings()).err(),
            Some(DeclineReason::UnsupportedMethod)
        );
        assert_eq!(
            context(request("GET", "/other/file.txt").body(()).unwrap(), settings()).err(),
            Some(DeclineReason::PathMismatch)
        );
        assert_eq!(
            context(request("GET", "/static/%FF.txt").body(()).unwrap(), settings()).err(),
            Some(DeclineReason::PathMismatch)
        );
        assert_eq!(
            context(
                request("GET", "/static/file.unknownext").body(()).unwrap(),
                settings()
            )
            .err(),
            Some(DeclineReason::UnknownContentType)
        );
        assert_eq!(
            context(request("GET", "/static/missing.txt").body(()).unwrap(), settings()).err(),
            Some(DeclineReason::FileNotFound)
        );
    }

    #[test]
    fn unknown_file_types() {
        let mut settings = settings();
        settings.serve_unknown_file_types = true;

        let ctx = context(
            request("GET", "/static/file.unknownext").body(()).unwrap(),
            settings,
        )
        .unwrap();
        assert_eq!(ctx.content_type, None);

        settings.default_content_type = Some("application/octet-stream");
        let ctx = context(
            request("GET", "/static/file.unknownext").body(()).unwrap(),
            settings,
        )
        .unwrap();
        assert_eq!(ctx.content_type.as_deref(), Some("application/octet-stream"));
    }

    #[test]
    fn outcomes() {
        let plain = request("GET", "/static/file.txt").body(()).unwrap();
        let ctx = context(plain, settings()).unwrap();
        assert_eq!(ctx.sub_path, "/file.txt");
        assert_eq!(ctx.content_type.as_deref(), Some("text/plain"));
        assert_eq!(ctx.outcome(), ResponseOutcome::Ok);
        assert_eq!(ctx.body_window(ResponseOutcome::Ok), Some((0, 500)));

        let ctx = context(
            request("GET", "/static/file%2Etxt")
                .header("Range", "bytes=0-99")
                .body(())
                .unwrap(),
            settings(),
        )
        .unwrap();
        assert_eq!(
            ctx.range,
            RangeState::Satisfiable(NormalizedRange {
                start: 0,
                length: 100
            })
        );
        assert_eq!(ctx.outcome(), ResponseOutcome::PartialContent);
        assert_eq!(
            ctx.body_window(ResponseOutcome::PartialContent),
            Some((0, 100))
        );

        let ctx = context(
            request("GET", "/static/file.txt")
                .header("Range", "bytes=1000-2000")
                .body(())
                .unwrap(),
            settings(),
        )
        .unwrap();
        assert_eq!(ctx.outcome(), ResponseOutcome::RangeNotSatisfiable);
        assert_eq!(ctx.body_window(ResponseOutcome::RangeNotSatisfiable), None);

        let ctx = context(
            request("HEAD", "/static/file.txt")
                .header("Range", "bytes=1000-2000")
                .body(())
                .unwrap(),
            settings(),
        )
        .unwrap();
        assert_eq!(ctx.outcome(), ResponseOutcome::Ok);
        assert_eq!(ctx.body_window(ResponseOutcome::Ok), None);
    }

    #[test]
    fn precondition_outcomes() {
        let etag = FileMetadata::new(500, UNIX_EPOCH + Duration::from_secs(MODIFIED))
            .etag()
            .to_string();

        let ctx = context(
            request("HEAD", "/static/file.txt")
                .header("If-None-Match", etag.as_str())
                .body(())
                .unwrap(),
            settings(),
        )
        .unwrap();
        assert_eq!(ctx.outcome(), ResponseOutcome::NotModified);
        assert_eq!(ctx.body_window(ResponseOutcome::NotModified), None);

        let ctx = context(
            request("GET", "/static/file.txt")
                .header("If-Match", "\"nonmatching\"")
                .header("If-None-Match", etag.as_str())
                .header("Range", "bytes=0-10")
                .body(())
                .unwrap(),
            settings(),
        )
        .unwrap();
        assert_eq!(ctx.outcome(), ResponseOutcome::PreconditionFailed);
    }
}
