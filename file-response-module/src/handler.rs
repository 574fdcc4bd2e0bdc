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

//! Handler producing file responses

use log::{debug, info, warn};
use std::fmt;
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::SystemTime;
use tokio_util::sync::CancellationToken;

use crate::configuration::FileResponseConf;
use crate::context::{DeclineReason, FileContext, ValidationSettings};
use crate::error::{Error, ErrorType};
use crate::file_writer::copy_file_range;
use crate::provider::{
    ContentTypeProvider, FileExtensionContentTypeProvider, FileProvider, PhysicalFileProvider,
};
use crate::range::RangeState;
use crate::response::{HeaderBuilder, PrepareResponse, PrepareResponseContext, ResponseOutcome};
use crate::transport::{RequestHeader, ResponseTransport};

/// Handler answering `GET` and `HEAD` requests with the contents of files
pub struct FileResponseHandler {
    conf: FileResponseConf,
    file_provider: Option<Arc<dyn FileProvider>>,
    content_type_provider: Arc<dyn ContentTypeProvider>,
    prepare_response: Option<Arc<PrepareResponse>>,
}

impl fmt::Debug for FileResponseHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileResponseHandler")
            .field("conf", &self.conf)
            .field("file_provider", &self.file_provider)
            .field("content_type_provider", &self.content_type_provider)
            .field("prepare_response", &self.prepare_response.is_some())
            .finish()
    }
}

impl FileResponseHandler {
    /// Creates a new handler with given configuration. This will canonicalize the path to the root
    /// directory and might result in an error if that path isn’t accessible.
    ///
    /// Without a root directory the handler declines all requests unless a file provider is set
    /// via [`FileResponseHandler::with_file_provider`].
    pub fn new(mut conf: FileResponseConf) -> Result<Self, Box<Error>> {
        let mut file_provider: Option<Arc<dyn FileProvider>> = None;
        if let Some(root) = &conf.root {
            let root = root.canonicalize().map_err(|err| {
                Error::because(
                    ErrorType::ConfigError,
                    format!("Failed accessing root path {root:?}"),
                    err,
                )
            })?;
            file_provider = Some(Arc::new(PhysicalFileProvider::new(root.clone())));
            conf.root = Some(root);
        }

        let content_type_provider = Arc::new(FileExtensionContentTypeProvider::new(
            &conf.content_types,
        ));

        debug!("Initialized file response handler, settings: {conf:#?}");
        Ok(Self {
            conf,
            file_provider,
            content_type_provider,
            prepare_response: None,
        })
    }

    /// Provides read-only access to the handler’s configuration.
    pub fn conf(&self) -> &FileResponseConf {
        &self.conf
    }

    /// Replaces the file provider, e.g. to serve files that aren’t stored on disk.
    pub fn with_file_provider(mut self, provider: impl FileProvider + 'static) -> Self {
        self.file_provider = Some(Arc::new(provider));
        self
    }

    /// Replaces the content type provider.
    pub fn with_content_type_provider(
        mut self,
        provider: impl ContentTypeProvider + 'static,
    ) -> Self {
        self.content_type_provider = Arc::new(provider);
        self
    }

    /// Sets a hook that can modify every response header right before it is written, e.g. to add
    /// caching headers.
    pub fn with_prepare_response(
        mut self,
        hook: impl Fn(&mut PrepareResponseContext<'_>) + Send + Sync + 'static,
    ) -> Self {
        self.prepare_response = Some(Arc::new(hook));
        self
    }

    /// Handles the current request. [`ResponseOutcome::Decline`] means that nothing has been
    /// written to the transport and the request should be passed on to the next handler. Errors
    /// are only returned for failures opening or reading the file and writing to the transport.
    ///
    /// Triggering `cancel` ends the body transfer early, this isn’t considered an error.
    pub async fn handle<T>(
        &self,
        request: &RequestHeader,
        transport: &mut T,
        cancel: &CancellationToken,
    ) -> Result<ResponseOutcome, Box<Error>>
    where
        T: ResponseTransport + ?Sized,
    {
        self.handle_at(request, transport, cancel, SystemTime::now())
            .await
    }

    /// Same as [`FileResponseHandler::handle`] but evaluates date conditions relative to `now`
    /// rather than the current time.
    pub async fn handle_at<T>(
        &self,
        request: &RequestHeader,
        transport: &mut T,
        cancel: &CancellationToken,
        now: SystemTime,
    ) -> Result<ResponseOutcome, Box<Error>>
    where
        T: ResponseTransport + ?Sized,
    {
        let Some(file_provider) = self.file_provider.as_deref() else {
            debug!("no root directory configured, declining request");
            return Ok(ResponseOutcome::Decline);
        };

        debug!("received URI path {}", request.uri.path());

        let settings = ValidationSettings {
            request_path: &self.conf.request_path,
            serve_unknown_file_types: self.conf.serve_unknown_file_types,
            default_content_type: self.conf.default_content_type.as_deref(),
        };
        let ctx = match FileContext::from_request(
            request,
            settings,
            file_provider,
            self.content_type_provider.as_ref(),
            now,
        ) {
            Ok(ctx) => ctx,
            Err(reason) => {
                match reason {
                    DeclineReason::UnsupportedMethod => {
                        info!("declining method {}", request.method);
                    }
                    DeclineReason::PathMismatch => {
                        info!("path {} doesn’t match request path", request.uri.path());
                    }
                    DeclineReason::UnknownContentType => {
                        info!("unknown content type for path {}", request.uri.path());
                    }
                    DeclineReason::FileNotFound => {
                        info!("no file found for path {}", request.uri.path());
                    }
                }
                return Ok(ResponseOutcome::Decline);
            }
        };

        let outcome = ctx.outcome();
        let Some(status) = outcome.status() else {
            return Ok(outcome);
        };
        debug!(
            "preconditions evaluated to {:?}, range to {:?}",
            ctx.precondition_state(),
            ctx.range
        );

        let window = ctx
            .body_window(outcome)
            .filter(|(_, length)| *length > 0);
        let physical_path = ctx.meta.physical_path();
        let use_send_file =
            window.is_some() && physical_path.is_some() && transport.send_file().is_some();

        // Opening the file before writing anything allows declining if it disappeared meanwhile.
        let source = match window {
            Some(_) if !use_send_file => match file_provider.open(&ctx.sub_path).await {
                Ok(source) => Some(source),
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    warn!("file {} disappeared before it could be opened", ctx.sub_path);
                    return Ok(ResponseOutcome::Decline);
                }
                Err(err) => {
                    warn!("failed opening file {}: {err}", ctx.sub_path);
                    return Err(Error::because(
                        ErrorType::FileOpenError,
                        "failed opening file",
                        err,
                    ));
                }
            },
            _ => None,
        };

        let range = match ctx.range {
            RangeState::Satisfiable(range) if outcome == ResponseOutcome::PartialContent => {
                Some(range)
            }
            _ => None,
        };
        let builder = HeaderBuilder {
            meta: &ctx.meta,
            etag: &ctx.etag,
            content_type: ctx.content_type.as_deref(),
        };
        let mut header = builder.build(status, range)?;

        if let Some(prepare_response) = &self.prepare_response {
            prepare_response(&mut PrepareResponseContext {
                request,
                response: &mut header,
                file: &ctx.meta,
            });
        }

        transport.write_response_header(Box::new(header)).await?;
        info!("responding to {} with {status}", request.uri.path());

        if let Some((start, length)) = window {
            if let Some(source) = source {
                copy_file_range(transport, source, start, length, cancel).await?;
            } else if let (Some(path), Some(send_file)) = (physical_path, transport.send_file()) {
                debug!("sending {length} bytes of {path:?} starting at {start} via sendfile");
                send_file
                    .send_file_segment(path, start, length, cancel)
                    .await?;
            }
        }

        Ok(outcome)
    }
}

impl TryFrom<FileResponseConf> for FileResponseHandler {
    type Error = Box<Error>;

    fn try_from(conf: FileResponseConf) -> Result<Self, Self::Error> {
        Self::new(conf)
    }
}
