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

//! # File Response Module
//!
//! This crate answers HTTP requests with the contents of a single file, taking care of conditional
//! requests and byte ranges. It is transport-agnostic: the response is written to anything
//! implementing [`ResponseTransport`], file contents come from a [`FileProvider`].
//!
//! ## Supported functionality
//!
//! * `GET` and `HEAD` requests, everything else is declined
//! * Serving files under a configurable request path prefix
//! * Content type detection via file extension, with configurable additional mappings
//! * Conditional requests via `If-Match`, `If-None-Match`, `If-Modified-Since` and
//!   `If-Unmodified-Since` HTTP headers
//! * Byte range requests via `Range` and `If-Range` HTTP headers
//! * Zero-copy data transfer (sendfile) if supported by the transport
//! * A hook to modify response headers before they are written
//!
//! ## Known limitations
//!
//! * Requests with multiple byte ranges are not supported and will result in the full file being
//!   returned.
//! * Weak entity tags never match, only strong comparison is performed.
//! * Requests that cannot be handled (unknown path, missing file, unsupported method) are declined
//!   rather than answered with an error response. It is up to the caller to produce one.
//!
//! ## Code example
//!
//! You will typically create a [`FileResponseHandler`] instance from configuration and call it for
//! each request. A [`ResponseOutcome::Decline`] result means that nothing has been written and the
//! request should be passed on.
//!
//! ```rust,no_run
//! use clap::Parser;
//! use file_response_module::{FileResponseConf, FileResponseHandler, FileResponseOpt};
//!
//! let opt = FileResponseOpt::parse();
//! let mut conf = FileResponseConf::load_from_yaml("conf.yaml").unwrap();
//! conf.merge_with_opt(opt);
//!
//! let handler = FileResponseHandler::new(conf)
//!     .unwrap()
//!     .with_prepare_response(|ctx| {
//!         ctx.response.headers_mut().insert(
//!             http::header::CACHE_CONTROL,
//!             http::HeaderValue::from_static("max-age=3600"),
//!         );
//!     });
//!
//! // Call handler.handle(&request, &mut transport, &cancel).await for each request here
//! ```
//!
//! A configuration file could look like this:
//!
//! ```yaml
//! root: /var/www/html
//! request_path: /static
//! serve_unknown_file_types: true
//! default_content_type: application/octet-stream
//! content_types:
//!   webmanifest: application/manifest+json
//! ```

pub mod conditions;
mod configuration;
pub mod context;
pub mod error;
pub mod etag;
mod file_writer;
mod handler;
pub mod metadata;
pub mod path;
pub mod precondition;
pub mod provider;
pub mod range;
pub mod response;
pub mod transport;

pub use configuration::{FileResponseConf, FileResponseOpt};
pub use error::{Error, ErrorType};
pub use handler::FileResponseHandler;
pub use metadata::FileMetadata;
pub use provider::{
    ContentTypeProvider, FileExtensionContentTypeProvider, FileProvider, FileSource,
    PhysicalFileProvider,
};
pub use response::{PrepareResponse, PrepareResponseContext, ResponseOutcome};
pub use transport::{RequestHeader, ResponseHeader, ResponseTransport, SendFile};
