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

//! Abstraction of the connection the response is written to

use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use tokio_util::sync::CancellationToken;

use crate::error::Error;

/// Request header type consumed by the handler
pub type RequestHeader = http::request::Parts;

/// Response header type produced by the handler. The body is always empty, it is written
/// separately via [`ResponseTransport::write_response_body`].
pub type ResponseHeader = http::Response<()>;

/// Writes responses to the client
///
/// The response header is always written completely before any body data.
#[async_trait]
pub trait ResponseTransport: Send {
    /// Writes status code and headers of the response.
    async fn write_response_header(&mut self, header: Box<ResponseHeader>)
        -> Result<(), Box<Error>>;

    /// Writes a chunk of the response body.
    async fn write_response_body(&mut self, data: Bytes) -> Result<(), Box<Error>>;

    /// Zero-copy transfer capability, `None` if the transport doesn’t support it.
    fn send_file(&mut self) -> Option<&mut dyn SendFile> {
        None
    }
}

/// Transfers a file segment to the client without passing it through application buffers
#[async_trait]
pub trait SendFile: Send {
    /// Sends `length` bytes of the file at `path` starting with `offset`. When `cancel` is
    /// triggered the transfer should stop early without producing an error.
    async fn send_file_segment(
        &mut self,
        path: &Path,
        offset: u64,
        length: u64,
        cancel: &CancellationToken,
    ) -> Result<(), Box<Error>>;
}
