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

//! Writing files to the response transport.

use bytes::BytesMut;
use log::{debug, error};
use std::cmp::min;
use std::io::SeekFrom;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, ErrorType};
use crate::provider::FileSource;
use crate::transport::ResponseTransport;

const BUFFER_SIZE: usize = 64 * 1024;

/// Copies `length` bytes of a file starting at `start` to the response body.
///
/// Cancellation ends the transfer early and isn’t considered an error. The file is consumed and
/// closed on every exit path.
pub(crate) async fn copy_file_range<T>(
    transport: &mut T,
    mut file: Box<dyn FileSource>,
    start: u64,
    length: u64,
    cancel: &CancellationToken,
) -> Result<(), Box<Error>>
where
    T: ResponseTransport + ?Sized,
{
    if start != 0 {
        file.seek(SeekFrom::Start(start)).await.map_err(|err| {
            error!("failed seeking in file: {err}");
            Error::because(ErrorType::FileReadError, "failed seeking in file", err)
        })?;
    }

    let mut remaining = length;
    while remaining > 0 {
        let chunk_size =
            usize::try_from(remaining).map_or(BUFFER_SIZE, |len| min(len, BUFFER_SIZE));
        let mut buf = BytesMut::zeroed(chunk_size);

        let len = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("file transfer cancelled with {remaining} bytes left");
                return Ok(());
            }
            result = file.read(buf.as_mut()) => result.map_err(|err| {
                error!("failed reading data from file: {err}");
                Error::because(ErrorType::FileReadError, "failed reading data from file", err)
            })?,
        };

        if len == 0 {
            error!("file ended with {remaining} bytes left to be written");
            return Err(Error::explain(
                ErrorType::FileReadError,
                "file shorter than expected",
            ));
        }

        buf.truncate(len);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("file transfer cancelled with {remaining} bytes left");
                return Ok(());
            }
            result = transport.write_response_body(buf.freeze()) => result?,
        }

        // `len` never exceeds `remaining`, the buffer is at most that large.
        remaining -= len as u64;
    }

    Ok(())
}
