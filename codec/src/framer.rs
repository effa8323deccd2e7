//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Delimiter framer
//!
//! Frames are cut out of the byte stream by scanning for literal multi-byte delimiters. Nothing
//! is escaped and nothing is length-prefixed, so the scan is deliberately naive:
//!
//! 1. Read one byte and append it.
//! 2. If it equals the delimiter's first byte, read the next `len - 1` bytes and append them.
//! 3. If those bytes equal the rest of the delimiter, the segment is complete. Otherwise keep
//!    reading from step 1; the speculatively read bytes stay in the segment and are never
//!    rescanned for a delimiter start.
//!
//! Two consequences devices have to live with:
//!
//! - A payload containing the delimiter terminates the segment early.
//! - A delimiter that starts inside a speculative window is missed, e.g. `@x@@@y@@@` is read as
//!   one segment ending at the second `@@@` because the first real `@@@` began on a byte that
//!   was consumed speculatively.
//! - A segment has no size limit. A peer that never sends the delimiter grows it until the
//!   connection ends, so deployments facing untrusted networks should bound connections at a
//!   lower layer.

use crate::CodecResult;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Read up to and including the first match of `delimiter`.
///
/// Any I/O failure is returned immediately, including end of stream
/// ([`std::io::ErrorKind::UnexpectedEof`]). Bytes consumed by a failed call are lost.
pub async fn read_delimited<R>(reader: &mut R, delimiter: &[u8]) -> CodecResult<Vec<u8>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let Some((first, rest)) = delimiter.split_first() else {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty delimiter").into());
    };

    let mut segment = Vec::new();
    let mut window = vec![0u8; rest.len()];
    loop {
        let byte = reader.read_u8().await?;
        segment.push(byte);
        if byte != *first {
            continue;
        }

        reader.read_exact(&mut window).await?;
        segment.extend_from_slice(&window);
        if window == rest {
            return Ok(segment);
        }
    }
}
