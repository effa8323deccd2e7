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

//! Read pipeline: one validated message per call

use crate::consts::{BODY_DELIMITER, CHECKSUM_LEN, END_TAG, HEADER_DELIMITER};
use crate::header::validate_header_len;
use crate::{
    CodecError, CodecResult, ParsedHeader, check_code, compute_check, decode_text,
    read_delimited,
};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace};

/// A frame as read off the wire, already validated.
///
/// The header and body segments still carry their trailing delimiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Header segment including `@@@`
    pub header: Vec<u8>,
    /// Body segment including `tek`
    pub body: Vec<u8>,
    /// Transmitted checksum
    pub checksum: [u8; CHECKSUM_LEN],
    /// Transmitted end tag
    pub end_tag: [u8; 4],
}

impl RawFrame {
    /// Number of bytes this frame occupied on the wire
    pub fn wire_len(&self) -> usize {
        self.header.len() + self.body.len() + self.checksum.len() + self.end_tag.len()
    }

    /// Transcode header and body into text, dropping their delimiters
    pub fn decode(&self) -> CodecResult<NeamMessage> {
        let header = strip_delimiter(&self.header, HEADER_DELIMITER);
        let body = strip_delimiter(&self.body, BODY_DELIMITER);
        Ok(NeamMessage {
            header: decode_text(header)?.into_owned(),
            data: decode_text(body)?.into_owned(),
        })
    }
}

fn strip_delimiter<'a>(segment: &'a [u8], delimiter: &[u8]) -> &'a [u8] {
    segment.strip_suffix(delimiter).unwrap_or(segment)
}

/// A decoded message: header text and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeamMessage {
    /// Header text without its delimiter
    pub header: String,
    /// Body text without its delimiter
    pub data: String,
}

impl NeamMessage {
    /// Create a message from header and body text
    pub fn new(header: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            data: data.into(),
        }
    }

    /// Split the header into its fields
    pub fn parse_header(&self) -> CodecResult<ParsedHeader> {
        ParsedHeader::parse(&self.header)
    }
}

/// Read and validate one frame.
///
/// Each step fails fast: header segment, declared header length, body segment, checksum over
/// both segments, end tag. Nothing read by a failed call is kept; the bytes are gone from the
/// stream, so a violation can leave the next read out of step with the device.
pub async fn read_frame<R>(reader: &mut R) -> CodecResult<RawFrame>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let header = read_delimited(reader, HEADER_DELIMITER).await?;
    validate_header_len(strip_delimiter(&header, HEADER_DELIMITER))?;

    let body = read_delimited(reader, BODY_DELIMITER).await?;

    let mut checksum = [0u8; CHECKSUM_LEN];
    reader.read_exact(&mut checksum).await?;

    let mut signed = Vec::with_capacity(header.len() + body.len());
    signed.extend_from_slice(&header);
    signed.extend_from_slice(&body);
    if !check_code(&signed, &checksum) {
        return Err(CodecError::ChecksumMismatch {
            expected: compute_check(&signed),
            received: String::from_utf8_lossy(&checksum).into_owned(),
        });
    }

    let mut end_tag = [0u8; 4];
    reader.read_exact(&mut end_tag).await?;
    if end_tag != END_TAG {
        return Err(CodecError::EndTagMismatch {
            received: end_tag.to_vec(),
        });
    }

    trace!(
        bytes = header.len() + body.len() + CHECKSUM_LEN + END_TAG.len(),
        "frame validated"
    );
    Ok(RawFrame {
        header,
        body,
        checksum,
        end_tag,
    })
}

/// Read, validate and decode one message.
pub async fn read_packet<R>(reader: &mut R) -> CodecResult<NeamMessage>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let message = read_frame(reader).await?.decode()?;
    debug!(header = %message.header, data = %message.data, "message received");
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    const HEADER: &[u8] = b"bn01DEV00012024-01-01 00:00:00001e";

    fn frame(header: &[u8], body: &[u8]) -> Vec<u8> {
        let mut wire = Vec::new();
        wire.extend_from_slice(header);
        wire.extend_from_slice(HEADER_DELIMITER);
        wire.extend_from_slice(body);
        wire.extend_from_slice(BODY_DELIMITER);
        let code = compute_check(&wire);
        wire.extend_from_slice(code.as_bytes());
        wire.extend_from_slice(END_TAG);
        wire
    }

    #[tokio::test]
    #[traced_test]
    async fn test_read_packet() {
        let wire = frame(HEADER, b"a01001-Rtd=12.5");
        let mut input: &[u8] = &wire;
        let message = read_packet(&mut input).await.unwrap();
        assert_eq!(message.header.as_bytes(), HEADER);
        assert_eq!(message.data, "a01001-Rtd=12.5");
        assert!(input.is_empty());

        let parsed = message.parse_header().unwrap();
        assert_eq!(parsed.mn, "DEV0001");
        assert!(logs_contain("message received"));
    }

    #[tokio::test]
    async fn test_read_frame_keeps_segments() {
        let wire = frame(HEADER, b"payload");
        let mut input: &[u8] = &wire;
        let raw = read_frame(&mut input).await.unwrap();
        assert!(raw.header.ends_with(HEADER_DELIMITER));
        assert!(raw.body.ends_with(BODY_DELIMITER));
        assert_eq!(raw.end_tag, *b"####");
        assert_eq!(raw.wire_len(), wire.len());
    }

    #[tokio::test]
    async fn test_consecutive_packets() {
        let mut wire = frame(HEADER, b"first");
        wire.extend(frame(HEADER, b"second"));
        let mut input: &[u8] = &wire;
        assert_eq!(read_packet(&mut input).await.unwrap().data, "first");
        assert_eq!(read_packet(&mut input).await.unwrap().data, "second");
        assert!(read_packet(&mut input).await.unwrap_err().is_end_of_stream());
    }

    #[tokio::test]
    async fn test_header_length_mismatch() {
        let wire = frame(b"bn01DEV00012024-01-01 00:00:00001f", b"payload");
        let mut input: &[u8] = &wire;
        let err = read_packet(&mut input).await.unwrap_err();
        assert!(matches!(err, CodecError::HeaderLengthMismatch { .. }));
        // Only the header segment was consumed
        assert!(input.starts_with(b"payloadtek"));
    }

    #[tokio::test]
    async fn test_checksum_mismatch() {
        let mut wire = frame(HEADER, b"payload");
        let at = wire.len() - 6;
        wire[at] = if wire[at] == b'0' { b'1' } else { b'0' };
        let mut input: &[u8] = &wire;
        let err = read_packet(&mut input).await.unwrap_err();
        assert!(matches!(err, CodecError::ChecksumMismatch { .. }));
        assert_eq!(input, b"####");
    }

    #[tokio::test]
    async fn test_uppercase_checksum_rejected() {
        let mut wire = frame(HEADER, b"payload");
        let at = wire.len() - 6;
        wire[at..at + 2].make_ascii_uppercase();
        let has_letters = wire[at..at + 2].iter().any(u8::is_ascii_alphabetic);
        let mut input: &[u8] = &wire;
        let result = read_packet(&mut input).await;
        assert_eq!(result.is_err(), has_letters);
    }

    #[tokio::test]
    async fn test_end_tag_mismatch() {
        let mut wire = frame(HEADER, b"payload");
        let last = wire.len() - 1;
        wire[last] = b'!';
        let mut input: &[u8] = &wire;
        let err = read_packet(&mut input).await.unwrap_err();
        assert_eq!(
            err,
            CodecError::EndTagMismatch {
                received: b"###!".to_vec()
            }
        );
    }

    #[tokio::test]
    async fn test_truncated_frame() {
        let wire = frame(HEADER, b"payload");
        let mut input: &[u8] = &wire[..wire.len() - 2];
        assert!(read_packet(&mut input).await.unwrap_err().is_end_of_stream());
    }

    #[tokio::test]
    async fn test_gbk_body_decoded() {
        let body = crate::encode_text("站点=北京").unwrap();
        let wire = frame(HEADER, &body);
        let mut input: &[u8] = &wire;
        let message = read_packet(&mut input).await.unwrap();
        assert_eq!(message.data, "站点=北京");
    }
}
