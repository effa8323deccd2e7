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

//! Device side codec
//!
//! Field devices write readings and read acknowledgments. [`DeviceCodec`] encodes
//! [`NeamMessage`]s into frames and decodes the server's acknowledgments, for use with
//! `tokio_util::codec::Framed` in simulators and tests.

use crate::consts::{BODY_DELIMITER, CHECKSUM_LEN, END_TAG, HEADER_DELIMITER, TIME_FORMAT};
use crate::{
    CodecError, CodecResult, NeamMessage, check_code, compute_check, decode_text, encode_text,
};
use bytes::{Buf, BufMut, BytesMut};
use chrono::NaiveDateTime;
use tokio_util::codec::{Decoder, Encoder};

/// An acknowledgment received from the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeamAck {
    /// The header being acknowledged, echoed back verbatim
    pub header: String,
    /// Server time when the acknowledgment was built
    pub time: String,
    /// Transmitted checksum (already validated)
    pub checksum: String,
}

impl NeamAck {
    /// Parse the server timestamp
    pub fn timestamp(&self) -> CodecResult<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.time, TIME_FORMAT).map_err(|e| {
            CodecError::MalformedHeader {
                reason: format!("invalid ack timestamp {:?}: {e}", self.time),
            }
        })
    }
}

/// Encodes readings and decodes acknowledgments.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceCodec;

impl DeviceCodec {
    /// Create a new codec
    pub fn new() -> Self {
        Self
    }
}

impl Encoder<&NeamMessage> for DeviceCodec {
    type Error = CodecError;

    fn encode(&mut self, item: &NeamMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let header = encode_text(&item.header)?;
        let data = encode_text(&item.data)?;

        let start = dst.len();
        dst.reserve(
            header.len()
                + HEADER_DELIMITER.len()
                + data.len()
                + BODY_DELIMITER.len()
                + CHECKSUM_LEN
                + END_TAG.len(),
        );
        dst.put_slice(&header);
        dst.put_slice(HEADER_DELIMITER);
        dst.put_slice(&data);
        dst.put_slice(BODY_DELIMITER);

        let code = compute_check(&dst[start..]);
        dst.put_slice(code.as_bytes());
        dst.put_slice(END_TAG);
        Ok(())
    }
}

impl Encoder<NeamMessage> for DeviceCodec {
    type Error = CodecError;

    fn encode(&mut self, item: NeamMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        <Self as Encoder<&NeamMessage>>::encode(self, &item, dst)
    }
}

impl Decoder for DeviceCodec {
    type Item = NeamAck;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(header_end) = find(src, HEADER_DELIMITER, 0) else {
            return Ok(None);
        };
        let time_start = header_end + HEADER_DELIMITER.len();
        let Some(time_end) = find(src, BODY_DELIMITER, time_start) else {
            return Ok(None);
        };
        let signed_end = time_end + BODY_DELIMITER.len();
        let frame_end = signed_end + CHECKSUM_LEN + END_TAG.len();
        if src.len() < frame_end {
            src.reserve(frame_end - src.len());
            return Ok(None);
        }

        let frame = src.split_to(frame_end);
        let (signed, trailer) = frame.split_at(signed_end);
        let (checksum, end_tag) = trailer.split_at(CHECKSUM_LEN);
        if end_tag != END_TAG {
            return Err(CodecError::EndTagMismatch {
                received: end_tag.to_vec(),
            });
        }
        let signed = decode_text(signed)?;
        if !check_code(signed.as_bytes(), checksum) {
            return Err(CodecError::ChecksumMismatch {
                expected: compute_check(signed.as_bytes()),
                received: String::from_utf8_lossy(checksum).into_owned(),
            });
        }

        Ok(Some(NeamAck {
            header: decode_text(&frame[..header_end])?.into_owned(),
            time: decode_text(&frame[time_start..time_end])?.into_owned(),
            checksum: String::from_utf8_lossy(checksum).into_owned(),
        }))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(buf)? {
            Some(ack) => Ok(Some(ack)),
            None if buf.is_empty() => Ok(None),
            None => {
                let remaining = buf.remaining();
                buf.advance(remaining);
                Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("{remaining} bytes of incomplete acknowledgment"),
                )
                .into())
            }
        }
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|at| at + from)
}
