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

//! Error types for NEAM codec operations

/// Result Type for Codec Operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while framing, validating, or transcoding NEAM messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// An I/O error occurred while reading from or writing to the underlying stream.
    ///
    /// End of stream surfaces here as [`std::io::ErrorKind::UnexpectedEof`].
    #[error("I/O error ({kind:?}): {message}")]
    Io {
        /// The kind of I/O error that occurred
        kind: std::io::ErrorKind,
        /// Description of the failure
        message: String,
    },

    /// The header's self-declared length does not match its actual length.
    #[error("header length mismatch: {actual} bytes, declared field {declared:?}")]
    HeaderLengthMismatch {
        /// The raw four character length field, if the header was long enough to carry one
        declared: Option<String>,
        /// Actual header length without its delimiter
        actual: usize,
    },

    /// The transmitted checksum differs from the one computed over header and body.
    #[error("checksum mismatch: computed {expected}, received {received}")]
    ChecksumMismatch {
        /// Checksum computed locally
        expected: String,
        /// Checksum bytes read off the wire (lossily rendered)
        received: String,
    },

    /// The four bytes following the checksum are not the end tag.
    #[error("end tag mismatch: received {received:?}")]
    EndTagMismatch {
        /// Bytes read where the end tag was expected
        received: Vec<u8>,
    },

    /// A header could not be split into its fields.
    #[error("malformed header: {reason}")]
    MalformedHeader {
        /// What is wrong with the header
        reason: String,
    },

    /// Text could not be converted to or from the wire charset.
    #[error("charset conversion failed: {reason}")]
    Charset {
        /// What could not be converted
        reason: String,
    },
}

impl CodecError {
    /// Check whether the error is the peer closing the stream
    pub fn is_end_of_stream(&self) -> bool {
        matches!(
            self,
            CodecError::Io {
                kind: std::io::ErrorKind::UnexpectedEof,
                ..
            }
        )
    }

    /// Check whether the error is a frame that violated the protocol
    ///
    /// Protocol violations discard the current frame; the connection stays open.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            CodecError::HeaderLengthMismatch { .. }
                | CodecError::ChecksumMismatch { .. }
                | CodecError::EndTagMismatch { .. }
                | CodecError::MalformedHeader { .. }
                | CodecError::Charset { .. }
        )
    }
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        CodecError::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
