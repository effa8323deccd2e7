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

//! Error types for the NEAM server

use crate::types::ConnectionId;
use neam_codec::CodecError;
use thiserror::Error;

/// Result type for operations
pub type Result<T> = std::result::Result<T, NeamError>;

/// NEAM server error types
#[derive(Debug, Error)]
pub enum NeamError {
    /// I/O error from the listener or a socket
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Framing, validation or charset error from the codec layer
    #[error("Protocol error: {0}")]
    Codec(#[from] CodecError),

    /// Configuration rejected before binding
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Connection with the given ID was not found
    #[error("Connection {0} not found")]
    ConnectionNotFound(ConnectionId),

    /// A connection with the given ID is already registered
    #[error("Connection {0} already registered")]
    DuplicateConnection(ConnectionId),

    /// Connection has been closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// The listener has been closed
    #[error("Listener closed")]
    ListenerClosed,
}

impl NeamError {
    /// Check if the error is the peer ending the stream
    pub fn is_end_of_stream(&self) -> bool {
        match self {
            NeamError::Codec(err) => err.is_end_of_stream(),
            NeamError::Io(err) => err.kind() == std::io::ErrorKind::UnexpectedEof,
            _ => false,
        }
    }

    /// Check if the error is a frame that violated the protocol
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, NeamError::Codec(err) if err.is_protocol_violation())
    }

    /// Check if the read loop may continue after this error
    ///
    /// Protocol violations and transient I/O failures are recoverable; end of stream and a
    /// closed connection are not.
    pub fn is_recoverable(&self) -> bool {
        match self {
            NeamError::Codec(err) => !err.is_end_of_stream(),
            NeamError::Io(err) => err.kind() != std::io::ErrorKind::UnexpectedEof,
            _ => false,
        }
    }
}
