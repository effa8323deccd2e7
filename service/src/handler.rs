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

//! Handler trait for observing NEAM server events

use crate::{ConnectionId, NeamConnection, NeamError};
use async_trait::async_trait;
use neam_codec::{NeamMessage, ParsedHeader};

/// Server event handler trait
///
/// Implement this trait to observe events from the NEAM server. All methods are async and
/// have default implementations that do nothing. Acknowledgement is handled by the server;
/// `on_message` runs after the frame has been validated and before its acknowledgement is
/// written, so a slow handler delays the ack for that connection only.
///
/// # Example
///
/// ```no_run
/// use neam_service::{ConnectionId, NeamConnection, NeamMessage, ParsedHeader, ServerHandler};
/// use async_trait::async_trait;
///
/// struct Store;
///
/// #[async_trait]
/// impl ServerHandler for Store {
///     async fn on_message(
///         &self,
///         id: ConnectionId,
///         _conn: &NeamConnection,
///         header: &ParsedHeader,
///         message: &NeamMessage,
///     ) {
///         println!("{id} {} {}: {}", header.mn, header.data_type, message.data);
///     }
/// }
/// ```
#[async_trait]
pub trait ServerHandler: Send + Sync + 'static {
    /// Called once the connection is registered, before the first read
    async fn on_connect(&self, _id: ConnectionId, _conn: &NeamConnection) {}

    /// Called for every frame that passed length, checksum and end tag validation
    async fn on_message(
        &self,
        _id: ConnectionId,
        _conn: &NeamConnection,
        _header: &ParsedHeader,
        _message: &NeamMessage,
    ) {
    }

    /// Called when a frame fails validation
    ///
    /// The frame gets no acknowledgement. The connection stays open and reading resumes.
    async fn on_rejected(&self, _id: ConnectionId, _conn: &NeamConnection, _error: &NeamError) {}

    /// Called after the connection has been closed and unregistered
    async fn on_disconnect(&self, _id: ConnectionId, _conn: &NeamConnection) {}
}

/// Handler that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

#[async_trait]
impl ServerHandler for NoopHandler {}
