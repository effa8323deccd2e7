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

//! NEAM connection: the per-socket read, validate, dispatch, acknowledge loop

use crate::{
    ConnectionId, ConnectionInfo, ConnectionStatus, NeamError, Registry, Result, ServerHandler,
    ServerMetrics, StatusCell,
};
use dashmap::DashSet;
use futures::FutureExt;
use neam_codec::{AckBuilder, NeamMessage, read_frame};
use parking_lot::Mutex;
use std::any::Any;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

/// A device connection
///
/// Reads one message at a time and writes its acknowledgment before the next read begins.
/// The loop is gated by a [`StatusCell`] so that [`NeamServer::graceful_down`] can stop it
/// without racing it to close the socket.
///
/// [`NeamServer::graceful_down`]: crate::NeamServer::graceful_down
pub struct NeamConnection {
    // Metadata
    id: ConnectionId,
    peer_addr: SocketAddr,
    created_at: Instant,
    last_active: Mutex<Instant>,
    messages_received: AtomicU64,

    // Lifecycle
    status: StatusCell,
    closing: AtomicBool,
    closed: CancellationToken,

    // I/O
    reader: Mutex<Option<BufReader<OwnedReadHalf>>>,
    writer: tokio::sync::Mutex<Option<OwnedWriteHalf>>,

    // Devices reported over this socket
    devices: DashSet<String>,

    registry: Weak<Registry>,
    handler: Arc<dyn ServerHandler>,
    acks: AckBuilder,
    metrics: Arc<ServerMetrics>,
}

impl NeamConnection {
    /// Wrap an accepted socket
    #[instrument(skip_all, fields(connection_id = %id))]
    pub(crate) fn new(
        id: ConnectionId,
        socket: TcpStream,
        registry: Weak<Registry>,
        handler: Arc<dyn ServerHandler>,
        acks: AckBuilder,
        metrics: Arc<ServerMetrics>,
    ) -> Result<Self> {
        let peer_addr = socket.peer_addr()?;
        let (reader, writer) = socket.into_split();
        let now = Instant::now();

        debug!(peer_addr = %peer_addr, "wrapping device connection");

        Ok(Self {
            id,
            peer_addr,
            created_at: now,
            last_active: Mutex::new(now),
            messages_received: AtomicU64::new(0),
            status: StatusCell::new(),
            closing: AtomicBool::new(false),
            closed: CancellationToken::new(),
            reader: Mutex::new(Some(BufReader::new(reader))),
            writer: tokio::sync::Mutex::new(Some(writer)),
            devices: DashSet::new(),
            registry,
            handler,
            acks,
            metrics,
        })
    }

    /// Get the connection ID
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Get the peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Get when the connection was accepted
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Get when the last message was accepted
    pub fn last_active(&self) -> Instant {
        *self.last_active.lock()
    }

    /// Get the number of accepted messages
    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    /// Get the current status
    pub fn status(&self) -> ConnectionStatus {
        self.status.load()
    }

    pub(crate) fn status_cell(&self) -> &StatusCell {
        &self.status
    }

    /// Check if the connection has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Device identifiers reported over this connection, sorted
    pub fn devices(&self) -> Vec<String> {
        let mut devices: Vec<String> = self.devices.iter().map(|mn| mn.key().clone()).collect();
        devices.sort_unstable();
        devices
    }

    /// Point-in-time info for queries
    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id,
            status: self.status(),
            peer_addr: self.peer_addr,
            created_at: self.created_at,
            last_active: self.last_active(),
            devices: self.devices(),
            messages_received: self.messages_received(),
        }
    }

    /// Drain coordinator hook, see [`StatusCell::shutdown_or_notify`]
    pub fn shutdown_or_notify(&self) -> bool {
        self.status.shutdown_or_notify()
    }

    /// Run the connection until the peer leaves, the server stops it, or the loop faults.
    ///
    /// On every exit path the connection is closed unless it is already `Shutdown`, in which
    /// case whoever moved it there owns the close.
    pub async fn run(self: Arc<Self>) {
        let Some(mut reader) = self.reader.lock().take() else {
            warn!(connection_id = %self.id, "connection loop already started");
            return;
        };

        let outcome = AssertUnwindSafe(async {
            self.handler.on_connect(self.id, &self).await;
            self.serve(&mut reader).await
        })
        .catch_unwind()
        .await;
        drop(reader);

        match outcome {
            Ok(Ok(())) | Ok(Err(NeamError::ConnectionClosed)) => {
                debug!(connection_id = %self.id, "connection loop finished");
            }
            Ok(Err(err)) => {
                warn!(connection_id = %self.id, error = %err, "connection loop failed");
            }
            Err(panic) => {
                error!(
                    connection_id = %self.id,
                    panic = panic_message(panic.as_ref()),
                    "connection loop panicked"
                );
            }
        }

        if self.status() != ConnectionStatus::Shutdown {
            self.close().await;
        }
        self.handler.on_disconnect(self.id, &self).await;
    }

    async fn serve(&self, reader: &mut BufReader<OwnedReadHalf>) -> Result<()> {
        loop {
            if !self.status.begin_read() {
                debug!(connection_id = %self.id, status = %self.status(), "stop requested");
                return Ok(());
            }

            let read = tokio::select! {
                biased;
                () = self.closed.cancelled() => Err(NeamError::ConnectionClosed),
                frame = read_frame(&mut *reader) => frame
                    .and_then(|frame| Ok((frame.wire_len(), frame.decode()?)))
                    .map_err(NeamError::from),
            };

            if !self.status.finish_read() {
                trace!(connection_id = %self.id, status = %self.status(), "status changed during read");
                return Ok(());
            }

            match read {
                Ok((wire_len, message)) => self.dispatch(wire_len, message).await?,
                Err(NeamError::ConnectionClosed) => return Ok(()),
                Err(err) if err.is_recoverable() => self.reject(err).await,
                Err(err) => {
                    debug!(connection_id = %self.id, error = %err, "peer closed the stream");
                    return Ok(());
                }
            }
        }
    }

    #[instrument(skip_all, fields(connection_id = %self.id))]
    async fn dispatch(&self, wire_len: usize, message: NeamMessage) -> Result<()> {
        let header = match message.parse_header() {
            Ok(header) => header,
            Err(err) => {
                self.reject(err.into()).await;
                return Ok(());
            }
        };
        let ack = match self.acks.build(&message.header) {
            Ok(ack) => ack,
            Err(err) => {
                self.reject(err.into()).await;
                return Ok(());
            }
        };

        *self.last_active.lock() = Instant::now();
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        self.metrics.frame_accepted(wire_len);
        self.register_device(&header.mn);

        self.handler
            .on_message(self.id, self, &header, &message)
            .await;

        self.write_ack(&ack).await?;
        self.metrics.ack_sent(ack.len());
        trace!(mn = %header.mn, data_type = %header.data_type, "message acknowledged");
        Ok(())
    }

    async fn reject(&self, err: NeamError) {
        if err.is_protocol_violation() {
            warn!(connection_id = %self.id, error = %err, "frame rejected");
            self.metrics.frame_rejected();
        } else {
            error!(connection_id = %self.id, error = %err, "read failed");
        }
        self.handler.on_rejected(self.id, self, &err).await;
    }

    fn register_device(&self, mn: &str) {
        if self.devices.insert(mn.to_string()) {
            info!(connection_id = %self.id, mn, "device reported");
        }
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        if registry.device_connection(mn) != Some(self.id) {
            registry.bind_device(mn, self.id);
        }
    }

    async fn write_ack(&self, ack: &[u8]) -> Result<()> {
        let mut guard = self.writer.lock().await;
        let Some(writer) = guard.as_mut() else {
            return Err(NeamError::ConnectionClosed);
        };
        tokio::select! {
            biased;
            () = self.closed.cancelled() => Err(NeamError::ConnectionClosed),
            written = async {
                writer.write_all(ack).await?;
                writer.flush().await
            } => written.map_err(NeamError::from),
        }
    }

    /// Close the connection.
    ///
    /// Removes the connection and every device entry still pointing at it from the registry,
    /// stops the loop, shuts the socket down and marks the connection `Shutdown`. Idempotent.
    pub async fn close(&self) {
        if self.closing.swap(true, Ordering::AcqRel) {
            return;
        }

        let removed = self
            .registry
            .upgrade()
            .and_then(|registry| registry.unregister(self.id));

        self.closed.cancel();
        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            if let Err(err) = writer.shutdown().await {
                trace!(connection_id = %self.id, error = %err, "socket shutdown failed");
            }
        }
        self.status.mark_shutdown();

        if removed.is_some() {
            self.metrics.connection_closed();
        }
        info!(
            connection_id = %self.id,
            peer_addr = %self.peer_addr,
            devices = self.devices.len(),
            "connection closed"
        );
    }
}

impl std::fmt::Debug for NeamConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NeamConnection")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("status", &self.status())
            .field("devices", &self.devices.len())
            .field("messages_received", &self.messages_received())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
