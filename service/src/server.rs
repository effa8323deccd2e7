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

//! NEAM server: accept loop, registry ownership and the graceful drain

use crate::{
    ConnectionId, ConnectionInfo, NeamConnection, NeamError, NoopHandler, Registry, Result,
    ServerConfig, ServerHandler, ServerMetrics, ServerSnapshot,
};
use futures::future::join_all;
use neam_codec::AckBuilder;
use parking_lot::RwLock;
use socket2::SockRef;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Pause between drain rounds in [`NeamServer::graceful_down`]
pub const DRAIN_TICK: Duration = Duration::from_secs(1);

/// NEAM server
///
/// Owns the listener and the [`Registry`]. Share it behind an [`Arc`]: one task drives
/// [`run`](Self::run) while another calls [`close`](Self::close) and
/// [`graceful_down`](Self::graceful_down).
pub struct NeamServer {
    config: ServerConfig,
    registry: Arc<Registry>,
    metrics: Arc<ServerMetrics>,
    handler: Arc<dyn ServerHandler>,
    acks: AckBuilder,
    listener: RwLock<Option<Arc<TcpListener>>>,
    stopped: CancellationToken,
    bind_address: SocketAddr,
    started_at: Instant,
    next_id: AtomicU64,
}

impl NeamServer {
    /// Validate the configuration and bind the listener.
    ///
    /// Does not accept connections until [`run`](Self::run) is called.
    pub async fn new(config: ServerConfig) -> Result<Self> {
        config.validate()?;
        let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
        Self::with_listener(config, listener)
    }

    /// Build a server around an already bound listener.
    ///
    /// The configuration's host and port are not checked; its socket options still apply.
    pub fn with_listener(config: ServerConfig, listener: TcpListener) -> Result<Self> {
        let bind_address = listener.local_addr()?;
        info!(addr = %bind_address, "NEAM server bound");

        Ok(Self {
            config,
            registry: Arc::new(Registry::new()),
            metrics: Arc::new(ServerMetrics::new()),
            handler: Arc::new(NoopHandler),
            acks: AckBuilder::system(),
            listener: RwLock::new(Some(Arc::new(listener))),
            stopped: CancellationToken::new(),
            bind_address,
            started_at: Instant::now(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Set the event handler for connections accepted from now on
    pub fn with_handler(mut self, handler: Arc<dyn ServerHandler>) -> Self {
        self.handler = handler;
        self
    }

    /// Set the acknowledgment builder for connections accepted from now on
    pub fn with_ack_builder(mut self, acks: AckBuilder) -> Self {
        self.acks = acks;
        self
    }

    /// Accept connections until [`close`](Self::close) is called.
    ///
    /// Every accepted socket gets its options applied, is registered, and runs in its own
    /// task. Any accept failure other than the listener closing ends the loop with an error.
    pub async fn run(&self) -> Result<()> {
        let listener = self
            .listener
            .read()
            .clone()
            .ok_or(NeamError::ListenerClosed)?;

        info!(addr = %self.bind_address, "accepting device connections");

        loop {
            let accepted = tokio::select! {
                biased;
                () = self.stopped.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((socket, peer_addr)) => self.accept(socket, peer_addr),
                Err(_) if self.stopped.is_cancelled() => break,
                Err(err) => {
                    error!(error = %err, "accept failed");
                    self.metrics.connection_error();
                    return Err(err.into());
                }
            }
        }

        info!("accept loop terminated");
        Ok(())
    }

    fn accept(&self, socket: TcpStream, peer_addr: SocketAddr) {
        self.apply_socket_options(&socket, peer_addr);

        let id = ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let connection = match NeamConnection::new(
            id,
            socket,
            Arc::downgrade(&self.registry),
            self.handler.clone(),
            self.acks.clone(),
            self.metrics.clone(),
        ) {
            Ok(connection) => Arc::new(connection),
            Err(err) => {
                warn!(peer_addr = %peer_addr, error = %err, "failed to wrap connection");
                self.metrics.connection_error();
                return;
            }
        };

        if let Err(err) = self.registry.register(connection.clone()) {
            error!(connection_id = %id, error = %err, "failed to register connection");
            self.metrics.connection_error();
            return;
        }
        self.metrics.connection_opened();
        info!(connection_id = %id, peer_addr = %peer_addr, "device connected");

        tokio::spawn(connection.run());
    }

    fn apply_socket_options(&self, socket: &TcpStream, peer_addr: SocketAddr) {
        if self.config.tcp_no_delay {
            if let Err(err) = socket.set_nodelay(true) {
                warn!(peer_addr = %peer_addr, error = %err, "failed to set TCP_NODELAY");
            }
        }
        if self.config.tcp_keep_alive {
            if let Err(err) = SockRef::from(socket).set_keepalive(true) {
                warn!(peer_addr = %peer_addr, error = %err, "failed to set SO_KEEPALIVE");
            }
        }
    }

    /// Close the listener. Idempotent.
    ///
    /// Live connections keep running; use [`graceful_down`](Self::graceful_down) to drain them.
    pub fn close(&self) {
        let listener = self.listener.write().take();
        self.stopped.cancel();
        if listener.is_some() {
            info!(addr = %self.bind_address, "listener closed");
        }
    }

    /// Drain every connection.
    ///
    /// Each round flags every registered connection: those waiting for input are closed here,
    /// the rest stop on their own after finishing the message in hand. Rounds repeat every
    /// [`DRAIN_TICK`] until no connection is left or `cancel` fires. Returns the number of
    /// connections still registered, zero on a complete drain.
    pub async fn graceful_down(&self, cancel: CancellationToken) -> usize {
        let mut round = 0u64;
        loop {
            round += 1;
            let caught = self.registry.shutdown_or_notify_all();
            let closed = caught.len();
            join_all(caught.iter().map(|connection| connection.close())).await;

            let remaining = self.registry.len();
            debug!(round, closed, remaining, "drain round");
            if remaining == 0 {
                info!(rounds = round, "all connections drained");
                return 0;
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    warn!(remaining, "drain cancelled");
                    return remaining;
                }
                () = tokio::time::sleep(DRAIN_TICK) => {}
            }
        }
    }

    /// Check if the listener has been closed
    pub fn is_closed(&self) -> bool {
        self.stopped.is_cancelled()
    }

    /// Get the address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.bind_address
    }

    /// Get the number of registered connections
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Get the IDs of all registered connections
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.registry.ids()
    }

    /// Get the connection a device last reported on
    pub fn device_connection(&self, mn: &str) -> Option<ConnectionId> {
        self.registry.device_connection(mn)
    }

    /// Get info for one connection
    pub fn connection_info(&self, id: ConnectionId) -> Option<ConnectionInfo> {
        self.registry.get(id).map(|connection| connection.info())
    }

    /// Get info for every registered connection
    pub fn connections(&self) -> Vec<ConnectionInfo> {
        self.registry.infos()
    }

    /// Close one connection
    pub async fn disconnect(&self, id: ConnectionId) -> Result<()> {
        let connection = self
            .registry
            .get(id)
            .ok_or(NeamError::ConnectionNotFound(id))?;
        connection.close().await;
        Ok(())
    }

    /// Get a snapshot of the server state
    pub fn snapshot(&self) -> ServerSnapshot {
        ServerSnapshot {
            active_connections: self.registry.len(),
            known_devices: self.registry.device_count(),
            total_connections: self.metrics.total_connections(),
            bind_address: self.bind_address,
            uptime: self.started_at.elapsed(),
        }
    }

    /// Get the server metrics
    pub fn metrics(&self) -> Arc<ServerMetrics> {
        self.metrics.clone()
    }

    /// Get the connection registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl std::fmt::Debug for NeamServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NeamServer")
            .field("bind_address", &self.bind_address)
            .field("closed", &self.is_closed())
            .field("connection_count", &self.connection_count())
            .field("uptime", &self.started_at.elapsed())
            .finish()
    }
}
