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

//! Core types for the NEAM server

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

/// Unique identifier for a connection (monotonically increasing, never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Create a new connection ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying u64 value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Connection status (stored as atomic u8, see [`StatusCell`])
///
/// ```text
/// Dispatching ──begin_read──▶ Reading ──finish_read──▶ Dispatching
///                               │
///                               └──shutdown_or_notify──▶ Shutdown (terminal)
///
/// any non-terminal ──shutdown_or_notify (not Reading)──▶ WaitShutdown
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionStatus {
    /// Between reads: dispatching a message or about to read the next one
    Dispatching = 0,
    /// Blocked reading the next message
    Reading = 1,
    /// Closed by the server
    Shutdown = 2,
    /// Asked by the server to stop at the top of the next iteration
    WaitShutdown = 3,
}

impl ConnectionStatus {
    /// Convert from u8 (for atomic operations)
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Dispatching,
            1 => Self::Reading,
            3 => Self::WaitShutdown,
            _ => Self::Shutdown,
        }
    }

    /// Convert to u8 (for atomic operations)
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if no further transition can leave this status
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Shutdown)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dispatching => write!(f, "dispatching"),
            Self::Reading => write!(f, "reading"),
            Self::Shutdown => write!(f, "shutdown"),
            Self::WaitShutdown => write!(f, "wait-shutdown"),
        }
    }
}

/// Lock-free connection status shared by a connection's read loop and the drain coordinator.
///
/// Every transition is a compare-and-swap except the drain coordinator's fallback to
/// `WaitShutdown`, which is what keeps the two sides from both closing the same connection:
/// the drain closes only connections it moved out of `Reading` itself, and everything else is
/// left for its own loop to close.
#[derive(Debug)]
pub struct StatusCell(AtomicU8);

impl StatusCell {
    /// Create a cell in the initial `Dispatching` status
    pub fn new() -> Self {
        Self(AtomicU8::new(ConnectionStatus::Dispatching.as_u8()))
    }

    /// Current status
    pub fn load(&self) -> ConnectionStatus {
        ConnectionStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Atomically move from `current` to `new`; false if the status was not `current`
    pub fn compare_and_swap(&self, current: ConnectionStatus, new: ConnectionStatus) -> bool {
        self.0
            .compare_exchange(
                current.as_u8(),
                new.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// `Dispatching → Reading` at the top of the read loop.
    ///
    /// False means the loop must exit.
    pub fn begin_read(&self) -> bool {
        self.compare_and_swap(ConnectionStatus::Dispatching, ConnectionStatus::Reading)
            && self.load() != ConnectionStatus::WaitShutdown
    }

    /// `Reading → Dispatching` after a read returns.
    ///
    /// False means the status was changed underneath the loop and it must exit.
    pub fn finish_read(&self) -> bool {
        self.compare_and_swap(ConnectionStatus::Reading, ConnectionStatus::Dispatching)
    }

    /// Drain coordinator entry point.
    ///
    /// Moves `Reading → Shutdown` and returns true: the caller now owns closing the connection.
    /// Otherwise flags `WaitShutdown` and returns false: the connection's loop will stop on its
    /// own. A connection already `Shutdown` is left untouched.
    pub fn shutdown_or_notify(&self) -> bool {
        if self.compare_and_swap(ConnectionStatus::Reading, ConnectionStatus::Shutdown) {
            return true;
        }

        let _ = self.0.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            (current != ConnectionStatus::Shutdown.as_u8())
                .then_some(ConnectionStatus::WaitShutdown.as_u8())
        });
        false
    }

    /// Mark the connection closed
    pub fn mark_shutdown(&self) {
        self.0
            .store(ConnectionStatus::Shutdown.as_u8(), Ordering::Release);
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Connection information snapshot (for non-blocking queries)
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Connection ID
    pub id: ConnectionId,
    /// Current status
    pub status: ConnectionStatus,
    /// Peer address
    pub peer_addr: SocketAddr,
    /// When the connection was accepted
    pub created_at: Instant,
    /// When the last message was accepted
    pub last_active: Instant,
    /// Device identifiers reported over this connection
    pub devices: Vec<String>,
    /// Messages accepted on this connection
    pub messages_received: u64,
}

impl ConnectionInfo {
    /// Get the connection duration
    pub fn duration(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Get the idle duration
    pub fn idle_duration(&self) -> Duration {
        self.last_active.elapsed()
    }
}

/// Server snapshot for non-blocking debug information
#[derive(Debug, Clone)]
pub struct ServerSnapshot {
    /// Number of registered connections
    pub active_connections: usize,
    /// Number of devices bound to a connection
    pub known_devices: usize,
    /// Total connections since server start
    pub total_connections: u64,
    /// Server bind address
    pub bind_address: SocketAddr,
    /// Server uptime
    pub uptime: Duration,
}

impl fmt::Display for ServerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NeamServer {{ active: {}, devices: {}, total: {}, addr: {}, uptime: {:?} }}",
            self.active_connections,
            self.known_devices,
            self.total_connections,
            self.bind_address,
            self.uptime
        )
    }
}
