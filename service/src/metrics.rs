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

//! Server-wide counters
//!
//! [`ServerMetrics`] keeps lock-free totals for queries and snapshots and mirrors every
//! update to the `metrics` facade so an installed recorder sees the same numbers.

use metrics::{counter, gauge};
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free server counters
#[derive(Debug, Default)]
pub struct ServerMetrics {
    connections_opened: AtomicU64,
    connections_closed: AtomicU64,
    connection_errors: AtomicU64,
    frames_accepted: AtomicU64,
    frames_rejected: AtomicU64,
    acks_sent: AtomicU64,
    bytes_received: AtomicU64,
    bytes_sent: AtomicU64,
}

impl ServerMetrics {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted connection
    pub fn connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
        counter!("neam.connections.total").increment(1);
        gauge!("neam.connections.active").increment(1.0);
    }

    /// Record a closed connection
    pub fn connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
        gauge!("neam.connections.active").decrement(1.0);
    }

    /// Record a failed accept or socket setup
    pub fn connection_error(&self) {
        self.connection_errors.fetch_add(1, Ordering::Relaxed);
        counter!("neam.connections.errors").increment(1);
    }

    /// Record a frame that passed validation
    pub fn frame_accepted(&self, wire_len: usize) {
        self.frames_accepted.fetch_add(1, Ordering::Relaxed);
        self.bytes_received
            .fetch_add(wire_len as u64, Ordering::Relaxed);
        counter!("neam.frames.accepted").increment(1);
        counter!("neam.bytes.received").increment(wire_len as u64);
    }

    /// Record a frame that failed validation
    pub fn frame_rejected(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
        counter!("neam.frames.rejected").increment(1);
    }

    /// Record an acknowledgement written to a device
    pub fn ack_sent(&self, wire_len: usize) {
        self.acks_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(wire_len as u64, Ordering::Relaxed);
        counter!("neam.acks.sent").increment(1);
        counter!("neam.bytes.sent").increment(wire_len as u64);
    }

    /// Connections accepted since start
    pub fn total_connections(&self) -> u64 {
        self.connections_opened.load(Ordering::Relaxed)
    }

    /// Connections currently open according to the counters
    pub fn active_connections(&self) -> u64 {
        self.connections_opened
            .load(Ordering::Relaxed)
            .saturating_sub(self.connections_closed.load(Ordering::Relaxed))
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            connection_errors: self.connection_errors.load(Ordering::Relaxed),
            frames_accepted: self.frames_accepted.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            acks_sent: self.acks_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
        }
    }
}

/// Copy of [`ServerMetrics`] at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Connections accepted
    pub connections_opened: u64,
    /// Connections closed
    pub connections_closed: u64,
    /// Accept or socket setup failures
    pub connection_errors: u64,
    /// Frames that passed validation
    pub frames_accepted: u64,
    /// Frames that failed validation
    pub frames_rejected: u64,
    /// Acknowledgements written
    pub acks_sent: u64,
    /// Wire bytes of accepted frames
    pub bytes_received: u64,
    /// Wire bytes of acknowledgements
    pub bytes_sent: u64,
}
