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

//! NEAM Server Implementation
//!
//! This crate accepts TCP connections from field monitoring devices, reads NEAM readings off
//! each socket, validates them, and answers every accepted reading with an acknowledgment.
//!
//! # Architecture
//!
//! ```text
//! NeamServer ── accept loop
//!     ↓
//! Registry (connections + device index, one RwLock)
//!     ↓
//! NeamConnection ── read → validate → dispatch → ack, gated by StatusCell
//! ```
//!
//! Each connection runs its own task and reads one message at a time; the acknowledgment for a
//! message is written before the next read begins. Shutdown is cooperative: the drain loop in
//! [`NeamServer::graceful_down`] closes connections caught waiting for input and flags the rest
//! to stop at the top of their next iteration.
//!
//! # Example
//!
//! ```no_run
//! use neam_service::{NeamServer, ServerConfig};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::new("0.0.0.0", 9999).with_tcp_no_delay(true);
//!     let server = Arc::new(NeamServer::new(config).await?);
//!
//!     let accept = tokio::spawn({
//!         let server = server.clone();
//!         async move { server.run().await }
//!     });
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.close();
//!     server.graceful_down(CancellationToken::new()).await;
//!     accept.await??;
//!     Ok(())
//! }
//! ```

mod config;
mod connection;
mod error;
mod handler;
mod metrics;
mod registry;
mod server;
mod types;

pub use config::ServerConfig;
pub use connection::NeamConnection;
pub use error::{NeamError, Result};
pub use handler::{NoopHandler, ServerHandler};
pub use metrics::{MetricsSnapshot, ServerMetrics};
pub use registry::Registry;
pub use server::{DRAIN_TICK, NeamServer};
pub use types::{ConnectionId, ConnectionInfo, ConnectionStatus, ServerSnapshot, StatusCell};

pub use neam_codec::{AckBuilder, Clock, FixedClock, NeamMessage, ParsedHeader, SystemClock};
