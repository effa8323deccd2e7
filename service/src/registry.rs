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

//! Registry of live connections and the device index
//!
//! Both maps sit behind one [`RwLock`]: lookups take the read lock, every insertion and
//! removal takes the write lock, and a closing connection clears its entries from both maps
//! in a single write section.

use crate::{ConnectionId, ConnectionInfo, NeamConnection, NeamError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Default)]
struct RegistryInner {
    connections: HashMap<ConnectionId, Arc<NeamConnection>>,
    devices: HashMap<String, ConnectionId>,
}

/// Live connections keyed by ID, plus the device identifier (MN) to connection index
#[derive(Default)]
pub struct Registry {
    inner: RwLock<RegistryInner>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection
    pub fn register(&self, connection: Arc<NeamConnection>) -> Result<()> {
        let id = connection.id();
        let mut inner = self.inner.write();
        if inner.connections.contains_key(&id) {
            return Err(NeamError::DuplicateConnection(id));
        }
        inner.connections.insert(id, connection);
        trace!(connection_id = %id, "connection registered");
        Ok(())
    }

    /// Point a device identifier at a connection.
    ///
    /// A device seen on a newer connection is rebound to it. Returns false, leaving the index
    /// untouched, if the connection is no longer registered.
    pub fn bind_device(&self, mn: &str, id: ConnectionId) -> bool {
        let mut inner = self.inner.write();
        if !inner.connections.contains_key(&id) {
            return false;
        }
        if let Some(previous) = inner.devices.insert(mn.to_string(), id) {
            if previous != id {
                debug!(mn, from = %previous, to = %id, "device rebound");
            }
        }
        true
    }

    /// Remove a connection and every device entry that still points at it.
    ///
    /// Devices rebound to another connection are left alone. Returns the removed connection,
    /// or `None` if it was not registered.
    pub fn unregister(&self, id: ConnectionId) -> Option<Arc<NeamConnection>> {
        let mut inner = self.inner.write();
        let before = inner.devices.len();
        inner.devices.retain(|_, target| *target != id);
        let unbound = before - inner.devices.len();
        let removed = inner.connections.remove(&id);
        if removed.is_some() {
            trace!(connection_id = %id, devices = unbound, "connection unregistered");
        }
        removed
    }

    /// Get a connection by ID
    pub fn get(&self, id: ConnectionId) -> Option<Arc<NeamConnection>> {
        self.inner.read().connections.get(&id).cloned()
    }

    /// Connection a device last reported on
    pub fn device_connection(&self, mn: &str) -> Option<ConnectionId> {
        self.inner.read().devices.get(mn).copied()
    }

    /// Number of registered connections
    pub fn len(&self) -> usize {
        self.inner.read().connections.len()
    }

    /// Check if no connection is registered
    pub fn is_empty(&self) -> bool {
        self.inner.read().connections.is_empty()
    }

    /// Number of devices in the index
    pub fn device_count(&self) -> usize {
        self.inner.read().devices.len()
    }

    /// IDs of all registered connections, in ascending order
    pub fn ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<_> = self.inner.read().connections.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Info for every registered connection
    pub fn infos(&self) -> Vec<ConnectionInfo> {
        self.inner
            .read()
            .connections
            .values()
            .map(|connection| connection.info())
            .collect()
    }

    /// Run one drain round's status transitions under the read lock.
    ///
    /// Returns the connections caught mid-read; the caller must close them after the lock is
    /// released. Every other connection has been flagged to stop on its own.
    pub(crate) fn shutdown_or_notify_all(&self) -> Vec<Arc<NeamConnection>> {
        self.inner
            .read()
            .connections
            .values()
            .filter(|connection| connection.shutdown_or_notify())
            .cloned()
            .collect()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Registry")
            .field("connections", &inner.connections.len())
            .field("devices", &inner.devices.len())
            .finish()
    }
}
