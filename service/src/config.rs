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

//! Server configuration

use crate::{NeamError, Result};
use serde::Deserialize;

/// Server configuration
///
/// Use the builder methods to customize the configuration.
///
/// # Example
///
/// ```
/// use neam_service::ServerConfig;
///
/// let config = ServerConfig::new("0.0.0.0", 9999)
///     .with_tcp_keep_alive(true)
///     .with_tcp_no_delay(true);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host or address to listen on
    pub host: String,

    /// TCP port to listen on; zero is rejected
    pub port: u16,

    /// Enable TCP keep-alive on accepted sockets
    pub tcp_keep_alive: bool,

    /// Disable Nagle's algorithm on accepted sockets
    pub tcp_no_delay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9999,
            tcp_keep_alive: false,
            tcp_no_delay: false,
        }
    }
}

impl ServerConfig {
    /// Create a new configuration for the given host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Enable or disable TCP keep-alive
    pub fn with_tcp_keep_alive(mut self, enabled: bool) -> Self {
        self.tcp_keep_alive = enabled;
        self
    }

    /// Enable or disable TCP no-delay
    pub fn with_tcp_no_delay(mut self, enabled: bool) -> Self {
        self.tcp_no_delay = enabled;
        self
    }

    /// The `host:port` string the listener binds to
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate the configuration
    ///
    /// Host must be non-empty and port non-zero.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(NeamError::InvalidConfig("host must not be empty".to_string()));
        }

        if self.port == 0 {
            return Err(NeamError::InvalidConfig("port must be greater than 0".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9999);
        assert!(!config.tcp_keep_alive);
        assert!(!config.tcp_no_delay);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = ServerConfig::new("0.0.0.0", 7000)
            .with_tcp_keep_alive(true)
            .with_tcp_no_delay(true);

        assert_eq!(config.address(), "0.0.0.0:7000");
        assert!(config.tcp_keep_alive);
        assert!(config.tcp_no_delay);
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            ServerConfig::new("", 9999).validate(),
            Err(NeamError::InvalidConfig(_))
        ));
        assert!(matches!(
            ServerConfig::new("   ", 9999).validate(),
            Err(NeamError::InvalidConfig(_))
        ));
        assert!(matches!(
            ServerConfig::new("localhost", 0).validate(),
            Err(NeamError::InvalidConfig(_))
        ));
        assert!(ServerConfig::new("localhost", 1).validate().is_ok());
    }
}
