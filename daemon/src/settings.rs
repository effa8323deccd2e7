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

//! Daemon settings: an optional TOML file overlaid with `NEAM_` environment variables

use anyhow::{Context, Result};
use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use neam_service::ServerConfig;
use serde::Deserialize;
use std::time::Duration;

/// Settings for the `neamd` process
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Filter directive used when `RUST_LOG` is unset
    pub log_level: String,
    /// Listener and socket options
    pub server: ServerConfig,
    /// Upper bound on the graceful drain after a shutdown signal
    pub shutdown_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            server: ServerConfig::default(),
            shutdown_timeout_secs: 30,
        }
    }
}

impl Settings {
    /// Load settings from `path` (if given) and the process environment.
    ///
    /// Environment variables use the `NEAM_` prefix and `__` between nested keys, so
    /// `NEAM_SERVER__PORT=9000` sets `server.port`.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path));
        }
        Self::build(builder, environment())
            .with_context(|| match path {
                Some(path) => format!("failed to load settings from '{path}'"),
                None => "failed to load settings".to_string(),
            })
    }

    fn build(builder: ConfigBuilder<DefaultState>, environment: Environment) -> Result<Self> {
        let settings: Self = builder
            .add_source(environment)
            .build()?
            .try_deserialize()?;
        settings.server.validate()?;
        Ok(settings)
    }

    /// Drain deadline
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

fn environment() -> Environment {
    Environment::with_prefix("NEAM")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn load(toml: &str, vars: &[(&str, &str)]) -> Result<Settings> {
        let builder = Config::builder().add_source(File::from_str(toml, FileFormat::Toml));
        let vars = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Settings::build(builder, environment().source(Some(vars)))
    }

    #[test]
    fn test_defaults() {
        let settings = load("", &[]).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.shutdown_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_file_values() {
        let settings = load(
            r#"
            log_level = "debug"
            shutdown_timeout_secs = 5

            [server]
            host = "0.0.0.0"
            port = 7001
            tcp_keep_alive = true
            "#,
            &[],
        )
        .unwrap();

        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.shutdown_timeout_secs, 5);
        assert_eq!(settings.server.address(), "0.0.0.0:7001");
        assert!(settings.server.tcp_keep_alive);
        assert!(!settings.server.tcp_no_delay);
    }

    #[test]
    fn test_environment_overrides_file() {
        let settings = load(
            "[server]\nport = 7001\n",
            &[
                ("NEAM_SERVER__PORT", "7002"),
                ("NEAM_SERVER__TCP_NO_DELAY", "true"),
            ],
        )
        .unwrap();

        assert_eq!(settings.server.port, 7002);
        assert!(settings.server.tcp_no_delay);
    }

    #[test]
    fn test_invalid_server_rejected() {
        assert!(load("[server]\nport = 0\n", &[]).is_err());
        assert!(load("[server]\nhost = \"\"\n", &[]).is_err());
    }
}
