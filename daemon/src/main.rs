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

//! `neamd`: NEAM telemetry server daemon
//!
//! ```text
//! neamd [--config <path>] [--version]
//! ```
//!
//! Accepts device connections until interrupted, then stops listening and drains the live
//! connections for at most `shutdown_timeout_secs`.

mod settings;

use anyhow::{Context, Result};
use async_trait::async_trait;
use neam_service::{
    ConnectionId, NeamConnection, NeamError, NeamMessage, NeamServer, ParsedHeader,
    ServerHandler,
};
use settings::Settings;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::filter::EnvFilter;

/// Logs every accepted reading
struct ReadingLog;

#[async_trait]
impl ServerHandler for ReadingLog {
    async fn on_connect(&self, id: ConnectionId, conn: &NeamConnection) {
        info!(connection_id = %id, peer_addr = %conn.peer_addr(), "device connected");
    }

    async fn on_message(
        &self,
        id: ConnectionId,
        _conn: &NeamConnection,
        header: &ParsedHeader,
        message: &NeamMessage,
    ) {
        info!(
            connection_id = %id,
            mn = %header.mn,
            data_type = %header.data_type,
            time = %header.time,
            data = %message.data,
            "reading received"
        );
    }

    async fn on_rejected(&self, id: ConnectionId, _conn: &NeamConnection, error: &NeamError) {
        warn!(connection_id = %id, error = %error, "reading rejected");
    }

    async fn on_disconnect(&self, id: ConnectionId, conn: &NeamConnection) {
        info!(connection_id = %id, devices = ?conn.devices(), "device disconnected");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|arg| arg == "--version") {
        println!("neamd {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config_path = match args.iter().position(|arg| arg == "--config") {
        Some(index) => Some(
            args.get(index + 1)
                .map(String::as_str)
                .context("--config requires a path")?,
        ),
        None => None,
    };
    let settings = Settings::load(config_path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .init();

    if let Err(err) = run(settings).await {
        error!(error = %err, "neamd failed");
        return Err(err);
    }
    Ok(())
}

async fn run(settings: Settings) -> Result<()> {
    let server = Arc::new(
        NeamServer::new(settings.server.clone())
            .await
            .with_context(|| format!("failed to listen on {}", settings.server.address()))?
            .with_handler(Arc::new(ReadingLog)),
    );

    let mut accept = tokio::spawn({
        let server = server.clone();
        async move { server.run().await }
    });

    tokio::select! {
        joined = &mut accept => {
            joined.context("accept loop aborted")??;
            return Ok(());
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for shutdown signal")?;
            info!("shutdown requested");
        }
    }

    server.close();
    accept.await.context("accept loop aborted")??;

    let deadline = CancellationToken::new();
    let timer = tokio::spawn({
        let deadline = deadline.clone();
        let timeout = settings.shutdown_timeout();
        async move {
            tokio::time::sleep(timeout).await;
            deadline.cancel();
        }
    });
    let remaining = server.graceful_down(deadline).await;
    timer.abort();

    if remaining > 0 {
        warn!(remaining, "shutdown deadline reached with connections still open");
    } else {
        info!("shutdown complete");
    }
    Ok(())
}
