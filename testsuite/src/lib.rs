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

//! Device simulator and server fixtures for end-to-end NEAM tests

use chrono::NaiveDateTime;
use futures::{SinkExt, StreamExt};
use neam_codec::consts::TIME_FORMAT;
use neam_codec::{
    CodecError, CodecResult, DeviceCodec, MessageType, NeamAck, NeamMessage, encode_text,
};
use neam_service::{AckBuilder, NeamServer, ServerConfig, ServerHandler};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;

/// How long a device waits for an acknowledgment before giving up
pub const ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Build a header with a correct length field.
///
/// The declared length counts GBK bytes, so `mn` may hold Chinese characters.
pub fn build_header(data_type: &str, mn: &str, time: &NaiveDateTime) -> CodecResult<String> {
    let time = time.format(TIME_FORMAT).to_string();
    let body = format!("{data_type}{mn}{time}");
    let len = encode_text(&body)?.len();
    Ok(format!("{body}{len:04x}"))
}

/// A simulated field device speaking NEAM over TCP
pub struct Device {
    mn: String,
    data_type: MessageType,
    framed: Framed<TcpStream, DeviceCodec>,
}

impl Device {
    /// Connect a device reporting as `mn`
    pub async fn connect(
        addr: SocketAddr,
        mn: impl Into<String>,
        data_type: MessageType,
    ) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            mn: mn.into(),
            data_type,
            framed: Framed::new(stream, DeviceCodec::new()),
        })
    }

    /// Device identifier
    pub fn mn(&self) -> &str {
        &self.mn
    }

    /// Header for a reading taken at `time`
    pub fn header(&self, time: &NaiveDateTime) -> CodecResult<String> {
        build_header(self.data_type.code(), &self.mn, time)
    }

    /// Send one reading without waiting for its acknowledgment
    pub async fn send(&mut self, time: &NaiveDateTime, data: &str) -> CodecResult<String> {
        let header = self.header(time)?;
        self.framed
            .send(NeamMessage::new(header.clone(), data))
            .await?;
        Ok(header)
    }

    /// Send raw bytes, bypassing the codec
    pub async fn send_raw(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let stream = self.framed.get_mut();
        stream.write_all(bytes).await?;
        stream.flush().await
    }

    /// Wait for the next acknowledgment.
    ///
    /// `Ok(None)` means the server closed the connection.
    pub async fn recv_ack(&mut self, wait: Duration) -> CodecResult<Option<NeamAck>> {
        match tokio::time::timeout(wait, self.framed.next()).await {
            Ok(Some(ack)) => ack.map(Some),
            Ok(None) => Ok(None),
            Err(_) => Err(CodecError::Io {
                kind: std::io::ErrorKind::TimedOut,
                message: "no acknowledgment".to_string(),
            }),
        }
    }

    /// Send one reading and wait for its acknowledgment
    pub async fn report(&mut self, time: &NaiveDateTime, data: &str) -> CodecResult<NeamAck> {
        self.send(time, data).await?;
        self.recv_ack(ACK_TIMEOUT)
            .await?
            .ok_or_else(|| CodecError::from(std::io::Error::from(std::io::ErrorKind::UnexpectedEof)))
    }
}

/// A server listening on an ephemeral loopback port
pub struct TestServer {
    /// The running server
    pub server: Arc<NeamServer>,
    /// The accept loop task
    pub accept: JoinHandle<neam_service::Result<()>>,
}

impl TestServer {
    /// Start a server with `handler` and acknowledgment times frozen at `ack_time`
    pub async fn start(
        config: ServerConfig,
        handler: Arc<dyn ServerHandler>,
        ack_time: NaiveDateTime,
    ) -> neam_service::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let server = Arc::new(
            NeamServer::with_listener(config, listener)?
                .with_handler(handler)
                .with_ack_builder(AckBuilder::fixed(ack_time)),
        );
        let accept = tokio::spawn({
            let server = server.clone();
            async move { server.run().await }
        });
        Ok(Self { server, accept })
    }

    /// Address devices connect to
    pub fn addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    /// Poll until `condition` holds, for up to five seconds
    pub async fn wait_until(&self, condition: impl Fn(&NeamServer) -> bool) -> bool {
        for _ in 0..500 {
            if condition(&self.server) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}
