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

//! End-to-end correctness tests for the NEAM server
//!
//! Simulated devices talk to a real server over loopback TCP and check acknowledgments, the
//! rejection of malformed frames, the device index, and the graceful drain.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use neam_codec::{MessageType, NeamMessage, ParsedHeader, check_code, compute_check};
use neam_service::{ConnectionId, NeamConnection, NeamError, ServerConfig, ServerHandler};
use neam_testsuite::{Device, TestServer, build_header};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Fixtures
// ============================================================================

fn at(second: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 15)
        .and_then(|date| date.and_hms_opt(8, 30, second))
        .unwrap()
}

fn ack_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 15)
        .and_then(|date| date.and_hms_opt(8, 31, 0))
        .unwrap()
}

#[derive(Default)]
struct Collector {
    readings: Mutex<Vec<(String, String, String)>>,
    rejected: Mutex<Vec<String>>,
}

#[async_trait]
impl ServerHandler for Collector {
    async fn on_message(
        &self,
        _id: ConnectionId,
        _conn: &NeamConnection,
        header: &ParsedHeader,
        message: &NeamMessage,
    ) {
        self.readings.lock().await.push((
            header.data_type.clone(),
            header.mn.clone(),
            message.data.clone(),
        ));
    }

    async fn on_rejected(&self, _id: ConnectionId, _conn: &NeamConnection, error: &NeamError) {
        self.rejected.lock().await.push(error.to_string());
    }
}

async fn start(collector: Arc<Collector>) -> TestServer {
    TestServer::start(ServerConfig::default(), collector, ack_time())
        .await
        .unwrap()
}

fn frame(header: &str, body: &str) -> Vec<u8> {
    let mut wire = format!("{header}@@@{body}tek").into_bytes();
    let code = compute_check(&wire);
    wire.extend_from_slice(code.as_bytes());
    wire.extend_from_slice(b"####");
    wire
}

// ============================================================================
// Acknowledgments
// ============================================================================

#[tokio::test]
async fn test_ack_echoes_header_with_valid_checksum() {
    let collector = Arc::new(Collector::default());
    let server = start(collector.clone()).await;
    let mut device = Device::connect(server.addr(), "MN20240315000001", MessageType::Jz12)
        .await
        .unwrap();

    let header = device.header(&at(0)).unwrap();
    let ack = device.report(&at(0), "a34004-Avg=12.5").await.unwrap();

    assert_eq!(ack.header, header);
    assert_eq!(ack.timestamp().unwrap(), ack_time());

    // The codec already checked it; check again from first principles
    let signed = format!("{}@@@{}tek", ack.header, ack.time);
    assert!(check_code(signed.as_bytes(), ack.checksum.as_bytes()));

    let readings = collector.readings.lock().await.clone();
    assert_eq!(
        readings,
        vec![(
            "JZ12".to_string(),
            "MN20240315000001".to_string(),
            "a34004-Avg=12.5".to_string()
        )]
    );
}

#[tokio::test]
async fn test_every_catalogued_type_is_acknowledged() {
    let collector = Arc::new(Collector::default());
    let server = start(collector.clone()).await;

    for (n, kind) in MessageType::ALL.into_iter().enumerate() {
        let mut device = Device::connect(server.addr(), format!("DEV{n:04}"), kind)
            .await
            .unwrap();
        let ack = device.report(&at(1), "a01=1").await.unwrap();
        assert!(ack.header.starts_with(kind.code()));
    }
    assert_eq!(
        collector.readings.lock().await.len(),
        MessageType::ALL.len()
    );
}

#[tokio::test]
async fn test_chinese_reading_round_trips() {
    let collector = Arc::new(Collector::default());
    let server = start(collector.clone()).await;
    let mut device = Device::connect(server.addr(), "站点01", MessageType::Bn01)
        .await
        .unwrap();

    let ack = device.report(&at(2), "状态=正常").await.unwrap();
    assert!(ack.header.starts_with("bn01站点01"));

    let readings = collector.readings.lock().await.clone();
    assert_eq!(readings[0].1, "站点01");
    assert_eq!(readings[0].2, "状态=正常");
}

#[tokio::test]
async fn test_readings_are_acknowledged_in_order() {
    let collector = Arc::new(Collector::default());
    let server = start(collector.clone()).await;
    let mut device = Device::connect(server.addr(), "DEV0001", MessageType::Bn01)
        .await
        .unwrap();

    let mut headers = Vec::new();
    for second in 0..10 {
        headers.push(device.send(&at(second), &format!("n={second}")).await.unwrap());
    }
    for header in headers {
        let ack = device.recv_ack(Duration::from_secs(5)).await.unwrap().unwrap();
        assert_eq!(ack.header, header);
    }

    let data: Vec<String> = collector
        .readings
        .lock()
        .await
        .iter()
        .map(|(_, _, data)| data.clone())
        .collect();
    assert_eq!(data, (0..10).map(|n| format!("n={n}")).collect::<Vec<_>>());
}

// ============================================================================
// Rejections
// ============================================================================

#[tokio::test]
async fn test_wrong_declared_length_gets_no_ack() {
    let collector = Arc::new(Collector::default());
    let server = start(collector.clone()).await;
    let mut device = Device::connect(server.addr(), "DEV0001", MessageType::Bn01)
        .await
        .unwrap();

    let header = build_header("bn01", "DEV0001", &at(0)).unwrap();
    let short = format!("{}{:04x}", &header[..header.len() - 4], header.len() - 5);
    device.send_raw(&frame(&short, "a01=1")).await.unwrap();

    assert!(device.recv_ack(Duration::from_millis(300)).await.is_err());
    assert_eq!(collector.rejected.lock().await.len(), 1);
    assert!(collector.readings.lock().await.is_empty());
    assert_eq!(server.server.connection_count(), 1);
}

#[tokio::test]
async fn test_bad_checksum_gets_no_ack_and_connection_stays_open() {
    let collector = Arc::new(Collector::default());
    let server = start(collector.clone()).await;
    let mut device = Device::connect(server.addr(), "DEV0001", MessageType::Bn01)
        .await
        .unwrap();

    let header = device.header(&at(0)).unwrap();
    let mut wire = frame(&header, "a01=1");
    let at_code = wire.len() - 6;
    wire[at_code] = if wire[at_code] == b'a' { b'b' } else { b'a' };
    device.send_raw(&wire).await.unwrap();

    assert!(device.recv_ack(Duration::from_millis(300)).await.is_err());
    let rejected = collector.rejected.lock().await.clone();
    assert_eq!(rejected.len(), 1);
    assert!(rejected[0].contains("checksum"));
    assert_eq!(server.server.connection_count(), 1);
    assert!(server.server.device_connection("DEV0001").is_none());
}

#[tokio::test]
async fn test_bad_end_tag_gets_no_ack() {
    let collector = Arc::new(Collector::default());
    let server = start(collector.clone()).await;
    let mut device = Device::connect(server.addr(), "DEV0001", MessageType::Bn01)
        .await
        .unwrap();

    let header = device.header(&at(0)).unwrap();
    let mut wire = frame(&header, "a01=1");
    let len = wire.len();
    wire[len - 4..].copy_from_slice(b"#**#");
    device.send_raw(&wire).await.unwrap();

    assert!(device.recv_ack(Duration::from_millis(300)).await.is_err());
    let rejected = collector.rejected.lock().await.clone();
    assert_eq!(rejected.len(), 1);
    assert!(rejected[0].contains("end tag"));
}

// ============================================================================
// Registry
// ============================================================================

#[tokio::test]
async fn test_device_index_follows_connections() {
    let collector = Arc::new(Collector::default());
    let server = start(collector).await;

    let mut first = Device::connect(server.addr(), "DEV0001", MessageType::Bn01)
        .await
        .unwrap();
    let mut second = Device::connect(server.addr(), "DEV0002", MessageType::Bn01)
        .await
        .unwrap();
    first.report(&at(0), "a01=1").await.unwrap();
    second.report(&at(0), "a01=2").await.unwrap();

    let first_id = server.server.device_connection("DEV0001").unwrap();
    let second_id = server.server.device_connection("DEV0002").unwrap();
    assert_ne!(first_id, second_id);
    assert_eq!(server.server.snapshot().known_devices, 2);

    drop(first);
    assert!(
        server
            .wait_until(|server| server.device_connection("DEV0001").is_none())
            .await
    );
    assert_eq!(server.server.connection_count(), 1);
    assert_eq!(server.server.device_connection("DEV0002"), Some(second_id));
    assert!(server.server.connection_info(first_id).is_none());
}

#[tokio::test]
async fn test_many_devices_concurrently() {
    let collector = Arc::new(Collector::default());
    let server = start(collector.clone()).await;

    let mut tasks = Vec::new();
    for n in 0..16 {
        let addr = server.addr();
        tasks.push(tokio::spawn(async move {
            let mut device = Device::connect(addr, format!("DEV{n:04}"), MessageType::Jz16)
                .await
                .unwrap();
            for second in 0..5 {
                device.report(&at(second), "a01=1").await.unwrap();
            }
            device
        }));
    }
    let mut devices = Vec::new();
    for task in tasks {
        devices.push(task.await.unwrap());
    }

    assert_eq!(collector.readings.lock().await.len(), 80);
    assert_eq!(server.server.connection_count(), 16);
    assert_eq!(server.server.snapshot().known_devices, 16);
    let metrics = server.server.metrics().snapshot();
    assert_eq!(metrics.frames_accepted, 80);
    assert_eq!(metrics.acks_sent, 80);
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test]
async fn test_drain_closes_every_device() {
    let collector = Arc::new(Collector::default());
    let server = start(collector).await;

    let mut devices = Vec::new();
    for n in 0..4 {
        let mut device = Device::connect(server.addr(), format!("DEV{n:04}"), MessageType::Bn01)
            .await
            .unwrap();
        device.report(&at(0), "a01=1").await.unwrap();
        devices.push(device);
    }

    server.server.close();
    let remaining = tokio::time::timeout(
        Duration::from_secs(10),
        server.server.graceful_down(CancellationToken::new()),
    )
    .await
    .unwrap();

    assert_eq!(remaining, 0);
    assert_eq!(server.server.snapshot().known_devices, 0);
    for device in &mut devices {
        assert!(device.recv_ack(Duration::from_secs(5)).await.unwrap().is_none());
    }
    assert!(server.accept.await.unwrap().is_ok());
}
