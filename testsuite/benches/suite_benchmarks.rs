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

//! Loopback benchmarks for the NEAM server
//!
//! Measures reading-to-acknowledgment latency through a real server, for one device and for
//! several devices reporting at once.

use chrono::NaiveDate;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use neam_codec::MessageType;
use neam_service::{NoopHandler, ServerConfig};
use neam_testsuite::{Device, TestServer};
use std::hint::black_box;
use std::sync::Arc;
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn bench_single_device(c: &mut Criterion) {
    let rt = runtime();
    let time = NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap();
    let (server, mut device) = rt.block_on(async {
        let config = ServerConfig::default().with_tcp_no_delay(true);
        let server = TestServer::start(config, Arc::new(NoopHandler), time)
            .await
            .unwrap();
        let device = Device::connect(server.addr(), "DEV0001", MessageType::Bn01)
            .await
            .unwrap();
        (server, device)
    });

    let mut group = c.benchmark_group("single_device");
    for size in [16usize, 256, 2048] {
        let data = "a".repeat(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("report", size), &data, |b, data| {
            b.iter(|| {
                rt.block_on(async {
                    black_box(device.report(&time, data).await.unwrap());
                })
            });
        });
    }
    group.finish();
    drop(server);
}

fn bench_concurrent_devices(c: &mut Criterion) {
    let rt = runtime();
    let time = NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap();
    let server = rt.block_on(async {
        TestServer::start(ServerConfig::default(), Arc::new(NoopHandler), time)
            .await
            .unwrap()
    });

    let mut group = c.benchmark_group("concurrent_devices");
    for devices in [4usize, 16] {
        group.throughput(Throughput::Elements(devices as u64 * 10));
        group.bench_with_input(
            BenchmarkId::new("ten_reports_each", devices),
            &devices,
            |b, &devices| {
                b.to_async(&rt).iter(|| async {
                    let mut tasks = Vec::with_capacity(devices);
                    for n in 0..devices {
                        let addr = server.addr();
                        tasks.push(tokio::spawn(async move {
                            let mut device =
                                Device::connect(addr, format!("DEV{n:04}"), MessageType::Jz12)
                                    .await
                                    .unwrap();
                            for _ in 0..10 {
                                black_box(device.report(&time, "a01=1").await.unwrap());
                            }
                        }));
                    }
                    for task in tasks {
                        task.await.unwrap();
                    }
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_single_device, bench_concurrent_devices);
criterion_main!(benches);
