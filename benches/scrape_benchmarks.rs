use arris_exporter::{
    scrape::{html, parse_decibels, parse_frequency},
    ChannelMetrics, PageFetcher, Poller, Result, Status, StatusSnapshot,
};
use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

const STATUS_HTML: &str = include_str!("../tests/fixtures/status.html");

struct FixtureFetcher;

#[async_trait]
impl PageFetcher for FixtureFetcher {
    async fn fetch(&self, _url: &str) -> Result<String> {
        Ok(STATUS_HTML.to_string())
    }
}

/// Benchmark cell value parsing
fn bench_field_parsing(c: &mut Criterion) {
    c.bench_function("parse_frequency", |b| {
        b.iter(|| parse_frequency(black_box("579000000 Hz")).expect("Should parse"))
    });

    c.bench_function("parse_decibels", |b| {
        b.iter(|| parse_decibels(black_box("-1.3 dBmV")).expect("Should parse"))
    });
}

/// Benchmark document parsing alone
fn bench_document_parse(c: &mut Criterion) {
    c.bench_function("document_parse", |b| {
        b.iter(|| html::parse_document(black_box(STATUS_HTML)).expect("Should parse"))
    });
}

/// Benchmark a full scrape of the status page, steady state and cold
fn bench_status_scrape(c: &mut Criterion) {
    let mut status = Status::default();
    status.scrape_body(STATUS_HTML).expect("Should scrape");

    c.bench_function("status_scrape_steady", |b| {
        b.iter(|| status.scrape_body(black_box(STATUS_HTML)).expect("Should scrape"))
    });

    c.bench_function("status_scrape_cold", |b| {
        b.iter(|| {
            let mut status = Status::new(Arc::new(ChannelMetrics::default()));
            status.scrape_body(black_box(STATUS_HTML)).expect("Should scrape")
        })
    });
}

/// Benchmark metric collection while channels are registered
fn bench_metrics_encode(c: &mut Criterion) {
    let metrics = Arc::new(ChannelMetrics::default());
    let mut status = Status::new(metrics.clone());
    status.scrape_body(STATUS_HTML).expect("Should scrape");

    c.bench_function("metrics_gather", |b| b.iter(|| metrics.gather()));
    c.bench_function("metrics_encode", |b| {
        b.iter(|| metrics.encode().expect("Should encode"))
    });
}

/// Benchmark JSON round trip of the status snapshot
fn bench_snapshot_json(c: &mut Criterion) {
    let mut status = Status::default();
    status.scrape_body(STATUS_HTML).expect("Should scrape");
    let snapshot = status.snapshot();
    let json = serde_json::to_string(&snapshot).expect("Should serialize");

    c.bench_function("snapshot_serialization", |b| {
        b.iter(|| serde_json::to_string(&snapshot).expect("Should serialize"))
    });

    c.bench_function("snapshot_deserialization", |b| {
        b.iter(|| serde_json::from_str::<StatusSnapshot>(&json).expect("Should deserialize"))
    });
}

/// Benchmark poll cycles against readers holding the shared status
fn bench_poll_cycle(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Should create tokio runtime");

    for readers in [0usize, 2, 8].iter() {
        c.bench_with_input(
            BenchmarkId::new("poll_cycle_with_readers", readers),
            readers,
            |b, &readers| {
                b.to_async(&rt).iter(|| async move {
                    let status = Arc::new(RwLock::new(Status::default()));
                    let poller = Poller::new(
                        status.clone(),
                        Arc::new(FixtureFetcher),
                        Duration::from_secs(60),
                    );

                    let handles: Vec<_> = (0..readers)
                        .map(|_| {
                            let status = status.clone();
                            tokio::spawn(async move {
                                let snapshot = status.read().await.snapshot();
                                snapshot
                            })
                        })
                        .collect();

                    poller.poll_once().await.expect("Should poll");
                    for handle in handles {
                        handle.await.expect("Reader should finish");
                    }
                })
            },
        );
    }
}

criterion_group!(
    benches,
    bench_field_parsing,
    bench_document_parse,
    bench_status_scrape,
    bench_metrics_encode,
    bench_snapshot_json,
    bench_poll_cycle
);

criterion_main!(benches);
