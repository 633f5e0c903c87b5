use arris_exporter::{
    error::{ExporterError, Result},
    metrics::ChannelMetrics,
    scrape::{html, Extractor, Page, Status, StatusSnapshot},
    ModemConfig, PageFetcher, Poller, WebConfig,
};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

const STATUS_HTML: &str = include_str!("fixtures/status.html");
const STATUS_JSON: &str = include_str!("fixtures/status.json");

/// Build a minimal status page with the given downstream rows.
fn downstream_page(rows: &[(&str, f64, i64)]) -> String {
    let body: String = rows
        .iter()
        .map(|(id, power, corrected)| {
            format!(
                "<tr><td>{id}</td><td>Locked</td><td>QAM256</td><td>600000000 Hz</td>\
                 <td>{power} dBmV</td><td>40.0 dB</td><td>{corrected}</td><td>0</td></tr>"
            )
        })
        .collect();
    format!(
        "<html><body><table>\
         <tr><th colspan=\"8\"><strong>Downstream Bonded Channels</strong></th></tr>\
         <tr><td>Channel ID</td><td>Lock Status</td></tr>{body}</table></body></html>"
    )
}

struct FixtureFetcher;

#[async_trait]
impl PageFetcher for FixtureFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        assert!(url.ends_with("/cmconnectionstatus.html"), "unexpected url {url}");
        Ok(STATUS_HTML.to_string())
    }
}

fn series_value(text: &str, series: &str) -> Option<f64> {
    text.lines()
        .find_map(|line| line.strip_prefix(series))
        .and_then(|rest| rest.trim().parse().ok())
}

fn power_channels(metrics: &ChannelMetrics) -> Vec<String> {
    metrics
        .gather()
        .iter()
        .filter(|family| family.get_name() == "arris_downstream_power")
        .flat_map(|family| family.get_metric().iter())
        .flat_map(|metric| metric.get_label().iter())
        .map(|label| label.get_value().to_string())
        .collect()
}

/// Test the model step against the fixture page
#[test]
fn test_page_scrape_model() {
    let doc = html::parse_document(STATUS_HTML).expect("fixture should parse");
    let mut page = Page::new();
    let report = page.scrape(&doc);

    assert_eq!(page.model, "SB8200", "Model Version");
    assert_eq!(report.outcome(Extractor::Model), Some(true));
    assert!(report.success());
}

/// Test a full scrape against the golden snapshot
#[test]
fn test_status_scrape_matches_golden() {
    let mut status = Status::default();
    let report = status.scrape_body(STATUS_HTML).expect("fixture should parse");
    assert!(report.success(), "failed steps: {:?}", report.failed());

    let expected: StatusSnapshot = serde_json::from_str(STATUS_JSON).expect("golden should parse");
    let mut actual = status.snapshot();
    assert!(actual.last_scrape.is_some());
    actual.last_scrape = None;

    assert_eq!(actual, expected);
}

/// Test that the display form is the JSON snapshot
#[test]
fn test_status_display_is_json() {
    let mut status = Status::default();
    status.scrape_body(STATUS_HTML).unwrap();

    let json: serde_json::Value = serde_json::from_str(&status.to_string()).unwrap();
    assert_eq!(json["model"], "SB8200");
    assert_eq!(json["downstream"]["33"]["corrected"], 581924);
    assert_eq!(json["upstream"]["4"]["channel"], 1);
}

/// Test that the fixture registers gauges for every downstream channel
#[test]
fn test_fixture_registers_every_downstream_channel() {
    let metrics = Arc::new(ChannelMetrics::default());
    let mut status = Status::new(metrics.clone());
    status.scrape_body(STATUS_HTML).unwrap();

    assert_eq!(metrics.registered(), vec![1, 2, 3, 13, 14, 15, 33]);
    assert_eq!(status.last_sync().registered, vec![1, 2, 3, 13, 14, 15, 33]);

    let text = metrics.encode().unwrap();
    assert_eq!(series_value(&text, "arris_downstream_power{channel=\"33\"}"), Some(-1.3));
    assert_eq!(series_value(&text, "arris_downstream_uncorrectables{channel=\"3\"}"), Some(3.0));
}

/// Test that repeating a scrape leaves tables and registrations unchanged
#[test]
fn test_downstream_step_is_idempotent() {
    let metrics = Arc::new(ChannelMetrics::default());
    let mut status = Status::new(metrics.clone());

    status.scrape_body(STATUS_HTML).unwrap();
    let first = status.snapshot();
    let first_ids = status.downstream_channels().cloned();

    let report = status.scrape_body(STATUS_HTML).unwrap();
    assert!(report.success());
    assert!(status.last_sync().registered.is_empty());
    assert!(status.last_sync().unregistered.is_empty());

    let mut second = status.snapshot();
    second.last_scrape = first.last_scrape;
    assert_eq!(second, first);
    assert_eq!(status.downstream_channels().cloned(), first_ids);
    assert_eq!(power_channels(&metrics).len(), 7);
}

/// Test unregistering a vanished channel and re-registering it when it returns
#[test]
fn test_channel_removed_then_readded() {
    let metrics = Arc::new(ChannelMetrics::default());
    let mut status = Status::new(metrics.clone());

    status
        .scrape_body(&downstream_page(&[("1", 5.0, 10), ("2", 6.0, 20)]))
        .unwrap();
    assert_eq!(status.last_sync().registered, vec![1, 2]);

    status.scrape_body(&downstream_page(&[("1", 5.5, 11)])).unwrap();
    assert_eq!(status.last_sync().unregistered, vec![2]);
    assert!(status.last_sync().registered.is_empty());
    assert_eq!(power_channels(&metrics), vec!["1"]);

    status
        .scrape_body(&downstream_page(&[("2", 7.0, 30), ("1", 5.5, 11)]))
        .unwrap();
    assert_eq!(status.last_sync().registered, vec![2]);
    assert!(status.last_sync().unregistered.is_empty());
    assert_eq!(metrics.registered(), vec![1, 2]);

    let text = metrics.encode().unwrap();
    assert_eq!(series_value(&text, "arris_downstream_power{channel=\"2\"}"), Some(7.0));
    assert_eq!(series_value(&text, "arris_downstream_corrected{channel=\"1\"}"), Some(11.0));
}

/// Test that a malformed id skips only its own row
#[test]
fn test_malformed_row_is_skipped() {
    let mut status = Status::default();
    let report = status
        .scrape_body(&downstream_page(&[("4", 1.0, 1), ("n/a", 2.0, 2), ("8", 3.0, 3)]))
        .unwrap();

    assert_eq!(report.outcome(Extractor::Downstream), Some(true));
    let ids: BTreeSet<u32> = [4, 8].into_iter().collect();
    assert_eq!(status.downstream_channels(), Some(&ids));
    assert_eq!(status.snapshot().downstream.len(), 2);
}

/// Test that a missing table keeps the previous readings
#[test]
fn test_missing_table_keeps_previous_values() {
    let metrics = Arc::new(ChannelMetrics::default());
    let mut status = Status::new(metrics.clone());
    status.scrape_body(STATUS_HTML).unwrap();
    let before = status.snapshot();

    let report = status
        .scrape_body("<html><body><p>Firmware upgrade in progress</p></body></html>")
        .unwrap();
    assert!(!report.success());
    assert_eq!(
        report.failed(),
        vec![
            Extractor::Model,
            Extractor::Startup,
            Extractor::Downstream,
            Extractor::Upstream
        ]
    );

    let after = status.snapshot();
    assert_eq!(after.downstream, before.downstream);
    assert_eq!(after.upstream, before.upstream);
    assert_eq!(after.connectivity, "OK");
    assert_eq!(metrics.registered().len(), 7);
}

/// Test that an empty body is a document error, not a scrape
#[test]
fn test_empty_body_is_document_error() {
    let mut status = Status::default();
    let err = status.scrape_body("").unwrap_err();
    assert!(matches!(err, ExporterError::Html(_)));
    assert!(err.is_transient());
    assert!(status.last_scrape().is_none());
}

/// Test removing steps from a status chain
#[test]
fn test_removed_steps_are_not_run() {
    let mut status = Status::default();
    status
        .page_mut()
        .extractors_mut()
        .remove_many(&[3, 1])
        .unwrap();

    let report = status.scrape_body(STATUS_HTML).unwrap();
    assert_eq!(
        report.outcomes,
        vec![(Extractor::Model, true), (Extractor::Downstream, true)]
    );
    assert!(status.snapshot().upstream.is_empty());
    assert!(status.connectivity.is_empty());
}

/// Test that metric collection during scrapes never sees partial state
#[test]
fn test_concurrent_gather_during_scrapes() {
    let metrics = Arc::new(ChannelMetrics::default());
    let mut status = Status::new(metrics.clone());
    let pages = [
        downstream_page(&[("1", 1.0, 1), ("2", 2.0, 2), ("3", 3.0, 3)]),
        downstream_page(&[("4", 4.0, 4), ("5", 5.0, 5), ("6", 6.0, 6)]),
    ];

    let reader = {
        let metrics = metrics.clone();
        std::thread::spawn(move || {
            for _ in 0..200 {
                let mut channels = power_channels(&metrics);
                channels.sort();
                assert!(
                    channels.is_empty() || channels == ["1", "2", "3"] || channels == ["4", "5", "6"],
                    "partial registry state: {:?}",
                    channels
                );
            }
        })
    };

    for i in 0..100 {
        status.scrape_body(&pages[i % 2]).unwrap();
    }
    reader.join().expect("reader thread should not panic");
}

/// Test one poll cycle end to end against the fixture
#[test]
fn test_poll_once_against_fixture() {
    let metrics = Arc::new(ChannelMetrics::default());
    let status = Arc::new(tokio::sync::RwLock::new(Status::new(metrics.clone())));
    let poller = Poller::new(status.clone(), Arc::new(FixtureFetcher), Duration::from_secs(15));

    let report = tokio_test::block_on(poller.poll_once()).expect("poll should succeed");
    assert!(report.success());

    let snapshot = tokio_test::block_on(status.read()).snapshot();
    assert_eq!(snapshot.model, "SB8200");
    assert_eq!(snapshot.connectivity, "OK");
    assert_eq!(metrics.registered().len(), 7);
}

/// Test configuration builders
#[test]
fn test_configs() {
    let web = WebConfig::default()
        .with_host("127.0.0.1")
        .with_port(9100)
        .with_status_api(false);
    assert_eq!(web.bind_address(), "127.0.0.1:9100");
    assert!(!web.enable_status_api);

    let modem = ModemConfig::new("http://10.0.0.1", "status.html").with_interval_ms(500);
    assert!(modem.validate().is_ok());
    assert_eq!(modem.interval().as_millis(), 500);
}
