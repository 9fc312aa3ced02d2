// tests/metrics_gather.rs
#![cfg(feature = "strict-metrics")]
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use trade_signal_gatherer::ingest::http::HttpFetch;
use trade_signal_gatherer::metrics::Metrics;
use trade_signal_gatherer::{build_sources, gather, GatherConfig, StaticFetcher};

#[tokio::test]
async fn metrics_exposed_after_gathering() {
    // Install a local recorder for the test
    let metrics = Metrics::init(90).expect("recorder");

    let mut cfg = GatherConfig::default();
    cfg.congress.enabled = false;
    cfg.insider.enabled = false;
    cfg.social.enabled = false;
    let xml = std::fs::read_to_string("tests/fixtures/google_news.xml").expect("fixture");
    let fetcher: Arc<dyn HttpFetch> =
        Arc::new(StaticFetcher::new().with_body("news.google.com", xml));

    let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
    let res = gather(build_sources(&cfg, fetcher), now, cfg.deduplicator()).await;
    assert_eq!(res.items.len(), 2);

    // Scrape metrics text and check series presence by substring
    let out = metrics.render();
    for needle in [
        "gather_items_total",
        "gather_dedup_total",
        "gather_parse_ms",
        "gather_last_run_ts",
        "gather_run_timeout_secs",
    ] {
        assert!(out.contains(needle), "metrics exposition missing '{needle}'\n{out}");
    }
}
