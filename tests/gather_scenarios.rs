// tests/gather_scenarios.rs
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use trade_signal_gatherer::ingest::chain::{ChainEntry, FallbackChain};
use trade_signal_gatherer::ingest::http::{FetchRequest, HttpFetch, StaticFetcher, ACCEPT_XML};
use trade_signal_gatherer::ingest::providers::rss;
use trade_signal_gatherer::ingest::strategy::HttpStrategy;
use trade_signal_gatherer::ingest::{
    gather, Deduplicator, FetchError, FetchOutcome, LogicalSource, SourceStrategy,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
}

/// Minimal RSS body; `items` are (title, RFC 2822 pubDate).
fn feed(items: &[(&str, &str)]) -> String {
    let body: String = items
        .iter()
        .map(|(t, d)| format!("<item><title>{t}</title><pubDate>{d}</pubDate></item>"))
        .collect();
    format!("<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>t</title>{body}</channel></rss>")
}

fn strategy(name: &str, label: &str, url: &str, fetcher: &Arc<StaticFetcher>) -> HttpStrategy {
    let f: Arc<dyn HttpFetch> = fetcher.clone();
    let req = FetchRequest::get(url, "test-agent/1.0", ACCEPT_XML, Duration::from_secs(5));
    HttpStrategy::new(name, label, req, rss::HEADLINES, f)
}

fn timeout_err(url: &str) -> FetchError {
    FetchError::Timeout {
        url: url.into(),
        timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn scenario_a_fallback_and_exhaustion_are_reported_per_source() {
    let fetcher = Arc::new(
        StaticFetcher::new()
            .with_body(
                "alpha.test/feed",
                feed(&[
                    ("Alpha first headline about the Dow", "Fri, 16 Oct 2026 10:00:00 GMT"),
                    ("Alpha second headline about bonds", "Fri, 16 Oct 2026 09:00:00 GMT"),
                ]),
            )
            .with_error("beta.test/primary", timeout_err("http://beta.test/primary"))
            .with_body(
                "beta.test/backup",
                feed(&[("Beta backup headline on oil", "Fri, 16 Oct 2026 11:00:00 GMT")]),
            )
            .with_error("gamma.test/one", timeout_err("http://gamma.test/one")),
        // gamma.test/two is unrouted: HTTP 404
    );

    let sources = vec![
        LogicalSource::new(
            "alpha",
            FallbackChain::new().then(ChainEntry::new(
                "alpha",
                strategy("alpha", "alpha", "http://alpha.test/feed", &fetcher),
            )),
        ),
        LogicalSource::new(
            "beta",
            FallbackChain::new()
                .then(ChainEntry::new(
                    "beta-primary",
                    strategy("beta-primary", "beta", "http://beta.test/primary", &fetcher),
                ))
                .then(ChainEntry::new(
                    "beta-backup",
                    strategy("beta-backup", "beta", "http://beta.test/backup", &fetcher),
                )),
        ),
        LogicalSource::new(
            "gamma",
            FallbackChain::new()
                .then(ChainEntry::new(
                    "gamma-1",
                    strategy("gamma-1", "gamma", "http://gamma.test/one", &fetcher),
                ))
                .then(ChainEntry::new(
                    "gamma-2",
                    strategy("gamma-2", "gamma", "http://gamma.test/two", &fetcher),
                )),
        ),
    ];

    let res = gather(sources, now(), Deduplicator::default()).await;
    assert_eq!(res.items.len(), 3);
    assert_eq!(res.items.iter().filter(|i| i.source == "alpha").count(), 2);
    assert_eq!(res.items.iter().filter(|i| i.source == "beta").count(), 1);
    assert_eq!(res.source_errors.iter().collect::<Vec<_>>(), vec!["gamma"]);
    assert_eq!(res.generated_at, now());
}

#[tokio::test]
async fn scenario_b_shared_prefix_collapses_to_first() {
    let fetcher = Arc::new(StaticFetcher::new().with_body(
        "news.test",
        feed(&[
            (
                "Stocks slide as Treasury yields hit highest level since 2007 - Reuters",
                "Fri, 16 Oct 2026 10:00:00 GMT",
            ),
            (
                "STOCKS SLIDE AS TREASURY YIELDS HIT HIGHEST LEVEL SINCE 2007 - AP",
                "Fri, 16 Oct 2026 10:05:00 GMT",
            ),
        ]),
    ));
    let sources = vec![LogicalSource::new(
        "news",
        FallbackChain::new().then(ChainEntry::new(
            "news",
            strategy("news", "news", "http://news.test/rss", &fetcher),
        )),
    )];

    let res = gather(sources, now(), Deduplicator::default()).await;
    assert_eq!(res.items.len(), 1);
    assert!(res.items[0].text.ends_with("Reuters"));
    assert!(res.source_errors.is_empty());
}

#[tokio::test]
async fn scenario_c_quiet_day_is_empty_without_errors() {
    let fetcher = Arc::new(
        StaticFetcher::new()
            .with_body("one.test", feed(&[]))
            .with_body(
                "two.test",
                feed(&[("Only stale news here", "Mon, 12 Oct 2026 10:00:00 GMT")]),
            ),
    );
    let sources = vec![
        LogicalSource::new(
            "one",
            FallbackChain::new().then(ChainEntry::new("one", strategy("one", "one", "http://one.test", &fetcher))),
        ),
        LogicalSource::new(
            "two",
            FallbackChain::new().then(ChainEntry::new("two", strategy("two", "two", "http://two.test", &fetcher))),
        ),
    ];

    let res = gather(sources, now(), Deduplicator::default()).await;
    assert!(res.is_quiet());
    assert!(res.source_errors.is_empty());

    let v = serde_json::to_value(&res).unwrap();
    assert_eq!(v["items"], serde_json::json!([]));
    assert_eq!(v["sourceErrors"], serde_json::json!([]));
}

struct Stalls;

#[async_trait]
impl SourceStrategy for Stalls {
    async fn attempt(&self, _now: DateTime<Utc>) -> FetchOutcome {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        FetchOutcome::Empty
    }
    fn name(&self) -> &str {
        "stalls"
    }
}

#[tokio::test(start_paused = true)]
async fn run_deadline_discards_everything() {
    let fetcher = Arc::new(StaticFetcher::new().with_body(
        "fast.test",
        feed(&[("Fast source headline", "Fri, 16 Oct 2026 10:00:00 GMT")]),
    ));
    let sources = vec![
        LogicalSource::new(
            "fast",
            FallbackChain::new().then(ChainEntry::new("fast", strategy("fast", "fast", "http://fast.test", &fetcher))),
        ),
        LogicalSource::new("slow", FallbackChain::new().then(ChainEntry::new("slow", Stalls))),
    ];

    let out = tokio::time::timeout(
        Duration::from_secs(90),
        gather(sources, now(), Deduplicator::default()),
    )
    .await;
    assert!(out.is_err(), "a stalled source must not produce a partial result");
}

#[tokio::test]
async fn one_source_failing_does_not_reduce_others() {
    let fetcher = Arc::new(StaticFetcher::new().with_body(
        "ok.test",
        feed(&[
            ("Healthy source item one", "Fri, 16 Oct 2026 10:00:00 GMT"),
            ("Healthy source item two", "Fri, 16 Oct 2026 10:30:00 GMT"),
        ]),
    ));
    let alone = gather(
        vec![LogicalSource::new(
            "ok",
            FallbackChain::new().then(ChainEntry::new("ok", strategy("ok", "ok", "http://ok.test", &fetcher))),
        )],
        now(),
        Deduplicator::default(),
    )
    .await;

    let with_failure = gather(
        vec![
            LogicalSource::new(
                "ok",
                FallbackChain::new().then(ChainEntry::new("ok", strategy("ok", "ok", "http://ok.test", &fetcher))),
            ),
            LogicalSource::new(
                "down",
                FallbackChain::new().then(ChainEntry::new(
                    "down",
                    strategy("down", "down", "http://down.test", &fetcher),
                )),
            ),
        ],
        now(),
        Deduplicator::default(),
    )
    .await;

    assert_eq!(alone.items, with_failure.items);
    assert_eq!(with_failure.source_errors.iter().collect::<Vec<_>>(), vec!["down"]);
}
