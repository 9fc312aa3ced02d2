// src/ingest/providers/news.rs
//! Market headlines: Google News search RSS (several queries, merged in
//! query order) → Yahoo Finance headline RSS.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::ingest::chain::{ChainEntry, FallbackChain};
use crate::ingest::config::GatherConfig;
use crate::ingest::http::{FetchRequest, HttpFetch, ACCEPT_XML};
use crate::ingest::orchestrator::LogicalSource;
use crate::ingest::providers::rss;
use crate::ingest::strategy::HttpStrategy;
use crate::ingest::window::UnknownPolicy;

pub const LABEL: &str = "news";

const GOOGLE_NEWS_SEARCH: &str = "https://news.google.com/rss/search";
const YAHOO_HEADLINES: &str = "https://feeds.finance.yahoo.com/rss/2.0/headline";

/// Search URL restricted to the last day.
pub fn google_news_url(query: &str) -> Option<String> {
    let q = format!("{} when:1d", query.trim());
    reqwest::Url::parse_with_params(
        GOOGLE_NEWS_SEARCH,
        [("q", q.as_str()), ("hl", "en-US"), ("gl", "US"), ("ceid", "US:en")],
    )
    .ok()
    .map(String::from)
}

pub fn yahoo_url(symbols: &[String]) -> Option<String> {
    let s = symbols
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(",");
    if s.is_empty() {
        return None;
    }
    reqwest::Url::parse_with_params(
        YAHOO_HEADLINES,
        [("s", s.as_str()), ("region", "US"), ("lang", "en-US")],
    )
    .ok()
    .map(String::from)
}

pub fn source(cfg: &GatherConfig, fetcher: Arc<dyn HttpFetch>) -> Option<LogicalSource> {
    let c = &cfg.news;
    if !c.enabled {
        return None;
    }
    let timeout = Duration::from_secs(c.timeout_secs);

    let queries: Vec<FetchRequest> = c
        .queries
        .iter()
        .filter(|q| !q.trim().is_empty())
        .filter_map(|q| {
            let url = google_news_url(q);
            if url.is_none() {
                warn!(target: "gather", query = %q, "could not build news search url");
            }
            url
        })
        .map(|u| FetchRequest::get(u, &cfg.user_agent, ACCEPT_XML, timeout))
        .collect();

    let mut chain = FallbackChain::new();
    if !queries.is_empty() {
        chain = chain.then(ChainEntry::new(
            "google-news",
            HttpStrategy::multi("google-news", LABEL, queries, rss::HEADLINES, fetcher.clone())
                .unknown_policy(UnknownPolicy::Drop)
                .requires_structure(true),
        ));
    }
    if let Some(url) = yahoo_url(&c.yahoo_symbols) {
        let req = FetchRequest::get(url, &cfg.user_agent, ACCEPT_XML, timeout);
        chain = chain.then(ChainEntry::new(
            "yahoo",
            HttpStrategy::new("yahoo-finance", LABEL, req, rss::HEADLINES, fetcher)
                .unknown_policy(UnknownPolicy::Drop)
                .requires_structure(true),
        ));
    }

    if chain.is_empty() {
        warn!(target: "gather", "news enabled but no queries or symbols configured");
        return None;
    }
    Some(LogicalSource::new(LABEL, chain))
}
