// src/ingest/mod.rs
pub mod chain;
pub mod config;
pub mod dedup;
pub mod extract;
pub mod http;
pub mod orchestrator;
pub mod providers;
pub mod strategy;
pub mod types;
pub mod window;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;

pub use chain::{ChainEntry, ChainOutcome, FallbackChain};
pub use dedup::Deduplicator;
pub use orchestrator::{gather, LogicalSource, RunResult};
pub use types::{FetchError, FetchOutcome, Item, SourceStrategy, Timestamp, TransactionType};
pub use window::UnknownPolicy;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("gather_items_total", "Items returned by a gathering run.");
        describe_counter!(
            "gather_strategy_failures_total",
            "Strategy attempts that failed and moved the chain forward."
        );
        describe_counter!(
            "gather_sources_exhausted_total",
            "Logical sources whose whole fallback chain failed."
        );
        describe_counter!("gather_dedup_total", "Items removed by prefix deduplication.");
        describe_histogram!("gather_parse_ms", "Extraction time in milliseconds.");
        describe_gauge!("gather_last_run_ts", "Unix ts when the last gathering run finished.");
    });
}

static RE_CDATA: Lazy<Regex> = Lazy::new(|| Regex::new(r"<!\[CDATA\[|\]\]>").unwrap());
static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<[a-z/!][^>]*>").unwrap());
/// Escaped markup, matched only when it reads like a real tag: bare or closing
/// known tags, or known tags carrying `name=value` attributes.
static RE_DECODED_TAGS: Lazy<Regex> = Lazy::new(|| {
    const TAGS: &str = "a|abbr|b|blockquote|br|cite|div|em|font|h[1-6]|hr|i|img|li|ol|p|small|span|strong|sub|sup|table|tbody|td|th|thead|tr|u|ul";
    Regex::new(&format!(
        r#"(?i)</?(?:{TAGS})\s*/?>|<(?:{TAGS})(?:\s+[a-z][a-z0-9-]*\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>"']+))+\s*/?>"#
    ))
    .unwrap()
});
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const MAX_TEXT_CHARS: usize = 1500;

/// Normalize text: drop CDATA markers and tags, decode entities, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) CDATA markers + tags
    let out = RE_CDATA.replace_all(s, "");
    let out = RE_TAGS.replace_all(&out, " ");

    // 2) HTML entity decode, then strip markup that was only escaped before
    let decoded = html_escape::decode_html_entities(&out);
    let out = RE_DECODED_TAGS.replace_all(&decoded, " ");

    // 3) Normalize “ ” ‘ ’ to ASCII quotes
    let out = out
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace (incl. nbsp)
    let out = RE_WS.replace_all(&out, " ");
    let mut out = out.trim().to_string();

    // 5) Length cap
    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }

    out
}
