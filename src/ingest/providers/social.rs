// src/ingest/providers/social.rs
//! Social timelines: one logical source per watched X handle plus the
//! Truth Social account.
//!
//! X chain: syndication timeline page → syndication CDN (same provider,
//! alternate transport) → Nitter RSS. Truth chain: account statuses API →
//! RSS mirror. Every entry requires structure: a rate-limit or login page
//! served with 200 is a failure, so the alternate transport still runs.

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::ingest::chain::{ChainEntry, FallbackChain};
use crate::ingest::config::GatherConfig;
use crate::ingest::extract::{capture_first, ExtractCtx, Extractor};
use crate::ingest::http::{FetchRequest, HttpFetch, ACCEPT_HTML, ACCEPT_JSON, ACCEPT_XML};
use crate::ingest::orchestrator::LogicalSource;
use crate::ingest::providers::rss;
use crate::ingest::strategy::HttpStrategy;
use crate::ingest::types::{Item, Timestamp};
use crate::ingest::window::{parse_any, parse_rfc3339, parse_twitter, UnknownPolicy};

pub fn x_label(handle: &str) -> String {
    format!("x:@{}", handle.trim().trim_start_matches('@'))
}

pub fn truth_label(handle: &str) -> String {
    format!("truth:@{}", handle.trim().trim_start_matches('@'))
}

// ---- X syndication -----------------------------------------------------------

pub const X_TIMELINE: Extractor = Extractor {
    name: "x-syndication",
    rules: &[next_data_tweets, json_tweets, full_text_scan],
    segmenter: None,
    zero_is_authoritative: false,
};

static RE_NEXT_DATA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<script[^>]*id="__NEXT_DATA__"[^>]*>(.*?)</script>"#).unwrap()
});

fn next_data_tweets(payload: &str, ctx: &ExtractCtx<'_>) -> Option<Vec<Item>> {
    let raw = capture_first(&RE_NEXT_DATA, payload)?;
    let v: Value = serde_json::from_str(raw).ok()?;
    timeline_entries(&v, ctx)
}

/// CDN variant: bare JSON, sometimes wrapping the page HTML in `body`.
fn json_tweets(payload: &str, ctx: &ExtractCtx<'_>) -> Option<Vec<Item>> {
    let v: Value = serde_json::from_str(payload.trim()).ok()?;
    if let Some(body) = v.get("body").and_then(Value::as_str) {
        return next_data_tweets(body, ctx);
    }
    timeline_entries(&v, ctx)
}

fn timeline_entries(v: &Value, ctx: &ExtractCtx<'_>) -> Option<Vec<Item>> {
    let entries = v
        .pointer("/props/pageProps/timeline/entries")
        .or_else(|| v.pointer("/timeline/entries"))?
        .as_array()?;

    let handle = ctx.source.strip_prefix("x:@").unwrap_or(ctx.source);
    let out = entries
        .iter()
        .filter_map(|e| e.pointer("/content/tweet"))
        .filter_map(|t| {
            let text = t
                .get("full_text")
                .or_else(|| t.get("text"))
                .and_then(Value::as_str)?;
            let ts = t
                .get("created_at")
                .and_then(Value::as_str)
                .map(|d| parse_tweet_time(d, ctx))
                .unwrap_or(Timestamp::Unknown);
            let url = t
                .get("permalink")
                .and_then(Value::as_str)
                .map(|p| format!("https://x.com{p}"))
                .or_else(|| {
                    t.get("id_str")
                        .and_then(Value::as_str)
                        .map(|id| format!("https://x.com/{handle}/status/{id}"))
                });
            Item::new(ctx.source, text, ts).map(|it| it.with_url(url))
        })
        .collect();
    Some(out)
}

fn parse_tweet_time(raw: &str, ctx: &ExtractCtx<'_>) -> Timestamp {
    match parse_twitter(raw) {
        t if t.is_known() => t,
        _ => parse_any(raw, ctx.now),
    }
}

static RE_FULL_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""full_text"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap());
static RE_CREATED_AT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""created_at"\s*:\s*"([^"]+)""#).unwrap());

const CREATED_AT_LOOKBACK: usize = 2000;

/// Last resort when the embedded JSON does not parse: scan for tweet bodies
/// and pair each with the nearest preceding `created_at`.
fn full_text_scan(payload: &str, ctx: &ExtractCtx<'_>) -> Option<Vec<Item>> {
    let mut out = Vec::new();
    for caps in RE_FULL_TEXT.captures_iter(payload) {
        let Some(m) = caps.get(1) else { continue };
        let Ok(text) = serde_json::from_str::<String>(&format!("\"{}\"", m.as_str())) else {
            continue;
        };

        let mut start = m.start().saturating_sub(CREATED_AT_LOOKBACK);
        while !payload.is_char_boundary(start) {
            start += 1;
        }
        let ts = RE_CREATED_AT
            .captures_iter(&payload[start..m.start()])
            .last()
            .and_then(|c| c.get(1))
            .map(|d| parse_tweet_time(d.as_str(), ctx))
            .unwrap_or(Timestamp::Unknown);

        if let Some(item) = Item::new(ctx.source, &text, ts) {
            out.push(item);
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

// ---- Truth Social ------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    content: String,
    created_at: Option<String>,
    url: Option<String>,
    #[serde(default)]
    reblog: Option<Value>,
}

pub const TRUTH_STATUSES: Extractor = Extractor {
    name: "truth-statuses",
    rules: &[truth_statuses],
    segmenter: None,
    zero_is_authoritative: true,
};

fn truth_statuses(payload: &str, ctx: &ExtractCtx<'_>) -> Option<Vec<Item>> {
    let statuses: Vec<Status> = serde_json::from_str(payload).ok()?;
    let out = statuses
        .into_iter()
        .filter(|s| s.reblog.as_ref().map_or(true, Value::is_null))
        .filter_map(|s| {
            let ts = s
                .created_at
                .as_deref()
                .map(parse_rfc3339)
                .unwrap_or(Timestamp::Unknown);
            Item::new(ctx.source, &s.content, ts).map(|it| it.with_url(s.url))
        })
        .collect();
    Some(out)
}

// ---- chains ------------------------------------------------------------------

pub fn sources(cfg: &GatherConfig, fetcher: Arc<dyn HttpFetch>) -> Vec<LogicalSource> {
    let c = &cfg.social;
    if !c.enabled {
        return Vec::new();
    }
    let timeout = Duration::from_secs(c.timeout_secs);
    let mut out = Vec::new();

    for handle in &c.x_handles {
        let handle = handle.trim().trim_start_matches('@');
        if handle.is_empty() {
            continue;
        }
        let label = x_label(handle);

        let page = FetchRequest::get(
            format!("https://syndication.twitter.com/srv/timeline-profile/screen-name/{handle}"),
            &cfg.user_agent,
            ACCEPT_HTML,
            timeout,
        );
        let cdn = FetchRequest::get(
            format!("https://cdn.syndication.twimg.com/timeline/profile?screen_name={handle}"),
            &cfg.user_agent,
            ACCEPT_JSON,
            timeout,
        );
        let nitter = FetchRequest::get(
            format!("{}/{handle}/rss", c.nitter_base.trim_end_matches('/')),
            &cfg.user_agent,
            ACCEPT_XML,
            timeout,
        );

        let chain = FallbackChain::new()
            .then(ChainEntry::new(
                "x-syndication",
                HttpStrategy::new("x-syndication", &label, page, X_TIMELINE, fetcher.clone())
                    .unknown_policy(UnknownPolicy::Drop)
                    .requires_structure(true),
            ))
            .then(ChainEntry::new(
                "x-syndication",
                HttpStrategy::new("x-syndication-cdn", &label, cdn, X_TIMELINE, fetcher.clone())
                    .unknown_policy(UnknownPolicy::Drop)
                    .requires_structure(true),
            ))
            .then(ChainEntry::new(
                "nitter",
                HttpStrategy::new("nitter-rss", &label, nitter, rss::POSTS, fetcher.clone())
                    .unknown_policy(UnknownPolicy::Drop)
                    .requires_structure(true),
            ));
        out.push(LogicalSource::new(label, chain));
    }

    if let Some(truth) = &c.truth {
        let label = truth_label(&truth.handle);
        let api = FetchRequest::get(
            format!(
                "https://truthsocial.com/api/v1/accounts/{}/statuses?exclude_replies=true&limit=20",
                truth.account_id
            ),
            &cfg.user_agent,
            ACCEPT_JSON,
            timeout,
        );
        let mirror = FetchRequest::get(&c.truth_mirror_url, &cfg.user_agent, ACCEPT_XML, timeout);

        let chain = FallbackChain::new()
            .then(ChainEntry::new(
                "truthsocial",
                HttpStrategy::new("truth-statuses", &label, api, TRUTH_STATUSES, fetcher.clone())
                    .unknown_policy(UnknownPolicy::Drop)
                    .requires_structure(true),
            ))
            .then(ChainEntry::new(
                "truth-mirror",
                HttpStrategy::new("truth-mirror-rss", &label, mirror, rss::POSTS, fetcher)
                    .unknown_policy(UnknownPolicy::Drop)
                    .requires_structure(true),
            ));
        out.push(LogicalSource::new(label, chain));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn ctx() -> ExtractCtx<'static> {
        ExtractCtx {
            source: "x:@DeItaone",
            now: Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap(),
        }
    }

    fn at(h: u32, m: u32) -> Timestamp {
        let dt: DateTime<Utc> = Utc.with_ymd_and_hms(2026, 10, 16, h, m, 0).unwrap();
        Timestamp::Instant(dt)
    }

    #[test]
    fn labels_strip_leading_at() {
        assert_eq!(x_label("@DeItaone"), "x:@DeItaone");
        assert_eq!(truth_label("realDonaldTrump"), "truth:@realDonaldTrump");
    }

    #[test]
    fn next_data_entries_become_items() {
        let html = r#"<html><script id="__NEXT_DATA__" type="application/json">
{"props":{"pageProps":{"timeline":{"entries":[
 {"type":"tweet","content":{"tweet":{"full_text":"*FED'S WALLER SAYS RATE CUTS STILL LIKELY","created_at":"Fri Oct 16 10:30:00 +0000 2026","id_str":"111"}}},
 {"type":"tweet","content":{"tweet":{"text":"older &amp; plain","created_at":"Fri Oct 16 09:00:00 +0000 2026","permalink":"/DeItaone/status/110"}}},
 {"type":"cursor","content":{}}
]}}}}</script></html>"#;
        let items = X_TIMELINE.extract(html, &ctx());
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].text, "*FED'S WALLER SAYS RATE CUTS STILL LIKELY");
        assert_eq!(items[0].timestamp, at(10, 30));
        assert_eq!(items[0].url.as_deref(), Some("https://x.com/DeItaone/status/111"));
        assert_eq!(items[1].text, "older & plain");
        assert_eq!(items[1].url.as_deref(), Some("https://x.com/DeItaone/status/110"));
    }

    #[test]
    fn broken_json_falls_back_to_full_text_scan() {
        let html = r#"<script id="__NEXT_DATA__">{"entries":[{"created_at":"Fri Oct 16 11:00:00 +0000 2026","full_text":"Oil \"spikes\" as Brent jumps 4%"},{"full_text":"no date"} BROKEN"#;
        let items = X_TIMELINE.extract(html, &ctx());
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].text, "Oil \"spikes\" as Brent jumps 4%");
        assert_eq!(items[0].timestamp, at(11, 0));
        // The nearest preceding created_at is reused within the lookback.
        assert_eq!(items[1].timestamp, at(11, 0));
    }

    #[test]
    fn cdn_json_body_is_unwrapped() {
        let inner = r#"<script id="__NEXT_DATA__" type="application/json">{"props":{"pageProps":{"timeline":{"entries":[{"content":{"tweet":{"full_text":"cdn copy","created_at":"Fri Oct 16 08:00:00 +0000 2026"}}}]}}}}</script>"#;
        let payload = serde_json::json!({ "body": inner }).to_string();
        let items = X_TIMELINE.extract(&payload, &ctx());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].timestamp, at(8, 0));
    }

    #[test]
    fn truth_statuses_skip_reblogs_and_blank_posts() {
        let json = r#"[
 {"id":"1","created_at":"2026-10-16T10:00:00.000Z","content":"<p>Tariffs on China go to 100% on Nov 1</p>","url":"https://truthsocial.com/@realDonaldTrump/1","reblog":null},
 {"id":"2","created_at":"2026-10-16T09:00:00.000Z","content":"","reblog":{"id":"0"}},
 {"id":"3","created_at":"2026-10-16T08:00:00.000Z","content":"<p></p>"}
]"#;
        let c = ExtractCtx {
            source: "truth:@realDonaldTrump",
            now: ctx().now,
        };
        let items = TRUTH_STATUSES.extract(json, &c);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text, "Tariffs on China go to 100% on Nov 1");
        assert_eq!(items[0].timestamp, at(10, 0));
    }

    #[test]
    fn truth_html_error_page_is_unrecognized() {
        assert_eq!(
            TRUTH_STATUSES.run("<html>Just a moment...</html>", &ctx()),
            crate::ingest::extract::Extraction::Unrecognized
        );
    }
}
