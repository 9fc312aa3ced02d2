// src/ingest/providers/insider.rs
//! Corporate insider filings (Form 4).
//!
//! Chain: SEC EDGAR "current filings" Atom feed → OpenInsider screener
//! snapshot. The snapshot table is authoritative: once the table is found,
//! an empty body means no recent trades and the loose row scan is skipped.

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use quick_xml::de::from_str;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;

use crate::ingest::chain::{ChainEntry, FallbackChain};
use crate::ingest::config::GatherConfig;
use crate::ingest::extract::{capture_all, capture_first, ExtractCtx, Extractor};
use crate::ingest::http::{FetchRequest, HttpFetch, ACCEPT_HTML, ACCEPT_XML};
use crate::ingest::normalize_text;
use crate::ingest::orchestrator::LogicalSource;
use crate::ingest::strategy::HttpStrategy;
use crate::ingest::types::{Item, Timestamp, TransactionType};
use crate::ingest::window::{parse_any, parse_rfc3339, UnknownPolicy};

pub const LABEL: &str = "insider-filings";

// ---- SEC EDGAR Atom ----------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    title: Option<String>,
    summary: Option<TextNode>,
    updated: Option<String>,
    link: Option<Link>,
}

#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(rename = "@href")]
    href: Option<String>,
}

pub const SEC_ATOM: Extractor = Extractor {
    name: "sec-atom",
    rules: &[sec_serde, sec_regex],
    segmenter: None,
    zero_is_authoritative: false,
};

// "4 - DOE JOHN (0001234567) (Reporting)"
static RE_FORM4_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(4(?:/A)?)\s*-\s*(.+?)\s*\((\d{4,10})\)\s*\((Reporting|Issuer)\)").unwrap()
});

static RE_FEED_ROOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<feed[\s>]").unwrap());

fn sec_serde(payload: &str, ctx: &ExtractCtx<'_>) -> Option<Vec<Item>> {
    // Every field of `Feed` is optional, so any XML root would deserialize.
    if !RE_FEED_ROOT.is_match(payload) {
        return None;
    }
    let feed: Feed = from_str(payload).ok()?;
    let out = feed
        .entry
        .into_iter()
        .filter_map(|e| {
            sec_item(
                ctx,
                e.title.as_deref().unwrap_or_default(),
                e.summary.as_ref().map(|s| s.value.as_str()),
                e.updated.as_deref(),
                e.link.and_then(|l| l.href),
            )
        })
        .collect();
    Some(out)
}

static RE_ENTRY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<entry\b[^>]*>(.*?)</entry>").unwrap());
static RE_ENTRY_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title>").unwrap());
static RE_ENTRY_SUMMARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<summary\b[^>]*>(.*?)</summary>").unwrap());
static RE_ENTRY_UPDATED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<updated\b[^>]*>(.*?)</updated>").unwrap());
static RE_ENTRY_HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<link\b[^>]*href="([^"]+)""#).unwrap());

fn sec_regex(payload: &str, ctx: &ExtractCtx<'_>) -> Option<Vec<Item>> {
    let blocks = capture_all(&RE_ENTRY, payload);
    if blocks.is_empty() {
        return None;
    }
    let out = blocks
        .into_iter()
        .filter_map(|b| {
            sec_item(
                ctx,
                capture_first(&RE_ENTRY_TITLE, b).unwrap_or_default(),
                capture_first(&RE_ENTRY_SUMMARY, b),
                capture_first(&RE_ENTRY_UPDATED, b),
                capture_first(&RE_ENTRY_HREF, b).map(|h| h.replace("&amp;", "&")),
            )
        })
        .collect();
    Some(out)
}

fn sec_item(
    ctx: &ExtractCtx<'_>,
    title: &str,
    summary: Option<&str>,
    updated: Option<&str>,
    href: Option<String>,
) -> Option<Item> {
    let title = normalize_text(title);
    let caps = RE_FORM4_TITLE.captures(&title)?;
    let form = caps[1].to_ascii_uppercase();
    let name = caps[2].to_string();
    let role = caps[4].to_string();

    let mut text = format!("Form {form} filed: {name} ({role})");
    let summary = summary.map(normalize_text).unwrap_or_default();
    if !summary.is_empty() {
        text.push_str(&format!(". {summary}"));
    }

    let ts = updated.map(parse_rfc3339).unwrap_or(Timestamp::Unknown);
    Item::new(ctx.source, &text, ts).map(|it| {
        it.with_trade(Some(name), None, None, None)
            .with_url(href)
    })
}

// ---- OpenInsider snapshot ----------------------------------------------------

pub const OPENINSIDER: Extractor = Extractor {
    name: "openinsider-html",
    rules: &[openinsider_table, openinsider_loose],
    segmenter: None,
    zero_is_authoritative: true,
};

const COL_FILED: usize = 1;
const COL_TICKER: usize = 3;
const COL_COMPANY: usize = 4;
const COL_INSIDER: usize = 5;
const COL_TITLE: usize = 6;
const COL_TRADE: usize = 7;
const COL_VALUE: usize = 12;

fn openinsider_table(payload: &str, ctx: &ExtractCtx<'_>) -> Option<Vec<Item>> {
    let doc = Html::parse_document(payload);
    let table_sel = Selector::parse("table.tinytable").ok()?;
    let row_sel = Selector::parse("tbody tr").ok()?;
    let cell_sel = Selector::parse("td").ok()?;

    let table = doc.select(&table_sel).next()?;
    let mut out = Vec::new();
    for row in table.select(&row_sel) {
        let cells: Vec<String> = row
            .select(&cell_sel)
            .map(|td| normalize_text(&td.text().collect::<String>()))
            .collect();
        if cells.len() <= COL_VALUE {
            continue;
        }
        let cell = |i: usize| Some(cells[i].clone()).filter(|s| !s.is_empty());

        let Some(insider) = cell(COL_INSIDER) else { continue };
        let ticker = cell(COL_TICKER);
        let trade = cell(COL_TRADE).unwrap_or_default();
        let value = cell(COL_VALUE);

        let mut text = insider.clone();
        if let Some(title) = cell(COL_TITLE) {
            text.push_str(&format!(" ({title})"));
        }
        text.push_str(&format!(" {trade} {}", ticker.as_deref().unwrap_or("?")));
        if let Some(company) = cell(COL_COMPANY) {
            text.push_str(&format!(" ({company})"));
        }
        if let Some(v) = value.as_deref() {
            text.push_str(&format!(", value {v}"));
        }

        let ts = cell(COL_FILED)
            .map(|d| parse_any(&d, ctx.now))
            .unwrap_or(Timestamp::Unknown);

        if let Some(item) = Item::new(ctx.source, &text, ts) {
            out.push(item.with_trade(
                Some(insider),
                ticker,
                TransactionType::from_label(&trade),
                value,
            ));
        }
    }
    Some(out)
}

static RE_TR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr>").unwrap());
static RE_TRADE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[PS] - (?:Purchase|Sale)").unwrap());
static RE_FILED_AT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4}-\d{2}-\d{2}(?: \d{2}:\d{2}:\d{2})?)\b").unwrap());

/// Layout drifted (no `tinytable`): keep any row that reads like a trade.
fn openinsider_loose(payload: &str, ctx: &ExtractCtx<'_>) -> Option<Vec<Item>> {
    let out: Vec<Item> = capture_all(&RE_TR, payload)
        .into_iter()
        .map(normalize_text)
        .filter(|row| RE_TRADE_CODE.is_match(row))
        .filter_map(|row| {
            let ts = capture_first(&RE_FILED_AT, &row)
                .map(|d| parse_any(d, ctx.now))
                .unwrap_or(Timestamp::Unknown);
            Item::new(ctx.source, &row, ts)
        })
        .collect();
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

// ---- chain -------------------------------------------------------------------

pub fn source(cfg: &GatherConfig, fetcher: Arc<dyn HttpFetch>) -> Option<LogicalSource> {
    let c = &cfg.insider;
    if !c.enabled {
        return None;
    }
    let timeout = Duration::from_secs(c.timeout_secs);

    let sec_req = FetchRequest::get(&c.sec_atom_url, &cfg.sec_user_agent, ACCEPT_XML, timeout);
    let oi_req = FetchRequest::get(&c.openinsider_url, &cfg.user_agent, ACCEPT_HTML, timeout);

    let chain = FallbackChain::new()
        .then(ChainEntry::new(
            "sec",
            HttpStrategy::new("sec-edgar-atom", LABEL, sec_req, SEC_ATOM, fetcher.clone())
                .unknown_policy(UnknownPolicy::Drop)
                .requires_structure(true),
        ))
        .then(ChainEntry::new(
            "openinsider",
            HttpStrategy::new("openinsider", LABEL, oi_req, OPENINSIDER, fetcher)
                .unknown_policy(UnknownPolicy::Keep)
                .requires_structure(true),
        ));

    Some(LogicalSource::new(LABEL, chain))
}
