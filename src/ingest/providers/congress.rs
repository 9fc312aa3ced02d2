// src/ingest/providers/congress.rs
//! Congressional trade disclosures.
//!
//! Chain: Quiver congress-trading JSON API (needs a key) → Capitol Trades
//! HTML table. Distinct providers, so an empty healthy Quiver answer still
//! lets Capitol Trades run. Dates are coarse; undated rows are dropped.

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::ingest::chain::{ChainEntry, FallbackChain};
use crate::ingest::config::{CongressCfg, GatherConfig};
use crate::ingest::extract::{capture_first, ExtractCtx, Extractor};
use crate::ingest::http::{FetchRequest, HttpFetch, ACCEPT_HTML, ACCEPT_JSON};
use crate::ingest::normalize_text;
use crate::ingest::orchestrator::LogicalSource;
use crate::ingest::strategy::HttpStrategy;
use crate::ingest::types::{Item, Timestamp, TransactionType};
use crate::ingest::window::{parse_coarse_date, UnknownPolicy};

pub const LABEL: &str = "congress-trades";

// ---- Quiver JSON -------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QuiverTrade {
    representative: Option<String>,
    report_date: Option<String>,
    transaction_date: Option<String>,
    ticker: Option<String>,
    transaction: Option<String>,
    range: Option<String>,
    house: Option<String>,
    party: Option<String>,
}

pub const QUIVER: Extractor = Extractor {
    name: "quiver-json",
    rules: &[quiver_rows],
    segmenter: None,
    zero_is_authoritative: true,
};

fn quiver_rows(payload: &str, ctx: &ExtractCtx<'_>) -> Option<Vec<Item>> {
    let rows: Vec<QuiverTrade> = serde_json::from_str(payload).ok()?;
    Some(rows.into_iter().filter_map(|r| quiver_item(r, ctx)).collect())
}

fn quiver_item(r: QuiverTrade, ctx: &ExtractCtx<'_>) -> Option<Item> {
    let who = r.representative.filter(|s| !s.trim().is_empty())?;
    let ticker = r.ticker.filter(|t| !t.trim().is_empty() && t.trim() != "-");
    let tx = r.transaction.as_deref().and_then(TransactionType::from_label);

    let mut text = who.clone();
    let affiliation: Vec<&str> = [r.party.as_deref(), r.house.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if !affiliation.is_empty() {
        text.push_str(&format!(" ({})", affiliation.join(", ")));
    }
    text.push_str(&format!(
        " reported {} of {}",
        r.transaction.as_deref().unwrap_or("a transaction"),
        ticker.as_deref().unwrap_or("an undisclosed asset")
    ));
    if let Some(range) = r.range.as_deref() {
        text.push_str(&format!(", amount {range}"));
    }
    if let Some(traded) = r.transaction_date.as_deref() {
        text.push_str(&format!(", traded {traded}"));
    }

    let ts = r
        .report_date
        .as_deref()
        .map(|d| parse_coarse_date(d, ctx.now))
        .unwrap_or(Timestamp::Unknown);

    Item::new(ctx.source, &text, ts).map(|it| it.with_trade(Some(who), ticker, tx, r.range))
}

// ---- Capitol Trades HTML -------------------------------------------------------

/// Rows first matched by their CSS classes; rows with a different layout
/// fall back to a loose text heuristic (no structured fields).
pub const CAPITOL_TRADES: Extractor = Extractor {
    name: "capitoltrades-html",
    rules: &[ct_row_classes, ct_row_text],
    segmenter: Some(table_rows),
    zero_is_authoritative: false,
};

static RE_ROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<tr\b.*?</tr>").unwrap());
static RE_POLITICIAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)class="[^"]*politician-name[^"]*"[^>]*>\s*(?:<a[^>]*>)?\s*([^<]+)"#).unwrap()
});
static RE_TICKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)class="[^"]*issuer-ticker[^"]*"[^>]*>\s*([^<]+)<"#).unwrap());
static RE_ISSUER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)class="[^"]*issuer-name[^"]*"[^>]*>\s*(?:<a[^>]*>)?\s*([^<]+)"#).unwrap()
});
static RE_TX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)class="[^"]*tx-type[^"]*"[^>]*>\s*([^<]+)<"#).unwrap());
static RE_SIZE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)class="[^"]*trade-size[^"]*"[^>]*>(?:\s*<[^>]+>)*\s*([^<]+)<"#).unwrap()
});
static RE_DAY_MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)>\s*(\d{1,2}\s+[A-Z][a-z]{2})\s*</div>\s*<div[^>]*>\s*(\d{4})\s*<").unwrap()
});
static RE_RELATIVE_DAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)>\s*(Today|Yesterday)\s*<").unwrap());
static RE_LOOSE_TICKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([A-Z]{1,5}):US\b").unwrap());
static RE_LOOSE_TX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(buy|sell)\b").unwrap());
static RE_LOOSE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2} [A-Z][a-z]{2} \d{4}|Today|Yesterday)\b").unwrap());

fn table_rows(payload: &str) -> Vec<&str> {
    RE_ROW.find_iter(payload).map(|m| m.as_str()).collect()
}

/// The published column precedes the traded column, so the first date in the row wins.
fn row_published(row: &str, ctx: &ExtractCtx<'_>) -> Timestamp {
    let absolute = RE_DAY_MONTH_YEAR.captures(row).and_then(|c| {
        let at = c.get(0)?.start();
        Some((at, format!("{} {}", &c[1], &c[2])))
    });
    let relative = RE_RELATIVE_DAY.captures(row).and_then(|c| {
        let at = c.get(0)?.start();
        Some((at, c[1].to_string()))
    });
    [absolute, relative]
        .into_iter()
        .flatten()
        .min_by_key(|(at, _)| *at)
        .map(|(_, d)| parse_coarse_date(&d, ctx.now))
        .unwrap_or(Timestamp::Unknown)
}

fn ct_row_classes(row: &str, ctx: &ExtractCtx<'_>) -> Option<Vec<Item>> {
    let who = normalize_text(capture_first(&RE_POLITICIAN, row)?);
    let ticker_raw = normalize_text(capture_first(&RE_TICKER, row)?);
    let tx_raw = normalize_text(capture_first(&RE_TX, row)?);

    let ticker = ticker_raw.split(':').next().unwrap_or_default().to_string();
    let issuer = capture_first(&RE_ISSUER, row).map(normalize_text);
    let size = capture_first(&RE_SIZE, row).map(normalize_text);
    let tx = TransactionType::from_label(&tx_raw);

    let mut text = format!("{who} {tx_raw} {}", issuer.as_deref().unwrap_or(&ticker));
    if !ticker.is_empty() {
        text.push_str(&format!(" ({ticker})"));
    }
    if let Some(size) = size.as_deref() {
        text.push_str(&format!(", size {size}"));
    }

    let item = Item::new(ctx.source, &text, row_published(row, ctx))?;
    Some(vec![item.with_trade(
        Some(who),
        Some(ticker).filter(|t| !t.is_empty()),
        tx,
        size,
    )])
}

fn ct_row_text(row: &str, ctx: &ExtractCtx<'_>) -> Option<Vec<Item>> {
    let text = normalize_text(row);
    capture_first(&RE_LOOSE_TICKER, &text)?;
    capture_first(&RE_LOOSE_TX, &text)?;
    let ts = capture_first(&RE_LOOSE_DATE, &text)
        .map(|d| parse_coarse_date(d, ctx.now))
        .unwrap_or(Timestamp::Unknown);
    Item::new(ctx.source, &text, ts).map(|it| vec![it])
}

// ---- chain -------------------------------------------------------------------

pub fn source(cfg: &GatherConfig, fetcher: Arc<dyn HttpFetch>) -> Option<LogicalSource> {
    let c: &CongressCfg = &cfg.congress;
    if !c.enabled {
        return None;
    }
    let timeout = Duration::from_secs(c.timeout_secs);
    let mut chain = FallbackChain::new();

    if let Some(key) = c.quiver_api_key.as_deref() {
        let req = FetchRequest::get(&c.quiver_url, &cfg.user_agent, ACCEPT_JSON, timeout)
            .header("Authorization", format!("Bearer {key}"));
        chain = chain.then(ChainEntry::new(
            "quiver",
            HttpStrategy::new("quiver-congress", LABEL, req, QUIVER, fetcher.clone())
                .unknown_policy(UnknownPolicy::Drop)
                .requires_structure(true),
        ));
    }

    let req = FetchRequest::get(&c.capitol_trades_url, &cfg.user_agent, ACCEPT_HTML, timeout);
    chain = chain.then(ChainEntry::new(
        "capitoltrades",
        HttpStrategy::new("capitoltrades", LABEL, req, CAPITOL_TRADES, fetcher)
            .unknown_policy(UnknownPolicy::Drop)
            .requires_structure(true),
    ));

    Some(LogicalSource::new(LABEL, chain))
}
