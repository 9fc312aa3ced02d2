// src/ingest/providers/rss.rs
//! RSS 2.0 extraction shared by the news, Nitter and Truth-mirror feeds.
//! Rule order: serde document parse, then a regex `<item>` block heuristic.

use once_cell::sync::Lazy;
use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;

use crate::ingest::extract::{capture_all, capture_first, strip_cdata, ExtractCtx, Extractor};
use crate::ingest::normalize_text;
use crate::ingest::types::{Item, Timestamp};
use crate::ingest::window::{parse_any, parse_rfc2822};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextMode {
    /// Headlines only (search feeds repeat the title in the description).
    Title,
    /// Title and body merged (post feeds).
    TitleAndBody,
}

/// Headline feeds (Google News, Yahoo Finance).
pub const HEADLINES: Extractor = Extractor {
    name: "rss-headlines",
    rules: &[serde_titles, regex_titles],
    segmenter: None,
    zero_is_authoritative: false,
};

/// Post feeds where the description carries the full text (Nitter, Truth mirror).
pub const POSTS: Extractor = Extractor {
    name: "rss-posts",
    rules: &[serde_posts, regex_posts],
    segmenter: None,
    zero_is_authoritative: false,
};

fn serde_titles(payload: &str, ctx: &ExtractCtx<'_>) -> Option<Vec<Item>> {
    parse_document(payload, ctx, TextMode::Title)
}

fn serde_posts(payload: &str, ctx: &ExtractCtx<'_>) -> Option<Vec<Item>> {
    parse_document(payload, ctx, TextMode::TitleAndBody)
}

fn regex_titles(payload: &str, ctx: &ExtractCtx<'_>) -> Option<Vec<Item>> {
    scan_item_blocks(payload, ctx, TextMode::Title)
}

fn regex_posts(payload: &str, ctx: &ExtractCtx<'_>) -> Option<Vec<Item>> {
    scan_item_blocks(payload, ctx, TextMode::TitleAndBody)
}

fn parse_document(payload: &str, ctx: &ExtractCtx<'_>, mode: TextMode) -> Option<Vec<Item>> {
    let xml_clean = scrub_html_entities_for_xml(payload);
    let rss: Rss = from_str(&xml_clean).ok()?;

    let out = rss
        .channel
        .item
        .into_iter()
        .filter_map(|it| {
            build_item(
                ctx,
                mode,
                it.title.as_deref(),
                it.description.as_deref(),
                it.pub_date.as_deref(),
                it.link,
            )
        })
        .collect();
    Some(out)
}

static RE_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<item\b[^>]*>(.*?)</item>").unwrap());
static RE_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title>").unwrap());
static RE_DESC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<description\b[^>]*>(.*?)</description>").unwrap());
static RE_PUBDATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<pubDate\b[^>]*>(.*?)</pubDate>").unwrap());
static RE_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<link\b[^>]*>(.*?)</link>").unwrap());

/// Heuristic for feeds the XML deserializer rejects (truncated bodies, stray entities).
fn scan_item_blocks(payload: &str, ctx: &ExtractCtx<'_>, mode: TextMode) -> Option<Vec<Item>> {
    let blocks = capture_all(&RE_ITEM, payload);
    if blocks.is_empty() {
        return None;
    }
    let out = blocks
        .into_iter()
        .filter_map(|b| {
            build_item(
                ctx,
                mode,
                capture_first(&RE_TITLE, b),
                capture_first(&RE_DESC, b),
                capture_first(&RE_PUBDATE, b),
                capture_first(&RE_LINK, b).map(|l| strip_cdata(l).trim().to_string()),
            )
        })
        .collect();
    Some(out)
}

fn build_item(
    ctx: &ExtractCtx<'_>,
    mode: TextMode,
    title: Option<&str>,
    description: Option<&str>,
    pub_date: Option<&str>,
    link: Option<String>,
) -> Option<Item> {
    let title = normalize_text(title.unwrap_or_default());
    let text = match mode {
        TextMode::Title => title,
        TextMode::TitleAndBody => merge_title_body(title, normalize_text(description.unwrap_or_default())),
    };
    let ts = pub_date
        .map(|d| {
            let d = strip_cdata(d);
            match parse_rfc2822(&d) {
                t if t.is_known() => t,
                _ => parse_any(&d, ctx.now),
            }
        })
        .unwrap_or(Timestamp::Unknown);
    Item::new(ctx.source, &text, ts).map(|it| it.with_url(link))
}

/// Post feeds often truncate the title to the body's first words.
fn merge_title_body(title: String, body: String) -> String {
    if body.is_empty() {
        return title;
    }
    if title.is_empty() || body.contains(title.trim_end_matches("...").trim_end_matches('…')) {
        return body;
    }
    if title.contains(&body) {
        return title;
    }
    format!("{title}. {body}")
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
