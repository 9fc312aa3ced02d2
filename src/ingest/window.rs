// src/ingest/window.rs
//! Trailing 24h recency window plus the timestamp parsers the extractors share.
//!
//! Every parser returns [`Timestamp::Unknown`] on failure; a parse failure is
//! never promoted to "now".

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::ingest::types::{Item, Timestamp};

pub const WINDOW_HOURS: i64 = 24;

/// What a strategy does with items whose time cannot be established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownPolicy {
    /// Live snapshot pages: everything on the page is current by construction.
    Keep,
    /// Staleness cannot be verified, so the item is not trusted.
    Drop,
}

/// True when `ts` falls inside `[now - 24h, now]` (dates: calendar-day overlap).
pub fn in_window(ts: &Timestamp, now: DateTime<Utc>, unknown: UnknownPolicy) -> bool {
    let start = now - Duration::hours(WINDOW_HOURS);
    match ts {
        Timestamp::Instant(t) => *t >= start && *t <= now,
        Timestamp::Date(d) => *d >= start.date_naive() && *d <= now.date_naive(),
        Timestamp::Unknown => unknown == UnknownPolicy::Keep,
    }
}

/// Keeps only items inside the window, preserving order.
pub fn filter_window(items: Vec<Item>, now: DateTime<Utc>, unknown: UnknownPolicy) -> Vec<Item> {
    items
        .into_iter()
        .filter(|it| in_window(&it.timestamp, now, unknown))
        .collect()
}

// ---- parsers -------------------------------------------------------------

pub fn parse_rfc2822(raw: &str) -> Timestamp {
    DateTime::parse_from_rfc2822(raw.trim())
        .map(|dt| Timestamp::Instant(dt.with_timezone(&Utc)))
        .unwrap_or(Timestamp::Unknown)
}

pub fn parse_rfc3339(raw: &str) -> Timestamp {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| Timestamp::Instant(dt.with_timezone(&Utc)))
        .unwrap_or(Timestamp::Unknown)
}

/// Twitter's legacy `created_at`, e.g. `Thu Oct 15 14:02:11 +0000 2026`.
pub fn parse_twitter(raw: &str) -> Timestamp {
    DateTime::parse_from_str(raw.trim(), "%a %b %d %H:%M:%S %z %Y")
        .map(|dt| Timestamp::Instant(dt.with_timezone(&Utc)))
        .unwrap_or(Timestamp::Unknown)
}

/// Naive `YYYY-MM-DD HH:MM:SS` (assumed UTC).
pub fn parse_naive_utc(raw: &str) -> Timestamp {
    NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M:%S")
        .map(|dt| Timestamp::Instant(Utc.from_utc_datetime(&dt)))
        .unwrap_or(Timestamp::Unknown)
}

/// Coarse dates: `2026-10-15`, `15 Oct 2026`, `Oct 15, 2026`, plus `Today`/`Yesterday`
/// relative to `now`.
pub fn parse_coarse_date(raw: &str, now: DateTime<Utc>) -> Timestamp {
    let s = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    match s.to_ascii_lowercase().as_str() {
        "" => return Timestamp::Unknown,
        "today" => return Timestamp::Date(now.date_naive()),
        "yesterday" => return Timestamp::Date((now - Duration::days(1)).date_naive()),
        _ => {}
    }
    ["%Y-%m-%d", "%d %b %Y", "%b %d, %Y", "%B %d, %Y", "%m/%d/%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&s, fmt).ok())
        .map(Timestamp::Date)
        .unwrap_or(Timestamp::Unknown)
}

/// Tries instant formats first, then coarse dates.
pub fn parse_any(raw: &str, now: DateTime<Utc>) -> Timestamp {
    [parse_rfc3339, parse_rfc2822, parse_twitter, parse_naive_utc]
        .iter()
        .map(|p| p(raw))
        .find(Timestamp::is_known)
        .unwrap_or_else(|| parse_coarse_date(raw, now))
}
