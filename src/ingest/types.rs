// src/ingest/types.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, Serializer};
use std::time::Duration;

/// Best-effort point in time an item refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    Instant(DateTime<Utc>),
    /// Coarse calendar date (filings, snapshot tables).
    Date(NaiveDate),
    Unknown,
}

impl Timestamp {
    pub fn is_known(&self) -> bool {
        !matches!(self, Timestamp::Unknown)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Timestamp::Instant(dt) => s.serialize_str(&dt.to_rfc3339()),
            Timestamp::Date(d) => s.serialize_str(&d.format("%Y-%m-%d").to_string()),
            Timestamp::Unknown => s.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Buy,
    Sell,
}

impl TransactionType {
    /// Maps the wording used by filing sources ("Purchase", "P - Purchase", "sale_full", "buy").
    pub fn from_label(raw: &str) -> Option<Self> {
        let s = raw.trim().to_ascii_lowercase();
        if s.starts_with("p - ") || s.starts_with("purchase") || s == "buy" || s == "p" {
            Some(Self::Buy)
        } else if s.starts_with("s - ") || s.starts_with("sale") || s == "sell" || s == "s" {
            Some(Self::Sell)
        } else {
            None
        }
    }
}

/// Canonical unit handed to the analysis step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub source: String, // e.g., "news", "x:@DeItaone"
    pub text: String,   // normalized text
    pub timestamp: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<TransactionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Item {
    /// Builds an item from raw markup; returns `None` when nothing is left after normalization.
    pub fn new(source: impl Into<String>, raw_text: &str, timestamp: Timestamp) -> Option<Self> {
        let text = crate::ingest::normalize_text(raw_text);
        if text.is_empty() {
            return None;
        }
        Some(Self {
            source: source.into(),
            text,
            timestamp,
            entity_name: None,
            ticker: None,
            transaction_type: None,
            raw_amount: None,
            url: None,
        })
    }

    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
        self
    }

    /// Sets all structured trade fields at once, from a single extraction pass.
    pub fn with_trade(
        mut self,
        entity_name: Option<String>,
        ticker: Option<String>,
        transaction_type: Option<TransactionType>,
        raw_amount: Option<String>,
    ) -> Self {
        let clean = |v: Option<String>| {
            v.map(|s| crate::ingest::normalize_text(&s))
                .filter(|s| !s.is_empty())
        };
        self.entity_name = clean(entity_name);
        self.ticker = clean(ticker).map(|t| t.to_ascii_uppercase());
        self.transaction_type = transaction_type;
        self.raw_amount = clean(raw_amount);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("timed out after {timeout:?} fetching {url}")]
    Timeout { url: String, timeout: Duration },
    #[error("transport error fetching {url}: {message}")]
    Transport { url: String, message: String },
    #[error("no extraction rule recognized the payload from {url}")]
    Unstructured { url: String },
    #[error("all {0} queries failed")]
    AllQueriesFailed(usize),
}

/// Result of one strategy attempt. Only `Failed` moves a chain forward.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Items(Vec<Item>),
    /// The endpoint answered, nothing qualified.
    Empty,
    Failed(FetchError),
}

impl FetchOutcome {
    /// Normalizes an item list: an empty list is the healthy `Empty` outcome.
    pub fn from_items(items: Vec<Item>) -> Self {
        if items.is_empty() {
            Self::Empty
        } else {
            Self::Items(items)
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

#[async_trait::async_trait]
pub trait SourceStrategy: Send + Sync {
    /// One fetch + extract + window pass, evaluated against `now`.
    async fn attempt(&self, now: DateTime<Utc>) -> FetchOutcome;
    fn name(&self) -> &str;
}
