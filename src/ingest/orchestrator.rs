// src/ingest/orchestrator.rs
//! Runs every logical source concurrently and assembles the [`RunResult`].
//!
//! One task per source on a `JoinSet`: a failing or panicking source never
//! touches another source's result. Dropping the returned future aborts all
//! in-flight tasks and discards partial results.

use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use metrics::{counter, gauge};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::ingest::chain::FallbackChain;
use crate::ingest::dedup::Deduplicator;
use crate::ingest::types::Item;

/// One conceptual provider (e.g. `congress-trades`) and its fallback chain.
pub struct LogicalSource {
    pub label: String,
    pub chain: FallbackChain,
}

impl LogicalSource {
    pub fn new(label: impl Into<String>, chain: FallbackChain) -> Self {
        Self {
            label: label.into(),
            chain,
        }
    }
}

/// Handoff to the analysis step. Empty `items` means "no activity", not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub items: Vec<Item>,
    pub source_errors: BTreeSet<String>,
    pub generated_at: DateTime<Utc>,
}

impl RunResult {
    pub fn is_quiet(&self) -> bool {
        self.items.is_empty()
    }
}

enum SourceReport {
    Items(String, Vec<Item>),
    Exhausted(String),
}

/// Gathers all sources against a single clock reading `now`.
pub async fn gather(sources: Vec<LogicalSource>, now: DateTime<Utc>, dedup: Deduplicator) -> RunResult {
    crate::ingest::ensure_metrics_described();

    let total = sources.len();
    let mut set = JoinSet::new();
    for src in sources {
        set.spawn(async move {
            let label = src.label;
            let chain = src.chain;
            let run = AssertUnwindSafe(chain.run(&label, now)).catch_unwind().await;
            match run {
                Ok(out) if out.exhausted => SourceReport::Exhausted(label),
                Ok(out) => SourceReport::Items(label, out.items),
                Err(_) => {
                    error!(target: "gather", source = %label, "source panicked");
                    SourceReport::Exhausted(label)
                }
            }
        });
    }

    let mut merged = Vec::new();
    let mut source_errors = BTreeSet::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(SourceReport::Items(label, items)) => {
                info!(target: "gather", source = %label, items = items.len(), "source done");
                merged.extend(items);
            }
            Ok(SourceReport::Exhausted(label)) => {
                warn!(target: "gather", source = %label, "source exhausted all strategies");
                counter!("gather_sources_exhausted_total", "source" => label.clone()).increment(1);
                source_errors.insert(label);
            }
            // Only reachable if the task was aborted from outside.
            Err(e) => error!(target: "gather", error = %e, "source task did not complete"),
        }
    }

    let (items, removed) = dedup.dedup(merged);
    counter!("gather_items_total").increment(items.len() as u64);
    counter!("gather_dedup_total").increment(removed as u64);
    gauge!("gather_last_run_ts").set(Utc::now().timestamp() as f64);

    info!(
        target: "gather",
        sources = total,
        items = items.len(),
        dedup = removed,
        failed = source_errors.len(),
        "gathering run finished"
    );

    RunResult {
        items,
        source_errors,
        generated_at: now,
    }
}
