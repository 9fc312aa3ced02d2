// src/ingest/chain.rs
//! Ordered fallback over the strategies of one logical source.
//!
//! Each entry declares its provider key and whether a healthy-but-empty answer
//! ends the chain. A healthy empty answer from a non-terminal entry skips the
//! remaining entries of the same provider (alternate transports) but still
//! lets entries of a distinct provider run.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use metrics::counter;
use tracing::{debug, info, warn};

use crate::ingest::types::{FetchOutcome, Item, SourceStrategy};

pub struct ChainEntry {
    pub strategy: Box<dyn SourceStrategy>,
    /// Underlying data provider; entries sharing a key are alternate transports.
    pub provider: String,
    pub empty_is_terminal: bool,
}

impl ChainEntry {
    pub fn new(provider: impl Into<String>, strategy: impl SourceStrategy + 'static) -> Self {
        Self {
            strategy: Box::new(strategy),
            provider: provider.into(),
            empty_is_terminal: false,
        }
    }

    pub fn boxed(provider: impl Into<String>, strategy: Box<dyn SourceStrategy>) -> Self {
        Self {
            strategy,
            provider: provider.into(),
            empty_is_terminal: false,
        }
    }

    pub fn empty_is_terminal(mut self, yes: bool) -> Self {
        self.empty_is_terminal = yes;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainOutcome {
    pub items: Vec<Item>,
    /// Every attempted entry failed; nothing answered.
    pub exhausted: bool,
    /// Names of the strategies actually invoked, in order.
    pub attempted: Vec<String>,
}

#[derive(Default)]
pub struct FallbackChain {
    entries: Vec<ChainEntry>,
}

impl FallbackChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, entry: ChainEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tries entries strictly in order; see module docs for the empty-answer rules.
    pub async fn run(&self, label: &str, now: DateTime<Utc>) -> ChainOutcome {
        let mut attempted = Vec::new();
        let mut answered: HashSet<&str> = HashSet::new();

        for entry in &self.entries {
            let name = entry.strategy.name().to_string();
            if answered.contains(entry.provider.as_str()) {
                debug!(source = %label, strategy = %name, "provider already answered, skipping alternate transport");
                continue;
            }

            attempted.push(name.clone());
            match entry.strategy.attempt(now).await {
                FetchOutcome::Items(items) => {
                    info!(target: "gather", source = %label, strategy = %name, items = items.len(), "strategy succeeded");
                    return ChainOutcome {
                        items,
                        exhausted: false,
                        attempted,
                    };
                }
                FetchOutcome::Empty => {
                    debug!(source = %label, strategy = %name, "healthy empty answer");
                    if entry.empty_is_terminal {
                        return ChainOutcome {
                            items: Vec::new(),
                            exhausted: false,
                            attempted,
                        };
                    }
                    answered.insert(entry.provider.as_str());
                }
                FetchOutcome::Failed(e) => {
                    warn!(target: "gather", source = %label, strategy = %name, error = %e, "strategy failed, falling back");
                    counter!("gather_strategy_failures_total", "source" => label.to_string()).increment(1);
                }
            }
        }

        ChainOutcome {
            items: Vec::new(),
            exhausted: answered.is_empty(),
            attempted,
        }
    }
}
