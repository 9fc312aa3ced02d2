// src/ingest/providers/mod.rs
pub mod congress;
pub mod insider;
pub mod news;
pub mod rss;
pub mod social;

use std::sync::Arc;

use tracing::info;

use crate::ingest::config::GatherConfig;
use crate::ingest::http::HttpFetch;
use crate::ingest::orchestrator::LogicalSource;

/// Turns configuration into the logical sources of one run. Disabled
/// families contribute nothing; Quiver is only chained when a key resolved.
pub fn build_sources(cfg: &GatherConfig, fetcher: Arc<dyn HttpFetch>) -> Vec<LogicalSource> {
    let mut out = Vec::new();
    out.extend(congress::source(cfg, fetcher.clone()));
    out.extend(insider::source(cfg, fetcher.clone()));
    out.extend(social::sources(cfg, fetcher.clone()));
    out.extend(news::source(cfg, fetcher));

    info!(
        target: "gather",
        sources = out.len(),
        labels = ?out.iter().map(|s| s.label.as_str()).collect::<Vec<_>>(),
        "sources built"
    );
    out
}
