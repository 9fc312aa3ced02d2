// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod ingest;
pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::ingest::config::{load_config_default, load_config_from, GatherConfig};
pub use crate::ingest::http::{HttpFetch, ReqwestFetcher, StaticFetcher};
pub use crate::ingest::providers::build_sources;
pub use crate::ingest::{gather, Deduplicator, Item, RunResult};

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

/// One full gathering run with the production fetcher: config → sources →
/// concurrent chains → deduplicated result. The clock is read once here.
pub async fn run_once(cfg: &GatherConfig) -> anyhow::Result<RunResult> {
    let fetcher: Arc<dyn HttpFetch> = Arc::new(ReqwestFetcher::new()?);
    let sources = build_sources(cfg, fetcher);
    let now = Utc::now();
    info!(target: "gather", sources = sources.len(), %now, "starting gathering run");
    Ok(gather(sources, now, cfg.deduplicator()).await)
}
