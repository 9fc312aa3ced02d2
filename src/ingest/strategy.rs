// src/ingest/strategy.rs
//! HTTP-backed [`SourceStrategy`]: fetch → extract → window.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::histogram;
use tracing::{debug, warn};

use crate::ingest::extract::{ExtractCtx, Extraction, Extractor};
use crate::ingest::http::{FetchRequest, HttpFetch};
use crate::ingest::types::{FetchError, FetchOutcome, Item, SourceStrategy};
use crate::ingest::window::{filter_window, UnknownPolicy};

/// One logical fetch against one endpoint. Several requests (e.g. search
/// queries) are issued sequentially and merged in request order; the strategy
/// fails only when every request fails.
pub struct HttpStrategy {
    name: String,
    source: String,
    requests: Vec<FetchRequest>,
    extractor: Extractor,
    unknown: UnknownPolicy,
    requires_structure: bool,
    fetcher: Arc<dyn HttpFetch>,
}

impl HttpStrategy {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        request: FetchRequest,
        extractor: Extractor,
        fetcher: Arc<dyn HttpFetch>,
    ) -> Self {
        Self::multi(name, source, vec![request], extractor, fetcher)
    }

    pub fn multi(
        name: impl Into<String>,
        source: impl Into<String>,
        requests: Vec<FetchRequest>,
        extractor: Extractor,
        fetcher: Arc<dyn HttpFetch>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            requests,
            extractor,
            unknown: UnknownPolicy::Drop,
            requires_structure: false,
            fetcher,
        }
    }

    pub fn unknown_policy(mut self, policy: UnknownPolicy) -> Self {
        self.unknown = policy;
        self
    }

    /// Treat a body no rule recognizes as a failure instead of an empty answer.
    pub fn requires_structure(mut self, yes: bool) -> Self {
        self.requires_structure = yes;
        self
    }

    fn evaluate(&self, url: &str, body: &str, now: DateTime<Utc>) -> Result<Vec<Item>, FetchError> {
        let t0 = std::time::Instant::now();
        let ctx = ExtractCtx {
            source: &self.source,
            now,
        };
        let extraction = self.extractor.run(body, &ctx);
        histogram!("gather_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        let items = match extraction {
            Extraction::Unrecognized if self.requires_structure => {
                return Err(FetchError::Unstructured {
                    url: url.to_string(),
                })
            }
            other => other.into_items(),
        };
        let extracted = items.len();
        let kept = filter_window(items, now, self.unknown);
        debug!(
            strategy = %self.name,
            extractor = self.extractor.name,
            extracted,
            kept = kept.len(),
            "extracted"
        );
        Ok(kept)
    }
}

#[async_trait]
impl SourceStrategy for HttpStrategy {
    async fn attempt(&self, now: DateTime<Utc>) -> FetchOutcome {
        let mut items = Vec::new();
        let mut failures = Vec::new();

        for req in &self.requests {
            let result = match self.fetcher.get(req).await {
                Ok(body) => self.evaluate(&req.url, &body, now),
                Err(e) => Err(e),
            };
            match result {
                Ok(v) => items.extend(v),
                Err(e) => {
                    warn!(strategy = %self.name, error = %e, "request failed");
                    failures.push(e);
                }
            }
        }

        if !self.requests.is_empty() && failures.len() == self.requests.len() {
            return match failures.len() {
                1 => FetchOutcome::Failed(failures.remove(0)),
                n => FetchOutcome::Failed(FetchError::AllQueriesFailed(n)),
            };
        }
        FetchOutcome::from_items(items)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
