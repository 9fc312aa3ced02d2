// src/metrics.rs
use std::net::SocketAddr;

use anyhow::{Context, Result};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const ENV_METRICS_ADDR: &str = "GATHER_METRICS_ADDR";

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder without a listener (render on demand).
    pub fn init(run_timeout_secs: u64) -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        Self::describe_static(run_timeout_secs);
        Ok(Self { handle })
    }

    /// Install the recorder and serve the exposition format on `addr`.
    /// Must be called inside a Tokio runtime.
    pub fn serve(addr: SocketAddr, run_timeout_secs: u64) -> Result<()> {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .with_context(|| format!("prometheus: listen on {addr}"))?;
        Self::describe_static(run_timeout_secs);
        Ok(())
    }

    /// Address from `GATHER_METRICS_ADDR`; unset or blank disables the exporter.
    pub fn addr_from_env() -> Result<Option<SocketAddr>> {
        match std::env::var(ENV_METRICS_ADDR) {
            Ok(v) if !v.trim().is_empty() => v
                .trim()
                .parse()
                .map(Some)
                .with_context(|| format!("{ENV_METRICS_ADDR}={v} is not a socket address")),
            _ => Ok(None),
        }
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }

    fn describe_static(run_timeout_secs: u64) {
        crate::ingest::ensure_metrics_described();
        // Static gauge with the configured run deadline.
        gauge!("gather_run_timeout_secs").set(run_timeout_secs as f64);
    }
}
