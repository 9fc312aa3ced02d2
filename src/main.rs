//! `gather`: runs one gathering pass and prints the `RunResult` JSON on stdout.
//! Logs go to stderr so the output can be piped straight into the analysis step.

use std::io::Write;

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trade_signal_gatherer::metrics::Metrics;
use trade_signal_gatherer::{load_config_default, run_once};

/// Compact logs by default; `GATHER_LOG_JSON=1` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("trade_signal_gatherer=info,gather=info,warn"));

    let json = std::env::var("GATHER_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = load_config_default().context("loading gather config")?;
    if cfg.congress.enabled && cfg.congress.quiver_api_key.is_none() {
        warn!("no Quiver API key resolved; congress trades use the HTML fallback only");
    }

    if let Some(addr) = Metrics::addr_from_env()? {
        Metrics::serve(addr, cfg.run_timeout_secs)?;
        info!(%addr, "prometheus exporter listening");
    }

    let deadline = cfg.run_timeout();
    let result = match tokio::time::timeout(deadline, run_once(&cfg)).await {
        Ok(res) => res?,
        Err(_) => {
            // Dropping the run aborts every source task; nothing partial is emitted.
            error!(?deadline, "gathering run exceeded its deadline");
            anyhow::bail!("gathering run timed out after {deadline:?}");
        }
    };

    let out = serde_json::to_string_pretty(&result).context("serializing run result")?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{out}").context("writing run result")?;
    Ok(())
}
