// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::dedup::{Deduplicator, DEFAULT_PREFIX_LEN};

const ENV_PATH: &str = "GATHER_CONFIG_PATH";
/// Secret fields holding this literal are read from the environment instead.
const ENV_MARKER: &str = "ENV";
const QUIVER_TOKEN_ENV: &str = "QUIVER_API_TOKEN";

const DEFAULT_RUN_TIMEOUT_SECS: u64 = 90;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 12;
const PREFIX_LEN_RANGE: (usize, usize) = (20, 200);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GatherConfig {
    pub user_agent: String,
    /// SEC asks automated clients to identify themselves with a contact.
    pub sec_user_agent: String,
    pub dedup_prefix_len: usize,
    pub run_timeout_secs: u64,
    pub congress: CongressCfg,
    pub insider: InsiderCfg,
    pub social: SocialCfg,
    pub news: NewsCfg,
}

impl Default for GatherConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (compatible; trade-signal-gatherer/0.1)".into(),
            sec_user_agent: "trade-signal-gatherer ops@localhost".into(),
            dedup_prefix_len: DEFAULT_PREFIX_LEN,
            run_timeout_secs: DEFAULT_RUN_TIMEOUT_SECS,
            congress: CongressCfg::default(),
            insider: InsiderCfg::default(),
            social: SocialCfg::default(),
            news: NewsCfg::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CongressCfg {
    pub enabled: bool,
    pub timeout_secs: u64,
    /// Literal token, `"ENV"` (read `QUIVER_API_TOKEN`), or absent.
    pub quiver_api_key: Option<String>,
    pub quiver_url: String,
    pub capitol_trades_url: String,
}

impl Default for CongressCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 15,
            quiver_api_key: Some(ENV_MARKER.into()),
            quiver_url: "https://api.quiverquant.com/beta/live/congresstrading".into(),
            capitol_trades_url: "https://www.capitoltrades.com/trades?pageSize=96".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InsiderCfg {
    pub enabled: bool,
    pub timeout_secs: u64,
    pub sec_atom_url: String,
    pub openinsider_url: String,
}

impl Default for InsiderCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 15,
            sec_atom_url: "https://www.sec.gov/cgi-bin/browse-edgar?action=getcurrent&type=4&company=&dateb=&owner=include&start=0&count=100&output=atom".into(),
            openinsider_url: "http://openinsider.com/latest-insider-trading".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TruthAccount {
    pub handle: String,
    /// Numeric account id used by the statuses API.
    pub account_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SocialCfg {
    pub enabled: bool,
    pub timeout_secs: u64,
    pub x_handles: Vec<String>,
    pub nitter_base: String,
    pub truth: Option<TruthAccount>,
    pub truth_mirror_url: String,
}

impl Default for SocialCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 10,
            x_handles: vec!["DeItaone".into(), "FirstSquawk".into()],
            nitter_base: "https://nitter.net".into(),
            truth: Some(TruthAccount {
                handle: "realDonaldTrump".into(),
                account_id: "107780257626128497".into(),
            }),
            truth_mirror_url: "https://www.trumpstruth.org/feed".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NewsCfg {
    pub enabled: bool,
    pub timeout_secs: u64,
    pub queries: Vec<String>,
    pub yahoo_symbols: Vec<String>,
}

impl Default for NewsCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 10,
            queries: vec![
                "Dow Jones".into(),
                "stock market today".into(),
                "Federal Reserve rates".into(),
            ],
            yahoo_symbols: vec!["^DJI".into(), "^GSPC".into()],
        }
    }
}

impl GatherConfig {
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    pub fn deduplicator(&self) -> Deduplicator {
        Deduplicator::new(self.dedup_prefix_len)
    }

    /// Clamps out-of-range values and resolves `"ENV"` secrets.
    pub fn finalize(mut self) -> Self {
        self.sanitize();
        self.congress.quiver_api_key = resolve_secret(self.congress.quiver_api_key.take(), QUIVER_TOKEN_ENV);
        self
    }

    fn sanitize(&mut self) {
        let (lo, hi) = PREFIX_LEN_RANGE;
        self.dedup_prefix_len = self.dedup_prefix_len.clamp(lo, hi);
        if self.run_timeout_secs == 0 {
            self.run_timeout_secs = DEFAULT_RUN_TIMEOUT_SECS;
        }
        for t in [
            &mut self.congress.timeout_secs,
            &mut self.insider.timeout_secs,
            &mut self.social.timeout_secs,
            &mut self.news.timeout_secs,
        ] {
            if *t == 0 {
                *t = DEFAULT_FETCH_TIMEOUT_SECS;
            }
        }
        if self.user_agent.trim().is_empty() {
            self.user_agent = GatherConfig::default().user_agent;
        }
        if self.sec_user_agent.trim().is_empty() {
            self.sec_user_agent = self.user_agent.clone();
        }
        let handles = std::mem::take(&mut self.social.x_handles)
            .into_iter()
            .map(|h| h.trim().trim_start_matches('@').to_string())
            .collect();
        self.social.x_handles = clean_list(handles);
        // An account without an id disables the Truth Social source.
        if self
            .social
            .truth
            .as_ref()
            .is_some_and(|t| t.account_id.trim().is_empty())
        {
            self.social.truth = None;
        }
        self.news.queries = clean_list(std::mem::take(&mut self.news.queries));
        self.news.yahoo_symbols = clean_list(std::mem::take(&mut self.news.yahoo_symbols));
    }
}

fn resolve_secret(raw: Option<String>, env_key: &str) -> Option<String> {
    let raw = raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())?;
    if raw == ENV_MARKER {
        std::env::var(env_key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    } else {
        Some(raw)
    }
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<GatherConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading gather config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing gather config {}", path.display()))
}

/// Load config using env var + fallbacks:
/// 1) $GATHER_CONFIG_PATH
/// 2) config/gather.toml
/// 3) config/gather.json
/// 4) built-in defaults
pub fn load_config_default() -> Result<GatherConfig> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("GATHER_CONFIG_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/gather.toml");
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from("config/gather.json");
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    Ok(GatherConfig::default().finalize())
}

pub fn parse_config(s: &str, hint_ext: &str) -> Result<GatherConfig> {
    let looks_json = s.trim_start().starts_with('{');
    let try_toml = hint_ext == "toml" || (hint_ext != "json" && !looks_json);
    if try_toml {
        if let Ok(v) = toml::from_str::<GatherConfig>(s) {
            return Ok(v.finalize());
        }
    }
    if let Ok(v) = serde_json::from_str::<GatherConfig>(s) {
        return Ok(v.finalize());
    }
    if !try_toml {
        if let Ok(v) = toml::from_str::<GatherConfig>(s) {
            return Ok(v.finalize());
        }
    }
    Err(anyhow!("unsupported gather config format"))
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|o| o == t) {
            out.push(t.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn toml_overrides_merge_with_defaults() {
        let toml = r#"
dedup_prefix_len = 5
run_timeout_secs = 0

[congress]
quiver_api_key = "literal-token"

[social]
x_handles = ["@DeItaone", " ", "DeItaone", "zerohedge"]
timeout_secs = 0

[social.truth]
handle = "someone"
account_id = "42"

[news]
enabled = false
"#;
        let cfg = parse_config(toml, "toml").unwrap();
        assert_eq!(cfg.dedup_prefix_len, 20);
        assert_eq!(cfg.run_timeout_secs, DEFAULT_RUN_TIMEOUT_SECS);
        assert_eq!(cfg.congress.quiver_api_key.as_deref(), Some("literal-token"));
        assert_eq!(cfg.social.x_handles, vec!["DeItaone", "zerohedge"]);
        assert_eq!(cfg.social.timeout_secs, DEFAULT_FETCH_TIMEOUT_SECS);
        assert_eq!(cfg.social.truth.as_ref().map(|t| t.account_id.as_str()), Some("42"));
        assert!(!cfg.news.enabled);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.insider, InsiderCfg::default());
    }

    #[test]
    fn json_is_accepted_and_bad_input_rejected() {
        let json = r#"{"dedup_prefix_len": 500, "news": {"queries": ["Dow", "Dow", ""]}}"#;
        let cfg = parse_config(json, "json").unwrap();
        assert_eq!(cfg.dedup_prefix_len, 200);
        assert_eq!(cfg.news.queries, vec!["Dow"]);
        assert!(parse_config("dedup_prefix_len = [", "toml").is_err());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        // Isolate CWD so the repo's own config/ does not interfere.
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();

        env::remove_var(ENV_PATH);
        env::remove_var(QUIVER_TOKEN_ENV);

        // No files: defaults, and the "ENV" key resolves to nothing.
        let cfg = load_config_default().unwrap();
        assert_eq!(cfg.dedup_prefix_len, DEFAULT_PREFIX_LEN);
        assert!(cfg.congress.quiver_api_key.is_none());

        // config/gather.toml is picked up and "ENV" reads the token.
        fs::create_dir_all(tmp.path().join("config")).unwrap();
        fs::write(tmp.path().join("config/gather.toml"), "run_timeout_secs = 30\n").unwrap();
        env::set_var(QUIVER_TOKEN_ENV, "from-env");
        let cfg = load_config_default().unwrap();
        assert_eq!(cfg.run_timeout_secs, 30);
        assert_eq!(cfg.congress.quiver_api_key.as_deref(), Some("from-env"));

        // Env path wins over the fallbacks.
        let p_json = tmp.path().join("custom.json");
        fs::write(&p_json, r#"{"run_timeout_secs": 45}"#).unwrap();
        env::set_var(ENV_PATH, p_json.display().to_string());
        assert_eq!(load_config_default().unwrap().run_timeout_secs, 45);

        env::set_var(ENV_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(load_config_default().is_err());

        env::remove_var(ENV_PATH);
        env::remove_var(QUIVER_TOKEN_ENV);
        env::set_current_dir(&old).unwrap();
    }
}
