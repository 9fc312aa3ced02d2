// src/ingest/http.rs
//! Outbound GET seam. Every request carries its own timeout and a declared
//! `User-Agent`/`Accept` pair; bodies are returned as untrusted text.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, USER_AGENT};
use tracing::debug;

use crate::ingest::types::FetchError;

pub const ACCEPT_JSON: &str = "application/json, text/plain;q=0.8, */*;q=0.5";
pub const ACCEPT_XML: &str =
    "application/rss+xml, application/atom+xml, application/xml;q=0.9, text/xml;q=0.9, */*;q=0.5";
pub const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub user_agent: String,
    pub accept: &'static str,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>, user_agent: &str, accept: &'static str, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            user_agent: user_agent.to_string(),
            accept,
            headers: Vec::new(),
            timeout,
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }
}

#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// GET `req.url`; non-2xx, transport errors and timeouts are `Err`.
    async fn get(&self, req: &FetchRequest) -> Result<String, FetchError>;
}

/// Production fetcher over a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(4))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }

    fn headers(req: &FetchRequest) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(v) = HeaderValue::from_str(&req.user_agent) {
            headers.insert(USER_AGENT, v);
        }
        headers.insert(ACCEPT, HeaderValue::from_static(req.accept));
        for (k, v) in &req.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(k.as_bytes()),
                HeaderValue::from_str(v),
            ) {
                headers.insert(name, value);
            }
        }
        headers
    }

    fn map_err(req: &FetchRequest, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                url: req.url.clone(),
                timeout: req.timeout,
            }
        } else if let Some(status) = e.status() {
            FetchError::Status {
                url: req.url.clone(),
                status: status.as_u16(),
            }
        } else {
            FetchError::Transport {
                url: req.url.clone(),
                message: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn get(&self, req: &FetchRequest) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(&req.url)
            .timeout(req.timeout)
            .headers(Self::headers(req))
            .send()
            .await
            .map_err(|e| Self::map_err(req, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: req.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.map_err(|e| Self::map_err(req, e))?;
        debug!(url = %req.url, bytes = body.len(), "fetched");
        Ok(body)
    }
}

// --- Fixture fetcher (tests) ---

/// Test double for [`HttpFetch`]: serves canned responses keyed by URL substring;
/// unmatched URLs fail with HTTP 404. Every requested URL is recorded and
/// readable through [`StaticFetcher::requested`] and [`StaticFetcher::hits`].
#[derive(Default)]
pub struct StaticFetcher {
    routes: Vec<(String, Result<String, FetchError>)>,
    calls: std::sync::Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url_part: &str, body: impl Into<String>) -> Self {
        self.routes.push((url_part.to_string(), Ok(body.into())));
        self
    }

    pub fn with_error(mut self, url_part: &str, err: FetchError) -> Self {
        self.routes.push((url_part.to_string(), Err(err)));
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Counts how many requested URLs contain `url_part`.
    pub fn hits(&self, url_part: &str) -> usize {
        self.requested().iter().filter(|u| u.contains(url_part)).count()
    }
}

#[async_trait]
impl HttpFetch for StaticFetcher {
    async fn get(&self, req: &FetchRequest) -> Result<String, FetchError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(req.url.clone());
        }
        self.routes
            .iter()
            .find(|(part, _)| req.url.contains(part.as_str()))
            .map(|(_, r)| r.clone())
            .unwrap_or_else(|| {
                Err(FetchError::Status {
                    url: req.url.clone(),
                    status: 404,
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(url: &str) -> FetchRequest {
        FetchRequest::get(url, "ua/1.0", ACCEPT_JSON, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn static_fetcher_routes_by_substring_and_records_calls() {
        let f = StaticFetcher::new()
            .with_body("example.test/a", "A")
            .with_error(
                "example.test/b",
                FetchError::Timeout {
                    url: "b".into(),
                    timeout: Duration::from_secs(1),
                },
            );
        assert_eq!(f.get(&req("https://example.test/a?x=1")).await.unwrap(), "A");
        assert!(matches!(
            f.get(&req("https://example.test/b")).await,
            Err(FetchError::Timeout { .. })
        ));
        assert!(matches!(
            f.get(&req("https://example.test/c")).await,
            Err(FetchError::Status { status: 404, .. })
        ));
        assert_eq!(f.requested().len(), 3);
        assert_eq!(f.hits("example.test/a"), 1);
    }

    #[test]
    fn request_headers_are_declared() {
        let r = req("https://example.test").header("Authorization", "Bearer t");
        let h = ReqwestFetcher::headers(&r);
        assert_eq!(h.get(USER_AGENT).unwrap(), "ua/1.0");
        assert_eq!(h.get(ACCEPT).unwrap(), ACCEPT_JSON);
        assert_eq!(h.get("authorization").unwrap(), "Bearer t");
    }
}
