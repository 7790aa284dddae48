use std::future::Future;
use std::time::{Duration, Instant};

use serde::Deserialize;
use spider_client::shapes::request::{
    RequestType, ReturnFormat, ReturnFormatHandling, Selector, Timeout, WaitFor,
};
use spider_client::{RequestParams, Spider};
use tracing::{debug, info};

use crate::error::FetchError;

/// Rendering is complete once the page footer exists.
const READY_SELECTOR: &str = "#footer";
const READY_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Returns the final HTML of a page.
pub trait PageFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Render in a remote headless browser (spider.cloud)
    Rendered,
    /// Plain HTTP GET
    Direct,
}

/// Page rendered by spider.cloud's headless browser, returned as raw HTML.
pub struct RenderedFetcher {
    spider: Spider,
}

impl RenderedFetcher {
    pub fn new(api_key: Option<String>) -> Result<Self, FetchError> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or(FetchError::MissingApiKey)?;
        let spider = Spider::new(Some(api_key)).map_err(|e| FetchError::Spider(e.to_string()))?;
        Ok(Self { spider })
    }
}

/// Full browser render, raw HTML back, held until the footer has rendered.
fn render_params() -> RequestParams {
    RequestParams {
        request: Some(RequestType::Browser),
        return_format: Some(ReturnFormatHandling::Single(ReturnFormat::Raw)),
        wait_for: Some(WaitFor {
            selector: Some(Selector {
                selector: READY_SELECTOR.to_string(),
                timeout: Timeout {
                    secs: READY_TIMEOUT_SECS,
                    nanos: 0,
                },
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

impl PageFetcher for RenderedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        info!(url = %url, "fetching rendered page via spider");
        let start = Instant::now();
        let response = self
            .spider
            .scrape_url(url, Some(render_params()), "application/json")
            .await
            .map_err(|e| FetchError::Spider(e.to_string()))?;

        // Responses may arrive as a JSON string wrapping the array.
        let parsed: serde_json::Value = match response.as_str() {
            Some(s) => serde_json::from_str(s).unwrap_or(response.clone()),
            None => response,
        };

        let first = parsed.as_array().and_then(|arr| arr.first());

        if let Some(status) = first.and_then(|obj| obj.get("status")).and_then(|s| s.as_u64()) {
            if !(200..300).contains(&status) {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: status as u16,
                });
            }
        }

        let content = first
            .and_then(|obj| obj.get("content"))
            .and_then(|c| c.as_str())
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| FetchError::EmptyBody(url.to_string()))?;

        debug!(
            bytes = content.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "rendered page received"
        );
        Ok(content.to_string())
    }
}

/// Plain GET with a desktop browser user agent.
pub struct DirectFetcher {
    client: reqwest::Client,
}

impl DirectFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl PageFetcher for DirectFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        info!(url = %url, "fetching page");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody(url.to_string()));
        }
        debug!(bytes = body.len(), "page received");
        Ok(body)
    }
}

/// Fetcher chosen by [`FetchMode`] at startup.
pub enum Fetcher {
    Rendered(RenderedFetcher),
    Direct(DirectFetcher),
}

impl Fetcher {
    pub fn new(
        mode: FetchMode,
        spider_api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        Ok(match mode {
            FetchMode::Rendered => Fetcher::Rendered(RenderedFetcher::new(spider_api_key)?),
            FetchMode::Direct => Fetcher::Direct(DirectFetcher::new(timeout)?),
        })
    }
}

impl PageFetcher for Fetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        match self {
            Fetcher::Rendered(f) => f.fetch(url).await,
            Fetcher::Direct(f) => f.fetch(url).await,
        }
    }
}
