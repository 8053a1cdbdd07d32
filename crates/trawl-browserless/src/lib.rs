//! Rendered-HTML page source backed by a Browserless `/content` endpoint.
//!
//! Each load is one render; the returned page is a snapshot. Scroll calls
//! are recorded against the snapshot but cannot pull in more content.

pub mod error;

pub use error::{BrowserlessError, Result};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use trawl_page::{Page, PageSource, StaticPage};

pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(BrowserlessError::Client)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    fn endpoint(&self) -> String {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }
        endpoint
    }

    /// Render `url` and return the resulting DOM as HTML.
    pub async fn content(&self, url: &str) -> Result<String> {
        let unreachable = |source| BrowserlessError::Unreachable {
            url: url.to_string(),
            source,
        };

        let resp = self
            .client
            .post(self.endpoint())
            .json(&serde_json::json!({ "url": url }))
            .send()
            .await
            .map_err(unreachable)?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            tracing::warn!(url, status = status.as_u16(), "render rejected");
            return Err(BrowserlessError::Rejected {
                url: url.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let html = resp.text().await.map_err(unreachable)?;
        tracing::debug!(url, bytes = html.len(), "rendered page fetched");
        Ok(html)
    }
}

/// [`PageSource`] that renders every page through Browserless.
pub struct BrowserlessSource {
    client: BrowserlessClient,
}

impl BrowserlessSource {
    pub fn new(client: BrowserlessClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for BrowserlessSource {
    async fn load(&self, url: &str) -> anyhow::Result<Arc<dyn Page>> {
        let html = self.client.content(url).await?;
        Ok(Arc::new(StaticPage::new(url, html)))
    }
}
