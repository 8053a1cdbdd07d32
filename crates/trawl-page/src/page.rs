use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// DOM access the page-side agent needs. Implemented by real browser
/// backends and by in-memory pages in tests.
#[async_trait]
pub trait Page: Send + Sync {
    fn url(&self) -> &str;

    /// Current rendered HTML of the document.
    async fn content(&self) -> Result<String>;

    /// Scroll vertically by `dy` units (negative scrolls back up).
    async fn scroll_by(&self, dy: i64) -> Result<()>;
}

/// A page whose content never changes. Scrolling only moves an offset.
pub struct StaticPage {
    url: String,
    html: String,
    scrolls: Mutex<Vec<i64>>,
}

impl StaticPage {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            scrolls: Mutex::new(Vec::new()),
        }
    }

    /// Every scroll delta applied so far, in order.
    pub fn scrolls(&self) -> Vec<i64> {
        self.scrolls.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn offset(&self) -> i64 {
        self.scrolls().iter().sum::<i64>().max(0)
    }
}

#[async_trait]
impl Page for StaticPage {
    fn url(&self) -> &str {
        &self.url
    }

    async fn content(&self) -> Result<String> {
        Ok(self.html.clone())
    }

    async fn scroll_by(&self, dy: i64) -> Result<()> {
        if let Ok(mut s) = self.scrolls.lock() {
            s.push(dy);
        }
        Ok(())
    }
}

/// [`crate::browser::PageSource`] over a fixed URL → HTML map.
#[derive(Default)]
pub struct StaticSource {
    pages: HashMap<String, String>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }
}

#[async_trait]
impl crate::browser::PageSource for StaticSource {
    async fn load(&self, url: &str) -> Result<Arc<dyn Page>> {
        let html = self
            .pages
            .get(url)
            .ok_or_else(|| anyhow::anyhow!("no page registered for {url}"))?;
        Ok(Arc::new(StaticPage::new(url, html.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::PageSource;

    #[tokio::test]
    async fn static_page_records_scrolls() {
        let page = StaticPage::new("https://example.com", "<p>x</p>");
        page.scroll_by(500).await.unwrap();
        page.scroll_by(-200).await.unwrap();
        assert_eq!(page.scrolls(), vec![500, -200]);
        assert_eq!(page.offset(), 300);
        assert_eq!(page.content().await.unwrap(), "<p>x</p>");
    }

    #[tokio::test]
    async fn static_source_unknown_url_errors() {
        let src = StaticSource::new().with_page("https://a", "<p>a</p>");
        assert!(src.load("https://a").await.is_ok());
        assert!(src.load("https://b").await.is_err());
    }
}
