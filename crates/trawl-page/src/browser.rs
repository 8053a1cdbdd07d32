//! Page lifecycle: open a group URL, attach an agent, close it again.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

use trawl_core::KeywordSource;

use crate::agent::{AgentLink, AgentPolicy, PageAgent};
use crate::page::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId(pub u64);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page-{}", self.0)
    }
}

/// An open page and the link to its agent.
#[derive(Debug, Clone)]
pub struct PageHandle {
    pub id: PageId,
    pub url: String,
    pub agent: AgentLink,
}

#[async_trait]
pub trait Browser: Send + Sync {
    async fn open_page(&self, url: &str) -> Result<PageHandle>;

    /// Close a page. Closing an unknown or already-closed page is a no-op.
    async fn close_page(&self, id: PageId);
}

/// Fetches a document for a URL.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn load(&self, url: &str) -> Result<Arc<dyn Page>>;
}

/// [`Browser`] that loads pages from a [`PageSource`] and runs an in-process
/// [`PageAgent`] task for each one.
pub struct AgentBrowser {
    source: Arc<dyn PageSource>,
    keywords: Arc<dyn KeywordSource>,
    policy: AgentPolicy,
    next_id: AtomicU64,
    open: Mutex<HashMap<PageId, JoinHandle<()>>>,
}

impl AgentBrowser {
    pub fn new(
        source: Arc<dyn PageSource>,
        keywords: Arc<dyn KeywordSource>,
        policy: AgentPolicy,
    ) -> Self {
        Self {
            source,
            keywords,
            policy,
            next_id: AtomicU64::new(1),
            open: Mutex::new(HashMap::new()),
        }
    }

    pub fn open_count(&self) -> usize {
        self.open.lock().map(|m| m.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Browser for AgentBrowser {
    async fn open_page(&self, url: &str) -> Result<PageHandle> {
        let page = self.source.load(url).await?;
        let id = PageId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let agent = PageAgent::new(page, self.keywords.clone(), self.policy.clone());
        let (link, task) = agent.spawn();
        if let Ok(mut open) = self.open.lock() {
            open.insert(id, task);
        }
        tracing::debug!(%id, url, "page opened");
        Ok(PageHandle {
            id,
            url: url.to_string(),
            agent: link,
        })
    }

    async fn close_page(&self, id: PageId) {
        let task = self.open.lock().ok().and_then(|mut open| open.remove(&id));
        if let Some(task) = task {
            task.abort();
            tracing::debug!(%id, "page closed");
        }
    }
}
