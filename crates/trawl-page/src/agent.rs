//! The page-side agent: one task per open page, serving readiness pings and
//! running the detect → scroll → extract → score pipeline on request.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use trawl_core::{ExtractionResult, KeywordSource};

use crate::detect::detect;
use crate::dom::select_doc;
use crate::extract::extract;
use crate::page::Page;
use crate::scroll::{simulate, ScrollPolicy};

/// Reply to a readiness probe. `Busy` while an extraction is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Ready,
    Busy,
}

/// Orchestrator → agent messages.
#[derive(Debug)]
pub enum AgentRequest {
    Ping {
        reply: oneshot::Sender<AgentStatus>,
    },
    BeginExtraction {
        result: oneshot::Sender<ExtractionResult>,
        status: mpsc::UnboundedSender<String>,
    },
}

/// Receiving side of one extraction request: a single result plus progress
/// narration.
pub struct ExtractionTicket {
    pub result: oneshot::Receiver<ExtractionResult>,
    pub status: mpsc::UnboundedReceiver<String>,
}

/// Orchestrator's handle to a page agent.
#[derive(Debug, Clone)]
pub struct AgentLink {
    tx: mpsc::Sender<AgentRequest>,
}

impl AgentLink {
    pub fn new(tx: mpsc::Sender<AgentRequest>) -> Self {
        Self { tx }
    }

    /// One liveness query. Errors when the agent is gone or never answers.
    pub async fn ping(&self) -> Result<AgentStatus> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(AgentRequest::Ping { reply })
            .await
            .map_err(|_| anyhow::anyhow!("page agent not listening"))?;
        rx.await
            .map_err(|_| anyhow::anyhow!("page agent dropped ping"))
    }

    /// Fire the extraction pipeline. The result arrives on the ticket.
    pub async fn begin_extraction(&self) -> Result<ExtractionTicket> {
        let (result, result_rx) = oneshot::channel();
        let (status, status_rx) = mpsc::unbounded_channel();
        self.tx
            .send(AgentRequest::BeginExtraction { result, status })
            .await
            .map_err(|_| anyhow::anyhow!("page agent not listening"))?;
        Ok(ExtractionTicket {
            result: result_rx,
            status: status_rx,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AgentPolicy {
    pub scroll: ScrollPolicy,
    /// How long to wait for the feed to render before proceeding anyway.
    pub feed_wait: Duration,
    pub feed_poll: Duration,
}

impl Default for AgentPolicy {
    fn default() -> Self {
        Self {
            scroll: ScrollPolicy::default(),
            feed_wait: Duration::from_secs(10),
            feed_poll: Duration::from_secs(1),
        }
    }
}

pub struct PageAgent {
    page: Arc<dyn Page>,
    keywords: Arc<dyn KeywordSource>,
    policy: AgentPolicy,
}

impl PageAgent {
    pub fn new(page: Arc<dyn Page>, keywords: Arc<dyn KeywordSource>, policy: AgentPolicy) -> Self {
        Self {
            page,
            keywords,
            policy,
        }
    }

    /// Start serving requests on a background task.
    pub fn spawn(self) -> (AgentLink, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(self.serve(rx));
        (AgentLink::new(tx), handle)
    }

    async fn serve(self, mut rx: mpsc::Receiver<AgentRequest>) {
        while let Some(req) = rx.recv().await {
            match req {
                AgentRequest::Ping { reply } => {
                    let _ = reply.send(AgentStatus::Ready);
                }
                AgentRequest::BeginExtraction { result, status } => {
                    let pipeline = self.run_pipeline(&status);
                    tokio::pin!(pipeline);
                    let outcome = loop {
                        tokio::select! {
                            outcome = &mut pipeline => break outcome,
                            req = rx.recv() => match req {
                                Some(AgentRequest::Ping { reply }) => {
                                    let _ = reply.send(AgentStatus::Busy);
                                }
                                Some(AgentRequest::BeginExtraction { result, .. }) => {
                                    let _ = result.send(ExtractionResult::Error {
                                        reason: "extraction already in progress".into(),
                                    });
                                }
                                None => break (&mut pipeline).await,
                            },
                        }
                    };
                    let _ = result.send(outcome);
                }
            }
        }
    }

    /// Feed wait → detect → scroll → extract & rank.
    pub async fn run_pipeline(&self, status: &mpsc::UnboundedSender<String>) -> ExtractionResult {
        let page = self.page.as_ref();
        let keywords = self.keywords.keywords();
        tracing::info!(
            url = page.url(),
            keywords = keywords.len(),
            "starting extraction"
        );

        let _ = status.send("Waiting for feed...".into());
        wait_for_feed(page, &self.policy).await;

        if let Some(detection) = detect(page).await {
            tracing::warn!(url = page.url(), kind = %detection.kind, "interstitial detected");
            return ExtractionResult::Detection { detection };
        }

        let _ = status.send("Deep scrolling (safe mode)...".into());
        match simulate(page, &self.policy.scroll).await {
            Ok(report) => {
                if let Some(detection) = report.stopped_by {
                    return ExtractionResult::Detection { detection };
                }
            }
            Err(e) => {
                return ExtractionResult::Error {
                    reason: format!("scroll failed: {e:#}"),
                }
            }
        }

        let _ = status.send("Analyzing & ranking posts...".into());
        let html = match page.content().await {
            Ok(h) => h,
            Err(e) => {
                return ExtractionResult::Error {
                    reason: format!("{e:#}"),
                }
            }
        };
        let extraction = extract(&html, page.url(), &keywords);
        ExtractionResult::Posts {
            posts: extraction.posts,
            diagnostics: extraction.diagnostics,
        }
    }
}

fn feed_visible(html: &str) -> bool {
    let doc = scraper::Html::parse_document(html);
    !select_doc(&doc, r#"div[role="feed"]"#).is_empty()
        || select_doc(&doc, r#"div[role="article"]"#).len() > 3
}

/// Poll until a feed container (or a handful of posts) renders, up to the
/// policy's cap. Gives up silently; detection runs next either way.
async fn wait_for_feed(page: &dyn Page, policy: &AgentPolicy) {
    let deadline = tokio::time::Instant::now() + policy.feed_wait;
    loop {
        if let Ok(html) = page.content().await {
            if feed_visible(&html) {
                return;
            }
        }
        if tokio::time::Instant::now() >= deadline {
            tracing::debug!(url = page.url(), "feed wait timed out, proceeding");
            return;
        }
        tokio::time::sleep(policy.feed_poll).await;
    }
}
