//! Everything that runs "inside" a loaded group page.
//!
//! The orchestrator never touches the DOM directly. It opens a page through a
//! [`browser::Browser`], then talks to that page's [`agent::PageAgent`] over
//! channels: readiness pings, one `begin extraction` request, and a single
//! [`trawl_core::ExtractionResult`] reply plus free-text status updates.

pub mod agent;
pub mod browser;
pub mod detect;
mod dom;
pub mod extract;
pub mod page;
pub mod score;
pub mod scroll;

pub use agent::{AgentLink, AgentPolicy, AgentStatus, ExtractionTicket, PageAgent};
pub use browser::{AgentBrowser, Browser, PageHandle, PageId, PageSource};
pub use page::{Page, StaticPage, StaticSource};
