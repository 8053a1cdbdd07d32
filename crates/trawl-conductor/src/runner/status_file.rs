//! Mirror of the live [`SessionState`] on disk, for `trawl status` in
//! another process.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::state::machine::SessionState;

pub fn write_status(path: &Path, state: &SessionState) -> Result<()> {
    trawl_store::write_json(path, state)
}

/// Last published state, or idle if none was ever written.
pub fn read_status(path: &Path) -> Result<SessionState> {
    trawl_store::read_json_or_default(path)
}

/// Write every broadcast state to `path` until the sender goes away.
pub fn spawn_status_writer(mut rx: watch::Receiver<SessionState>, path: PathBuf) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            if let Err(e) = write_status(&path, &snapshot) {
                tracing::warn!(path = %path.display(), error = %format!("{e:#}"), "status write failed");
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
    })
}
