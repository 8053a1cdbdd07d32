use std::path::PathBuf;

/// Every file trawl reads or writes, derived from one root.
#[derive(Debug, Clone)]
pub struct StorePaths {
    pub root: PathBuf,
    /// Configuration scope.
    pub config_json: PathBuf,
    /// Local data scope.
    pub local_dir: PathBuf,
    pub posts_json: PathBuf,
    pub quota_json: PathBuf,
    pub status_json: PathBuf,
    pub events_jsonl: PathBuf,
    pub stop_request: PathBuf,
    pub lock_file: PathBuf,
}

impl StorePaths {
    /// Derive all paths from a root. Pure computation, no I/O.
    pub fn discover(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let local_dir = root.join("local");
        Self {
            config_json: root.join("config.json"),
            posts_json: local_dir.join("posts.json"),
            quota_json: local_dir.join("quota.json"),
            status_json: local_dir.join("status.json"),
            events_jsonl: local_dir.join("events.jsonl"),
            stop_request: local_dir.join("STOP"),
            lock_file: local_dir.join("LOCK"),
            local_dir,
            root,
        }
    }

    /// Paths under [`crate::store_root`].
    pub fn default_root() -> Self {
        Self::discover(crate::store_root())
    }

    pub fn ensure_dirs(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.local_dir)?;
        Ok(())
    }
}
