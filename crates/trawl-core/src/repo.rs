//! Repository seams between the orchestrator and persistence.

use anyhow::Result;

use crate::config::Settings;
use crate::quota::QuotaRecord;
use crate::types::Post;

/// Deduplicating, capped post storage.
pub trait PostRepository: Send + Sync {
    /// Merge new posts, returning how many were actually added.
    fn merge(&self, posts: &[Post]) -> Result<usize>;
    fn load(&self) -> Result<Vec<Post>>;
}

/// Load/save access to the persisted [`QuotaRecord`].
pub trait QuotaRepository: Send + Sync {
    fn load(&self) -> Result<QuotaRecord>;
    fn save(&self, record: &QuotaRecord) -> Result<()>;

    /// Read-modify-write under whatever exclusion the backend offers.
    fn update(&self, f: &mut dyn FnMut(&mut QuotaRecord)) -> Result<QuotaRecord> {
        let mut record = self.load()?;
        f(&mut record);
        self.save(&record)?;
        Ok(record)
    }
}

/// Configuration scope read at session start.
pub trait SettingsSource: Send + Sync {
    fn settings(&self) -> Result<Settings>;
}

impl SettingsSource for Settings {
    fn settings(&self) -> Result<Settings> {
        Ok(self.clone())
    }
}
