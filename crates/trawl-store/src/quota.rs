use anyhow::Result;
use std::path::PathBuf;

use trawl_core::repo::QuotaRepository;
use trawl_core::QuotaRecord;

use crate::{lock_file, read_json_or_default, write_json, StorePaths};

/// [`QuotaRecord`] persisted as `local/quota.json`.
pub struct FileQuotaStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileQuotaStore {
    pub fn new(paths: &StorePaths) -> Self {
        Self {
            path: paths.quota_json.clone(),
            lock_path: paths.lock_file.clone(),
        }
    }
}

impl QuotaRepository for FileQuotaStore {
    fn load(&self) -> Result<QuotaRecord> {
        read_json_or_default(&self.path)
    }

    fn save(&self, record: &QuotaRecord) -> Result<()> {
        write_json(&self.path, record)
    }

    fn update(&self, f: &mut dyn FnMut(&mut QuotaRecord)) -> Result<QuotaRecord> {
        let _lock = lock_file(&self.lock_path)?;
        let mut record = self.load()?;
        f(&mut record);
        self.save(&record)?;
        Ok(record)
    }
}
