use anyhow::Result;
use std::path::PathBuf;

use trawl_core::config::Settings;
use trawl_core::repo::SettingsSource;
use trawl_core::{KeywordSet, KeywordSource};

use crate::{read_json_or_default, write_json, StorePaths};

/// Configuration scope backed by `config.json`. Re-read on every access so
/// edits made between sessions (or between extractions) take effect.
#[derive(Debug, Clone)]
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    pub fn new(paths: &StorePaths) -> Self {
        Self {
            path: paths.config_json.clone(),
        }
    }

    pub fn load(&self) -> Result<Settings> {
        read_json_or_default(&self.path)
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        write_json(&self.path, settings)
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

impl SettingsSource for SettingsFile {
    fn settings(&self) -> Result<Settings> {
        self.load()
    }
}

impl KeywordSource for SettingsFile {
    /// Unreadable config falls back to the default keyword lists.
    fn keywords(&self) -> KeywordSet {
        match self.load() {
            Ok(s) => KeywordSet::from_config(&s.keywords),
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "config unreadable, using default keywords");
                KeywordSet::from_config(&Default::default())
            }
        }
    }
}
