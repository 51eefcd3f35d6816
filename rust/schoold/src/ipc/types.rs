use std::path::{Path, PathBuf};

use crate::cache::SnapshotCache;
use crate::config::Config;
use crate::notify::Notifications;
use crate::store::SqliteStore;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: Config,
    pub workspace: Option<PathBuf>,
    pub store: Option<SqliteStore>,
    pub cache: Option<SnapshotCache>,
    pub notices: Notifications,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            workspace: None,
            store: None,
            cache: None,
            notices: Notifications::new(),
        }
    }

    /// Open (or switch to) the store in `path`. A fresh cache comes with it
    /// when caching is enabled.
    pub fn open_workspace(&mut self, path: &Path) -> anyhow::Result<()> {
        let store = SqliteStore::open(path)?;
        self.store = Some(store);
        self.cache = self.config.cache_enabled.then(SnapshotCache::new);
        self.workspace = Some(path.to_path_buf());
        info!(workspace = %path.display(), cache = self.config.cache_enabled, "workspace opened");
        Ok(())
    }
}
