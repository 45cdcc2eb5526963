//! App-configuration stores.
//!
//! The file store keeps the configuration in the workspace under
//! `.blueprint/app-config.json`.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::GenResult;
use crate::reconcile::{AppConfig, AppConfigPatch};

/// Holder of the app configuration. Updates are partial merges only.
pub trait ConfigStore: Send + Sync {
    fn current(&self) -> GenResult<AppConfig>;

    fn merge(&self, patch: &AppConfigPatch) -> GenResult<AppConfig>;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    config: RwLock<AppConfig>,
}

impl MemoryConfigStore {
    pub fn new(initial: AppConfig) -> Self {
        Self {
            config: RwLock::new(initial),
        }
    }
}

impl ConfigStore for MemoryConfigStore {
    fn current(&self) -> GenResult<AppConfig> {
        Ok(*self.config.read())
    }

    fn merge(&self, patch: &AppConfigPatch) -> GenResult<AppConfig> {
        let mut config = self.config.write();
        *config = patch.apply(*config);
        Ok(*config)
    }
}

/// JSON file store rooted at a workspace.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    workspace_root: PathBuf,
}

impl FileConfigStore {
    pub fn new(workspace_root: impl AsRef<Path>) -> Self {
        Self {
            workspace_root: workspace_root.as_ref().to_path_buf(),
        }
    }

    /// Path of the configuration file
    pub fn path(&self) -> PathBuf {
        self.workspace_root.join(".blueprint").join("app-config.json")
    }

    fn save(&self, config: &AppConfig) -> GenResult<()> {
        let path = self.path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(config)?;
        fs::write(&path, content)?;
        Ok(())
    }
}

impl ConfigStore for FileConfigStore {
    fn current(&self) -> GenResult<AppConfig> {
        let path = self.path();
        if !path.exists() {
            return Ok(AppConfig::default());
        }
        debug!("Loading app config from {}", path.display());
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn merge(&self, patch: &AppConfigPatch) -> GenResult<AppConfig> {
        let merged = patch.apply(self.current()?);
        self.save(&merged)?;
        info!("Updated app config at {}", self.path().display());
        Ok(merged)
    }
}
