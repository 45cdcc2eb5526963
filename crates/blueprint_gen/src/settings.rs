//! Generator settings.
//!
//! Read from `<workspace>/.blueprint/settings.json` (all keys optional) and
//! overridden by `BLUEPRINT_LLM_MODEL` and `BLUEPRINT_PHASE_TIMEOUT_SECS`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::GenResult;
use crate::llm::LlmProvider;

/// Default token budget for the plan call.
pub const DEFAULT_PLAN_MAX_TOKENS: u32 = 4096;
/// Default token budget for the schema call.
pub const DEFAULT_SCHEMA_MAX_TOKENS: u32 = 16384;
/// Default bound on a single generation call.
pub const DEFAULT_PHASE_TIMEOUT_SECS: u64 = 120;

/// Tunables for the generation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorSettings {
    pub default_provider: Option<LlmProvider>,
    pub default_model: Option<String>,
    pub plan_max_tokens: u32,
    pub schema_max_tokens: u32,
    pub phase_timeout_secs: u64,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            default_provider: None,
            default_model: None,
            plan_max_tokens: DEFAULT_PLAN_MAX_TOKENS,
            schema_max_tokens: DEFAULT_SCHEMA_MAX_TOKENS,
            phase_timeout_secs: DEFAULT_PHASE_TIMEOUT_SECS,
        }
    }
}

impl GeneratorSettings {
    /// Path of the settings file inside a workspace.
    pub fn path(workspace_root: &Path) -> PathBuf {
        workspace_root.join(".blueprint").join("settings.json")
    }

    /// Load settings for a workspace, then apply environment overrides.
    ///
    /// A missing file yields defaults; a malformed one is an error.
    pub fn load(workspace_root: &Path) -> GenResult<Self> {
        let path = Self::path(workspace_root);
        let settings = if path.exists() {
            debug!("Loading generator settings from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            Self::default()
        };

        Ok(settings.with_overrides(
            std::env::var("BLUEPRINT_LLM_MODEL").ok(),
            std::env::var("BLUEPRINT_PHASE_TIMEOUT_SECS").ok(),
        ))
    }

    /// Apply model and timeout overrides; blank or unparseable values are ignored.
    pub fn with_overrides(mut self, model: Option<String>, timeout_secs: Option<String>) -> Self {
        if let Some(model) = model.filter(|m| !m.trim().is_empty()) {
            self.default_model = Some(model);
        }
        if let Some(raw) = timeout_secs {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.phase_timeout_secs = secs,
                _ => warn!("Ignoring invalid phase timeout override: {}", raw),
            }
        }
        self
    }

    pub fn phase_timeout(&self) -> Duration {
        Duration::from_secs(self.phase_timeout_secs)
    }
}
