//! Inputs to a generation cycle.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GenResult;

/// Structured description of the app being scaffolded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDescription {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Full README text, if the user supplied one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,
    /// Inferred page names
    #[serde(default)]
    pub pages: Vec<String>,
}

/// A feature inferred from the app description.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Feature {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Feature {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// A table the user asked for, before any columns exist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableStub {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl TableStub {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Everything a generation cycle needs from the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub app: AppDescription,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub tables: Vec<TableStub>,
}

impl GenerationRequest {
    pub fn new(app: AppDescription) -> Self {
        Self {
            app,
            features: Vec::new(),
            tables: Vec::new(),
        }
    }

    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.features.push(feature);
        self
    }

    pub fn with_table(mut self, stub: TableStub) -> Self {
        self.tables.push(stub);
        self
    }

    /// Read a request file. `.yaml`/`.yml` files are parsed as YAML, anything else as JSON.
    pub fn load(path: &Path) -> GenResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let request: Self = if is_yaml(path) {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        debug!(
            "Loaded request for {} ({} features, {} tables)",
            request.app.name,
            request.features.len(),
            request.tables.len()
        );
        Ok(request)
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref(),
        Some("yaml" | "yml")
    )
}
