//! Loading of generation requests from the command line.

use std::path::Path;

use anyhow::{Context, Result};

use blueprint_gen::GenerationRequest;

/// Read a request file (JSON, or YAML by extension).
pub fn load_request(path: &Path) -> Result<GenerationRequest> {
    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }
    GenerationRequest::load(path).with_context(|| format!("Invalid input file {}", path.display()))
}
