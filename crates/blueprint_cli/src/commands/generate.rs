//! Generate command - Run the two-phase schema generation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use blueprint_gen::{
    ConfiguratorSession, FileConfigStore, GeneratorSettings, LlmAdapter, Orchestrator,
};

use crate::input::load_request;

#[derive(Args)]
pub struct GenerateArgs {
    /// App description file (JSON or YAML)
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the accepted schema (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Workspace holding `.blueprint/` settings and app config
    #[arg(short, long, env = "BLUEPRINT_WORKSPACE", default_value = ".")]
    workspace: PathBuf,

    /// Override the LLM model
    #[arg(long)]
    model: Option<String>,
}

pub async fn execute(args: GenerateArgs, quiet: bool) -> Result<()> {
    let request = load_request(&args.input)?;

    let settings = GeneratorSettings::load(&args.workspace)
        .context("Failed to load generator settings")?
        .with_overrides(args.model, None);
    let adapter = LlmAdapter::from_settings(&settings)?;
    info!("Using {:?} model {}", adapter.provider(), adapter.model());

    let store = Arc::new(FileConfigStore::new(&args.workspace));
    let orchestrator = Orchestrator::with_settings(adapter, settings).with_config_store(store.clone());
    let session = ConfiguratorSession::new();

    if !quiet {
        println!(
            "🧩 Generating schema for {} ({} tables requested)...",
            request.app.name,
            request.tables.len()
        );
    }

    let outcome = orchestrator
        .run(&session, &request)
        .await
        .context("Schema generation failed")?;

    if !quiet {
        println!(
            "   ✅ {} tables, {} enums, {} RLS policies",
            outcome.schema.tables.len(),
            outcome.schema.enums.len(),
            outcome.schema.rls_policies.len()
        );
        for warning in &outcome.report.warnings {
            println!("   ⚠️  {}", warning);
        }
        match &outcome.config_merge_error {
            Some(e) => println!("   ⚠️  App config not updated: {}", e),
            None => println!("   🔧 App config updated at {}", store.path().display()),
        }
    }

    let json = serde_json::to_string_pretty(&outcome.schema)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !quiet {
                println!("   📄 Schema written to {}", path.display());
            }
        }
        None => println!("{}", json),
    }

    Ok(())
}
