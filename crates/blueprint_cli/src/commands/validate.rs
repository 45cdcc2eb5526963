//! Validate command - Run extraction, normalization and validation on a saved response.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use blueprint_gen::{parse_schema, reconcile, validate_and_fix, ExpectedCounts, GenError};

use crate::input::load_request;

#[derive(Args)]
pub struct ValidateArgs {
    /// Raw LLM response (any text containing the JSON payload)
    #[arg(short, long)]
    schema: PathBuf,

    /// App description file providing the requested tables
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Where to write the fixed schema
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub async fn execute(args: ValidateArgs) -> Result<()> {
    if !args.schema.exists() {
        anyhow::bail!("Response file not found: {}", args.schema.display());
    }
    let response = std::fs::read_to_string(&args.schema)
        .with_context(|| format!("Failed to read {}", args.schema.display()))?;

    let expected = match &args.input {
        Some(path) => ExpectedCounts::from_stubs(&load_request(path)?.tables),
        None => ExpectedCounts::for_tables(0),
    };

    let mut schema = parse_schema(&response)
        .ok_or(GenError::InvalidResponseFormat)
        .with_context(|| format!("Could not parse {}", args.schema.display()))?;
    info!("Parsed {} tables from {}", schema.tables.len(), args.schema.display());

    let report = validate_and_fix(&mut schema, &expected);
    let patch = reconcile(&schema.configuration);

    println!("📋 Validating {}...", args.schema.display());
    println!(
        "   {} tables, {} enums, {} RLS policies ({} provider)",
        schema.tables.len(),
        schema.enums.len(),
        schema.rls_policies.len(),
        schema.configuration.database_provider
    );
    if report.is_clean() {
        println!("   ✅ No issues found");
    }
    for warning in &report.warnings {
        println!("   ⚠️  {}", warning);
    }
    println!("   🔧 Config patch: {}", serde_json::to_string(&patch)?);

    if let Some(path) = &args.output {
        std::fs::write(path, serde_json::to_string_pretty(&schema)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("   📄 Fixed schema written to {}", path.display());
    }

    Ok(())
}
