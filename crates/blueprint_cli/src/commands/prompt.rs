//! Prompt command - Print a generation prompt without calling an LLM.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use blueprint_gen::{build_plan_prompt, build_schema_prompt};

use crate::input::load_request;

#[derive(Args)]
pub struct PromptArgs {
    /// App description file (JSON or YAML)
    #[arg(short, long)]
    input: PathBuf,

    /// Design plan; prints the schema prompt instead of the plan prompt
    #[arg(short, long)]
    plan: Option<PathBuf>,
}

pub async fn execute(args: PromptArgs) -> Result<()> {
    let request = load_request(&args.input)?;

    let prompt = match &args.plan {
        Some(path) => {
            let plan = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read plan {}", path.display()))?;
            build_schema_prompt(&plan, &request.tables, &request.app)
        }
        None => build_plan_prompt(&request.app, &request.features, &request.tables),
    };

    println!("{}", prompt);
    Ok(())
}
