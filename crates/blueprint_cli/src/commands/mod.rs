//! CLI command definitions.

use clap::{Parser, Subcommand};

pub mod generate;
pub mod prompt;
pub mod validate;

/// blueprint - LLM-assisted backend schema configurator
#[derive(Parser)]
#[command(name = "blueprint")]
#[command(version, about = "blueprint - LLM-assisted backend schema configurator")]
#[command(long_about = r#"
blueprint turns an app description into a backend schema (tables, enums,
row-level-security policies) using a two-phase LLM generation, then validates
and reconciles the result with the app configuration.

COMMANDS:
  generate  → Run plan + schema generation for an app description
  validate  → Extract, normalize and validate a saved LLM response
  prompt    → Print the plan or schema prompt without calling an LLM

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Invalid AI response
  4 - LLM failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a schema for an app description
    Generate(generate::GenerateArgs),

    /// Validate a saved generation response
    Validate(validate::ValidateArgs),

    /// Print a generation prompt
    Prompt(prompt::PromptArgs),
}
