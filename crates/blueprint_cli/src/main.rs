//! blueprint CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Invalid AI response
//! - 4: LLM failure

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use blueprint_gen::GenError;

mod commands;
mod input;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const INVALID_RESPONSE: u8 = 3;
    pub const LLM_FAILURE: u8 = 4;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Generate(args) => commands::generate::execute(args, cli.quiet).await,
        Commands::Validate(args) => commands::validate::execute(args).await,
        Commands::Prompt(args) => commands::prompt::execute(args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "blueprint=debug"
    } else if quiet {
        "blueprint=warn"
    } else {
        "blueprint=info"
    };

    let mut filter = EnvFilter::from_default_env();
    for directive in [level, "warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    // Already initialized in tests; nothing to do then.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    if let Some(gen_error) = e.chain().find_map(|cause| cause.downcast_ref::<GenError>()) {
        return match gen_error {
            GenError::InvalidResponseFormat => ExitCodes::INVALID_RESPONSE,
            GenError::LlmNotConfigured | GenError::Llm(_) | GenError::Timeout(_) => {
                ExitCodes::LLM_FAILURE
            }
            _ => ExitCodes::GENERAL_ERROR,
        };
    }

    let msg = e.to_string().to_lowercase();
    if msg.contains("argument") || msg.contains("not found") {
        ExitCodes::INVALID_ARGS
    } else {
        ExitCodes::GENERAL_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_categorize_error() {
        let invalid: anyhow::Result<()> =
            Err(GenError::InvalidResponseFormat).context("Schema generation failed");
        assert_eq!(categorize_error(&invalid.unwrap_err()), ExitCodes::INVALID_RESPONSE);

        let llm = anyhow::Error::new(GenError::LlmNotConfigured);
        assert_eq!(categorize_error(&llm), ExitCodes::LLM_FAILURE);

        let missing = anyhow::anyhow!("Input file not found: app.json");
        assert_eq!(categorize_error(&missing), ExitCodes::INVALID_ARGS);

        let other = anyhow::anyhow!("disk full");
        assert_eq!(categorize_error(&other), ExitCodes::GENERAL_ERROR);
    }
}
