//! Floral - Prompt Enhancement for Floral Arrangements
//!
//! Single binary: stdio MCP server plus offline commands over the same
//! intent pipeline.
//!
//! Usage:
//!   floral mcp                                   # Run the MCP server on stdio
//!   floral enhance "spring wedding" --json       # Enhance a prompt offline
//!   floral workflow "ikebana" --hint style=nageire
//!   floral styles                                # Arrangement styles table

mod cli;
mod config;
mod synthesis;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::{ConfigOverrides, FloralConfig};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "floral")]
#[command(author, version)]
#[command(about = "Floral arrangement prompt enhancement and ComfyUI workflow generation")]
struct Cli {
    /// Enable verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Config file (default: $FLORAL_HOME/config.toml)
    #[arg(long, global = true, env = "FLORAL_CONFIG")]
    config: Option<PathBuf>,

    /// Candidates kept per taxonomy category
    #[arg(long, global = true, env = "FLORAL_TOP_K")]
    top_k: Option<usize>,

    /// Confidence below which synthesis is attempted (0.0 - 1.0)
    #[arg(long, global = true, env = "FLORAL_THRESHOLD")]
    threshold: Option<f64>,

    /// Never call the synthesis command
    #[arg(long, global = true)]
    no_synthesis: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the MCP server over stdio
    Mcp,

    /// Enhance a free-text request into a structured prompt
    Enhance {
        /// Free-text request, e.g. "romantic spring wedding centerpiece"
        text: String,

        /// Pin a category to an entry (category=id), repeatable
        #[arg(long = "hint", value_name = "CATEGORY=ID", value_parser = cli::parse_hint)]
        hints: Vec<(String, String)>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print ComfyUI workflow slots for a request as JSON
    Workflow {
        /// Free-text request
        text: String,

        /// Pin a category to an entry (category=id), repeatable
        #[arg(long = "hint", value_name = "CATEGORY=ID", value_parser = cli::parse_hint)]
        hints: Vec<(String, String)>,
    },

    /// List arrangement styles
    Styles,
}

fn run_command(cli: Cli) -> Result<()> {
    let mut config = FloralConfig::load(cli.config.as_deref())?;
    config.apply_overrides(&ConfigOverrides {
        top_k: cli.top_k,
        confidence_threshold: cli.threshold,
        no_synthesis: cli.no_synthesis,
    })?;

    match cli.command {
        Commands::Mcp => cli::mcp::run(&config),
        Commands::Enhance { text, hints, json } => {
            cli::enhance::run(cli::enhance::EnhanceArgs { text, hints, json }, &config)
        }
        Commands::Workflow { text, hints } => {
            cli::workflow::run(cli::workflow::WorkflowArgs { text, hints }, &config)
        }
        Commands::Styles => cli::styles::run(&config),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Offline commands keep stderr for their own diagnostics.
    let quiet_console = !matches!(cli.command, Commands::Mcp);
    if let Err(err) = floral_logging::init_logging(floral_logging::LogConfig {
        app_name: "floral",
        verbose: cli.verbose,
        quiet_console,
        log_dir: None,
    }) {
        eprintln!("Warning: failed to initialize logging: {err:#}");
    }

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_enhance_with_hints() {
        let cli = Cli::try_parse_from([
            "floral",
            "enhance",
            "spring wedding",
            "--hint",
            "style=nageire",
            "--hint",
            "palette=spring",
            "--json",
            "--threshold",
            "0.5",
        ])
        .unwrap();

        assert_eq!(cli.threshold, Some(0.5));
        match cli.command {
            Commands::Enhance { text, hints, json } => {
                assert_eq!(text, "spring wedding");
                assert_eq!(hints.len(), 2);
                assert_eq!(hints[0], ("style".to_string(), "nageire".to_string()));
                assert!(json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_malformed_hint_rejected() {
        assert!(Cli::try_parse_from(["floral", "workflow", "roses", "--hint", "nageire"]).is_err());
    }
}
