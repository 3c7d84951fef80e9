//! Command-line interface.

pub mod commands;
pub mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging::LoggerImpl;

pub use commands::analyze::AnalyzeArgs;

/// Exit code when any rule failed.
pub const EXIT_DRIFT: u8 = 2;

/// Exit code for fatal errors.
pub const EXIT_ERROR: u8 = 1;

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(name = "driftwatch")]
#[command(about = "Detect drift in AI-agent conversations and project documents", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Project directory holding `.driftwatch/` configuration
    #[arg(short, long, global = true, default_value = ".")]
    pub project: PathBuf,

    /// Explicit configuration file (replaces the project config layers)
    #[arg(short, long, global = true, env = "DRIFTWATCH_CONFIG_FILE")]
    pub config: Option<PathBuf>,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze conversations or document bundles for drift
    Analyze(AnalyzeArgs),

    /// List configured rules
    Rules,
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => ConfigLoader::load_from_file(path),
            None => ConfigLoader::load_from_dir(&self.project),
        }
    }
}

/// Parse-independent entry point: load config, set up logging, dispatch.
pub async fn run(cli: Cli) -> Result<ExitCode> {
    let config = cli.load_config()?;
    let _logger = LoggerImpl::init(&config.logging)?;

    match &cli.command {
        Commands::Analyze(args) => {
            commands::analyze::execute(args, &config, &cli.project, cli.json).await
        }
        Commands::Rules => {
            commands::rules::execute(&config, cli.json)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Report a fatal error on stderr.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) -> ExitCode {
    if json_mode {
        let chain: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        eprintln!(
            "{}",
            serde_json::json!({ "error": err.to_string(), "caused_by": chain })
        );
    } else {
        eprintln!("Error: {err:#}");
    }
    ExitCode::from(EXIT_ERROR)
}
