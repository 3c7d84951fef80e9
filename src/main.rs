//! Driftwatch CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use driftwatch::cli::{handle_error, run, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let json_mode = cli.json;

    match run(cli).await {
        Ok(code) => code,
        Err(err) => handle_error(&err, json_mode),
    }
}
