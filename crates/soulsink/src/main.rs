//! Soulsink CLI: replays host events against the configured table committers.

use std::process::ExitCode;

use clap::Parser;
use tracing::info;

use soulsink::{CliArgs, init_tracing, run};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = CliArgs::parse();

    let paths = args.config.config_paths();
    if paths.is_empty() {
        eprintln!("Error: no config files or directories specified");
        return ExitCode::FAILURE;
    }

    info!("Loading config from {} source(s)", paths.len());

    match run(args).await {
        Ok(summary) => {
            info!(
                "Replayed {} event(s), {} commit(s)",
                summary.events, summary.commits
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("soulsink failed: {e}");
            ExitCode::FAILURE
        }
    }
}
