//! exptrack binary entry point

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use exptrack::cli::{execute, Cli, Command};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("exptrack=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let what = match &cli.command {
        Command::Run(_) => "run failed",
        Command::Report(_) => "report generation failed",
    };
    execute(&cli).context(what)
}
