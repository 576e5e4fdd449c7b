// qualis/src/main.rs

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod render;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Setup Logging (Tracing)
    // RUST_LOG=qualis_core=debug qualis run ... to see per-rule details.
    // Logs go to stderr so `--format json` stays parseable on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            project_dir,
            select,
            format,
            output,
        } => {
            let passed = commands::run::execute(project_dir, select, format, output).await?;
            if !passed {
                // Exit with error code for CI/CD
                std::process::exit(1);
            }
        }
        Commands::Rules { project_dir } => commands::rules::execute(project_dir)?,
        Commands::Profile {
            project_dir,
            format,
        } => commands::profile::execute(project_dir, format).await?,
        Commands::Inspect { project_dir, limit } => {
            commands::inspect::execute(project_dir, limit).await?
        }
    }

    Ok(())
}
