//! profsweep - stale profile and orphan folder cleanup

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use profsweep_cli::cmd;
use profsweep_cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Diagnostics go to stderr so stdout stays clean for --json.
    let filter = if cli.debug {
        EnvFilter::new("profsweep_core=debug,profsweep_cli=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Scan(args) => cmd::scan::scan(&args, cli.dry_run, cli.json),
        Commands::Completions { shell } => {
            cmd::completions::completions(shell);
            Ok(())
        }
    }
}
