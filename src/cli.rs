use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pkgscope-collect")]
#[command(about = "Collect DNF/RPM package metrics into a JSON snapshot")]
#[command(version)]
pub struct CollectCli {
    #[command(subcommand)]
    pub command: CollectCommand,
}

#[derive(Subcommand)]
pub enum CollectCommand {
    /// Run every enabled collector and write a snapshot
    Run(CollectArgs),
}

#[derive(Parser)]
pub struct CollectArgs {
    /// Configuration file (defaults to ~/.config/pkgscope/config.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Show debug output including skipped lines and commands run
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,
}

#[derive(Parser)]
#[command(name = "pkgscope-report")]
#[command(about = "Turn the latest package snapshot into an AI-written HTML report")]
#[command(version)]
pub struct ReportCli {
    #[command(subcommand)]
    pub command: ReportCommand,
}

#[derive(Subcommand)]
pub enum ReportCommand {
    /// Load the latest snapshot, ask the model, write the report
    Run(ReportArgs),
}

#[derive(Parser)]
pub struct ReportArgs {
    /// Configuration file (defaults to ~/.config/pkgscope/config.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Use this snapshot instead of the newest one in output_dir
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Show debug output
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,
}

/// Log to stderr; RUST_LOG wins over --verbose.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "pkgscope=debug" } else { "pkgscope=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
