//! CLI argument parsing for repcrec

use clap::Parser;
use std::path::PathBuf;

/// Replicated concurrency control and recovery simulator
#[derive(Parser, Debug, Clone)]
#[command(name = "repcrec")]
#[command(about = "Run an operation script against the replicated store")]
#[command(version)]
pub struct Cli {
    /// Operation script to run ("-" reads standard input)
    pub input: PathBuf,

    /// Write results to this file instead of standard output
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output events as a JSON array
    #[arg(long)]
    pub json: bool,

    /// Simulation configuration file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of sites (overrides the config file)
    #[arg(long)]
    pub sites: Option<u32>,

    /// Number of variables (overrides the config file)
    #[arg(long)]
    pub variables: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Leave blocked operations pending instead of retrying them at the end
    #[arg(long)]
    pub no_drain: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Whether the script comes from standard input
    pub fn reads_stdin(&self) -> bool {
        self.input.as_os_str() == "-"
    }
}
