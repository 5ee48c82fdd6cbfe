//! # repcrec
//!
//! Runs an operation script against the replicated store and prints what
//! happened to every operation.
//!
//! ## Usage
//!
//! ```bash
//! # Run a script, text output
//! repcrec tests/scenario.txt
//!
//! # JSON events, smaller system, read from stdin
//! cat scenario.txt | repcrec - --json --sites 4 --variables 8
//!
//! # Trace lock decisions on stderr
//! repcrec scenario.txt --log-level debug
//! ```

mod cli;
mod config;
mod error;
mod output;
mod script;

use anyhow::Result;
use cli::Cli;
use error::CliResult;
use output::Output;
use repcrec_scheduler::TransactionManager;
use std::fs::File;
use std::io::{self, BufWriter, Read};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize tracing on stderr; stdout carries the results
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    let config = config::resolve_config(&cli)?;
    let source = read_input(&cli)?;
    let operations = script::parse_script(&source)?;

    tracing::info!(
        sites = config.num_sites,
        variables = config.num_variables,
        operations = operations.len(),
        "running script"
    );

    let mut manager = TransactionManager::new(config);
    let mut output = Output::new(cli.json);
    for op in operations {
        output.extend(manager.submit(op));
    }

    if cli.no_drain {
        let pending = manager.blocked_operations().count();
        if pending > 0 {
            tracing::warn!(pending, "script ended with blocked operations");
        }
    } else {
        output.extend(manager.finish());
    }

    tracing::info!(events = output.events().len(), "script finished");

    match &cli.output {
        Some(path) => output.write_to(&mut BufWriter::new(File::create(path)?))?,
        None => output.write_to(&mut io::stdout().lock())?,
    }

    Ok(())
}

fn read_input(cli: &Cli) -> CliResult<String> {
    if cli.reads_stdin() {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source)?;
        Ok(source)
    } else {
        Ok(std::fs::read_to_string(&cli.input)?)
    }
}
