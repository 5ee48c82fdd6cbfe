//! Simulation configuration loading

use crate::cli::Cli;
use crate::error::CliResult;
use repcrec_types::SimConfig;
use std::path::Path;

/// Load a configuration file; missing fields take their defaults
pub fn load_config_file(path: &Path) -> CliResult<SimConfig> {
    tracing::info!("Loading configuration from {:?}", path);
    let content = std::fs::read_to_string(path)?;
    let config: SimConfig = serde_json::from_str(&content)?;
    Ok(config)
}

/// Build the configuration from the optional file plus command-line overrides
pub fn resolve_config(cli: &Cli) -> CliResult<SimConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config_file(path)?,
        None => SimConfig::default(),
    };

    if let Some(sites) = cli.sites {
        config.num_sites = sites;
    }
    if let Some(variables) = cli.variables {
        config.num_variables = variables;
    }

    config.validate()?;
    Ok(config)
}
