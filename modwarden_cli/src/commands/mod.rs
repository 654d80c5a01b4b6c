//! CLI subcommand implementations.

pub mod check_config;
pub mod run;

use std::path::Path;

use anyhow::{Context, Result};
use modwarden_lib::Config;

/// Reads, parses and validates the configuration file.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = Config::from_file(path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    config.validate()?;
    Ok(config)
}
