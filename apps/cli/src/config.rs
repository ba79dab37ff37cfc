//! CLI configuration loading and merging.

use anyhow::{Context, Result, bail};
use std::path::Path;
use tuningtron_training::TunerConfig;

/// Load and merge configuration.
///
/// Precedence, highest first:
/// 1. CLI arguments (applied by each command)
/// 2. `--config <path>`
/// 3. Local config file (./tuningtron.toml)
/// 4. Global config file (~/.tuningtron/config.toml)
/// 5. Defaults
pub fn load_config(explicit: Option<&Path>) -> Result<TunerConfig> {
    let mut layers = vec![TunerConfig::default_global_path(), TunerConfig::default_local_path()];
    if let Some(path) = explicit {
        if !path.is_file() {
            bail!("Config file not found: {}", path.display());
        }
        layers.push(path.to_path_buf());
    }
    TunerConfig::load_layers(&layers).context("Failed to load configuration")
}
