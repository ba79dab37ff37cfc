//! Tuner configuration file support.
//!
//! Configuration is read from `~/.tuningtron/config.toml` and then from
//! `./tuningtron.toml`; values in the local file override the global one.
//!
//! ```toml
//! workspace = "/srv/tuning"
//! models_dir = "/srv/models"
//! datasets_dir = "/srv/datasets"
//! log_level = "debug"
//! distributed = true
//!
//! [launcher]
//! program = "accelerate"
//! args = ["launch", "runner.py"]
//!
//! [hardware]
//! capability = "8.0"
//!
//! [sft]
//! rank = 16
//! max_len_percentile = 95.0
//! ```

use crate::error::{TrainingError, TrainingResult};
use crate::hardware::HardwareOverride;
use crate::job::{DpoOptions, SftOptions};
use crate::launcher::LauncherConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const GLOBAL_CONFIG_DIR: &str = ".tuningtron";
pub const LOCAL_CONFIG_FILE: &str = "tuningtron.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TunerConfig {
    /// Root that holds `.tuningtron/jobs`.
    #[serde(default)]
    pub workspace: Option<PathBuf>,

    /// Directory searched for model ids that are not local paths.
    #[serde(default)]
    pub models_dir: Option<PathBuf>,

    #[serde(default)]
    pub datasets_dir: Option<PathBuf>,

    #[serde(default)]
    pub log_level: Option<String>,

    /// Request ZeRO-3 CPU offload on accelerators.
    #[serde(default)]
    pub distributed: Option<bool>,

    #[serde(default)]
    pub launcher: Option<LauncherConfig>,

    #[serde(default)]
    pub hardware: HardwareOverride,

    /// Defaults for `sft` runs; command-line flags still win.
    #[serde(default)]
    pub sft: Option<SftOptions>,

    #[serde(default)]
    pub dpo: Option<DpoOptions>,
}

impl TunerConfig {
    pub fn load_from_file(path: &Path) -> TrainingResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TrainingError::Config(format!("{}: {e}", path.display())))?;
        toml::from_str(&content).map_err(|e| TrainingError::Config(format!("{}: {e}", path.display())))
    }

    pub fn save_to_file(&self, path: &Path) -> TrainingResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| TrainingError::Config(format!("failed to serialize: {e}")))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    #[must_use]
    pub fn default_global_path() -> PathBuf {
        std::env::var("HOME")
            .map_or_else(|_| PathBuf::from("."), PathBuf::from)
            .join(GLOBAL_CONFIG_DIR)
            .join("config.toml")
    }

    #[must_use]
    pub fn default_local_path() -> PathBuf {
        PathBuf::from(LOCAL_CONFIG_FILE)
    }

    /// Load the global then the local config. Missing files are skipped;
    /// files that exist but fail to parse are errors.
    pub fn discover_and_load() -> TrainingResult<Self> {
        Self::load_layers(&[Self::default_global_path(), Self::default_local_path()])
    }

    /// Merge the files in order, later ones overriding earlier ones.
    pub fn load_layers(paths: &[PathBuf]) -> TrainingResult<Self> {
        let mut config = Self::default();
        for path in paths {
            if path.is_file() {
                config.merge(&Self::load_from_file(path)?);
            }
        }
        Ok(config)
    }

    /// Values set in `other` override values in `self`.
    pub fn merge(&mut self, other: &Self) {
        if other.workspace.is_some() {
            self.workspace.clone_from(&other.workspace);
        }
        if other.models_dir.is_some() {
            self.models_dir.clone_from(&other.models_dir);
        }
        if other.datasets_dir.is_some() {
            self.datasets_dir.clone_from(&other.datasets_dir);
        }
        if other.log_level.is_some() {
            self.log_level.clone_from(&other.log_level);
        }
        if other.distributed.is_some() {
            self.distributed = other.distributed;
        }
        if other.launcher.is_some() {
            self.launcher.clone_from(&other.launcher);
        }
        self.hardware.merge(&other.hardware);
        if other.sft.is_some() {
            self.sft.clone_from(&other.sft);
        }
        if other.dpo.is_some() {
            self.dpo.clone_from(&other.dpo);
        }
    }

    #[must_use]
    pub fn launcher(&self) -> LauncherConfig {
        self.launcher.clone().unwrap_or_default()
    }

    #[must_use]
    pub fn sft_options(&self) -> SftOptions {
        self.sft.clone().unwrap_or_default()
    }

    #[must_use]
    pub fn dpo_options(&self) -> DpoOptions {
        self.dpo.clone().unwrap_or_default()
    }
}
