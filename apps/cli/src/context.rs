//! Per-invocation state shared by the commands.

use crate::commands::types::HardwareArgs;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::warn;
use tuningtron_training::hardware::log_device_info;
use tuningtron_training::{
    DatasetLoader, HardwareProfile, HfTokenizer, JsonlDatasetLoader, LauncherTrainer, LocalModelResolver,
    ModelResolver, Record, ResolvedModel, TrainingLayout, Tuner, TunerConfig,
};

pub struct CliContext {
    pub config: TunerConfig,
    pub workspace: PathBuf,
}

impl CliContext {
    /// The workspace comes from the flag, then the config, then the current directory.
    pub fn new(config: TunerConfig, workspace: Option<PathBuf>) -> Result<Self> {
        let workspace = match workspace.or_else(|| config.workspace.clone()) {
            Some(dir) => dir,
            None => std::env::current_dir().context("Failed to read current directory")?,
        };
        Ok(Self { config, workspace })
    }

    pub fn layout(&self) -> TrainingLayout {
        TrainingLayout::for_workspace_root(&self.workspace)
    }

    pub fn trainer(&self) -> LauncherTrainer {
        LauncherTrainer::new(self.config.launcher(), self.layout())
    }

    /// Config overrides first, then flags.
    pub fn hardware(&self, args: &HardwareArgs) -> Result<HardwareProfile> {
        let mut overrides = self.config.hardware.clone();
        overrides.merge(&args.overrides());
        HardwareProfile::resolve(&overrides).context("Failed to determine hardware")
    }

    pub fn distributed(&self, args: &HardwareArgs) -> bool {
        args.distributed || self.config.distributed.unwrap_or(false)
    }

    pub fn resolve_model(&self, model: &str) -> Result<ResolvedModel> {
        LocalModelResolver::new(self.config.models_dir.clone())
            .resolve(model)
            .with_context(|| format!("Failed to resolve model {model}"))
    }

    pub fn load_dataset(&self, dataset: &str) -> Result<Vec<Record>> {
        JsonlDatasetLoader::new(self.config.datasets_dir.clone())
            .load(dataset)
            .with_context(|| format!("Failed to load dataset {dataset}"))
    }

    pub fn tuner(&self, model: &str, args: &HardwareArgs) -> Result<Tuner> {
        let resolved = self.resolve_model(model)?;
        resolved.config.family()?;
        let hardware = self.hardware(args)?;
        if let Err(e) = log_device_info(&hardware) {
            warn!(error = %e, "device info unavailable");
        }
        let tokenizer = HfTokenizer::from_model_dir(&resolved.dir)
            .with_context(|| format!("Failed to load tokenizer for {model}"))?;
        Ok(Tuner::new(resolved, Box::new(tokenizer), hardware, self.distributed(args), self.layout())?)
    }
}
