use crate::args::{ModelLoadOptions, TorchDtype, TrainingArguments};
use crate::error::{TrainingError, TrainingResult};
use crate::family::ModelFamily;
use crate::lora::LoraConfig;
use crate::settings::DeviceMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Identifier for a training or merge job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrainingJobId(pub String);

impl TrainingJobId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for TrainingJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TrainingJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Base model reference as resolved on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Identifier given by the user (hub name or path).
    pub model_id: String,
    /// Directory holding `config.json` and tokenizer files.
    pub path: PathBuf,
    pub family: ModelFamily,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingObjective {
    Sft,
    Dpo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparams {
    pub num_train_epochs: u32,
    pub learning_rate: f64,
    pub batch_size: u32,
    pub gradient_steps: u32,
    /// Seed for the train/eval split.
    pub seed: u64,
}

impl Default for Hyperparams {
    fn default() -> Self {
        Self { num_train_epochs: 1, learning_rate: 1e-5, batch_size: 4, gradient_steps: 2, seed: 42 }
    }
}

impl Hyperparams {
    pub fn validate(&self) -> TrainingResult<()> {
        if self.num_train_epochs == 0 {
            return Err(TrainingError::InvalidSpec("num_train_epochs must be >= 1".to_string()));
        }
        if !(self.learning_rate.is_finite()) || self.learning_rate <= 0.0 {
            return Err(TrainingError::InvalidSpec("learning_rate must be > 0".to_string()));
        }
        if self.batch_size == 0 {
            return Err(TrainingError::InvalidSpec("batch_size must be >= 1".to_string()));
        }
        if self.gradient_steps == 0 {
            return Err(TrainingError::InvalidSpec("gradient_steps must be >= 1".to_string()));
        }
        Ok(())
    }
}

/// Adapter options shared by SFT and DPO.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterOptions {
    pub rank: u32,
    pub lora_alpha: Option<u32>,
    pub lora_dropout: f64,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self { rank: 32, lora_alpha: None, lora_dropout: 0.1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SftOptions {
    pub do_eval: bool,
    pub max_len_percentile: f64,
    #[serde(flatten)]
    pub adapter: AdapterOptions,
    #[serde(flatten)]
    pub hyperparams: Hyperparams,
    /// Compute loss on completions only.
    pub comp_only: bool,
}

impl Default for SftOptions {
    fn default() -> Self {
        Self {
            do_eval: false,
            max_len_percentile: 100.0,
            adapter: AdapterOptions::default(),
            hyperparams: Hyperparams::default(),
            comp_only: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DpoOptions {
    pub do_eval: bool,
    #[serde(flatten)]
    pub adapter: AdapterOptions,
    #[serde(flatten)]
    pub hyperparams: Hyperparams,
}

/// Batch collation used by the external trainer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataCollator {
    LanguageModeling,
    CompletionOnly { response_template: String },
}

impl DataCollator {
    #[must_use]
    pub fn select(family: ModelFamily, comp_only: bool) -> Self {
        if comp_only {
            Self::CompletionOnly { response_template: family.response_template().to_string() }
        } else {
            Self::LanguageModeling
        }
    }
}

/// Everything the external trainer needs for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingJob {
    pub job_id: TrainingJobId,
    pub created_at: DateTime<Utc>,
    pub objective: TrainingObjective,
    pub base_model: ModelSpec,
    /// Where the trained adapter is saved.
    pub adapter_dir: PathBuf,
    pub train_dataset: PathBuf,
    pub eval_dataset: Option<PathBuf>,
    /// Sequence length rows are padded/truncated to (SFT only).
    pub max_len: Option<usize>,
    pub collator: Option<DataCollator>,
    pub args: TrainingArguments,
    pub lora: LoraConfig,
    pub model_load: ModelLoadOptions,
}

impl TrainingJob {
    pub fn validate(&self) -> TrainingResult<()> {
        if self.base_model.model_id.trim().is_empty() {
            return Err(TrainingError::InvalidSpec("base_model.model_id is required".to_string()));
        }
        if self.adapter_dir.as_os_str().is_empty() {
            return Err(TrainingError::InvalidSpec("adapter_dir is required".to_string()));
        }
        if self.objective == TrainingObjective::Sft && self.max_len.is_none() {
            return Err(TrainingError::InvalidSpec("sft jobs require max_len".to_string()));
        }
        self.lora.validate()?;
        Ok(())
    }
}

/// Merge an adapter into its base model and save the result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeJob {
    pub job_id: TrainingJobId,
    pub created_at: DateTime<Utc>,
    pub base_model: ModelSpec,
    pub adapter_dir: PathBuf,
    pub output_dir: PathBuf,
    pub torch_dtype: TorchDtype,
    pub device_map: Option<DeviceMap>,
    /// Copy input embeddings into `lm_head` through `untied_model_dir` before merging.
    pub untie_embeddings: bool,
    pub untied_model_dir: Option<PathBuf>,
}

impl MergeJob {
    pub fn validate(&self) -> TrainingResult<()> {
        if self.adapter_dir.as_os_str().is_empty() || self.output_dir.as_os_str().is_empty() {
            return Err(TrainingError::InvalidSpec("adapter and output directories are required".to_string()));
        }
        if self.untie_embeddings && self.untied_model_dir.is_none() {
            return Err(TrainingError::InvalidSpec("untied_model_dir is required to untie embeddings".to_string()));
        }
        Ok(())
    }
}
