//! Command type definitions shared between main.rs and the command modules.

use clap::Args;
use std::path::PathBuf;
use tuningtron_training::{AdapterOptions, HardwareOverride, Hyperparams};

/// Hardware overrides; without them the machine is inspected with nvidia-smi.
#[derive(Args, Debug, Clone, Default)]
pub struct HardwareArgs {
    /// Ignore any accelerator and use CPU settings
    #[arg(long, conflicts_with = "capability")]
    pub cpu: bool,

    /// Assume an accelerator with this compute capability (e.g. 8.0)
    #[arg(long)]
    pub capability: Option<String>,

    /// Enable ZeRO-3 CPU offload on accelerators
    #[arg(long)]
    pub distributed: bool,
}

impl HardwareArgs {
    pub fn overrides(&self) -> HardwareOverride {
        HardwareOverride {
            accelerator: self.cpu.then_some(false),
            capability: self.capability.clone(),
        }
    }
}

/// Adapter and optimizer flags; unset flags keep the configured defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct TuningArgs {
    /// Hold out 10% of the rows for evaluation
    #[arg(long)]
    pub do_eval: bool,

    /// LoRA rank
    #[arg(long)]
    pub rank: Option<u32>,

    /// LoRA alpha (defaults to the rank)
    #[arg(long)]
    pub lora_alpha: Option<u32>,

    #[arg(long)]
    pub lora_dropout: Option<f64>,

    /// Number of training epochs
    #[arg(long)]
    pub epochs: Option<u32>,

    #[arg(long)]
    pub learning_rate: Option<f64>,

    /// Per-device train and eval batch size
    #[arg(long)]
    pub batch_size: Option<u32>,

    /// Gradient accumulation steps
    #[arg(long)]
    pub gradient_steps: Option<u32>,

    /// Seed for the train/eval split
    #[arg(long)]
    pub seed: Option<u64>,
}

impl TuningArgs {
    pub fn apply(&self, adapter: &mut AdapterOptions, hyperparams: &mut Hyperparams) {
        if let Some(rank) = self.rank {
            adapter.rank = rank;
        }
        if self.lora_alpha.is_some() {
            adapter.lora_alpha = self.lora_alpha;
        }
        if let Some(dropout) = self.lora_dropout {
            adapter.lora_dropout = dropout;
        }
        if let Some(epochs) = self.epochs {
            hyperparams.num_train_epochs = epochs;
        }
        if let Some(lr) = self.learning_rate {
            hyperparams.learning_rate = lr;
        }
        if let Some(batch_size) = self.batch_size {
            hyperparams.batch_size = batch_size;
        }
        if let Some(steps) = self.gradient_steps {
            hyperparams.gradient_steps = steps;
        }
        if let Some(seed) = self.seed {
            hyperparams.seed = seed;
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SftCommand {
    /// Base model directory or name under models_dir
    pub model: String,

    /// JSONL dataset file, or a directory holding train.jsonl
    pub dataset: String,

    /// Directory the trained adapter is saved to
    pub adapter_dir: PathBuf,

    /// Drop rows longer than this percentile of token counts (0-100)
    #[arg(long)]
    pub max_len_percentile: Option<f64>,

    /// Compute loss on completions only
    #[arg(long)]
    pub comp_only: bool,

    #[command(flatten)]
    pub tuning: TuningArgs,

    #[command(flatten)]
    pub hardware: HardwareArgs,

    /// Print the job manifest as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DpoCommand {
    /// Base model directory or name under models_dir
    pub model: String,

    /// JSONL dataset with prompt/chosen/rejected rows
    pub dataset: String,

    /// Directory the trained adapter is saved to
    pub adapter_dir: PathBuf,

    #[command(flatten)]
    pub tuning: TuningArgs,

    #[command(flatten)]
    pub hardware: HardwareArgs,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct MergeCommand {
    /// Base model directory or name under models_dir
    pub model: String,

    /// Adapter directory, or the id of a finished job
    pub adapter: String,

    /// Directory the merged model is saved to
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub hardware: HardwareArgs,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PlanCommand {
    /// Base model directory or name under models_dir
    pub model: String,

    /// Also prepare this dataset to report max_len, filtering and the split
    #[arg(long)]
    pub dataset: Option<String>,

    #[arg(long)]
    pub max_len_percentile: Option<f64>,

    #[arg(long)]
    pub comp_only: bool,

    #[command(flatten)]
    pub tuning: TuningArgs,

    #[command(flatten)]
    pub hardware: HardwareArgs,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct JobsCommand {
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DevicesCommand {
    #[arg(long)]
    pub json: bool,
}
