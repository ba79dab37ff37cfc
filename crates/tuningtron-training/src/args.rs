use crate::job::Hyperparams;
use crate::offload::OffloadConfig;
use crate::record::DatasetShape;
use crate::settings::{AttentionImpl, DeviceMap, Optimizer, TrainingSettings};
use serde::{Deserialize, Serialize};

/// Fraction of total steps between evaluations when evaluation is on.
pub const EVAL_STEPS: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LrSchedulerType {
    Linear,
    Constant,
}

impl LrSchedulerType {
    /// Instruction data decays linearly; pre-formatted text keeps a constant rate.
    #[must_use]
    pub const fn for_dataset(shape: &DatasetShape) -> Self {
        if !shape.has_instruct() && shape.has_text() {
            Self::Constant
        } else {
            Self::Linear
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalStrategy {
    No,
    Steps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStrategy {
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TorchDtype {
    Bfloat16,
}

/// Arguments for the external trainer. Built once, then only read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingArguments {
    pub output_dir: String,
    pub num_train_epochs: u32,
    pub logging_steps: u32,
    pub eval_strategy: EvalStrategy,
    pub eval_steps: Option<f64>,
    pub gradient_checkpointing: bool,
    pub save_strategy: SaveStrategy,
    pub bf16: bool,
    pub fp16: bool,
    pub optim: Optimizer,
    pub weight_decay: f64,
    pub learning_rate: f64,
    pub lr_scheduler_type: LrSchedulerType,
    pub per_device_train_batch_size: u32,
    pub per_device_eval_batch_size: u32,
    pub gradient_accumulation_steps: u32,
    pub eval_accumulation_steps: u32,
    pub deepspeed: Option<OffloadConfig>,
}

impl TrainingArguments {
    #[must_use]
    pub fn new(
        hyperparams: &Hyperparams,
        settings: &TrainingSettings,
        lr_scheduler_type: LrSchedulerType,
        evaluate: bool,
    ) -> Self {
        let (eval_strategy, eval_steps) =
            if evaluate { (EvalStrategy::Steps, Some(EVAL_STEPS)) } else { (EvalStrategy::No, None) };

        Self {
            output_dir: ".".to_string(),
            num_train_epochs: hyperparams.num_train_epochs,
            logging_steps: 1,
            eval_strategy,
            eval_steps,
            gradient_checkpointing: true,
            save_strategy: SaveStrategy::No,
            bf16: settings.precision.bf16(),
            fp16: settings.precision.fp16(),
            optim: settings.optimizer,
            weight_decay: 0.001,
            learning_rate: hyperparams.learning_rate,
            lr_scheduler_type,
            per_device_train_batch_size: hyperparams.batch_size,
            per_device_eval_batch_size: hyperparams.batch_size,
            gradient_accumulation_steps: hyperparams.gradient_steps,
            eval_accumulation_steps: 1,
            deepspeed: settings.offload.clone(),
        }
    }
}

/// How the external runtime loads the base model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelLoadOptions {
    pub torch_dtype: TorchDtype,
    pub attn_implementation: Option<AttentionImpl>,
    pub device_map: Option<DeviceMap>,
    pub gradient_checkpointing: bool,
    /// Generation KV cache implementation; always cleared for training.
    pub cache_implementation: Option<String>,
}

impl ModelLoadOptions {
    #[must_use]
    pub fn for_training(settings: &TrainingSettings) -> Self {
        Self {
            torch_dtype: TorchDtype::Bfloat16,
            attn_implementation: settings.attention,
            device_map: settings.device_map,
            gradient_checkpointing: true,
            cache_implementation: None,
        }
    }
}
