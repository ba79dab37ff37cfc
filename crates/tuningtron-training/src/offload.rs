use serde::{Deserialize, Serialize};

/// Value resolved by the distributed runtime from the training arguments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Auto {
    #[default]
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffloadDevice {
    Cpu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffloadTarget {
    pub device: OffloadDevice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoToggle {
    pub enabled: Auto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZeroOptimization {
    pub stage: u8,
    pub offload_optimizer: OffloadTarget,
    pub offload_param: OffloadTarget,
    pub overlap_comm: bool,
    pub sub_group_size: u64,
    pub reduce_bucket_size: Auto,
    pub stage3_prefetch_bucket_size: Auto,
    pub stage3_param_persistence_threshold: Auto,
    pub gather_16bit_weights_on_model_save: bool,
}

/// Distributed runtime block: ZeRO sharding with optimizer and parameter state
/// moved to host memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffloadConfig {
    pub zero_force_ds_cpu_optimizer: bool,
    pub bf16: AutoToggle,
    pub zero_optimization: ZeroOptimization,
    pub gradient_accumulation_steps: Auto,
    pub gradient_clipping: Auto,
    pub steps_per_print: Auto,
    pub train_batch_size: Auto,
    pub train_micro_batch_size_per_gpu: Auto,
}

impl OffloadConfig {
    /// ZeRO stage 3 with optimizer and parameters offloaded to CPU.
    #[must_use]
    pub fn zero3_cpu() -> Self {
        let cpu = OffloadTarget { device: OffloadDevice::Cpu };
        Self {
            zero_force_ds_cpu_optimizer: false,
            bf16: AutoToggle { enabled: Auto::Auto },
            zero_optimization: ZeroOptimization {
                stage: 3,
                offload_optimizer: cpu,
                offload_param: cpu,
                overlap_comm: true,
                sub_group_size: 1_000_000_000,
                reduce_bucket_size: Auto::Auto,
                stage3_prefetch_bucket_size: Auto::Auto,
                stage3_param_persistence_threshold: Auto::Auto,
                gather_16bit_weights_on_model_save: true,
            },
            gradient_accumulation_steps: Auto::Auto,
            gradient_clipping: Auto::Auto,
            steps_per_print: Auto::Auto,
            train_batch_size: Auto::Auto,
            train_micro_batch_size_per_gpu: Auto::Auto,
        }
    }
}
