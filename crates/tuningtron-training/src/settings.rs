//! Hardware-driven training settings.
//!
//! | hardware                   | precision | attention                       | optimizer / offload                      |
//! |----------------------------|-----------|---------------------------------|------------------------------------------|
//! | no accelerator             | CPU bf16  | none                            | `adamw_8bit`                             |
//! | accelerator, capability < 8| fp16      | none                            | `adamw_8bit`, distributed: `adamw_torch` |
//! | accelerator, capability >= 8| bf16     | eager (gemma) / flash attention | `adamw_8bit`, distributed: `adamw_torch` |
//!
//! Distributed mode only takes effect with an accelerator; it adds the offload
//! block and leaves device placement to the distributed runtime.

use crate::family::ModelFamily;
use crate::hardware::HardwareProfile;
use crate::offload::OffloadConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecisionMode {
    /// bf16 on an accelerator that supports it.
    Bf16,
    /// fp16 mixed precision on older accelerators.
    Fp16,
    /// bf16 on CPU, no mixed precision.
    CpuBf16,
}

impl PrecisionMode {
    #[must_use]
    pub const fn bf16(self) -> bool {
        matches!(self, Self::Bf16 | Self::CpuBf16)
    }

    #[must_use]
    pub const fn fp16(self) -> bool {
        matches!(self, Self::Fp16)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttentionImpl {
    Eager,
    #[serde(rename = "flash_attention_2")]
    FlashAttention2,
}

impl AttentionImpl {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eager => "eager",
            Self::FlashAttention2 => "flash_attention_2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Optimizer {
    #[serde(rename = "adamw_8bit")]
    AdamW8bit,
    #[serde(rename = "adamw_torch")]
    AdamWTorch,
}

impl Optimizer {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AdamW8bit => "adamw_8bit",
            Self::AdamWTorch => "adamw_torch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceMap {
    Auto,
}

/// Settings derived once per invocation from hardware and model family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingSettings {
    pub family: ModelFamily,
    pub hardware: HardwareProfile,
    pub precision: PrecisionMode,
    pub attention: Option<AttentionImpl>,
    pub optimizer: Optimizer,
    pub distributed: bool,
    pub device_map: Option<DeviceMap>,
    pub offload: Option<OffloadConfig>,
}

impl TrainingSettings {
    #[must_use]
    pub fn derive(hardware: HardwareProfile, family: ModelFamily, distributed: bool) -> Self {
        let mut settings = Self {
            family,
            precision: PrecisionMode::CpuBf16,
            attention: None,
            optimizer: Optimizer::AdamW8bit,
            distributed: false,
            device_map: Some(DeviceMap::Auto),
            offload: None,
            hardware,
        };

        if let Some(capability) = settings.hardware.capability() {
            if distributed {
                settings.distributed = true;
                settings.device_map = None;
                settings.offload = Some(OffloadConfig::zero3_cpu());
                settings.optimizer = Optimizer::AdamWTorch;
                info!("distributed: enabled");
            }

            if capability.is_high() {
                settings.precision = PrecisionMode::Bf16;
                settings.attention = Some(if family.requires_eager_attention() {
                    AttentionImpl::Eager
                } else {
                    AttentionImpl::FlashAttention2
                });
            } else {
                settings.precision = PrecisionMode::Fp16;
            }
        }

        info!(
            fp16 = settings.precision.fp16(),
            bf16 = settings.precision.bf16(),
            attention = ?settings.attention,
            optimizer = settings.optimizer.as_str(),
            "detected hyperparameters"
        );
        settings
    }
}
