use crate::error::{TrainingError, TrainingResult};
use crate::family::ModelFamily;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    CausalLm,
}

/// Adapter configuration handed to the external PEFT layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoraConfig {
    pub r: u32,
    pub lora_alpha: u32,
    pub target_modules: Vec<String>,
    pub lora_dropout: f64,
    pub task_type: TaskType,
}

impl LoraConfig {
    /// `lora_alpha` defaults to the rank.
    #[must_use]
    pub fn new(family: ModelFamily, rank: u32, lora_alpha: Option<u32>, lora_dropout: f64) -> Self {
        Self {
            r: rank,
            lora_alpha: lora_alpha.unwrap_or(rank),
            target_modules: family.target_modules(),
            lora_dropout,
            task_type: TaskType::CausalLm,
        }
    }

    pub fn validate(&self) -> TrainingResult<()> {
        if self.r == 0 {
            return Err(TrainingError::InvalidSpec("rank must be >= 1".to_string()));
        }
        if self.lora_alpha == 0 {
            return Err(TrainingError::InvalidSpec("lora_alpha must be >= 1".to_string()));
        }
        if !(0.0..1.0).contains(&self.lora_dropout) {
            return Err(TrainingError::InvalidSpec("lora_dropout must be within [0, 1)".to_string()));
        }
        Ok(())
    }
}
