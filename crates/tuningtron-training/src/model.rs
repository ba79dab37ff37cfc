use crate::error::{TrainingError, TrainingResult};
use crate::family::ModelFamily;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Subset of a model's `config.json` that drives tuning decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model_type: String,
    #[serde(default)]
    pub tie_word_embeddings: bool,
    #[serde(default)]
    pub architectures: Vec<String>,
}

impl ModelConfig {
    pub fn from_model_dir(dir: &Path) -> TrainingResult<Self> {
        let path = dir.join("config.json");
        let bytes = std::fs::read(&path)
            .map_err(|e| TrainingError::ModelConfig(format!("failed to read {}: {e}", path.display())))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| TrainingError::ModelConfig(format!("failed to parse {}: {e}", path.display())))
    }

    pub fn family(&self) -> TrainingResult<ModelFamily> {
        ModelFamily::detect(&self.model_type)
    }
}

/// A model identifier resolved to local files.
#[derive(Debug, Clone)]
pub struct ResolvedModel {
    pub id: String,
    pub dir: PathBuf,
    pub config: ModelConfig,
}

/// Resolves model identifiers to a directory holding `config.json` and tokenizer files.
pub trait ModelResolver: Send + Sync {
    fn resolve(&self, model_id: &str) -> TrainingResult<ResolvedModel>;
}

/// Resolves a model id as a local path, then relative to an optional models directory.
#[derive(Debug, Clone, Default)]
pub struct LocalModelResolver {
    models_dir: Option<PathBuf>,
}

impl LocalModelResolver {
    #[must_use]
    pub fn new(models_dir: Option<PathBuf>) -> Self {
        Self { models_dir }
    }

    fn locate(&self, model_id: &str) -> Option<PathBuf> {
        let direct = PathBuf::from(model_id);
        if direct.join("config.json").is_file() {
            return Some(direct);
        }
        self.models_dir
            .as_ref()
            .map(|root| root.join(model_id))
            .filter(|dir| dir.join("config.json").is_file())
    }
}

impl ModelResolver for LocalModelResolver {
    fn resolve(&self, model_id: &str) -> TrainingResult<ResolvedModel> {
        let dir = self
            .locate(model_id)
            .ok_or_else(|| TrainingError::ModelConfig(format!("model not found: {model_id}")))?;
        let config = ModelConfig::from_model_dir(&dir)?;
        Ok(ResolvedModel { id: model_id.to_string(), dir, config })
    }
}
