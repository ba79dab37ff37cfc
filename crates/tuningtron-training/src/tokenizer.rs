use crate::error::{TrainingError, TrainingResult};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// Files that make up a saved tokenizer.
pub const TOKENIZER_FILES: [&str; 3] = ["tokenizer.json", "tokenizer_config.json", "special_tokens_map.json"];

/// Vocabulary files some tokenizers keep next to `tokenizer.json`.
pub const VOCAB_FILES: [&str; 4] = ["tokenizer.model", "vocab.json", "merges.txt", "vocab.txt"];

/// Token counting and special tokens of a model's tokenizer.
pub trait Tokenizer: Send + Sync {
    /// Number of ids produced for `text`, special tokens included.
    fn count_tokens(&self, text: &str) -> TrainingResult<usize>;

    fn bos_token(&self) -> Option<&str>;

    fn eos_token(&self) -> Option<&str>;

    fn pad_token(&self) -> Option<&str>;
}

/// Log which special tokens the tokenizer defines.
pub fn log_special_tokens(tokenizer: &dyn Tokenizer) {
    for (name, token) in [
        ("pad", tokenizer.pad_token()),
        ("bos", tokenizer.bos_token()),
        ("eos", tokenizer.eos_token()),
    ] {
        match token {
            Some(token) => info!(token = %token, "{name} token"),
            None => warn!("{name} token not found"),
        }
    }
}

/// `tokenizer_config.json` stores special tokens either as plain strings or
/// as added-token objects.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TokenSpec {
    Plain(String),
    Added { content: String },
}

impl TokenSpec {
    fn into_content(self) -> String {
        match self {
            Self::Plain(s) | Self::Added { content: s } => s,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TokenizerConfigFile {
    #[serde(default)]
    bos_token: Option<TokenSpec>,
    #[serde(default)]
    eos_token: Option<TokenSpec>,
    #[serde(default)]
    pad_token: Option<TokenSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecialTokens {
    pub bos: Option<String>,
    pub eos: Option<String>,
    pub pad: Option<String>,
}

impl SpecialTokens {
    /// Read special tokens from `tokenizer_config.json`; a missing file yields none.
    pub fn from_model_dir(dir: &Path) -> TrainingResult<Self> {
        let path = dir.join("tokenizer_config.json");
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        let file: TokenizerConfigFile = serde_json::from_slice(&bytes).map_err(|e| {
            TrainingError::Tokenizer(format!("failed to parse {}: {e}", path.display()))
        })?;
        Ok(Self {
            bos: file.bos_token.map(TokenSpec::into_content),
            eos: file.eos_token.map(TokenSpec::into_content),
            pad: file.pad_token.map(TokenSpec::into_content),
        })
    }
}

/// Tokenizer backed by a Hugging Face `tokenizer.json`.
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
    special: SpecialTokens,
}

impl HfTokenizer {
    pub fn from_model_dir(dir: &Path) -> TrainingResult<Self> {
        let path = dir.join("tokenizer.json");
        let inner = tokenizers::Tokenizer::from_file(&path)
            .map_err(|e| TrainingError::Tokenizer(format!("failed to load {}: {e}", path.display())))?;
        let special = SpecialTokens::from_model_dir(dir)?;
        Ok(Self { inner, special })
    }
}

impl Tokenizer for HfTokenizer {
    fn count_tokens(&self, text: &str) -> TrainingResult<usize> {
        let encoding = self
            .inner
            .encode(text, true)
            .map_err(|e| TrainingError::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().len())
    }

    fn bos_token(&self) -> Option<&str> {
        self.special.bos.as_deref()
    }

    fn eos_token(&self) -> Option<&str> {
        self.special.eos.as_deref()
    }

    fn pad_token(&self) -> Option<&str> {
        self.special.pad.as_deref()
    }
}
