//! Model family registry.
//!
//! A model's `model_type` (as found in its `config.json`) is matched by prefix
//! against a fixed table of families. Each family owns a pure formatting
//! function that turns an [`InstructRecord`] into an ordered list of chat
//! messages, plus the chat markup used to render those messages to text.

use crate::error::{TrainingError, TrainingResult};
use crate::record::InstructRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Modules that receive LoRA adapters for every supported family.
pub const LORA_TARGET_MODULES: [&str; 8] =
    ["q_proj", "k_proj", "v_proj", "o_proj", "gate_proj", "up_proj", "down_proj", "lm_head"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    Gemma,
    Cohere,
    Qwen,
}

/// Prefix table consulted by [`ModelFamily::detect`], in match order.
const FAMILY_PREFIXES: &[(&str, ModelFamily)] = &[
    ("gemma", ModelFamily::Gemma),
    ("cohere", ModelFamily::Cohere),
    ("qwen", ModelFamily::Qwen),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

/// Ordered role/content pairs produced from a single record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormattedPrompt {
    pub messages: Vec<ChatMessage>,
}

impl FormattedPrompt {
    #[must_use]
    pub fn roles(&self) -> Vec<Role> {
        self.messages.iter().map(|m| m.role).collect()
    }
}

/// Formatting strategy: a pure function from record to prompt.
pub type FormatFn = fn(&InstructRecord) -> FormattedPrompt;

/// Instruction and input share the user turn; used by families without a system role.
fn format_user_assistant(record: &InstructRecord) -> FormattedPrompt {
    let user = format!("{}\n\n\n{}", record.instruct.trim(), record.input.trim());
    FormattedPrompt {
        messages: vec![
            ChatMessage::new(Role::User, user),
            ChatMessage::new(Role::Assistant, record.output.trim()),
        ],
    }
}

fn format_system_user_assistant(record: &InstructRecord) -> FormattedPrompt {
    FormattedPrompt {
        messages: vec![
            ChatMessage::new(Role::System, record.instruct.trim()),
            ChatMessage::new(Role::User, record.input.trim()),
            ChatMessage::new(Role::Assistant, record.output.trim()),
        ],
    }
}

impl ModelFamily {
    /// Resolve the family for a `model_type` identifier.
    pub fn detect(model_type: &str) -> TrainingResult<Self> {
        FAMILY_PREFIXES
            .iter()
            .find(|(prefix, _)| model_type.starts_with(prefix))
            .map(|(_, family)| *family)
            .ok_or_else(|| TrainingError::UnsupportedModel(model_type.to_string()))
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gemma => "gemma",
            Self::Cohere => "cohere",
            Self::Qwen => "qwen",
        }
    }

    #[must_use]
    pub fn formatter(self) -> FormatFn {
        match self {
            Self::Gemma => format_user_assistant,
            Self::Cohere | Self::Qwen => format_system_user_assistant,
        }
    }

    #[must_use]
    pub fn format(self, record: &InstructRecord) -> FormattedPrompt {
        (self.formatter())(record)
    }

    /// Gemma attention does not run under flash attention kernels.
    #[must_use]
    pub const fn requires_eager_attention(self) -> bool {
        matches!(self, Self::Gemma)
    }

    #[must_use]
    pub fn target_modules(self) -> Vec<String> {
        LORA_TARGET_MODULES.iter().map(|m| (*m).to_string()).collect()
    }

    /// Markup that opens the assistant turn; completion-only collation masks
    /// every token before it.
    #[must_use]
    pub const fn response_template(self) -> &'static str {
        match self {
            Self::Gemma => "<start_of_turn>model\n",
            Self::Cohere => "<|START_OF_TURN_TOKEN|><|CHATBOT_TOKEN|>",
            Self::Qwen => "<|im_start|>assistant\n",
        }
    }

    /// Render messages with the family's chat markup. No BOS token is emitted.
    #[must_use]
    pub fn render_chat(self, prompt: &FormattedPrompt) -> String {
        match self {
            Self::Gemma => render_gemma(prompt),
            Self::Cohere => render_cohere(prompt),
            Self::Qwen => render_chatml(prompt),
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn render_gemma(prompt: &FormattedPrompt) -> String {
    let mut out = String::new();
    // Gemma has no system turn: system text is folded into the next user turn.
    let mut pending_system: Option<&str> = None;
    for message in &prompt.messages {
        let (role, content) = match message.role {
            Role::System => {
                pending_system = Some(message.content.as_str());
                continue;
            }
            Role::User => match pending_system.take() {
                Some(system) => ("user", format!("{system}\n\n{}", message.content)),
                None => ("user", message.content.clone()),
            },
            Role::Assistant => ("model", message.content.clone()),
        };
        out.push_str("<start_of_turn>");
        out.push_str(role);
        out.push('\n');
        out.push_str(&content);
        out.push_str("<end_of_turn>\n");
    }
    out
}

fn render_cohere(prompt: &FormattedPrompt) -> String {
    let mut out = String::new();
    for message in &prompt.messages {
        let token = match message.role {
            Role::System => "<|SYSTEM_TOKEN|>",
            Role::User => "<|USER_TOKEN|>",
            Role::Assistant => "<|CHATBOT_TOKEN|>",
        };
        out.push_str("<|START_OF_TURN_TOKEN|>");
        out.push_str(token);
        out.push_str(&message.content);
        out.push_str("<|END_OF_TURN_TOKEN|>");
    }
    out
}

fn render_chatml(prompt: &FormattedPrompt) -> String {
    let mut out = String::new();
    for message in &prompt.messages {
        let role = match message.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        out.push_str("<|im_start|>");
        out.push_str(role);
        out.push('\n');
        out.push_str(&message.content);
        out.push_str("<|im_end|>\n");
    }
    out
}
