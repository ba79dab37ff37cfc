//! Tuningtron Training
//!
//! Glue between a base model and an external LoRA trainer:
//! - Picking a prompt format per model family (`ModelFamily`)
//! - Deriving precision, attention, optimizer and offload settings from hardware (`TrainingSettings`)
//! - Preparing SFT/DPO datasets and training arguments (`Tuner`)
//! - Handing jobs to a training runtime (`Trainer`) and recording manifests

pub mod args;
pub mod artifacts;
pub mod config;
pub mod error;
pub mod family;
pub mod hardware;
pub mod job;
pub mod launcher;
pub mod layout;
pub mod loader;
pub mod lora;
pub mod model;
pub mod offload;
pub mod progress;
pub mod record;
pub mod registry;
pub mod settings;
pub mod split;
pub mod stats;
pub mod tokenizer;
pub mod trainer;
pub mod tuner;

pub use args::{LrSchedulerType, ModelLoadOptions, TrainingArguments};
pub use artifacts::{ArtifactKind, TrainingArtifact, TrainingManifest, TrainingMetrics};
pub use config::TunerConfig;
pub use error::{TrainingError, TrainingResult};
pub use family::{ChatMessage, FormattedPrompt, ModelFamily, Role};
pub use hardware::{ComputeCapability, HardwareOverride, HardwareProfile};
pub use job::{
    AdapterOptions, DataCollator, DpoOptions, Hyperparams, MergeJob, ModelSpec, SftOptions, TrainingJob,
    TrainingJobId, TrainingObjective,
};
pub use launcher::{LauncherConfig, LauncherTrainer};
pub use layout::TrainingLayout;
pub use loader::{DatasetLoader, JsonlDatasetLoader};
pub use lora::LoraConfig;
pub use model::{LocalModelResolver, ModelConfig, ModelResolver, ResolvedModel};
pub use progress::{LogProgressSink, ProgressEvent, ProgressSink};
pub use record::{InstructRecord, PreferenceRecord, Record};
pub use registry::{discover_jobs, resolve_job_output, JobEntry};
pub use settings::{AttentionImpl, Optimizer, PrecisionMode, TrainingSettings};
pub use tokenizer::{HfTokenizer, Tokenizer};
pub use trainer::Trainer;
pub use tuner::{DpoPlan, MergeOutcome, SftPlan, Tuner};
