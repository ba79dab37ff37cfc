use crate::artifacts::TrainingMetrics;
use crate::error::TrainingResult;
use crate::job::{MergeJob, TrainingJob};
use crate::progress::ProgressSink;
use async_trait::async_trait;

/// External training runtime. Each call blocks until the runtime is done.
#[async_trait]
pub trait Trainer: Send + Sync {
    fn id(&self) -> &'static str;

    async fn prepare(&self, job: &TrainingJob) -> TrainingResult<()>;

    /// Train the adapter described by `job` and save it to `job.adapter_dir`.
    async fn run(&self, job: &TrainingJob, progress: &dyn ProgressSink) -> TrainingResult<TrainingMetrics>;

    /// Merge `job.adapter_dir` into the base model and save to `job.output_dir`.
    async fn merge(&self, job: &MergeJob, progress: &dyn ProgressSink) -> TrainingResult<()>;
}
