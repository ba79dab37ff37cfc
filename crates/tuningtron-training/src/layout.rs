use crate::error::TrainingResult;
use crate::job::TrainingJobId;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "training_manifest.json";

/// Filesystem layout for job files inside a workspace.
///
/// Default layout is under `.tuningtron/jobs/<job_id>/...`
#[derive(Debug, Clone)]
pub struct TrainingLayout {
    root: PathBuf,
}

impl TrainingLayout {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn for_workspace_root(workspace_root: &Path) -> Self {
        Self::new(workspace_root.join(".tuningtron").join("jobs"))
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn job_dir(&self, job_id: &TrainingJobId) -> PathBuf {
        self.root.join(job_id.0.as_str())
    }

    #[must_use]
    pub fn job_spec_path(&self, job_id: &TrainingJobId) -> PathBuf {
        self.job_dir(job_id).join("job.json")
    }

    #[must_use]
    pub fn job_manifest_path(&self, job_id: &TrainingJobId) -> PathBuf {
        self.job_dir(job_id).join(MANIFEST_FILE)
    }

    #[must_use]
    pub fn train_dataset_path(&self, job_id: &TrainingJobId) -> PathBuf {
        self.job_dir(job_id).join("train.jsonl")
    }

    #[must_use]
    pub fn eval_dataset_path(&self, job_id: &TrainingJobId) -> PathBuf {
        self.job_dir(job_id).join("eval.jsonl")
    }

    /// Written by the external trainer when it reports metrics.
    #[must_use]
    pub fn metrics_path(&self, job_id: &TrainingJobId) -> PathBuf {
        self.job_dir(job_id).join("metrics.json")
    }

    #[must_use]
    pub fn untied_model_dir(&self, job_id: &TrainingJobId) -> PathBuf {
        self.job_dir(job_id).join("untied_model")
    }

    pub fn ensure_job_dir(&self, job_id: &TrainingJobId) -> TrainingResult<()> {
        std::fs::create_dir_all(self.job_dir(job_id))?;
        Ok(())
    }
}
