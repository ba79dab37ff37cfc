//! Trainer that hands jobs to an external launcher process.
//!
//! The job is written to `job.json` in the job directory and the launcher is
//! started as `<program> <args..> --job <path>`. Each stdout line becomes a
//! progress message. A non-zero exit fails the job. When the launcher leaves a
//! `metrics.json` next to the job file its contents are returned as metrics.

use crate::artifacts::TrainingMetrics;
use crate::error::{TrainingError, TrainingResult};
use crate::job::{MergeJob, TrainingJob, TrainingJobId};
use crate::layout::TrainingLayout;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::trainer::Trainer;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LauncherConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self { program: "tuningtron-runner".to_string(), args: Vec::new() }
    }
}

#[derive(Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
enum Invocation<'a> {
    Train { job: &'a TrainingJob },
    Merge { job: &'a MergeJob },
}

#[derive(Debug, Clone)]
pub struct LauncherTrainer {
    config: LauncherConfig,
    layout: TrainingLayout,
}

impl LauncherTrainer {
    #[must_use]
    pub fn new(config: LauncherConfig, layout: TrainingLayout) -> Self {
        Self { config, layout }
    }

    fn write_invocation(&self, job_id: &TrainingJobId, invocation: &Invocation<'_>) -> TrainingResult<PathBuf> {
        self.layout.ensure_job_dir(job_id)?;
        let path = self.layout.job_spec_path(job_id);
        std::fs::write(&path, serde_json::to_string_pretty(invocation)?)?;
        Ok(path)
    }

    async fn launch(&self, job_id: &TrainingJobId, spec_path: &Path, progress: &dyn ProgressSink) -> TrainingResult<()> {
        info!(program = %self.config.program, job = %job_id, "launching trainer");
        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .arg("--job")
            .arg(spec_path)
            .env("TOKENIZERS_PARALLELISM", "false")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TrainingError::Trainer(format!("failed to start {}: {e}", self.config.program)))?;

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                progress.on_event(ProgressEvent::Message { job_id: job_id.clone(), message: line });
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(TrainingError::Trainer(format!("{} exited with {status}", self.config.program)));
        }
        Ok(())
    }

    fn read_metrics(&self, job_id: &TrainingJobId) -> TrainingResult<TrainingMetrics> {
        let path = self.layout.metrics_path(job_id);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no metrics reported");
                Ok(TrainingMetrics::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Trainer for LauncherTrainer {
    fn id(&self) -> &'static str {
        "launcher"
    }

    async fn prepare(&self, job: &TrainingJob) -> TrainingResult<()> {
        job.validate()?;
        self.layout.ensure_job_dir(&job.job_id)?;
        Ok(())
    }

    async fn run(&self, job: &TrainingJob, progress: &dyn ProgressSink) -> TrainingResult<TrainingMetrics> {
        job.validate()?;
        let spec_path = self.write_invocation(&job.job_id, &Invocation::Train { job })?;

        progress.on_event(ProgressEvent::Started { job_id: job.job_id.clone() });
        self.launch(&job.job_id, &spec_path, progress).await?;
        let metrics = self.read_metrics(&job.job_id)?;
        progress.on_event(ProgressEvent::Finished { job_id: job.job_id.clone() });
        Ok(metrics)
    }

    async fn merge(&self, job: &MergeJob, progress: &dyn ProgressSink) -> TrainingResult<()> {
        job.validate()?;
        let spec_path = self.write_invocation(&job.job_id, &Invocation::Merge { job })?;

        progress.on_event(ProgressEvent::Started { job_id: job.job_id.clone() });
        self.launch(&job.job_id, &spec_path, progress).await?;
        progress.on_event(ProgressEvent::Finished { job_id: job.job_id.clone() });
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::args::{LrSchedulerType, ModelLoadOptions, TorchDtype, TrainingArguments};
    use crate::family::ModelFamily;
    use crate::hardware::HardwareProfile;
    use crate::job::{Hyperparams, ModelSpec, TrainingObjective};
    use crate::lora::LoraConfig;
    use crate::progress::CollectingProgressSink;
    use crate::settings::TrainingSettings;
    use tempfile::TempDir;

    fn model_spec() -> ModelSpec {
        ModelSpec { model_id: "qwen".to_string(), path: "/models/qwen".into(), family: ModelFamily::Qwen }
    }

    fn job(root: &Path) -> TrainingJob {
        let settings = TrainingSettings::derive(HardwareProfile::cpu(), ModelFamily::Qwen, false);
        TrainingJob {
            job_id: TrainingJobId("job-1".to_string()),
            created_at: chrono::Utc::now(),
            objective: TrainingObjective::Sft,
            base_model: model_spec(),
            adapter_dir: root.join("adapter"),
            train_dataset: root.join("train.jsonl"),
            eval_dataset: None,
            max_len: Some(64),
            collator: None,
            args: TrainingArguments::new(&Hyperparams::default(), &settings, LrSchedulerType::Linear, false),
            lora: LoraConfig::new(ModelFamily::Qwen, 8, None, 0.1),
            model_load: ModelLoadOptions::for_training(&settings),
        }
    }

    fn shell(script: &str) -> LauncherConfig {
        // `sh -c script sh --job <path>`: the job path lands in $2.
        LauncherConfig {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string(), "sh".to_string()],
        }
    }

    #[tokio::test]
    async fn test_run_streams_stdout_and_reads_metrics() {
        let temp = TempDir::new().unwrap();
        let layout = TrainingLayout::new(temp.path().join("jobs"));
        let script = r#"grep -q '"command": "train"' "$2" || exit 9
echo "loading model"
echo '{"train_loss": 0.5, "steps": 12}' > "$(dirname "$2")/metrics.json""#;
        let trainer = LauncherTrainer::new(shell(script), layout.clone());
        let sink = CollectingProgressSink::default();
        let job = job(temp.path());

        trainer.prepare(&job).await.unwrap();
        let metrics = trainer.run(&job, &sink).await.unwrap();

        assert_eq!(metrics.train_loss, Some(0.5));
        assert_eq!(metrics.steps, Some(12));
        assert!(layout.job_spec_path(&job.job_id).exists());

        let events = sink.events();
        assert_eq!(events.first(), Some(&ProgressEvent::Started { job_id: job.job_id.clone() }));
        assert!(events.contains(&ProgressEvent::Message {
            job_id: job.job_id.clone(),
            message: "loading model".to_string()
        }));
        assert_eq!(events.last(), Some(&ProgressEvent::Finished { job_id: job.job_id.clone() }));
    }

    #[tokio::test]
    async fn test_run_without_metrics_file_returns_defaults() {
        let temp = TempDir::new().unwrap();
        let trainer = LauncherTrainer::new(shell("true"), TrainingLayout::new(temp.path().join("jobs")));
        let metrics = trainer.run(&job(temp.path()), &CollectingProgressSink::default()).await.unwrap();
        assert_eq!(metrics, TrainingMetrics::default());
    }

    #[tokio::test]
    async fn test_run_fails_on_non_zero_exit() {
        let temp = TempDir::new().unwrap();
        let trainer = LauncherTrainer::new(shell("exit 3"), TrainingLayout::new(temp.path().join("jobs")));
        let err = trainer.run(&job(temp.path()), &CollectingProgressSink::default()).await.unwrap_err();
        assert!(matches!(err, TrainingError::Trainer(_)));
    }

    #[tokio::test]
    async fn test_missing_program_is_a_trainer_error() {
        let temp = TempDir::new().unwrap();
        let config = LauncherConfig { program: "/nonexistent/launcher".to_string(), args: vec![] };
        let trainer = LauncherTrainer::new(config, TrainingLayout::new(temp.path().join("jobs")));
        let err = trainer.run(&job(temp.path()), &CollectingProgressSink::default()).await.unwrap_err();
        assert!(err.to_string().contains("failed to start"));
    }

    #[tokio::test]
    async fn test_merge_writes_merge_invocation() {
        let temp = TempDir::new().unwrap();
        let layout = TrainingLayout::new(temp.path().join("jobs"));
        let trainer = LauncherTrainer::new(shell(r#"grep -q '"command": "merge"' "$2""#), layout);
        let job = MergeJob {
            job_id: TrainingJobId("merge-1".to_string()),
            created_at: chrono::Utc::now(),
            base_model: model_spec(),
            adapter_dir: temp.path().join("adapter"),
            output_dir: temp.path().join("merged"),
            torch_dtype: TorchDtype::Bfloat16,
            device_map: None,
            untie_embeddings: false,
            untied_model_dir: None,
        };
        trainer.merge(&job, &CollectingProgressSink::default()).await.unwrap();
    }
}
