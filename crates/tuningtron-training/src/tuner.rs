//! Fine-tuning orchestration.
//!
//! A [`Tuner`] is built once per invocation for one base model. It renders
//! records with the model family's chat template, derives sequence length and
//! training arguments, writes the prepared data into the job directory and
//! makes a single call into the external [`Trainer`].

use crate::args::{LrSchedulerType, ModelLoadOptions, TorchDtype, TrainingArguments};
use crate::artifacts::{dir_artifacts, make_artifact, ArtifactKind, TrainingArtifact, TrainingManifest};
use crate::error::{TrainingError, TrainingResult};
use crate::family::ModelFamily;
use crate::hardware::HardwareProfile;
use crate::job::{
    AdapterOptions, DataCollator, DpoOptions, MergeJob, ModelSpec, SftOptions, TrainingJob, TrainingJobId,
    TrainingObjective,
};
use crate::layout::TrainingLayout;
use crate::loader::write_jsonl;
use crate::lora::LoraConfig;
use crate::model::ResolvedModel;
use crate::progress::ProgressSink;
use crate::record::{
    compute_dataset_id, validate_records, DatasetId, DatasetShape, PreferenceRecord, PreparedExample, Record,
};
use crate::settings::TrainingSettings;
use crate::split::{train_eval_split, Split};
use crate::stats::max_len_at_percentile;
use crate::tokenizer::{log_special_tokens, Tokenizer, TOKENIZER_FILES, VOCAB_FILES};
use crate::trainer::Trainer;
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prepared SFT inputs, before anything is written to disk.
#[derive(Debug, Clone)]
pub struct SftPlan {
    pub max_len: usize,
    /// Rows dropped for exceeding `max_len`.
    pub dropped: usize,
    pub split: Split<PreparedExample>,
    pub collator: DataCollator,
    pub args: TrainingArguments,
    pub lora: LoraConfig,
}

#[derive(Debug, Clone)]
pub struct DpoPlan {
    pub split: Split<PreferenceRecord>,
    pub args: TrainingArguments,
    pub lora: LoraConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeOutcome {
    pub job_id: TrainingJobId,
    pub output_dir: PathBuf,
    pub artifacts: Vec<TrainingArtifact>,
}

pub struct Tuner {
    model: ResolvedModel,
    family: ModelFamily,
    tokenizer: Box<dyn Tokenizer>,
    settings: TrainingSettings,
    layout: TrainingLayout,
}

impl Tuner {
    /// Fails with [`TrainingError::UnsupportedModel`] when the model family is unknown.
    pub fn new(
        model: ResolvedModel,
        tokenizer: Box<dyn Tokenizer>,
        hardware: HardwareProfile,
        distributed: bool,
        layout: TrainingLayout,
    ) -> TrainingResult<Self> {
        let family = model.config.family()?;
        info!(model = %model.id, family = %family, "resolved model family");
        log_special_tokens(tokenizer.as_ref());
        let settings = TrainingSettings::derive(hardware, family, distributed);
        Ok(Self { model, family, tokenizer, settings, layout })
    }

    #[must_use]
    pub const fn family(&self) -> ModelFamily {
        self.family
    }

    #[must_use]
    pub const fn settings(&self) -> &TrainingSettings {
        &self.settings
    }

    fn model_spec(&self) -> ModelSpec {
        ModelSpec { model_id: self.model.id.clone(), path: self.model.dir.clone(), family: self.family }
    }

    fn lora_config(&self, adapter: &AdapterOptions) -> TrainingResult<LoraConfig> {
        let lora = LoraConfig::new(self.family, adapter.rank, adapter.lora_alpha, adapter.lora_dropout);
        lora.validate()?;
        Ok(lora)
    }

    /// Training text for one record. Instruction rows go through the family
    /// template with BOS tokens removed; text rows are used as-is.
    pub fn instruction_text(&self, record: &Record) -> TrainingResult<String> {
        match record {
            Record::Instruct(r) => {
                let text = self.family.render_chat(&self.family.format(r));
                Ok(match self.tokenizer.bos_token() {
                    Some(bos) if !bos.is_empty() => text.replace(bos, ""),
                    _ => text,
                })
            }
            Record::Text { text } => Ok(text.clone()),
            Record::Preference(_) => Err(TrainingError::Dataset(
                "preference records can only be used for dpo".to_string(),
            )),
        }
    }

    pub fn plan_sft(&self, records: &[Record], options: &SftOptions) -> TrainingResult<SftPlan> {
        options.hyperparams.validate()?;
        validate_records(records)?;
        let lora = self.lora_config(&options.adapter)?;

        let texts = records.iter().map(|r| self.instruction_text(r)).collect::<TrainingResult<Vec<_>>>()?;
        let lengths = texts.iter().map(|t| self.tokenizer.count_tokens(t)).collect::<TrainingResult<Vec<_>>>()?;
        let max_len = max_len_at_percentile(&lengths, options.max_len_percentile)?;

        info!(max_len, percentile = options.max_len_percentile, "dataset max_len detected");
        if let Some(first) = texts.first() {
            info!("dataset example row after chat template:\n{first}");
        }

        let before = texts.len();
        let examples: Vec<PreparedExample> = texts
            .into_iter()
            .zip(lengths)
            .filter(|(_, num_tokens)| *num_tokens <= max_len)
            .map(|(text, num_tokens)| PreparedExample { text, num_tokens })
            .collect();
        info!(before, after = examples.len(), "filtered rows longer than max_len");

        let lr_scheduler_type = LrSchedulerType::for_dataset(&DatasetShape::of(records));
        let collator = DataCollator::select(self.family, options.comp_only);
        info!(collator = ?collator, lr_scheduler = ?lr_scheduler_type, "sft data setup");

        let dropped = before - examples.len();
        let split = train_eval_split(examples, options.do_eval, options.hyperparams.seed)?;
        log_split(&split);

        let args = TrainingArguments::new(&options.hyperparams, &self.settings, lr_scheduler_type, split.eval.is_some());
        Ok(SftPlan { max_len, dropped, split, collator, args, lora })
    }

    pub fn plan_dpo(&self, records: &[Record], options: &DpoOptions) -> TrainingResult<DpoPlan> {
        options.hyperparams.validate()?;
        validate_records(records)?;
        let lora = self.lora_config(&options.adapter)?;

        let pairs = records
            .iter()
            .enumerate()
            .map(|(idx, record)| match record {
                Record::Preference(p) => Ok(p.clone()),
                _ => Err(TrainingError::Dataset(format!(
                    "record[{idx}] is not a preference row (prompt/chosen/rejected)"
                ))),
            })
            .collect::<TrainingResult<Vec<_>>>()?;

        let split = train_eval_split(pairs, options.do_eval, options.hyperparams.seed)?;
        log_split(&split);

        let args =
            TrainingArguments::new(&options.hyperparams, &self.settings, LrSchedulerType::Linear, split.eval.is_some());
        Ok(DpoPlan { split, args, lora })
    }

    /// Supervised fine-tuning of a LoRA adapter saved to `adapter_dir`.
    pub async fn sft(
        &self,
        records: &[Record],
        adapter_dir: &Path,
        options: &SftOptions,
        trainer: &dyn Trainer,
        progress: &dyn ProgressSink,
    ) -> TrainingResult<TrainingManifest> {
        let plan = self.plan_sft(records, options)?;
        let job_id = TrainingJobId::new();
        let (train_dataset, eval_dataset, dataset_id) = self.write_split(&job_id, &plan.split)?;

        let job = TrainingJob {
            job_id,
            created_at: Utc::now(),
            objective: TrainingObjective::Sft,
            base_model: self.model_spec(),
            adapter_dir: adapter_dir.to_path_buf(),
            train_dataset,
            eval_dataset,
            max_len: Some(plan.max_len),
            collator: Some(plan.collator),
            args: plan.args,
            lora: plan.lora,
            model_load: ModelLoadOptions::for_training(&self.settings),
        };
        self.execute(job, dataset_id, trainer, progress).await
    }

    /// Direct preference optimization of a LoRA adapter saved to `adapter_dir`.
    pub async fn dpo(
        &self,
        records: &[Record],
        adapter_dir: &Path,
        options: &DpoOptions,
        trainer: &dyn Trainer,
        progress: &dyn ProgressSink,
    ) -> TrainingResult<TrainingManifest> {
        let plan = self.plan_dpo(records, options)?;
        let job_id = TrainingJobId::new();
        let (train_dataset, eval_dataset, dataset_id) = self.write_split(&job_id, &plan.split)?;

        let job = TrainingJob {
            job_id,
            created_at: Utc::now(),
            objective: TrainingObjective::Dpo,
            base_model: self.model_spec(),
            adapter_dir: adapter_dir.to_path_buf(),
            train_dataset,
            eval_dataset,
            max_len: None,
            collator: None,
            args: plan.args,
            lora: plan.lora,
            model_load: ModelLoadOptions::for_training(&self.settings),
        };
        self.execute(job, dataset_id, trainer, progress).await
    }

    /// Merge `adapter_dir` into the base model and save it with the base tokenizer to `output_dir`.
    pub async fn merge(
        &self,
        adapter_dir: &Path,
        output_dir: &Path,
        trainer: &dyn Trainer,
        progress: &dyn ProgressSink,
    ) -> TrainingResult<MergeOutcome> {
        let job_id = TrainingJobId::new();
        self.layout.ensure_job_dir(&job_id)?;

        let untie_embeddings = self.model.config.tie_word_embeddings;
        let job = MergeJob {
            job_id: job_id.clone(),
            created_at: Utc::now(),
            base_model: self.model_spec(),
            adapter_dir: adapter_dir.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            torch_dtype: TorchDtype::Bfloat16,
            device_map: self.settings.device_map,
            untie_embeddings,
            untied_model_dir: untie_embeddings.then(|| self.layout.untied_model_dir(&job_id)),
        };
        job.validate()?;

        info!(adapter = %adapter_dir.display(), output = %output_dir.display(), untie_embeddings, "merging adapter");
        trainer.merge(&job, progress).await?;

        std::fs::create_dir_all(output_dir)?;
        let mut tokenizer_artifacts = Vec::new();
        for name in TOKENIZER_FILES {
            let src = self.model.dir.join(name);
            if src.is_file() {
                let dst = output_dir.join(name);
                std::fs::copy(&src, &dst)?;
                tokenizer_artifacts.push(dst);
            }
        }
        tokenizer_artifacts.extend(copy_vocabulary(&self.model.dir, output_dir));

        let mut artifacts: Vec<TrainingArtifact> = dir_artifacts(&ArtifactKind::MergedModel, output_dir)?
            .into_iter()
            .filter(|a| !tokenizer_artifacts.contains(&a.path))
            .collect();
        for path in tokenizer_artifacts {
            artifacts.push(make_artifact(ArtifactKind::Tokenizer, path)?);
        }

        Ok(MergeOutcome { job_id, output_dir: output_dir.to_path_buf(), artifacts })
    }

    fn write_split<T: Serialize>(
        &self,
        job_id: &TrainingJobId,
        split: &Split<T>,
    ) -> TrainingResult<(PathBuf, Option<PathBuf>, DatasetId)> {
        self.layout.ensure_job_dir(job_id)?;

        let train_path = self.layout.train_dataset_path(job_id);
        write_jsonl(&train_path, &split.train)?;

        let eval_path = match &split.eval {
            Some(rows) => {
                let path = self.layout.eval_dataset_path(job_id);
                write_jsonl(&path, rows)?;
                Some(path)
            }
            None => None,
        };

        let all: Vec<&T> = split.train.iter().chain(split.eval.iter().flatten()).collect();
        let dataset_id = compute_dataset_id(&all)?;
        Ok((train_path, eval_path, dataset_id))
    }

    async fn execute(
        &self,
        job: TrainingJob,
        dataset_id: DatasetId,
        trainer: &dyn Trainer,
        progress: &dyn ProgressSink,
    ) -> TrainingResult<TrainingManifest> {
        job.validate()?;
        trainer.prepare(&job).await?;
        info!(job = %job.job_id, trainer = trainer.id(), objective = ?job.objective, "starting training");
        let metrics = trainer.run(&job, progress).await?;

        let mut artifacts = dir_artifacts(&ArtifactKind::Adapter, &job.adapter_dir)?;
        artifacts.push(make_artifact(ArtifactKind::DatasetJsonl, job.train_dataset.clone())?);

        let manifest = TrainingManifest {
            job_id: job.job_id.clone(),
            created_at: Utc::now(),
            objective: job.objective,
            base_model: job.base_model.clone(),
            dataset_id,
            output_dir: job.adapter_dir.clone(),
            max_len: job.max_len,
            metrics,
            artifacts,
        };
        std::fs::write(
            self.layout.job_manifest_path(&job.job_id),
            serde_json::to_string_pretty(&manifest)?,
        )?;
        info!(job = %job.job_id, adapter = %job.adapter_dir.display(), "adapter saved");
        Ok(manifest)
    }
}

fn log_split<T>(split: &Split<T>) {
    if let Some(eval) = &split.eval {
        info!(rows = eval.len(), "eval dataset");
    }
    info!(rows = split.train.len(), "train dataset");
}

/// Copy vocabulary files next to the merged tokenizer and return the copies.
/// Not every tokenizer has them, so failures are skipped.
fn copy_vocabulary(model_dir: &Path, output_dir: &Path) -> Vec<PathBuf> {
    VOCAB_FILES
        .iter()
        .filter_map(|name| {
            let dst = output_dir.join(name);
            match std::fs::copy(model_dir.join(name), &dst) {
                Ok(_) => Some(dst),
                Err(e) => {
                    debug!(file = name, error = %e, "vocabulary file not copied");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::TrainingMetrics;
    use crate::hardware::ComputeCapability;
    use crate::model::ModelConfig;
    use crate::progress::CollectingProgressSink;
    use crate::record::InstructRecord;
    use crate::settings::{AttentionImpl, PrecisionMode};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// One token per whitespace-separated word, plus BOS.
    struct WordTokenizer {
        bos: Option<String>,
    }

    impl Tokenizer for WordTokenizer {
        fn count_tokens(&self, text: &str) -> TrainingResult<usize> {
            Ok(text.split_whitespace().count() + usize::from(self.bos.is_some()))
        }

        fn bos_token(&self) -> Option<&str> {
            self.bos.as_deref()
        }

        fn eos_token(&self) -> Option<&str> {
            None
        }

        fn pad_token(&self) -> Option<&str> {
            None
        }
    }

    /// Records jobs and writes a fake adapter.
    #[derive(Default)]
    struct FakeTrainer {
        jobs: Mutex<Vec<TrainingJob>>,
        merges: Mutex<Vec<MergeJob>>,
    }

    #[async_trait]
    impl Trainer for FakeTrainer {
        fn id(&self) -> &'static str {
            "fake"
        }

        async fn prepare(&self, _job: &TrainingJob) -> TrainingResult<()> {
            Ok(())
        }

        async fn run(&self, job: &TrainingJob, _progress: &dyn ProgressSink) -> TrainingResult<TrainingMetrics> {
            std::fs::create_dir_all(&job.adapter_dir)?;
            std::fs::write(job.adapter_dir.join("adapter_config.json"), "{}")?;
            self.jobs.lock().unwrap().push(job.clone());
            Ok(TrainingMetrics { train_loss: Some(1.25), eval_loss: None, steps: Some(3) })
        }

        async fn merge(&self, job: &MergeJob, _progress: &dyn ProgressSink) -> TrainingResult<()> {
            std::fs::create_dir_all(&job.output_dir)?;
            std::fs::write(job.output_dir.join("model.safetensors"), "weights")?;
            self.merges.lock().unwrap().push(job.clone());
            Ok(())
        }
    }

    fn model(dir: &Path, model_type: &str, tied: bool) -> ResolvedModel {
        ResolvedModel {
            id: format!("test/{model_type}"),
            dir: dir.to_path_buf(),
            config: ModelConfig {
                model_type: model_type.to_string(),
                tie_word_embeddings: tied,
                architectures: vec![],
            },
        }
    }

    fn tuner(root: &Path, model_type: &str, bos: Option<&str>) -> Tuner {
        Tuner::new(
            model(root, model_type, false),
            Box::new(WordTokenizer { bos: bos.map(str::to_string) }),
            HardwareProfile::cpu(),
            true,
            TrainingLayout::for_workspace_root(root),
        )
        .unwrap()
    }

    fn instruct(instruct: &str, input: &str, output: &str) -> Record {
        Record::Instruct(InstructRecord {
            instruct: instruct.to_string(),
            input: input.to_string(),
            output: output.to_string(),
        })
    }

    #[test]
    fn test_new_rejects_unsupported_model() {
        let temp = TempDir::new().unwrap();
        let result = Tuner::new(
            model(temp.path(), "llama", false),
            Box::new(WordTokenizer { bos: None }),
            HardwareProfile::cpu(),
            false,
            TrainingLayout::for_workspace_root(temp.path()),
        );
        assert!(matches!(result, Err(TrainingError::UnsupportedModel(ref t)) if t == "llama"));
    }

    #[test]
    fn test_settings_follow_hardware() {
        let temp = TempDir::new().unwrap();
        let tuner = Tuner::new(
            model(temp.path(), "gemma2", false),
            Box::new(WordTokenizer { bos: None }),
            HardwareProfile::with_capability(ComputeCapability::new(8, 9)),
            false,
            TrainingLayout::for_workspace_root(temp.path()),
        )
        .unwrap();
        assert_eq!(tuner.settings().precision, PrecisionMode::Bf16);
        assert_eq!(tuner.settings().attention, Some(AttentionImpl::Eager));
        assert!(tuner.settings().offload.is_none());
    }

    #[test]
    fn test_instruction_text_strips_bos() {
        let temp = TempDir::new().unwrap();
        let tuner = tuner(temp.path(), "gemma", Some("<bos>"));
        let text = tuner.instruction_text(&instruct("Say <bos>hi", "", "hi")).unwrap();
        assert!(!text.contains("<bos>"));
        assert!(text.starts_with("<start_of_turn>user\nSay hi"));

        let raw = tuner.instruction_text(&Record::Text { text: "as is".to_string() }).unwrap();
        assert_eq!(raw, "as is");
    }

    #[test]
    fn test_plan_sft_filters_by_percentile() {
        let temp = TempDir::new().unwrap();
        let tuner = tuner(temp.path(), "qwen2", None);
        let records = vec![
            Record::Text { text: "one".to_string() },
            Record::Text { text: "one two".to_string() },
            Record::Text { text: "one two three".to_string() },
            Record::Text { text: "one two three four five six seven eight".to_string() },
        ];
        let options = SftOptions { max_len_percentile: 50.0, ..Default::default() };

        let plan = tuner.plan_sft(&records, &options).unwrap();
        // lengths 1 2 3 8 -> median 2.5 -> 2
        assert_eq!(plan.max_len, 2);
        assert_eq!(plan.dropped, 2);
        assert_eq!(plan.split.train.len(), 2);
        assert_eq!(plan.args.lr_scheduler_type, LrSchedulerType::Constant);
        assert_eq!(plan.collator, DataCollator::LanguageModeling);
    }

    #[test]
    fn test_plan_sft_instruct_rows_use_linear_schedule_and_completion_collator() {
        let temp = TempDir::new().unwrap();
        let tuner = tuner(temp.path(), "cohere", None);
        let records: Vec<Record> = (0..20).map(|i| instruct("Echo", &format!("v{i}"), &format!("v{i}"))).collect();
        let options = SftOptions { do_eval: true, comp_only: true, ..Default::default() };

        let plan = tuner.plan_sft(&records, &options).unwrap();
        assert_eq!(plan.args.lr_scheduler_type, LrSchedulerType::Linear);
        assert_eq!(plan.split.eval.as_ref().map(Vec::len), Some(2));
        assert_eq!(plan.split.train.len(), 18);
        assert_eq!(
            plan.collator,
            DataCollator::CompletionOnly { response_template: ModelFamily::Cohere.response_template().to_string() }
        );
        assert!(plan.split.train[0].text.contains("<|SYSTEM_TOKEN|>Echo"));
    }

    #[test]
    fn test_plan_sft_rejects_preference_rows() {
        let temp = TempDir::new().unwrap();
        let tuner = tuner(temp.path(), "qwen2", None);
        let records = vec![Record::Preference(PreferenceRecord {
            prompt: "p".to_string(),
            chosen: "a".to_string(),
            rejected: "b".to_string(),
        })];
        assert!(matches!(tuner.plan_sft(&records, &SftOptions::default()), Err(TrainingError::Dataset(_))));
    }

    #[test]
    fn test_plan_dpo_requires_preference_rows() {
        let temp = TempDir::new().unwrap();
        let tuner = tuner(temp.path(), "qwen2", None);
        let records = vec![instruct("i", "", "o")];
        assert!(tuner.plan_dpo(&records, &DpoOptions::default()).is_err());
    }

    #[tokio::test]
    async fn test_sft_writes_job_files_and_manifest() {
        let temp = TempDir::new().unwrap();
        let tuner = tuner(temp.path(), "qwen2", None);
        let trainer = FakeTrainer::default();
        let sink = CollectingProgressSink::default();
        let adapter_dir = temp.path().join("adapters").join("qwen-sft");
        let records = vec![instruct("Add", "1 2", "3"), instruct("Add", "2 2", "4")];

        let manifest = tuner
            .sft(&records, &adapter_dir, &SftOptions::default(), &trainer, &sink)
            .await
            .unwrap();

        assert_eq!(manifest.objective, TrainingObjective::Sft);
        assert_eq!(manifest.output_dir, adapter_dir);
        assert_eq!(manifest.metrics.steps, Some(3));
        assert!(manifest.artifacts.iter().any(|a| a.kind == ArtifactKind::Adapter));
        assert!(manifest.artifacts.iter().any(|a| a.kind == ArtifactKind::DatasetJsonl));

        let layout = TrainingLayout::for_workspace_root(temp.path());
        assert!(layout.job_manifest_path(&manifest.job_id).exists());

        let jobs = trainer.jobs.lock().unwrap();
        assert_eq!(jobs.len(), 1);
        let job = &jobs[0];
        assert_eq!(job.args.optim.as_str(), "adamw_8bit");
        assert!(job.args.bf16);
        assert!(job.args.deepspeed.is_none());
        assert_eq!(job.lora.r, 32);
        assert_eq!(job.lora.lora_alpha, 32);
        assert!(job.eval_dataset.is_none());

        let rows = std::fs::read_to_string(&job.train_dataset).unwrap();
        assert_eq!(rows.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_dpo_passes_preference_rows() {
        let temp = TempDir::new().unwrap();
        let tuner = tuner(temp.path(), "gemma", None);
        let trainer = FakeTrainer::default();
        let records = vec![Record::Preference(PreferenceRecord {
            prompt: "Capital of France?".to_string(),
            chosen: "Paris".to_string(),
            rejected: "Lyon".to_string(),
        })];

        let manifest = tuner
            .dpo(&records, &temp.path().join("dpo"), &DpoOptions::default(), &trainer, &CollectingProgressSink::default())
            .await
            .unwrap();

        assert_eq!(manifest.objective, TrainingObjective::Dpo);
        assert_eq!(manifest.max_len, None);
        let jobs = trainer.jobs.lock().unwrap();
        assert_eq!(jobs[0].args.lr_scheduler_type, LrSchedulerType::Linear);
        let rows = std::fs::read_to_string(&jobs[0].train_dataset).unwrap();
        assert!(rows.contains("\"chosen\":\"Paris\""));
    }

    #[tokio::test]
    async fn test_merge_unties_embeddings_and_copies_tokenizer() {
        let temp = TempDir::new().unwrap();
        let model_dir = temp.path().join("base");
        std::fs::create_dir_all(&model_dir).unwrap();
        std::fs::write(model_dir.join("tokenizer.json"), "{}").unwrap();
        std::fs::write(model_dir.join("tokenizer_config.json"), "{}").unwrap();
        std::fs::write(model_dir.join("tokenizer.model"), "spm").unwrap();

        let tuner = Tuner::new(
            model(&model_dir, "gemma", true),
            Box::new(WordTokenizer { bos: None }),
            HardwareProfile::cpu(),
            false,
            TrainingLayout::for_workspace_root(temp.path()),
        )
        .unwrap();
        let trainer = FakeTrainer::default();
        let output = temp.path().join("merged");

        let outcome = tuner
            .merge(&temp.path().join("adapter"), &output, &trainer, &CollectingProgressSink::default())
            .await
            .unwrap();

        let merges = trainer.merges.lock().unwrap();
        assert!(merges[0].untie_embeddings);
        assert!(merges[0].untied_model_dir.is_some());

        assert!(output.join("tokenizer.json").exists());
        assert!(output.join("tokenizer.model").exists());
        assert!(!output.join("special_tokens_map.json").exists());
        assert!(outcome.artifacts.iter().any(|a| a.kind == ArtifactKind::MergedModel));
        assert_eq!(outcome.artifacts.iter().filter(|a| a.kind == ArtifactKind::Tokenizer).count(), 3);
    }

    #[tokio::test]
    async fn test_merge_tags_vocabulary_files_as_tokenizer() {
        let temp = TempDir::new().unwrap();
        let model_dir = temp.path().join("base");
        std::fs::create_dir_all(&model_dir).unwrap();
        std::fs::write(model_dir.join("tokenizer.json"), "{}").unwrap();
        std::fs::write(model_dir.join("vocab.json"), "{}").unwrap();
        std::fs::write(model_dir.join("merges.txt"), "#version: 0.2").unwrap();

        let tuner = Tuner::new(
            model(&model_dir, "qwen2", false),
            Box::new(WordTokenizer { bos: None }),
            HardwareProfile::cpu(),
            false,
            TrainingLayout::for_workspace_root(temp.path()),
        )
        .unwrap();
        let output = temp.path().join("merged");

        let outcome = tuner
            .merge(&temp.path().join("adapter"), &output, &FakeTrainer::default(), &CollectingProgressSink::default())
            .await
            .unwrap();

        for name in ["tokenizer.json", "vocab.json", "merges.txt"] {
            let artifact = outcome.artifacts.iter().find(|a| a.path == output.join(name)).unwrap();
            assert_eq!(artifact.kind, ArtifactKind::Tokenizer, "{name}");
        }
    }
}
