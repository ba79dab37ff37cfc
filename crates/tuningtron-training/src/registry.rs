use crate::artifacts::TrainingManifest;
use crate::error::{TrainingError, TrainingResult};
use crate::job::TrainingJobId;
use crate::layout::{TrainingLayout, MANIFEST_FILE};
use std::path::{Path, PathBuf};

/// A finished job found in the workspace.
#[derive(Debug, Clone)]
pub struct JobEntry {
    pub manifest_path: PathBuf,
    pub manifest: TrainingManifest,
}

impl JobEntry {
    fn load(manifest_path: PathBuf) -> TrainingResult<Self> {
        let manifest = serde_json::from_slice(&std::fs::read(&manifest_path)?)?;
        Ok(Self { manifest_path, manifest })
    }
}

/// Finished jobs under `.tuningtron/jobs`, oldest first.
///
/// A job directory without a manifest is still running or has failed and is skipped.
pub fn discover_jobs(workspace_root: &Path) -> TrainingResult<Vec<JobEntry>> {
    let layout = TrainingLayout::for_workspace_root(workspace_root);
    let entries = match std::fs::read_dir(layout.root()) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut jobs = Vec::new();
    for entry in entries {
        let manifest_path = entry?.path().join(MANIFEST_FILE);
        if manifest_path.is_file() {
            jobs.push(JobEntry::load(manifest_path)?);
        }
    }

    jobs.sort_by_key(|job| job.manifest.created_at);
    Ok(jobs)
}

/// Output directory (adapter) recorded for `job_id`.
pub fn resolve_job_output(workspace_root: &Path, job_id: &str) -> TrainingResult<PathBuf> {
    let manifest_path = TrainingLayout::for_workspace_root(workspace_root)
        .job_manifest_path(&TrainingJobId(job_id.to_string()));
    if !manifest_path.is_file() {
        return Err(TrainingError::InvalidSpec(format!("no finished job with id {job_id}")));
    }
    Ok(JobEntry::load(manifest_path)?.manifest.output_dir)
}
