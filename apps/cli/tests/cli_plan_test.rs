//! Integration tests for the `tuningtron plan` command.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const WORD_LEVEL: &str = r#"{
    "version": "1.0",
    "truncation": null,
    "padding": null,
    "added_tokens": [],
    "normalizer": null,
    "pre_tokenizer": {"type": "Whitespace"},
    "post_processor": null,
    "decoder": null,
    "model": {"type": "WordLevel", "vocab": {"[UNK]": 0, "hello": 1, "world": 2}, "unk_token": "[UNK]"}
}"#;

/// Helper to create a model directory with config.json and a tokenizer
fn create_model(root: &Path, model_type: &str) -> PathBuf {
    let dir = root.join("models").join(model_type);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.json"), format!(r#"{{"model_type": "{model_type}"}}"#)).unwrap();
    fs::write(dir.join("tokenizer.json"), WORD_LEVEL).unwrap();
    dir
}

fn tuningtron(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tuningtron-cli").unwrap();
    cmd.current_dir(temp_dir.path()).env("HOME", temp_dir.path());
    cmd
}

fn plan_json(temp_dir: &TempDir, args: &[&str]) -> serde_json::Value {
    let output = tuningtron(temp_dir).arg("plan").args(args).arg("--json").assert().success();
    serde_json::from_slice(&output.get_output().stdout).unwrap()
}

#[test]
fn test_plan_cpu_settings() {
    let temp_dir = TempDir::new().unwrap();
    let model = create_model(temp_dir.path(), "gemma2");

    let plan = plan_json(&temp_dir, &[model.to_str().unwrap(), "--cpu"]);
    assert_eq!(plan["family"], "gemma");
    assert_eq!(plan["args"]["optim"], "adamw_8bit");
    assert_eq!(plan["args"]["bf16"], true);
    assert_eq!(plan["args"]["fp16"], false);
    assert_eq!(plan["settings"]["attention"], serde_json::Value::Null);
    assert_eq!(plan["lora"]["r"], 32);
    assert_eq!(plan["lora"]["lora_alpha"], 32);
    assert_eq!(plan["lora"]["task_type"], "CAUSAL_LM");
    assert_eq!(plan["model_load"]["device_map"], "auto");
}

#[test]
fn test_plan_high_capability_attention_per_family() {
    let temp_dir = TempDir::new().unwrap();
    let gemma = create_model(temp_dir.path(), "gemma");
    let qwen = create_model(temp_dir.path(), "qwen2");

    let gemma_plan = plan_json(&temp_dir, &[gemma.to_str().unwrap(), "--capability", "8.0", "--distributed"]);
    let qwen_plan = plan_json(&temp_dir, &[qwen.to_str().unwrap(), "--capability", "8.0", "--distributed"]);

    assert_eq!(gemma_plan["settings"]["attention"], "eager");
    assert_eq!(qwen_plan["settings"]["attention"], "flash_attention_2");
    assert_eq!(qwen_plan["args"]["optim"], "adamw_torch");
    assert_eq!(qwen_plan["args"]["deepspeed"]["zero_optimization"]["stage"], 3);
    assert_eq!(qwen_plan["model_load"]["device_map"], serde_json::Value::Null);
}

#[test]
fn test_plan_low_capability_uses_fp16() {
    let temp_dir = TempDir::new().unwrap();
    let model = create_model(temp_dir.path(), "cohere");

    let plan = plan_json(&temp_dir, &[model.to_str().unwrap(), "--capability", "7.5"]);
    assert_eq!(plan["args"]["fp16"], true);
    assert_eq!(plan["args"]["bf16"], false);
    assert_eq!(plan["args"]["deepspeed"], serde_json::Value::Null);
}

#[test]
fn test_plan_resolves_models_dir_from_config() {
    let temp_dir = TempDir::new().unwrap();
    create_model(temp_dir.path(), "qwen2");
    fs::write(
        temp_dir.path().join("tuningtron.toml"),
        "models_dir = \"models\"\n\n[hardware]\naccelerator = false\n\n[sft]\nrank = 8\n",
    )
    .unwrap();

    let plan = plan_json(&temp_dir, &["qwen2"]);
    assert_eq!(plan["family"], "qwen");
    assert_eq!(plan["lora"]["r"], 8);
    assert_eq!(plan["args"]["optim"], "adamw_8bit");
}

#[test]
fn test_plan_with_dataset_reports_max_len() {
    let temp_dir = TempDir::new().unwrap();
    let model = create_model(temp_dir.path(), "qwen2");
    let dataset = temp_dir.path().join("train.jsonl");
    fs::write(&dataset, "{\"text\": \"hello\"}\n{\"text\": \"hello world\"}\n{\"text\": \"hello world hello world\"}\n")
        .unwrap();

    let plan = plan_json(
        &temp_dir,
        &[model.to_str().unwrap(), "--cpu", "--dataset", dataset.to_str().unwrap(), "--max-len-percentile", "50"],
    );
    assert_eq!(plan["dataset"]["max_len"], 2);
    assert_eq!(plan["dataset"]["dropped"], 1);
    assert_eq!(plan["dataset"]["train_rows"], 2);
    assert_eq!(plan["args"]["lr_scheduler_type"], "constant");
}

#[test]
fn test_plan_logs_visible_devices_on_cpu() {
    let temp_dir = TempDir::new().unwrap();
    let model = create_model(temp_dir.path(), "qwen2");
    let dataset = temp_dir.path().join("train.jsonl");
    fs::write(&dataset, "{\"text\": \"hello world\"}\n").unwrap();

    tuningtron(&temp_dir)
        .env("CUDA_VISIBLE_DEVICES", "-1")
        .arg("plan")
        .arg(&model)
        .arg("--cpu")
        .arg("--dataset")
        .arg(&dataset)
        .assert()
        .success()
        .stderr(predicate::str::contains("visible devices"))
        .stderr(predicate::str::contains("-1"));

    tuningtron(&temp_dir)
        .env_remove("CUDA_VISIBLE_DEVICES")
        .arg("plan")
        .arg(&model)
        .arg("--cpu")
        .arg("--dataset")
        .arg(&dataset)
        .assert()
        .success()
        .stderr(predicate::str::contains("device info unavailable"));
}

#[test]
fn test_plan_human_output() {
    let temp_dir = TempDir::new().unwrap();
    let model = create_model(temp_dir.path(), "qwen2");

    tuningtron(&temp_dir)
        .arg("plan")
        .arg(&model)
        .arg("--cpu")
        .assert()
        .success()
        .stdout(predicate::str::contains("adamw_8bit"))
        .stdout(predicate::str::contains("lm_head"));
}

#[test]
fn test_plan_unsupported_model_fails() {
    let temp_dir = TempDir::new().unwrap();
    let model = create_model(temp_dir.path(), "llama");

    tuningtron(&temp_dir)
        .arg("plan")
        .arg(&model)
        .arg("--cpu")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported model type: llama"));
}

#[test]
fn test_plan_missing_model_fails() {
    let temp_dir = TempDir::new().unwrap();

    tuningtron(&temp_dir)
        .arg("plan")
        .arg("no-such-model")
        .arg("--cpu")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no-such-model"));
}

#[test]
fn test_plan_cpu_conflicts_with_capability() {
    let temp_dir = TempDir::new().unwrap();
    let model = create_model(temp_dir.path(), "qwen2");

    tuningtron(&temp_dir).arg("plan").arg(&model).arg("--cpu").arg("--capability").arg("8.0").assert().failure();
}
