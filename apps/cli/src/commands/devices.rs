//! Device listing command.

use super::types::DevicesCommand;
use anyhow::{Context, Result};
use colored::Colorize;
use tuningtron_training::HardwareProfile;
use tuningtron_training::hardware::log_device_info;

pub fn execute(cmd: DevicesCommand) -> Result<()> {
    let profile = HardwareProfile::detect();
    log_device_info(&profile).context("Cannot list devices")?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }

    let devices = profile.accelerator.as_ref().map(|a| a.devices.as_slice()).unwrap_or_default();
    println!();
    println!("{}", format!("CUDA devices ({})", devices.len()).bold().cyan());
    println!("  CUDA_VISIBLE_DEVICES: {}", profile.visible_devices.as_deref().unwrap_or_default());
    println!();

    if devices.is_empty() {
        println!("  {}", "No CUDA devices visible; training will use CPU settings.".dimmed());
        println!();
        return Ok(());
    }

    for device in devices {
        let memory_gib = device.total_memory_mib as f64 / 1024.0;
        let tier = if device.capability.is_high() { "bf16".green() } else { "fp16".yellow() };
        println!(
            "  GPU {}: {} | {:.2} GiB | capability {} | {}",
            device.index, device.name, memory_gib, device.capability, tier
        );
    }
    println!();
    Ok(())
}
