//! Hardware inspection.
//!
//! The profile is built once at startup, either from `nvidia-smi` or from
//! explicit overrides, and then passed by value to the settings builder.

use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::{Command, Output};
use std::str::FromStr;
use tracing::{debug, info, warn};

pub const VISIBLE_DEVICES_ENV: &str = "CUDA_VISIBLE_DEVICES";

/// CUDA compute capability, compared as `(major, minor)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComputeCapability {
    pub major: u32,
    pub minor: u32,
}

impl ComputeCapability {
    /// Ampere and newer: bf16 and flash attention kernels are available.
    pub const HIGH: Self = Self { major: 8, minor: 0 };

    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    #[must_use]
    pub const fn is_high(self) -> bool {
        self.major >= Self::HIGH.major
    }
}

impl FromStr for ComputeCapability {
    type Err = TrainingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (major, minor) = s.split_once('.').unwrap_or((s, "0"));
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|_| TrainingError::Config(format!("invalid compute capability: {s}")))
        };
        Ok(Self { major: parse(major)?, minor: parse(minor)? })
    }
}

impl fmt::Display for ComputeCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuDevice {
    pub index: u32,
    pub name: String,
    pub total_memory_mib: u64,
    pub capability: ComputeCapability,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accelerator {
    /// Capability of the device training starts on.
    pub capability: ComputeCapability,
    #[serde(default)]
    pub devices: Vec<GpuDevice>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareProfile {
    pub accelerator: Option<Accelerator>,
    pub visible_devices: Option<String>,
}

/// Explicit hardware settings that replace detection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareOverride {
    /// `false` forces CPU mode; `true` requires an accelerator.
    #[serde(default)]
    pub accelerator: Option<bool>,
    /// Capability such as `"8.6"`.
    #[serde(default)]
    pub capability: Option<String>,
}

impl HardwareOverride {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accelerator.is_none() && self.capability.is_none()
    }

    /// Overlay `other` onto `self`; set fields in `other` win.
    pub fn merge(&mut self, other: &Self) {
        if other.accelerator.is_some() {
            self.accelerator = other.accelerator;
        }
        if other.capability.is_some() {
            self.capability.clone_from(&other.capability);
        }
    }
}

impl HardwareProfile {
    #[must_use]
    pub fn cpu() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capability(capability: ComputeCapability) -> Self {
        Self { accelerator: Some(Accelerator { capability, devices: Vec::new() }), visible_devices: None }
    }

    #[must_use]
    pub const fn has_accelerator(&self) -> bool {
        self.accelerator.is_some()
    }

    #[must_use]
    pub fn capability(&self) -> Option<ComputeCapability> {
        self.accelerator.as_ref().map(|a| a.capability)
    }

    /// Inspect the machine: `CUDA_VISIBLE_DEVICES` and `nvidia-smi`.
    #[must_use]
    pub fn detect() -> Self {
        let visible_devices = std::env::var(VISIBLE_DEVICES_ENV).ok();
        let devices = query_nvidia_smi()
            .map(|devices| filter_visible(devices, visible_devices.as_deref()))
            .unwrap_or_default();
        let accelerator = devices
            .first()
            .map(|first| Accelerator { capability: first.capability, devices: devices.clone() });
        Self { accelerator, visible_devices }
    }

    /// Detect unless the override makes detection unnecessary, then apply it.
    pub fn resolve(overrides: &HardwareOverride) -> TrainingResult<Self> {
        let base = if overrides.accelerator == Some(false) || overrides.capability.is_some() {
            Self { accelerator: None, visible_devices: std::env::var(VISIBLE_DEVICES_ENV).ok() }
        } else {
            Self::detect()
        };
        base.apply(overrides)
    }

    pub fn apply(mut self, overrides: &HardwareOverride) -> TrainingResult<Self> {
        if overrides.accelerator == Some(false) {
            self.accelerator = None;
            return Ok(self);
        }
        if let Some(raw) = overrides.capability.as_deref() {
            let capability: ComputeCapability = raw.parse()?;
            let devices = self.accelerator.take().map(|a| a.devices).unwrap_or_default();
            self.accelerator = Some(Accelerator { capability, devices });
        }
        if overrides.accelerator == Some(true) && self.accelerator.is_none() {
            return Err(TrainingError::Config(
                "accelerator required but none detected; set a capability override".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Log visible devices and per-GPU memory. Fails when `CUDA_VISIBLE_DEVICES` was unset.
pub fn log_device_info(profile: &HardwareProfile) -> TrainingResult<()> {
    let visible = profile
        .visible_devices
        .as_deref()
        .ok_or(TrainingError::MissingEnv(VISIBLE_DEVICES_ENV))?;
    info!(visible_devices = %visible, "visible devices");

    let devices = profile.accelerator.as_ref().map(|a| a.devices.as_slice()).unwrap_or_default();
    info!(count = devices.len(), "CUDA devices");
    for device in devices {
        info!(
            gpu = device.index,
            name = %device.name,
            total_memory_mib = device.total_memory_mib,
            capability = %device.capability,
            "GPU"
        );
    }
    Ok(())
}

fn query_nvidia_smi() -> Option<Vec<GpuDevice>> {
    let output = Command::new("nvidia-smi")
        .args(["--query-gpu=index,name,memory.total,compute_cap", "--format=csv,noheader,nounits"])
        .output();
    devices_from_output(output)
}

/// A missing `nvidia-smi` means a CPU machine. A failing one usually means a
/// driver too old for the `compute_cap` field, so it is reported.
fn devices_from_output(output: std::io::Result<Output>) -> Option<Vec<GpuDevice>> {
    match output {
        Ok(out) if out.status.success() => Some(parse_nvidia_smi(&String::from_utf8_lossy(&out.stdout))),
        Ok(out) => {
            warn!(
                status = %out.status,
                stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                "nvidia-smi query failed, continuing without an accelerator; set a capability override to train on GPU"
            );
            None
        }
        Err(e) => {
            debug!(error = %e, "nvidia-smi not available");
            None
        }
    }
}

/// Parse `index, name, memory.total, compute_cap` CSV rows. Malformed rows are skipped.
pub fn parse_nvidia_smi(output: &str) -> Vec<GpuDevice> {
    output
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let [index, name, memory, capability] = fields.as_slice() else {
                return None;
            };
            Some(GpuDevice {
                index: index.parse().ok()?,
                name: (*name).to_string(),
                total_memory_mib: memory.parse().ok()?,
                capability: capability.parse().ok()?,
            })
        })
        .collect()
}

/// Apply `CUDA_VISIBLE_DEVICES` the way the CUDA runtime enumerates it.
///
/// Entries are taken in order and enumeration stops at the first one that is
/// not a known device index, so `-1` or `NoDevFiles` hide every GPU and
/// `0,-1,1` keeps only device 0.
fn filter_visible(devices: Vec<GpuDevice>, visible: Option<&str>) -> Vec<GpuDevice> {
    let Some(visible) = visible else {
        return devices;
    };
    let entries: Vec<&str> = visible.split(',').map(str::trim).collect();
    // GPU UUIDs or MIG ids: leave ordering to the driver.
    if entries.first().is_some_and(|e| e.starts_with("GPU-") || e.starts_with("MIG-")) {
        return devices;
    }

    let mut kept: Vec<GpuDevice> = Vec::new();
    for entry in entries {
        let Ok(index) = entry.parse::<u32>() else {
            break;
        };
        if kept.iter().any(|d| d.index == index) {
            break;
        }
        match devices.iter().find(|d| d.index == index) {
            Some(device) => kept.push(device.clone()),
            None => break,
        }
    }
    kept
}
