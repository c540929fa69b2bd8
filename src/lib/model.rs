//! # Run Configuration and Device Data Models
//!
//! This module defines the plain data structures shared by the executor, the
//! CPU baseline and the `vecadd` binary.
//!
//! - `RunConfig`: Everything a single vector-add run needs to know, from device
//!   selection to element count. Serializable so it can be embedded in reports.
//! - `DeviceKind`: The OpenCL device-type filter used when enumerating devices.
//! - `PlatformInfo` / `DeviceInfo`: Inventory records produced by device discovery.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::VectorAddError;

/// Default number of elements in each input vector.
pub const DEFAULT_COUNT: usize = 1_000_000;

/// Size in bytes of one vector element (`int` on the device, `i32` on the host).
pub const ELEMENT_BYTES: usize = std::mem::size_of::<i32>();

/// Largest element count whose indices all fit in an `i32`.
pub const MAX_COUNT: usize = i32::MAX as usize + 1;

/// Filters devices by type during enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Any device the platform exposes
    #[default]
    All,
    /// GPUs only
    Gpu,
    /// CPU devices only
    Cpu,
    /// Dedicated accelerators (FPGA, DSP, ...)
    Accelerator,
    /// Custom devices without full OpenCL C support, and anything else
    Custom,
}

impl DeviceKind {
    /// Lowercase name as accepted on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::All => "all",
            DeviceKind::Gpu => "gpu",
            DeviceKind::Cpu => "cpu",
            DeviceKind::Accelerator => "accelerator",
            DeviceKind::Custom => "custom",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceKind {
    type Err = VectorAddError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(DeviceKind::All),
            "gpu" => Ok(DeviceKind::Gpu),
            "cpu" => Ok(DeviceKind::Cpu),
            "accelerator" | "acc" => Ok(DeviceKind::Accelerator),
            "custom" => Ok(DeviceKind::Custom),
            other => Err(VectorAddError::InvalidConfig(format!(
                "unknown device type '{}' (expected all, gpu, cpu, accelerator or custom)",
                other
            ))),
        }
    }
}

/// Configuration for one vector-add run.
///
/// The defaults reproduce the classic demo: first platform, first device of any
/// type, one million elements and one work-item per element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Index into the list of available platforms
    pub platform_index: usize,
    /// Index into the platform's devices of `device_kind`
    pub device_index: usize,
    /// Device-type filter
    pub device_kind: DeviceKind,
    /// Number of elements per vector
    pub count: usize,
    /// Number of work-items to launch (`None` means one per element)
    pub global_size: Option<usize>,
    /// Create the queue with profiling enabled and report kernel time from events
    pub profiling: bool,
    /// Compare the device result against the CPU reference
    pub verify: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            platform_index: 0,
            device_index: 0,
            device_kind: DeviceKind::All,
            count: DEFAULT_COUNT,
            global_size: None,
            profiling: false,
            verify: true,
        }
    }
}

impl RunConfig {
    /// Create a configuration for `count` elements with all other fields defaulted
    pub fn with_count(count: usize) -> Self {
        Self {
            count,
            ..Self::default()
        }
    }

    /// Set an explicit global work size
    pub fn with_global_size(mut self, global_size: usize) -> Self {
        self.global_size = Some(global_size);
        self
    }

    /// Select platform and device by index
    pub fn with_device(mut self, platform_index: usize, device_index: usize) -> Self {
        self.platform_index = platform_index;
        self.device_index = device_index;
        self
    }

    /// Number of work-items that will actually be launched.
    pub fn effective_global_size(&self) -> usize {
        self.global_size.unwrap_or(self.count)
    }

    /// Size in bytes of each of the three device buffers.
    pub fn buffer_bytes(&self) -> usize {
        self.count * ELEMENT_BYTES
    }

    /// Rejects configurations that cannot produce a meaningful launch.
    pub fn validate(&self) -> Result<(), VectorAddError> {
        if self.count == 0 {
            return Err(VectorAddError::InvalidConfig(
                "element count must be greater than zero".to_string(),
            ));
        }
        if self.count > MAX_COUNT {
            return Err(VectorAddError::InvalidConfig(format!(
                "element count {} exceeds {} (indices must fit in a device int)",
                self.count, MAX_COUNT
            )));
        }
        if self.count.checked_mul(ELEMENT_BYTES).is_none() {
            return Err(VectorAddError::InvalidConfig(format!(
                "element count {} overflows the buffer size",
                self.count
            )));
        }
        match self.global_size {
            Some(0) => Err(VectorAddError::InvalidConfig(
                "global work size must be greater than zero".to_string(),
            )),
            Some(g) if g > self.count => Err(VectorAddError::InvalidConfig(format!(
                "global work size {} exceeds element count {}",
                g, self.count
            ))),
            _ => Ok(()),
        }
    }
}

/// Inventory record for one OpenCL device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Position within the platform's device list for the requested kind
    pub index: usize,
    pub name: String,
    pub vendor: String,
    pub version: String,
    pub kind: DeviceKind,
    pub compute_units: u32,
    pub global_mem_bytes: u64,
    pub max_work_group_size: usize,
}

/// Inventory record for one OpenCL platform and its devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub index: usize,
    pub name: String,
    pub vendor: String,
    pub version: String,
    pub devices: Vec<DeviceInfo>,
}

impl fmt::Display for PlatformInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Platform {}: {} ({}, {})",
            self.index, self.name, self.vendor, self.version
        )?;
        if self.devices.is_empty() {
            writeln!(f, "  (no devices)")?;
        }
        for device in &self.devices {
            writeln!(
                f,
                "  Device {}: {} [{}] {} CUs, {} MiB, max work-group {}",
                device.index,
                device.name,
                device.kind,
                device.compute_units,
                device.global_mem_bytes / (1024 * 1024),
                device.max_work_group_size
            )?;
        }
        Ok(())
    }
}
