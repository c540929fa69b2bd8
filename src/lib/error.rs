//! Error type shared by device discovery, the executor and verification.

use thiserror::Error;

/// Errors that can occur while setting up or running a vector-add on a device.
#[derive(Error, Debug)]
pub enum VectorAddError {
    #[error("No platforms found. Check the OpenCL installation")]
    NoPlatform,
    #[error("No devices found on platform '{platform}'. Check OpenCL is properly installed")]
    NoDevice { platform: String },
    #[error("Platform index {index} out of range ({available} available)")]
    PlatformIndex { index: usize, available: usize },
    #[error("Device index {index} out of range ({available} available)")]
    DeviceIndex { index: usize, available: usize },
    #[error("Error building kernel program:\n{log}")]
    Build { log: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Length mismatch: expected {expected} elements, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[cfg(feature = "opencl")]
    #[error("OpenCL error: {0}")]
    Cl(#[from] opencl3::error_codes::ClError),
}
