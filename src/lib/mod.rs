#![allow(missing_docs)]
//! # OpenCL Vector Addition
//!
//! This crate offloads an element-wise integer vector addition (`C = A + B`) to an
//! OpenCL device and times it against a naive CPU loop. It picks the first
//! platform and device (or the ones asked for), compiles an inline kernel,
//! allocates three device buffers, uploads two inputs, launches one kernel and
//! reads the result back.
//!
//! ## Core Modules
//!
//! - `model`: Run configuration and device inventory records.
//! - `kernel`: The OpenCL C source of the `simple_add` kernel.
//! - `workload`: Input generation and the timed CPU reference loop.
//! - `verify`: Element-wise comparison of a device result against the reference.
//! - `report`: Timings and verification outcome, printable and saved as JSON.
//! - `executor`: The OpenCL execution engine (`opencl` feature).

pub mod error;
pub mod kernel;
pub mod model;
pub mod report;
pub mod verify;
pub mod workload;

#[cfg(feature = "opencl")]
pub mod executor;

pub use error::VectorAddError;
pub use model::{DeviceInfo, DeviceKind, PlatformInfo, RunConfig};
pub use report::{save_report, RunReport};
pub use verify::{verify, Verification};
pub use workload::{cpu_add, cpu_baseline, HostVectors};

#[cfg(feature = "opencl")]
pub use executor::{list_platforms, run_vector_add, VectorAddExecutor};

// Re-export common types
pub use anyhow::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
