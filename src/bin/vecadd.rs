#![deny(missing_docs)]
//! # Vector-Add Demo
//!
//! The `vecadd` binary runs one element-wise integer addition on an OpenCL
//! device and compares it with a plain CPU loop. With no arguments it uses the
//! first platform and its first device, sums one million elements and prints
//! the CPU time and the device read-back time in microseconds.
//!
//! Any failure (no platform, no device, kernel build error, OpenCL call error)
//! is reported and the process exits with a non-zero status.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use clvadd::{list_platforms, run_vector_add, save_report, DeviceKind, RunConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Element-wise vector addition on an OpenCL device")]
/// Command-line arguments for the vector-add demo.
struct Args {
    /// Platform index
    #[arg(long, default_value = "0")]
    platform: usize,

    /// Device index within the selected platform
    #[arg(long, default_value = "0")]
    device: usize,

    /// Device type filter (all, gpu, cpu, accelerator, custom)
    #[arg(long, default_value = "all")]
    device_type: String,

    /// Number of elements per vector
    #[arg(long, default_value = "1000000")]
    count: usize,

    /// Number of work-items to launch (defaults to one per element)
    #[arg(long)]
    global_size: Option<usize>,

    /// Enable queue profiling and report kernel execution time
    #[arg(long)]
    profiling: bool,

    /// Skip comparing the device result with the CPU result
    #[arg(long)]
    no_verify: bool,

    /// List platforms and devices, then exit
    #[arg(long)]
    list: bool,

    /// Output file for the JSON report
    #[arg(long)]
    out: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn to_config(&self) -> Result<RunConfig> {
        let device_kind: DeviceKind = self.device_type.parse()?;
        let config = RunConfig {
            platform_index: self.platform,
            device_index: self.device,
            device_kind,
            count: self.count,
            global_size: self.global_size,
            profiling: self.profiling,
            verify: !self.no_verify,
        };
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if args.list {
        let platforms = list_platforms().context("Failed to enumerate OpenCL platforms")?;
        if platforms.is_empty() {
            println!("No OpenCL platforms found");
        }
        for platform in &platforms {
            print!("{}", platform);
        }
        return Ok(());
    }

    let config = args.to_config()?;
    info!(
        "[VECADD:INIT] Count: {}, global size: {}, device type: {}",
        config.count,
        config.effective_global_size(),
        config.device_kind
    );

    let report = run_vector_add(&config)?;
    println!("{}", report);

    if let Some(ref out_file) = args.out {
        save_report(out_file, &report)?;
    }

    if !report.passed() {
        error!("[VECADD:DONE] Device result does not match the CPU result");
        anyhow::bail!("verification failed");
    }

    info!("[VECADD:DONE] Finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_gives_default_config() {
        let args = Args::parse_from(["vecadd"]);
        assert_eq!(args.to_config().unwrap(), RunConfig::default());
    }

    #[test]
    fn test_flags_map_to_config() {
        let args = Args::parse_from([
            "vecadd",
            "--platform",
            "1",
            "--device-type",
            "gpu",
            "--count",
            "1000000",
            "--global-size",
            "1000",
            "--profiling",
            "--no-verify",
        ]);
        let config = args.to_config().unwrap();
        assert_eq!(config.platform_index, 1);
        assert_eq!(config.device_kind, DeviceKind::Gpu);
        assert_eq!(config.effective_global_size(), 1000);
        assert!(config.profiling);
        assert!(!config.verify);
    }

    #[test]
    fn test_invalid_flags_rejected() {
        let args = Args::parse_from(["vecadd", "--device-type", "tpu"]);
        assert!(args.to_config().is_err());

        let args = Args::parse_from(["vecadd", "--count", "10", "--global-size", "20"]);
        assert!(args.to_config().is_err());
    }
}
