//! # Run Report
//!
//! Collects the timings and verification outcome of one run. `Display` prints
//! the two classic timing lines; `save_report` writes the whole record as JSON
//! for later comparison between devices.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::model::RunConfig;
use crate::verify::Verification;

/// Everything measured during one vector-add run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub config: RunConfig,
    /// Name of the platform that ran the kernel
    pub platform: String,
    /// Name of the device that ran the kernel
    pub device: String,
    /// Naive CPU loop wall time (microseconds)
    pub cpu_us: u64,
    /// Host-to-device copy of A and B (microseconds)
    pub upload_us: u64,
    /// Kernel enqueue wall time (microseconds)
    pub kernel_us: u64,
    /// Kernel execution time from profiling events, if profiling was enabled
    pub kernel_profiled_us: Option<f64>,
    /// Blocking device-to-host copy of C (microseconds)
    pub read_back_us: u64,
    /// Total bytes moved host-to-device
    pub bytes_uploaded: u64,
    /// Total bytes moved device-to-host
    pub bytes_downloaded: u64,
    pub verification: Option<Verification>,
}

impl RunReport {
    /// True unless verification ran and found mismatches.
    pub fn passed(&self) -> bool {
        self.verification.as_ref().map_or(true, |v| v.passed())
    }

    /// Read-back throughput in GiB/s, or `None` when the copy was too fast to time.
    pub fn read_back_gib_per_sec(&self) -> Option<f64> {
        if self.read_back_us == 0 {
            return None;
        }
        let secs = self.read_back_us as f64 / 1_000_000.0;
        Some(self.bytes_downloaded as f64 / secs / (1024.0 * 1024.0 * 1024.0))
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "No OpenCL: time elapsed:{} microseconds", self.cpu_us)?;
        write!(f, "OpenCL: time elapsed:{} microseconds", self.read_back_us)?;
        if let Some(us) = self.kernel_profiled_us {
            write!(f, "\nKernel (profiled): {:.1} microseconds", us)?;
        }
        if let Some(v) = &self.verification {
            if v.passed() {
                write!(f, "\nVerified {} elements", v.checked)?;
            } else {
                write!(
                    f,
                    "\nVerification FAILED: {} of {} elements differ",
                    v.mismatches, v.checked
                )?;
                if let Some(m) = v.first_mismatch {
                    write!(
                        f,
                        " (first at index {}: expected {}, got {})",
                        m.index, m.expected, m.actual
                    )?;
                }
            }
        }
        Ok(())
    }
}

/// Writes `report` as pretty-printed JSON to `path`.
pub fn save_report(path: impl AsRef<Path>, report: &RunReport) -> Result<()> {
    let path = path.as_ref();
    let mut file =
        File::create(path).with_context(|| format!("Failed to create report {:?}", path))?;
    writeln!(file, "{}", serde_json::to_string_pretty(report)?)?;
    tracing::info!("[VECADD:DONE] Saved report to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::Mismatch;

    fn sample_report() -> RunReport {
        RunReport {
            config: RunConfig::with_count(1000),
            platform: "pocl".to_string(),
            device: "cpu-haswell".to_string(),
            cpu_us: 812,
            upload_us: 95,
            kernel_us: 12,
            kernel_profiled_us: None,
            read_back_us: 240,
            bytes_uploaded: 8000,
            bytes_downloaded: 4000,
            verification: Some(Verification {
                checked: 1000,
                mismatches: 0,
                first_mismatch: None,
                unchecked: 0,
            }),
        }
    }

    #[test]
    fn test_display_timing_lines() {
        let text = sample_report().to_string();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("No OpenCL: time elapsed:812 microseconds")
        );
        assert_eq!(lines.next(), Some("OpenCL: time elapsed:240 microseconds"));
        assert_eq!(lines.next(), Some("Verified 1000 elements"));
    }

    #[test]
    fn test_display_failed_verification() {
        let mut report = sample_report();
        report.verification = Some(Verification {
            checked: 1000,
            mismatches: 3,
            first_mismatch: Some(Mismatch {
                index: 7,
                expected: 15,
                actual: 0,
            }),
            unchecked: 0,
        });
        assert!(!report.passed());
        let text = report.to_string();
        assert!(text.contains("3 of 1000 elements differ"));
        assert!(text.contains("first at index 7: expected 15, got 0"));
    }

    #[test]
    fn test_passed_without_verification() {
        let mut report = sample_report();
        report.verification = None;
        assert!(report.passed());
    }

    #[test]
    fn test_read_back_throughput() {
        let mut report = sample_report();
        report.read_back_us = 0;
        assert!(report.read_back_gib_per_sec().is_none());

        report.read_back_us = 1_000_000;
        report.bytes_downloaded = 1024 * 1024 * 1024;
        let rate = report.read_back_gib_per_sec().unwrap();
        assert!((rate - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_save_report() {
        let path = std::env::temp_dir().join(format!("clvadd_report_{}.json", std::process::id()));
        save_report(&path, &sample_report()).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["cpu_us"], 812);
        assert_eq!(json["config"]["count"], 1000);
        assert_eq!(json["verification"]["mismatches"], 0);

        std::fs::remove_file(&path).ok();
    }
}
