//! # Host Vectors and CPU Baseline
//!
//! This module produces the two input vectors and the naive CPU sum that the
//! device result is timed and checked against.
//!
//! - **Inputs (`HostVectors::generate`)**: `A[i] = i`, `B[i] = i + 1`.
//! - **Reference (`cpu_add`)**: A single-threaded loop computing `A[i] + B[i]`
//!   with wrapping arithmetic, matching the device's two's-complement `int`.
//! - **Baseline (`cpu_baseline`)**: The same loop with a wall-clock timer around
//!   it, which is what gets compared against the device read-back time.

use std::time::Instant;

use crate::error::VectorAddError;

/// The pair of host-side input vectors for one run.
///
/// Fields are private so `a` and `b` always have the same length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostVectors {
    a: Vec<i32>,
    b: Vec<i32>,
}

impl HostVectors {
    /// Fills `count` elements with the demo pattern (index and index + 1).
    ///
    /// Indices past `i32::MAX` wrap; `RunConfig::validate` keeps counts below that.
    pub fn generate(count: usize) -> Self {
        let a: Vec<i32> = (0..count).map(|i| i as i32).collect();
        let b: Vec<i32> = (0..count).map(|i| (i as i32).wrapping_add(1)).collect();
        Self { a, b }
    }

    /// Wraps existing vectors, rejecting mismatched lengths.
    pub fn from_parts(a: Vec<i32>, b: Vec<i32>) -> Result<Self, VectorAddError> {
        if a.len() != b.len() {
            return Err(VectorAddError::LengthMismatch {
                expected: a.len(),
                actual: b.len(),
            });
        }
        Ok(Self { a, b })
    }

    pub fn a(&self) -> &[i32] {
        &self.a
    }

    pub fn b(&self) -> &[i32] {
        &self.b
    }

    /// Fails unless both vectors hold exactly `count` elements.
    pub fn ensure_len(&self, count: usize) -> Result<(), VectorAddError> {
        for actual in [self.a.len(), self.b.len()] {
            if actual != count {
                return Err(VectorAddError::LengthMismatch {
                    expected: count,
                    actual,
                });
            }
        }
        Ok(())
    }

    /// Number of elements in each vector
    pub fn len(&self) -> usize {
        self.a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    /// Raw bytes of both inputs, as they will be copied into device buffers.
    pub fn as_bytes(&self) -> (&[u8], &[u8]) {
        (
            bytemuck::cast_slice(self.a.as_slice()),
            bytemuck::cast_slice(self.b.as_slice()),
        )
    }
}

/// Element-wise `a + b` on the host.
pub fn cpu_add(a: &[i32], b: &[i32]) -> Result<Vec<i32>, VectorAddError> {
    if a.len() != b.len() {
        return Err(VectorAddError::LengthMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    Ok(a.iter().zip(b).map(|(x, y)| x.wrapping_add(*y)).collect())
}

/// Result of the timed CPU loop.
#[derive(Debug, Clone)]
pub struct CpuBaseline {
    pub result: Vec<i32>,
    /// Elapsed wall time in microseconds
    pub elapsed_us: u128,
}

/// Runs `cpu_add` under a wall-clock timer.
pub fn cpu_baseline(inputs: &HostVectors) -> Result<CpuBaseline, VectorAddError> {
    let start = Instant::now();
    let result = cpu_add(&inputs.a, &inputs.b)?;
    let elapsed_us = start.elapsed().as_micros();

    tracing::debug!(
        "[VECADD:CPU] Summed {} elements in {} us",
        result.len(),
        elapsed_us
    );

    Ok(CpuBaseline { result, elapsed_us })
}
