//! Checks a device result against the CPU reference.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::error::VectorAddError;

/// First element that disagreed with the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    pub index: usize,
    pub expected: i32,
    pub actual: i32,
}

/// Outcome of comparing a result range against the reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    /// Number of elements compared
    pub checked: usize,
    /// Number of elements that differed
    pub mismatches: usize,
    pub first_mismatch: Option<Mismatch>,
    /// Elements outside the launched range, left unchecked
    pub unchecked: usize,
}

impl Verification {
    pub fn passed(&self) -> bool {
        self.mismatches == 0
    }
}

/// Compares `actual[range]` with `expected[range]`.
///
/// Only the launched work-items write to the output buffer, so callers pass the
/// `0..global_size` range and everything past it is counted as unchecked.
pub fn verify(
    expected: &[i32],
    actual: &[i32],
    range: Range<usize>,
) -> Result<Verification, VectorAddError> {
    if expected.len() != actual.len() {
        return Err(VectorAddError::LengthMismatch {
            expected: expected.len(),
            actual: actual.len(),
        });
    }
    if range.start > range.end || range.end > expected.len() {
        return Err(VectorAddError::InvalidConfig(format!(
            "verification range {:?} outside {} elements",
            range,
            expected.len()
        )));
    }

    let mut mismatches = 0;
    let mut first_mismatch = None;
    for i in range.clone() {
        if expected[i] != actual[i] {
            mismatches += 1;
            if first_mismatch.is_none() {
                first_mismatch = Some(Mismatch {
                    index: i,
                    expected: expected[i],
                    actual: actual[i],
                });
            }
        }
    }

    let checked = range.len();
    Ok(Verification {
        checked,
        mismatches,
        first_mismatch,
        unchecked: expected.len() - checked,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_all_match() {
        let expected = vec![1, 3, 5, 7];
        let v = verify(&expected, &expected.clone(), 0..4).unwrap();
        assert!(v.passed());
        assert_eq!(v.checked, 4);
        assert_eq!(v.unchecked, 0);
        assert!(v.first_mismatch.is_none());
    }

    #[test]
    fn test_verify_reports_first_mismatch() {
        let expected = vec![1, 3, 5, 7, 9];
        let actual = vec![1, 3, 0, 7, 0];
        let v = verify(&expected, &actual, 0..5).unwrap();
        assert!(!v.passed());
        assert_eq!(v.mismatches, 2);
        assert_eq!(
            v.first_mismatch,
            Some(Mismatch {
                index: 2,
                expected: 5,
                actual: 0
            })
        );
    }

    #[test]
    fn test_verify_partial_range() {
        let expected = vec![1, 3, 5, 7];
        let actual = vec![1, 3, 0, 0];
        let v = verify(&expected, &actual, 0..2).unwrap();
        assert!(v.passed());
        assert_eq!(v.checked, 2);
        assert_eq!(v.unchecked, 2);
    }

    #[test]
    fn test_verify_rejects_bad_input() {
        assert!(verify(&[1, 2], &[1], 0..1).is_err());
        assert!(verify(&[1, 2], &[1, 2], 0..3).is_err());
    }
}
