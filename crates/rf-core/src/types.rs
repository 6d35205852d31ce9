//! Columnar helpers shared by the registry, the ledger and the fill step.
//!
//! Every per-event array of a batch is a plain slice aligned to the batch
//! row order; these helpers only ever combine arrays of equal length.

use crate::error::{Error, Result};

/// Fail with [`Error::LengthMismatch`] unless `actual == expected`.
pub fn check_len(what: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(Error::LengthMismatch { what: what.to_string(), expected, actual });
    }
    Ok(())
}

/// In-place elementwise AND: `acc[i] &= other[i]`.
///
/// Both slices must have the same length.
pub fn and_assign(acc: &mut [bool], other: &[bool]) {
    debug_assert_eq!(acc.len(), other.len());
    for (a, &b) in acc.iter_mut().zip(other) {
        *a &= b;
    }
}

/// Number of `true` entries.
pub fn count_true(mask: &[bool]) -> usize {
    mask.iter().filter(|&&m| m).count()
}

/// Sum of `weights` over the entries selected by `mask`.
///
/// NaN weights contribute nothing.
pub fn weighted_sum(mask: &[bool], weights: &[f64]) -> f64 {
    mask.iter()
        .zip(weights)
        .filter(|&(&m, w)| m && !w.is_nan())
        .map(|(_, &w)| w)
        .sum()
}

/// Keep the entries of `values` selected by `mask`, preserving order.
pub fn restrict<T: Copy>(values: &[T], mask: &[bool]) -> Vec<T> {
    debug_assert_eq!(values.len(), mask.len());
    values.iter().zip(mask).filter(|&(_, &m)| m).map(|(&v, _)| v).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_len_reports_both_lengths() {
        assert!(check_len("pt", 3, 3).is_ok());
        let err = check_len("pt", 3, 4).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { expected: 3, actual: 4, .. }));
        assert!(err.to_string().contains("'pt'"));
    }

    #[test]
    fn restrict_and_counts() {
        let mask = [true, false, true, false];
        assert_eq!(restrict(&[1.0, 2.0, 3.0, 4.0], &mask), vec![1.0, 3.0]);
        assert_eq!(count_true(&mask), 2);
        assert_eq!(weighted_sum(&mask, &[0.5, 9.0, f64::NAN, 1.0]), 0.5);
    }

    #[test]
    fn and_assign_is_elementwise() {
        let mut acc = vec![true, true, false];
        and_assign(&mut acc, &[true, false, true]);
        assert_eq!(acc, vec![true, false, false]);
    }
}
