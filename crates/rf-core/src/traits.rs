//! Core traits for RegioFill
//!
//! Batches are processed independently and combined afterwards. The only
//! concurrency contract of the engine is that per-batch outputs can be
//! summed in any order, which [`Merge`] expresses.

use std::collections::BTreeMap;

use crate::Result;

/// Associative, commutative combination of per-batch outputs.
///
/// `a.merge(b)` followed by `.merge(c)` must equal `a.merge(b.merge(c))`
/// and `b.merge(a)` up to floating-point rounding.
pub trait Merge: Sized {
    /// Fold `other` into `self`.
    fn merge(&mut self, other: Self) -> Result<()>;
}

impl Merge for f64 {
    fn merge(&mut self, other: Self) -> Result<()> {
        *self += other;
        Ok(())
    }
}

impl Merge for u64 {
    fn merge(&mut self, other: Self) -> Result<()> {
        *self += other;
        Ok(())
    }
}

impl<K: Ord, V: Merge> Merge for BTreeMap<K, V> {
    fn merge(&mut self, other: Self) -> Result<()> {
        for (key, value) in other {
            match self.get_mut(&key) {
                Some(existing) => existing.merge(value)?,
                None => {
                    self.insert(key, value);
                }
            }
        }
        Ok(())
    }
}
