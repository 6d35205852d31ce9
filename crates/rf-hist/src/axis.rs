//! Numeric histogram axes.
//!
//! Every axis carries an underflow and an overflow bin. Indices returned by
//! [`Axis::index`] address the extended layout:
//! `0` = underflow, `1..=n_bins` = in-range bins, `n_bins + 1` = overflow.
//! NaN values land in the overflow bin.

use serde::{Deserialize, Serialize};

use rf_core::{Error, Result};

/// A numeric axis with a fixed binning scheme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Axis {
    /// `n_bins` equal-width bins on `[lo, hi)`.
    Regular {
        /// Axis name (the quantity filled along it).
        name: String,
        /// Display label.
        label: String,
        /// Number of in-range bins.
        n_bins: usize,
        /// Lower edge of the first bin.
        lo: f64,
        /// Upper edge of the last bin.
        hi: f64,
    },
    /// Bins delimited by explicit, strictly increasing edges.
    Variable {
        /// Axis name (the quantity filled along it).
        name: String,
        /// Display label.
        label: String,
        /// Bin edges (length = n_bins + 1).
        edges: Vec<f64>,
    },
}

impl Axis {
    /// Equal-width axis.
    pub fn regular(
        n_bins: usize,
        lo: f64,
        hi: f64,
        name: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Axis::Regular { name: name.into(), label: label.into(), n_bins, lo, hi }
    }

    /// Axis with explicit edges.
    pub fn variable(name: impl Into<String>, label: impl Into<String>, edges: Vec<f64>) -> Self {
        Axis::Variable { name: name.into(), label: label.into(), edges }
    }

    /// Axis name.
    pub fn name(&self) -> &str {
        match self {
            Axis::Regular { name, .. } | Axis::Variable { name, .. } => name,
        }
    }

    /// Display label.
    pub fn label(&self) -> &str {
        match self {
            Axis::Regular { label, .. } | Axis::Variable { label, .. } => label,
        }
    }

    /// Number of in-range bins.
    pub fn n_bins(&self) -> usize {
        match self {
            Axis::Regular { n_bins, .. } => *n_bins,
            Axis::Variable { edges, .. } => edges.len().saturating_sub(1),
        }
    }

    /// Number of bins including underflow and overflow.
    pub fn extent(&self) -> usize {
        self.n_bins() + 2
    }

    /// Bin edges (length = n_bins + 1).
    pub fn edges(&self) -> Vec<f64> {
        match self {
            Axis::Regular { n_bins, lo, hi, .. } => {
                let width = (hi - lo) / *n_bins as f64;
                (0..=*n_bins)
                    .map(|i| if i == *n_bins { *hi } else { lo + width * i as f64 })
                    .collect()
            }
            Axis::Variable { edges, .. } => edges.clone(),
        }
    }

    /// Check the binning is usable.
    pub fn validate(&self) -> Result<()> {
        match self {
            Axis::Regular { name, n_bins, lo, hi, .. } => {
                if *n_bins == 0 {
                    return Err(Error::Histogram(format!("axis '{name}' has zero bins")));
                }
                if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                    return Err(Error::Histogram(format!(
                        "axis '{name}' has invalid range [{lo}, {hi})"
                    )));
                }
            }
            Axis::Variable { name, edges, .. } => {
                if edges.len() < 2 {
                    return Err(Error::Histogram(format!(
                        "axis '{name}' needs at least two edges, got {}",
                        edges.len()
                    )));
                }
                if edges.iter().any(|e| !e.is_finite()) || edges.windows(2).any(|w| w[0] >= w[1])
                {
                    return Err(Error::Histogram(format!(
                        "axis '{name}' edges must be finite and strictly increasing"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Extended-layout index of `value`.
    pub fn index(&self, value: f64) -> usize {
        let n = self.n_bins();
        if value.is_nan() {
            return n + 1;
        }
        match self {
            Axis::Regular { lo, hi, .. } => {
                if value < *lo {
                    0
                } else if value >= *hi {
                    n + 1
                } else {
                    let b = ((value - lo) / (hi - lo) * n as f64) as usize;
                    // Rounding can push values just below `hi` onto `n`.
                    b.min(n - 1) + 1
                }
            }
            Axis::Variable { edges, .. } => match find_bin(edges, value) {
                Some(b) => b + 1,
                None if value < edges[0] => 0,
                None => n + 1,
            },
        }
    }
}

/// Find the bin index for a value given sorted bin edges.
///
/// Returns `None` for underflow/overflow and NaN.
fn find_bin(edges: &[f64], val: f64) -> Option<usize> {
    if val.is_nan() || val < edges[0] || val >= edges[edges.len() - 1] {
        return None;
    }
    match edges.binary_search_by(|e| e.total_cmp(&val)) {
        Ok(i) => {
            if i >= edges.len() - 1 {
                None
            } else {
                Some(i)
            }
        }
        Err(i) => {
            if i == 0 || i >= edges.len() {
                None
            } else {
                Some(i - 1)
            }
        }
    }
}
