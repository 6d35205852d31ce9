//! A named collection of sinks produced for one batch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use rf_core::{Error, Merge, Result};

use crate::histogram::RegionHistogram;

/// Histograms keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistogramSet {
    histograms: BTreeMap<String, RegionHistogram>,
}

impl HistogramSet {
    /// Add (or replace) a histogram under its own name.
    pub fn insert(&mut self, histogram: RegionHistogram) {
        self.histograms.insert(histogram.name().to_string(), histogram);
    }

    /// Borrow a histogram.
    pub fn get(&self, name: &str) -> Option<&RegionHistogram> {
        self.histograms.get(name)
    }

    /// Mutably borrow a histogram, failing with [`Error::UnknownHistogram`].
    pub fn get_mut(&mut self, name: &str) -> Result<&mut RegionHistogram> {
        self.histograms.get_mut(name).ok_or_else(|| Error::UnknownHistogram(name.to_string()))
    }

    /// Whether a histogram with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.histograms.contains_key(name)
    }

    /// Histogram names (sorted).
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.histograms.keys().map(String::as_str)
    }

    /// Iterate over histograms (sorted by name).
    pub fn iter(&self) -> impl Iterator<Item = &RegionHistogram> {
        self.histograms.values()
    }

    /// Number of histograms.
    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }
}

impl Merge for HistogramSet {
    fn merge(&mut self, other: Self) -> Result<()> {
        self.histograms.merge(other.histograms)
    }
}
