//! Certified luminosity-section mask.

use std::collections::BTreeMap;
use std::path::Path;

use rf_core::{Error, Result, check_len};

/// Certified `(run, luminosity block)` ranges.
///
/// Parsed from the golden-JSON shape `{"<run>": [[first, last], ...]}`;
/// ranges are inclusive on both ends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LumiMask {
    runs: BTreeMap<u32, Vec<(u32, u32)>>,
}

impl LumiMask {
    /// Parse golden JSON.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let raw: BTreeMap<String, Vec<[u32; 2]>> = serde_json::from_str(s)?;
        let mut runs = BTreeMap::new();
        for (run, ranges) in raw {
            let run: u32 = run
                .trim()
                .parse()
                .map_err(|_| Error::Validation(format!("lumi mask: invalid run number '{run}'")))?;
            let mut ranges: Vec<(u32, u32)> = ranges.into_iter().map(|[lo, hi]| (lo, hi)).collect();
            if let Some(&(lo, hi)) = ranges.iter().find(|(lo, hi)| lo > hi) {
                return Err(Error::Validation(format!("lumi mask: run {run} has empty range [{lo}, {hi}]")));
            }
            ranges.sort_unstable();
            runs.insert(run, ranges);
        }
        Ok(Self { runs })
    }

    /// Read a golden-JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let mask = Self::from_json_str(&std::fs::read_to_string(path)?)?;
        tracing::info!(path = %path.display(), runs = mask.runs.len(), "lumi mask loaded");
        Ok(mask)
    }

    /// Number of certified runs.
    pub fn n_runs(&self) -> usize {
        self.runs.len()
    }

    /// Whether one luminosity block is certified.
    pub fn contains(&self, run: u32, lumi: u32) -> bool {
        self.runs.get(&run).is_some_and(|ranges| {
            let idx = ranges.partition_point(|&(lo, _)| lo <= lumi);
            ranges[..idx].iter().rev().any(|&(_, hi)| lumi <= hi)
        })
    }

    /// Per-event mask from run and luminosity-block columns.
    ///
    /// Values that are not non-negative integers are never certified.
    pub fn apply(&self, runs: &[f64], lumis: &[f64]) -> Result<Vec<bool>> {
        check_len("luminosityBlock", runs.len(), lumis.len())?;
        Ok(runs
            .iter()
            .zip(lumis)
            .map(|(&run, &lumi)| match (as_id(run), as_id(lumi)) {
                (Some(run), Some(lumi)) => self.contains(run, lumi),
                _ => false,
            })
            .collect())
    }
}

fn as_id(v: f64) -> Option<u32> {
    (v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64).then_some(v as u32)
}
