//! Columnar event batches.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use rf_core::{Error, Result, check_len};
use rf_select::EventMode;

/// Column whose presence marks a batch as simulated.
pub const GEN_WEIGHT: &str = "genWeight";

/// On-disk shape of a batch (`{"dataset", "columns", "flags"}`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchFile {
    /// Dataset identifier.
    pub dataset: String,
    /// Numeric per-event columns.
    #[serde(default)]
    pub columns: BTreeMap<String, Vec<f64>>,
    /// Boolean per-event columns (HLT paths, MET filters, ...).
    #[serde(default)]
    pub flags: BTreeMap<String, Vec<bool>>,
}

/// N events of one dataset, stored column-wise.
///
/// Every column has the same length; this is checked once in
/// [`EventBatch::new`].
#[derive(Debug, Clone)]
pub struct EventBatch {
    dataset: String,
    n_events: usize,
    columns: BTreeMap<String, Vec<f64>>,
    flags: BTreeMap<String, Vec<bool>>,
}

impl EventBatch {
    /// Build a batch, checking that every column has the same length.
    pub fn new(
        dataset: impl Into<String>,
        columns: BTreeMap<String, Vec<f64>>,
        flags: BTreeMap<String, Vec<bool>>,
    ) -> Result<Self> {
        let dataset = dataset.into();
        let n_events = columns
            .values()
            .map(Vec::len)
            .chain(flags.values().map(Vec::len))
            .next()
            .unwrap_or(0);
        for (name, col) in &columns {
            check_len(name, n_events, col.len())?;
        }
        for (name, col) in &flags {
            check_len(name, n_events, col.len())?;
        }
        Ok(Self { dataset, n_events, columns, flags })
    }

    /// Build from the deserialised file shape.
    pub fn from_file(file: BatchFile) -> Result<Self> {
        Self::new(file.dataset, file.columns, file.flags)
    }

    /// Parse a batch from JSON bytes.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        Self::from_file(serde_json::from_slice(bytes)?)
    }

    /// Read a batch JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let batch = Self::from_json_slice(&bytes)?;
        tracing::info!(
            path = %path.display(),
            dataset = %batch.dataset,
            events = batch.n_events,
            "batch loaded"
        );
        Ok(batch)
    }

    /// Dataset identifier.
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.n_events
    }

    /// Whether the batch has no events.
    pub fn is_empty(&self) -> bool {
        self.n_events == 0
    }

    /// Simulated iff a `genWeight` column is present.
    pub fn mode(&self) -> EventMode {
        if self.columns.contains_key(GEN_WEIGHT) {
            EventMode::Simulated
        } else {
            EventMode::Observed
        }
    }

    /// Whether a numeric column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Whether a boolean column exists.
    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.contains_key(name)
    }

    /// Borrow a numeric column.
    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::UnknownQuantity(name.to_string()))
    }

    /// Borrow a boolean column.
    pub fn flag(&self, name: &str) -> Result<&[bool]> {
        self.flags
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::UnknownSelection(name.to_string()))
    }

    /// First existing column among `names`.
    pub fn first_column<'a>(&self, names: &[&'a str]) -> Option<(&'a str, &[f64])> {
        names.iter().find_map(|n| self.columns.get(*n).map(|c| (*n, c.as_slice())))
    }

    /// Numeric column names (sorted).
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Boolean column names (sorted).
    pub fn flag_names(&self) -> impl Iterator<Item = &str> {
        self.flags.keys().map(String::as_str)
    }

    pub(crate) fn insert_column(&mut self, name: String, values: Vec<f64>) -> Result<()> {
        check_len(&name, self.n_events, values.len())?;
        self.columns.insert(name, values);
        Ok(())
    }

    /// OR over the listed flags present in the batch (all false if none is).
    pub fn any_of(&self, names: &[String]) -> Vec<bool> {
        let mut out = vec![false; self.n_events];
        for name in names {
            match self.flags.get(name) {
                Some(flag) => {
                    for (o, f) in out.iter_mut().zip(flag) {
                        *o |= f;
                    }
                }
                None => tracing::debug!(path = %name, dataset = %self.dataset, "trigger path absent"),
            }
        }
        out
    }

    /// AND over the listed flags present in the batch (all true if none is).
    pub fn all_of(&self, names: &[String]) -> Vec<bool> {
        let mut out = vec![true; self.n_events];
        for name in names {
            match self.flags.get(name) {
                Some(flag) => rf_core::and_assign(&mut out, flag),
                None => tracing::debug!(filter = %name, dataset = %self.dataset, "MET filter absent"),
            }
        }
        out
    }
}
