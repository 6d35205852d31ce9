//! Fixed histogram schema and per-batch factory.

use serde::{Deserialize, Serialize};

use rf_core::{Error, Result};

use crate::axis::Axis;
use crate::histogram::{RegionHistogram, Storage};
use crate::set::HistogramSet;

/// Declaration of one named sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramDef {
    /// Sink name.
    pub name: String,
    /// Storage kind.
    pub storage: Storage,
    /// Numeric axes (the `region` category is implicit).
    pub axes: Vec<Axis>,
}

/// Ordered list of sink declarations.
///
/// Built once per run; [`HistogramSchema::build`] returns a fresh, empty
/// [`HistogramSet`] for every batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramSchema {
    defs: Vec<HistogramDef>,
}

impl HistogramSchema {
    /// Empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a sink. Fails on a duplicate name or invalid axes.
    pub fn histogram(
        mut self,
        name: impl Into<String>,
        storage: Storage,
        axes: Vec<Axis>,
    ) -> Result<Self> {
        let name = name.into();
        if self.defs.iter().any(|d| d.name == name) {
            return Err(Error::Histogram(format!("duplicate histogram '{name}' in schema")));
        }
        // Validate eagerly so `build` cannot fail.
        RegionHistogram::new(name.as_str(), storage, axes.clone())?;
        self.defs.push(HistogramDef { name, storage, axes });
        Ok(self)
    }

    /// Declarations in schema order.
    pub fn defs(&self) -> &[HistogramDef] {
        &self.defs
    }

    /// Look up a declaration by name.
    pub fn def(&self, name: &str) -> Option<&HistogramDef> {
        self.defs.iter().find(|d| d.name == name)
    }

    /// Fresh set of empty sinks.
    pub fn build(&self) -> HistogramSet {
        let mut set = HistogramSet::default();
        for def in &self.defs {
            // Axes were validated in `histogram`.
            if let Ok(h) = RegionHistogram::new(def.name.as_str(), def.storage, def.axes.clone()) {
                set.insert(h);
            }
        }
        set
    }
}
