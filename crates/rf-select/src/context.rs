//! Per-batch state passed explicitly to every processing step.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use rf_core::{Error, Result, check_len};

use crate::region::Region;
use crate::selection::SelectionRegistry;
use crate::weights::WeightLedger;

/// Whether a batch is simulated (weights apply) or observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventMode {
    /// Simulated events: region scales come from the weight ledger.
    Simulated,
    /// Observed events: every event has unit weight.
    Observed,
}

impl EventMode {
    /// `true` for [`EventMode::Simulated`].
    pub fn is_simulated(self) -> bool {
        self == EventMode::Simulated
    }
}

/// Selection registry, weight ledger and axis quantities of one batch.
#[derive(Debug, Clone)]
pub struct BatchContext {
    n_events: usize,
    mode: EventMode,
    /// Named masks of this batch.
    pub selections: SelectionRegistry,
    /// Named weight factors of this batch.
    pub weights: WeightLedger,
    quantities: BTreeMap<String, Vec<f64>>,
}

impl BatchContext {
    /// Fresh context for `n_events` rows.
    pub fn new(n_events: usize, mode: EventMode) -> Self {
        Self {
            n_events,
            mode,
            selections: SelectionRegistry::new(n_events),
            weights: WeightLedger::new(n_events),
            quantities: BTreeMap::new(),
        }
    }

    /// Batch length.
    pub fn n_events(&self) -> usize {
        self.n_events
    }

    /// Simulated or observed.
    pub fn mode(&self) -> EventMode {
        self.mode
    }

    /// Register a per-event axis quantity (e.g. `"electron_pt"`).
    pub fn add_quantity(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if self.quantities.contains_key(&name) {
            return Err(Error::Validation(format!("quantity '{name}' already supplied")));
        }
        check_len(&name, self.n_events, values.len())?;
        self.quantities.insert(name, values);
        Ok(())
    }

    /// Borrow a quantity.
    pub fn quantity(&self, name: &str) -> Result<&[f64]> {
        self.quantities
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::UnknownQuantity(name.to_string()))
    }

    /// Quantity names (sorted).
    pub fn quantity_names(&self) -> impl Iterator<Item = &str> {
        self.quantities.keys().map(String::as_str)
    }

    /// Per-event scale factor of `region` over the whole batch.
    ///
    /// Simulated batches use the partial product of the region's weights;
    /// observed batches have no weight ledger entries and use unit weight.
    pub fn region_scale(&self, region: &Region) -> Result<Vec<f64>> {
        match self.mode {
            EventMode::Simulated => self.weights.partial(&region.weights),
            EventMode::Observed => Ok(vec![1.0; self.n_events]),
        }
    }
}
