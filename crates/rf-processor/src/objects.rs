//! Physics-object selection collaborator.
//!
//! Object-quality predicates and four-vector kinematics live outside the
//! engine. They reach it through [`ObjectSelector`] as plain per-event
//! arrays: object multiplicities, leading-object quality flags and a table
//! of named kinematic quantities (NaN where the object is absent).

use std::collections::BTreeMap;

use rf_core::{Error, Result};

use crate::batch::EventBatch;
use crate::working_point::{ElectronId, MuonId};

/// What a processor asks of the object selector.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRequest {
    /// Electron ID working point.
    pub electron_id: ElectronId,
    /// Muon ID working point.
    pub muon_id: MuonId,
    /// `(output name, source column)` pairs of kinematic quantities.
    pub quantities: Vec<(String, String)>,
}

impl ObjectRequest {
    /// Request with no kinematic quantities.
    pub fn new(electron_id: ElectronId, muon_id: MuonId) -> Self {
        Self { electron_id, muon_id, quantities: Vec::new() }
    }

    /// Request a quantity under its own column name.
    pub fn quantity(self, name: &str) -> Self {
        self.renamed(name, name)
    }

    /// Request column `source` exposed as `name`.
    pub fn renamed(mut self, name: &str, source: &str) -> Self {
        self.quantities.push((name.to_string(), source.to_string()));
        self
    }
}

/// Per-event object summary of one batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectedObjects {
    /// Good electrons per event.
    pub n_electrons: Vec<u32>,
    /// Good muons per event.
    pub n_muons: Vec<u32>,
    /// Good b-tagged jets per event.
    pub n_bjets: Vec<u32>,
    /// Hadronic taus per event.
    pub n_taus: Vec<u32>,
    /// Whether the leading electron passes the electron selection.
    pub good_electron: Vec<bool>,
    /// Whether the leading muon passes the muon selection.
    pub good_muon: Vec<bool>,
    /// Named kinematic quantities.
    pub quantities: BTreeMap<String, Vec<f64>>,
}

impl SelectedObjects {
    /// Borrow a kinematic quantity.
    pub fn quantity(&self, name: &str) -> Result<&[f64]> {
        self.quantities
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::UnknownQuantity(name.to_string()))
    }
}

/// Computes [`SelectedObjects`] for a batch.
pub trait ObjectSelector: Send + Sync {
    /// Select objects of `batch` according to `request`.
    fn select(&self, batch: &EventBatch, request: &ObjectRequest) -> Result<SelectedObjects>;
}

/// Reads object summaries from precomputed batch columns.
///
/// Multiplicities come from `n_electrons`, `n_muons`, `n_bjets`, `n_taus`
/// and quality flags from `good_electron`, `good_muon`. A column suffixed
/// with the requested working point (`n_electrons_wp80iso`,
/// `good_muon_tight`) takes precedence over the bare one.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnObjects;

impl ColumnObjects {
    fn counts(batch: &EventBatch, name: &str, wp: Option<&str>) -> Result<Vec<u32>> {
        let suffixed = wp.map(|wp| format!("{name}_{wp}"));
        let candidates: Vec<&str> = suffixed.as_deref().into_iter().chain([name]).collect();
        let (source, values) =
            batch.first_column(&candidates).ok_or_else(|| Error::UnknownQuantity(name.to_string()))?;
        values
            .iter()
            .map(|&v| {
                if v.is_finite() && v >= 0.0 && v.fract() == 0.0 {
                    Ok(v as u32)
                } else {
                    Err(Error::Validation(format!("column '{source}' holds non-count value {v}")))
                }
            })
            .collect()
    }

    fn flag(batch: &EventBatch, name: &str, wp: &str) -> Result<Vec<bool>> {
        let suffixed = format!("{name}_{wp}");
        if batch.has_flag(&suffixed) {
            return batch.flag(&suffixed).map(<[bool]>::to_vec);
        }
        batch.flag(name).map(<[bool]>::to_vec)
    }
}

impl ObjectSelector for ColumnObjects {
    fn select(&self, batch: &EventBatch, request: &ObjectRequest) -> Result<SelectedObjects> {
        let ele_wp = request.electron_id.as_str();
        let mu_wp = request.muon_id.as_str();
        let mut quantities = BTreeMap::new();
        for (name, source) in &request.quantities {
            quantities.insert(name.clone(), batch.column(source)?.to_vec());
        }
        Ok(SelectedObjects {
            n_electrons: Self::counts(batch, "n_electrons", Some(ele_wp))?,
            n_muons: Self::counts(batch, "n_muons", Some(mu_wp))?,
            n_bjets: Self::counts(batch, "n_bjets", None)?,
            n_taus: Self::counts(batch, "n_taus", None)?,
            good_electron: Self::flag(batch, "good_electron", ele_wp)?,
            good_muon: Self::flag(batch, "good_muon", mu_wp)?,
            quantities,
        })
    }
}
