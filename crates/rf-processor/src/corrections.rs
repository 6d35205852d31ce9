//! Correction (scale-factor) collaborator.

use rf_core::{Error, Result};
use rf_select::{NamedWeight, WeightLedger};

use crate::batch::{EventBatch, GEN_WEIGHT};
use crate::objects::SelectedObjects;
use crate::working_point::Year;

/// One weight factor to register, and where its values come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightSource {
    /// Ledger name (e.g. `"pileup"`).
    pub name: String,
    /// Nominal column; variants are `<column>_up` / `<column>_down`.
    pub column: String,
}

impl WeightSource {
    /// Source read from `weight_<name>`.
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), column: format!("weight_{name}") }
    }

    /// Source read from an explicit column.
    pub fn from_column(name: &str, column: &str) -> Self {
        Self { name: name.to_string(), column: column.to_string() }
    }

    /// The generator weight, read from `genWeight`.
    pub fn genweight() -> Self {
        Self::from_column("genweight", GEN_WEIGHT)
    }
}

/// Ordered list of weight factors a processor needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrectionRequest {
    /// Data-taking era the corrections belong to (`"2016APV"`, `"2018"`).
    pub era: String,
    /// Factors in registration order.
    pub sources: Vec<WeightSource>,
}

impl CorrectionRequest {
    /// Empty request for one year and year modifier.
    pub fn for_era(year: Year, yearmod: &str) -> Self {
        Self { era: format!("{year}{yearmod}"), sources: Vec::new() }
    }

    /// Append a factor.
    pub fn weight(mut self, source: WeightSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Ledger names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.name.as_str())
    }
}

/// Registers weight factors for a batch.
pub trait CorrectionProvider: Send + Sync {
    /// Add every factor of `request` to `ledger`.
    fn add_weights(
        &self,
        batch: &EventBatch,
        objects: &SelectedObjects,
        request: &CorrectionRequest,
        ledger: &mut WeightLedger,
    ) -> Result<()>;
}

/// Reads precomputed correction columns from the batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnCorrections;

impl CorrectionProvider for ColumnCorrections {
    fn add_weights(
        &self,
        batch: &EventBatch,
        _objects: &SelectedObjects,
        request: &CorrectionRequest,
        ledger: &mut WeightLedger,
    ) -> Result<()> {
        tracing::debug!(era = %request.era, factors = request.sources.len(), "reading correction columns");
        for source in &request.sources {
            let nominal = batch
                .column(&source.column)
                .map_err(|_| Error::UnknownWeight(format!("{} (column '{}')", source.name, source.column)))?
                .to_vec();
            let up = format!("{}_up", source.column);
            let down = format!("{}_down", source.column);
            let mut weight = NamedWeight::new(source.name.as_str(), nominal);
            match (batch.has_column(&up), batch.has_column(&down)) {
                (true, true) => {
                    weight = weight.with_variations(batch.column(&up)?.to_vec(), batch.column(&down)?.to_vec());
                }
                (false, false) => {}
                _ => {
                    return Err(Error::Validation(format!(
                        "weight '{}' needs both '{up}' and '{down}' or neither",
                        source.name
                    )));
                }
            }
            ledger.add_weight(weight)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_select::Variation;

    fn batch() -> EventBatch {
        let json = br#"{
            "dataset": "TTToSemiLeptonic",
            "columns": {
                "genWeight": [1.0, -1.0],
                "weight_pileup": [1.1, 0.9],
                "weight_L1Prefiring": [0.98, 0.99],
                "weight_L1Prefiring_up": [0.99, 1.0],
                "weight_L1Prefiring_down": [0.97, 0.98],
                "weight_btagSF": [1.0, 1.0],
                "weight_btagSF_up": [1.1, 1.1]
            }
        }"#;
        EventBatch::from_json_slice(json).unwrap()
    }

    #[test]
    fn registers_nominal_and_variants() {
        let request = CorrectionRequest::default()
            .weight(WeightSource::genweight())
            .weight(WeightSource::new("L1Prefiring"))
            .weight(WeightSource::new("pileup"));
        let mut ledger = WeightLedger::new(2);
        ColumnCorrections.add_weights(&batch(), &SelectedObjects::default(), &request, &mut ledger).unwrap();

        assert_eq!(ledger.names().collect::<Vec<_>>(), vec!["genweight", "L1Prefiring", "pileup"]);
        assert_eq!(ledger.nominal("genweight").unwrap(), &[1.0, -1.0]);
        assert_eq!(ledger.variations(), vec!["L1PrefiringUp".to_string(), "L1PrefiringDown".to_string()]);
        let down = ledger.variation("L1Prefiring", Variation::Down).unwrap();
        approx::assert_relative_eq!(down[0], 0.97 * 1.1);
    }

    #[test]
    fn era_joins_year_and_modifier() {
        assert_eq!(CorrectionRequest::for_era(Year::Y2016, "APV").era, "2016APV");
        assert_eq!(CorrectionRequest::for_era(Year::Y2018, "").era, "2018");
    }

    #[test]
    fn missing_or_half_variants_fail() {
        let mut ledger = WeightLedger::new(2);
        let request = CorrectionRequest::default().weight(WeightSource::new("muonIso"));
        let err = ColumnCorrections.add_weights(&batch(), &SelectedObjects::default(), &request, &mut ledger).unwrap_err();
        assert!(matches!(err, Error::UnknownWeight(ref n) if n.starts_with("muonIso")));

        let request = CorrectionRequest::default().weight(WeightSource::new("btagSF"));
        assert!(matches!(
            ColumnCorrections.add_weights(&batch(), &SelectedObjects::default(), &request, &mut ledger),
            Err(Error::Validation(_))
        ));
        assert!(ledger.is_empty());
    }
}
