//! Named per-event weight factors.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use rf_core::{Error, Result, check_len};

/// Direction of a systematic variation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variation {
    /// +1σ
    Up,
    /// −1σ
    Down,
}

impl Variation {
    /// Tag suffix (`"Up"` / `"Down"`).
    pub fn suffix(self) -> &'static str {
        match self {
            Variation::Up => "Up",
            Variation::Down => "Down",
        }
    }
}

/// One multiplicative contribution to the per-event weight.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedWeight {
    /// Weight source name.
    pub name: String,
    /// Nominal per-event factor.
    pub nominal: Vec<f64>,
    /// +1σ variant, if provided.
    pub up: Option<Vec<f64>>,
    /// −1σ variant, if provided.
    pub down: Option<Vec<f64>>,
}

impl NamedWeight {
    /// Factor without variants.
    pub fn new(name: impl Into<String>, nominal: Vec<f64>) -> Self {
        Self { name: name.into(), nominal, up: None, down: None }
    }

    /// Attach up/down variants.
    pub fn with_variations(mut self, up: Vec<f64>, down: Vec<f64>) -> Self {
        self.up = Some(up);
        self.down = Some(down);
        self
    }

    fn variant(&self, variation: Variation) -> Option<&[f64]> {
        match variation {
            Variation::Up => self.up.as_deref(),
            Variation::Down => self.down.as_deref(),
        }
    }
}

/// Per-batch ledger of weight factors.
///
/// The running total is updated on every [`WeightLedger::add`]. Negative
/// and non-finite factors are stored as given; NaN propagates into every
/// product that includes it.
#[derive(Debug, Clone)]
pub struct WeightLedger {
    n_events: usize,
    factors: Vec<NamedWeight>,
    total: Vec<f64>,
}

impl WeightLedger {
    /// Empty ledger for a batch of `n_events` rows (total weight = 1).
    pub fn new(n_events: usize) -> Self {
        Self { n_events, factors: Vec::new(), total: vec![1.0; n_events] }
    }

    /// Batch length.
    pub fn n_events(&self) -> usize {
        self.n_events
    }

    /// Add a factor with optional up/down variants.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        nominal: Vec<f64>,
        up: Option<Vec<f64>>,
        down: Option<Vec<f64>>,
    ) -> Result<()> {
        self.add_weight(NamedWeight { name: name.into(), nominal, up, down })
    }

    /// Add a prepared [`NamedWeight`].
    pub fn add_weight(&mut self, weight: NamedWeight) -> Result<()> {
        if self.contains(&weight.name) {
            return Err(Error::DuplicateWeight(weight.name));
        }
        check_len(&weight.name, self.n_events, weight.nominal.len())?;
        if let Some(up) = &weight.up {
            check_len(&format!("{}Up", weight.name), self.n_events, up.len())?;
        }
        if let Some(down) = &weight.down {
            check_len(&format!("{}Down", weight.name), self.n_events, down.len())?;
        }

        for (t, w) in self.total.iter_mut().zip(&weight.nominal) {
            *t *= w;
        }
        tracing::trace!(name = %weight.name, "weight added");
        self.factors.push(weight);
        Ok(())
    }

    /// Whether `name` was added.
    pub fn contains(&self, name: &str) -> bool {
        self.factors.iter().any(|f| f.name == name)
    }

    /// Factor names, in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factors.iter().map(|f| f.name.as_str())
    }

    /// Number of factors.
    pub fn len(&self) -> usize {
        self.factors.len()
    }

    /// Whether no factor was added.
    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    /// Nominal array of one factor.
    pub fn nominal(&self, name: &str) -> Result<&[f64]> {
        self.factor(name).map(|f| f.nominal.as_slice())
    }

    fn factor(&self, name: &str) -> Result<&NamedWeight> {
        self.factors
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| Error::UnknownWeight(name.to_string()))
    }

    /// Product of every nominal factor.
    pub fn total(&self) -> &[f64] {
        &self.total
    }

    /// Product of the named subset of nominal factors.
    ///
    /// `names` is a set: repeated names are counted once. Every name must
    /// be registered.
    pub fn partial<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<f64>> {
        if let Some(missing) = names.iter().map(|n| n.as_ref()).find(|n| !self.contains(n)) {
            return Err(Error::UnknownWeight(missing.to_string()));
        }
        let wanted: HashSet<&str> = names.iter().map(|n| n.as_ref()).collect();

        // Registration order, so `partial(all) == total()` exactly.
        let mut out = vec![1.0; self.n_events];
        for factor in self.factors.iter().filter(|f| wanted.contains(f.name.as_str())) {
            for (o, w) in out.iter_mut().zip(&factor.nominal) {
                *o *= w;
            }
        }
        Ok(out)
    }

    /// Total weight with factor `name` replaced by its variant.
    ///
    /// Falls back to the nominal factor when it has no such variant.
    pub fn variation(&self, name: &str, variation: Variation) -> Result<Vec<f64>> {
        self.factor(name)?;
        let mut out = vec![1.0; self.n_events];
        for factor in &self.factors {
            let values = if factor.name == name {
                factor.variant(variation).unwrap_or(factor.nominal.as_slice())
            } else {
                factor.nominal.as_slice()
            };
            for (o, w) in out.iter_mut().zip(values) {
                *o *= w;
            }
        }
        Ok(out)
    }

    /// Available variation tags (`"<name>Up"`, `"<name>Down"`).
    pub fn variations(&self) -> Vec<String> {
        let mut tags = Vec::new();
        for factor in &self.factors {
            for v in [Variation::Up, Variation::Down] {
                if factor.variant(v).is_some() {
                    tags.push(format!("{}{}", factor.name, v.suffix()));
                }
            }
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn ledger() -> WeightLedger {
        let mut w = WeightLedger::new(3);
        w.add("genweight", vec![1.0, -1.0, 1.0], None, None).unwrap();
        w.add("pileup", vec![1.1, 0.9, 1.0], None, None).unwrap();
        w.add("L1Prefiring", vec![0.98, 0.99, 1.0], Some(vec![0.99, 1.0, 1.0]), Some(vec![0.97, 0.98, 1.0]))
            .unwrap();
        w
    }

    #[test]
    fn empty_ledger_total_is_one() {
        let w = WeightLedger::new(4);
        assert_eq!(w.total(), &[1.0; 4]);
        assert!(w.is_empty());
        assert_eq!(w.partial::<&str>(&[]).unwrap(), vec![1.0; 4]);
    }

    #[test]
    fn total_is_product_of_nominals() {
        let w = ledger();
        let t = w.total();
        assert_relative_eq!(t[0], 1.0 * 1.1 * 0.98);
        assert_relative_eq!(t[1], -1.0 * 0.9 * 0.99);
        assert_relative_eq!(t[2], 1.0);
    }

    #[test]
    fn partial_of_everything_is_total() {
        let w = ledger();
        assert_eq!(w.partial(&["L1Prefiring", "genweight", "pileup"]).unwrap(), w.total());
    }

    #[test]
    fn partial_subset_and_repeats() {
        let w = ledger();
        assert_eq!(w.partial(&["pileup"]).unwrap(), vec![1.1, 0.9, 1.0]);
        assert_eq!(w.partial(&["pileup", "pileup"]).unwrap(), vec![1.1, 0.9, 1.0]);
        let err = w.partial(&["pileup", "btagSF"]).unwrap_err();
        assert!(matches!(err, Error::UnknownWeight(ref n) if n == "btagSF"));
    }

    #[test]
    fn first_missing_name_is_reported() {
        let w = ledger();
        for _ in 0..8 {
            let err = w.partial(&["muonIso", "pileup", "btagSF", "electronID"]).unwrap_err();
            assert!(matches!(err, Error::UnknownWeight(ref n) if n == "muonIso"));
        }
    }

    #[test]
    fn duplicate_and_length_checks() {
        let mut w = ledger();
        assert!(matches!(
            w.add("pileup", vec![1.0; 3], None, None).unwrap_err(),
            Error::DuplicateWeight(_)
        ));
        assert!(matches!(
            w.add("btagSF", vec![1.0; 2], None, None).unwrap_err(),
            Error::LengthMismatch { .. }
        ));
        assert!(matches!(
            w.add("btagSF", vec![1.0; 3], Some(vec![1.0]), None).unwrap_err(),
            Error::LengthMismatch { .. }
        ));
        assert_eq!(w.len(), 3);
    }

    #[test]
    fn nan_propagates_without_error() {
        let mut w = WeightLedger::new(2);
        w.add("pileup", vec![f64::NAN, 1.0], None, None).unwrap();
        w.add("btagSF", vec![2.0, 2.0], None, None).unwrap();
        assert!(w.total()[0].is_nan());
        assert_eq!(w.total()[1], 2.0);
        assert_eq!(w.partial(&["btagSF"]).unwrap(), vec![2.0, 2.0]);
    }

    #[test]
    fn variations_replace_one_factor() {
        let w = ledger();
        assert_eq!(w.variations(), vec!["L1PrefiringUp".to_string(), "L1PrefiringDown".to_string()]);
        let up = w.variation("L1Prefiring", Variation::Up).unwrap();
        assert_relative_eq!(up[0], 1.0 * 1.1 * 0.99);
        // No variant stored: nominal.
        assert_eq!(w.variation("pileup", Variation::Down).unwrap(), w.total());
        assert!(w.variation("btagSF", Variation::Up).is_err());
    }

    proptest! {
        #[test]
        fn prop_total_independent_of_registration_order(
            factors in proptest::collection::vec(proptest::collection::vec(0.0f64..2.0, 8), 3..6),
        ) {
            let mut forward = WeightLedger::new(8);
            let mut backward = WeightLedger::new(8);
            for (i, f) in factors.iter().enumerate() {
                forward.add(format!("w{i}"), f.clone(), None, None).unwrap();
            }
            for (i, f) in factors.iter().enumerate().rev() {
                backward.add(format!("w{i}"), f.clone(), None, None).unwrap();
            }
            for row in 0..8 {
                let expected: f64 = factors.iter().map(|f| f[row]).product();
                for got in [forward.total()[row], backward.total()[row]] {
                    prop_assert!((got - expected).abs() <= 1e-12 * (1.0 + expected.abs()));
                }
            }
            let names: Vec<String> = (0..factors.len()).map(|i| format!("w{i}")).collect();
            prop_assert_eq!(forward.partial(&names).unwrap(), forward.total());
        }
    }
}
