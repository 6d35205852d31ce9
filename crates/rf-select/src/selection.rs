//! Named per-event boolean masks.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use rf_core::{Error, Result, and_assign, check_len, count_true, weighted_sum};

/// Events remaining after one cumulative cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutflowStep {
    /// Selection applied at this step.
    pub name: String,
    /// Count (or weighted sum) of events passing every cut up to here.
    pub passed: f64,
}

/// Per-batch registry of named selections.
///
/// Masks are registered once; regions then combine any subset of them by
/// name, in any order, without recomputing the underlying columns.
#[derive(Debug, Clone)]
pub struct SelectionRegistry {
    n_events: usize,
    order: Vec<String>,
    masks: HashMap<String, Vec<bool>>,
}

impl SelectionRegistry {
    /// Empty registry for a batch of `n_events` rows.
    pub fn new(n_events: usize) -> Self {
        Self { n_events, order: Vec::new(), masks: HashMap::new() }
    }

    /// Batch length.
    pub fn n_events(&self) -> usize {
        self.n_events
    }

    /// Store `mask` under `name`.
    ///
    /// A second registration of the same name fails and leaves the first
    /// mask untouched.
    pub fn register(&mut self, name: impl Into<String>, mask: Vec<bool>) -> Result<()> {
        let name = name.into();
        if self.masks.contains_key(&name) {
            return Err(Error::DuplicateSelection(name));
        }
        check_len(&name, self.n_events, mask.len())?;
        self.order.push(name.clone());
        self.masks.insert(name, mask);
        Ok(())
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.masks.contains_key(name)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Number of registered selections.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing is registered yet.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Borrow one mask.
    pub fn get(&self, name: &str) -> Result<&[bool]> {
        self.masks
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::UnknownSelection(name.to_string()))
    }

    fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<&[bool]>> {
        names.iter().map(|n| self.get(n.as_ref())).collect()
    }

    /// Elementwise AND of the named masks.
    ///
    /// Every name is resolved before any work is done. An empty list selects
    /// every event.
    pub fn combine<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<bool>> {
        let masks = self.resolve(names)?;
        let mut acc = vec![true; self.n_events];
        for mask in masks {
            and_assign(&mut acc, mask);
        }
        Ok(acc)
    }

    /// Cumulative cutflow over `names` in the given order.
    ///
    /// Step `i` reports the events passing the AND of `names[..=i]`, as a
    /// count or, with `weight`, as a sum of weights (NaN weights count as 0).
    pub fn cutflow<S: AsRef<str>>(
        &self,
        names: &[S],
        weight: Option<&[f64]>,
    ) -> Result<Vec<CutflowStep>> {
        let masks = self.resolve(names)?;
        if let Some(w) = weight {
            check_len("cutflow weight", self.n_events, w.len())?;
        }

        let mut acc = vec![true; self.n_events];
        let mut steps = Vec::with_capacity(masks.len());
        for (name, mask) in names.iter().zip(masks) {
            and_assign(&mut acc, mask);
            let passed = match weight {
                Some(w) => weighted_sum(&acc, w),
                None => count_true(&acc) as f64,
            };
            steps.push(CutflowStep { name: name.as_ref().to_string(), passed });
        }
        Ok(steps)
    }
}
