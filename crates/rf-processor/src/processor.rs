//! Processor contract and per-batch output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use rf_core::{Error, Merge, Result};
use rf_hist::{HistogramSchema, HistogramSet};
use rf_select::{BatchContext, CutflowStep, EventMode, RegionCatalog};

use crate::batch::EventBatch;
use crate::config::RunConfig;
use crate::lumi::LumiMask;
use crate::working_point::Channel;

/// Everything one batch contributes, for one dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessorOutput {
    /// Sum of generator weights (0 for observed batches).
    pub sumw: f64,
    /// Filled histograms.
    pub histograms: HistogramSet,
    /// Cumulative cutflow.
    #[serde(default)]
    pub cutflow: Vec<CutflowStep>,
    /// Selected per-event columns.
    #[serde(default)]
    pub columns: BTreeMap<String, Vec<f64>>,
}

impl Merge for ProcessorOutput {
    /// Sums `sumw`, histograms and cutflow steps; selected columns are
    /// appended, so their row order follows the merge order.
    fn merge(&mut self, other: Self) -> Result<()> {
        self.sumw.merge(other.sumw)?;
        self.histograms.merge(other.histograms)?;

        if self.cutflow.is_empty() {
            self.cutflow = other.cutflow;
        } else if !other.cutflow.is_empty() {
            if self.cutflow.len() != other.cutflow.len()
                || self.cutflow.iter().zip(&other.cutflow).any(|(a, b)| a.name != b.name)
            {
                return Err(Error::Validation("cannot merge cutflows with different steps".into()));
            }
            for (a, b) in self.cutflow.iter_mut().zip(other.cutflow) {
                a.passed += b.passed;
            }
        }

        if !self.columns.is_empty()
            && !other.columns.is_empty()
            && !self.columns.keys().eq(other.columns.keys())
        {
            return Err(Error::Validation("cannot merge selected columns with different names".into()));
        }
        for (name, values) in other.columns {
            self.columns.entry(name).or_default().extend(values);
        }
        Ok(())
    }
}

/// Per-dataset outputs of one or more batches.
pub type Outputs = BTreeMap<String, ProcessorOutput>;

/// A batch processor.
pub trait Processor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Histograms filled per batch.
    fn schema(&self) -> &HistogramSchema;

    /// Regions of the active channel.
    fn catalog(&self) -> &RegionCatalog;

    /// Process one batch.
    fn process(&self, batch: &EventBatch) -> Result<Outputs>;
}

/// Selections shared by every processor: trigger OR, lumi mask and MET
/// filters, computed once from the run configuration.
#[derive(Debug, Clone)]
pub(crate) struct EventFilters {
    triggers: BTreeMap<Channel, Vec<String>>,
    met_filters_mc: Vec<String>,
    met_filters_data: Vec<String>,
    lumi: Option<LumiMask>,
}

impl EventFilters {
    pub(crate) fn new(config: &RunConfig, lumi: Option<LumiMask>) -> Self {
        let triggers = [Channel::Ele, Channel::Mu]
            .into_iter()
            .map(|ch| (ch, config.triggers.for_channel(ch).to_vec()))
            .collect();
        Self {
            triggers,
            met_filters_mc: config.met_filters.mc.clone(),
            met_filters_data: config.met_filters.data.clone(),
            lumi,
        }
    }

    /// OR over the channel's HLT paths present in the batch.
    pub(crate) fn trigger(&self, batch: &EventBatch, channel: Channel) -> Vec<bool> {
        let paths = self.triggers.get(&channel).map(Vec::as_slice).unwrap_or_default();
        if !paths.iter().any(|p| batch.has_flag(p)) {
            tracing::warn!(channel = %channel, dataset = batch.dataset(), "no configured trigger path in batch");
        }
        batch.any_of(paths)
    }

    /// Certified luminosity blocks; all true for simulated batches.
    pub(crate) fn lumi(&self, batch: &EventBatch) -> Result<Vec<bool>> {
        match (batch.mode(), &self.lumi) {
            (EventMode::Observed, Some(mask)) => {
                mask.apply(batch.column("run")?, batch.column("luminosityBlock")?)
            }
            (EventMode::Observed, None) => {
                tracing::warn!(dataset = batch.dataset(), "no lumi mask configured; accepting every block");
                Ok(vec![true; batch.len()])
            }
            (EventMode::Simulated, _) => Ok(vec![true; batch.len()]),
        }
    }

    /// AND over the mode's MET filters present in the batch.
    pub(crate) fn met_filters(&self, batch: &EventBatch) -> Vec<bool> {
        match batch.mode() {
            EventMode::Simulated => batch.all_of(&self.met_filters_mc),
            EventMode::Observed => batch.all_of(&self.met_filters_data),
        }
    }
}

/// Fresh context for `batch`.
pub(crate) fn context_for(batch: &EventBatch) -> BatchContext {
    BatchContext::new(batch.len(), batch.mode())
}

/// `Σ genWeight` of a simulated batch, 0 otherwise.
pub(crate) fn sum_gen_weight(batch: &EventBatch) -> Result<f64> {
    match batch.mode() {
        EventMode::Simulated => Ok(batch.column(crate::batch::GEN_WEIGHT)?.iter().sum()),
        EventMode::Observed => Ok(0.0),
    }
}
