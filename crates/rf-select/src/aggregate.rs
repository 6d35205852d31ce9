//! Region aggregation: mask, scale and fill.
//!
//! For one `(channel, label)` the combined selection mask and the region
//! scale are evaluated over the whole batch, then every [`FillSpec`] of the
//! [`FillPlan`] fills its sink with the masked axis quantities. All names
//! are resolved before the first fill, so a configuration error never
//! leaves a half-filled histogram set behind.

use serde::{Deserialize, Serialize};

use rf_core::{Error, Result, count_true, restrict};
use rf_hist::HistogramSet;

use crate::context::{BatchContext, EventMode};
use crate::region::RegionCatalog;

/// Source of the values filled along one histogram axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    /// A per-event quantity registered in the [`BatchContext`].
    Column(String),
    /// The partial product of the named weight factors.
    PartialWeight(Vec<String>),
}

impl Quantity {
    /// Shorthand for [`Quantity::Column`].
    pub fn column(name: impl Into<String>) -> Self {
        Quantity::Column(name.into())
    }

    /// Shorthand for a single-factor [`Quantity::PartialWeight`].
    pub fn weight(name: impl Into<String>) -> Self {
        Quantity::PartialWeight(vec![name.into()])
    }

    fn evaluate(&self, ctx: &BatchContext) -> Result<Vec<f64>> {
        match self {
            Quantity::Column(name) => ctx.quantity(name).map(<[f64]>::to_vec),
            Quantity::PartialWeight(names) => ctx.weights.partial(names),
        }
    }
}

/// How one sink is filled for every region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillSpec {
    /// Target histogram name.
    pub histogram: String,
    /// `(axis name, source)` pairs; every axis of the sink needs one.
    pub axes: Vec<(String, Quantity)>,
    /// Fill with the region scale (`true`) or unit weight (`false`).
    pub weighted: bool,
    /// Skip this sink for observed batches.
    pub simulated_only: bool,
}

impl FillSpec {
    /// Weighted fill of `histogram`, active in every mode.
    pub fn new(histogram: impl Into<String>) -> Self {
        Self { histogram: histogram.into(), axes: Vec::new(), weighted: true, simulated_only: false }
    }

    /// Bind an axis to a quantity.
    pub fn axis(mut self, axis: impl Into<String>, quantity: Quantity) -> Self {
        self.axes.push((axis.into(), quantity));
        self
    }

    /// Bind an axis to the quantity of the same name.
    pub fn column(self, axis: &str) -> Self {
        self.axis(axis, Quantity::column(axis))
    }

    /// Fill with unit weight.
    pub fn unweighted(mut self) -> Self {
        self.weighted = false;
        self
    }

    /// Only fill simulated batches.
    pub fn simulated_only(mut self) -> Self {
        self.simulated_only = true;
        self
    }

    fn is_active(&self, mode: EventMode) -> bool {
        !self.simulated_only || mode.is_simulated()
    }
}

/// Ordered list of fills performed for every region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FillPlan {
    specs: Vec<FillSpec>,
}

impl FillPlan {
    /// Empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fill.
    pub fn fill(mut self, spec: FillSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Fills in plan order.
    pub fn specs(&self) -> &[FillSpec] {
        &self.specs
    }
}

/// What one region contributed to the sinks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    /// Region label.
    pub label: String,
    /// Events passing the combined selection.
    pub selected: usize,
    /// Sum of the region scale over the selected events.
    pub sum_weight: f64,
}

struct ResolvedFill<'a> {
    histogram: &'a str,
    values: Vec<Vec<f64>>,
    weighted: bool,
}

fn resolve<'a>(
    ctx: &BatchContext,
    plan: &'a FillPlan,
    sinks: &HistogramSet,
    mask: &[bool],
) -> Result<Vec<ResolvedFill<'a>>> {
    let mut resolved = Vec::new();
    for spec in plan.specs().iter().filter(|s| s.is_active(ctx.mode())) {
        let sink = sinks
            .get(&spec.histogram)
            .ok_or_else(|| Error::UnknownHistogram(spec.histogram.clone()))?;
        let mut values = Vec::with_capacity(sink.axes().len());
        for axis in sink.axes() {
            let (_, quantity) =
                spec.axes.iter().find(|(name, _)| name == axis.name()).ok_or_else(|| {
                    Error::Histogram(format!(
                        "fill of '{}' binds no quantity to axis '{}'",
                        spec.histogram,
                        axis.name()
                    ))
                })?;
            values.push(restrict(&quantity.evaluate(ctx)?, mask));
        }
        if let Some((extra, _)) =
            spec.axes.iter().find(|(name, _)| !sink.axes().iter().any(|a| a.name() == name))
        {
            return Err(Error::Histogram(format!(
                "fill of '{}' binds unknown axis '{extra}'",
                spec.histogram
            )));
        }
        resolved.push(ResolvedFill { histogram: &spec.histogram, values, weighted: spec.weighted });
    }
    Ok(resolved)
}

fn aggregate_inner(
    ctx: &BatchContext,
    catalog: &RegionCatalog,
    channel: &str,
    label: &str,
    plan: &FillPlan,
    sinks: &mut HistogramSet,
) -> Result<RegionSummary> {
    let region = catalog.region(channel, label)?;
    let mask = ctx.selections.combine(&region.selections)?;
    let scale = restrict(&ctx.region_scale(region)?, &mask);
    let fills = resolve(ctx, plan, sinks, &mask)?;

    for fill in &fills {
        let columns: Vec<&[f64]> = fill.values.iter().map(Vec::as_slice).collect();
        let weight = fill.weighted.then_some(scale.as_slice());
        sinks.get_mut(fill.histogram)?.fill(label, &columns, weight)?;
    }

    let summary = RegionSummary {
        label: label.to_string(),
        selected: count_true(&mask),
        sum_weight: scale.iter().sum(),
    };
    tracing::debug!(
        channel,
        region = label,
        selected = summary.selected,
        sum_weight = summary.sum_weight,
        histograms = fills.len(),
        "region filled"
    );
    Ok(summary)
}

/// Fill every sink of `plan` for one region.
///
/// Errors are wrapped in [`Error::Region`] with the channel and label.
pub fn aggregate_region(
    ctx: &BatchContext,
    catalog: &RegionCatalog,
    channel: &str,
    label: &str,
    plan: &FillPlan,
    sinks: &mut HistogramSet,
) -> Result<RegionSummary> {
    aggregate_inner(ctx, catalog, channel, label, plan, sinks)
        .map_err(|e| e.in_region(channel, label))
}

/// Run [`aggregate_region`] for every region of `channel`, in catalog order.
pub fn aggregate_channel(
    ctx: &BatchContext,
    catalog: &RegionCatalog,
    channel: &str,
    plan: &FillPlan,
    sinks: &mut HistogramSet,
) -> Result<Vec<RegionSummary>> {
    catalog
        .regions(channel)?
        .iter()
        .map(|region| aggregate_region(ctx, catalog, channel, &region.label, plan, sinks))
        .collect()
}
