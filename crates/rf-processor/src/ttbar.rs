//! ttbar control-region processor.
//!
//! Registers a fixed chain of selections, reports the cumulative cutflow in
//! registration order and returns the per-event variables of the events
//! passing all of them.

use std::collections::BTreeMap;

use rf_core::{Result, count_true, restrict};
use rf_hist::HistogramSchema;
use rf_select::{BatchContext, Region, RegionCatalog};

use crate::batch::EventBatch;
use crate::config::RunConfig;
use crate::corrections::{ColumnCorrections, CorrectionProvider, CorrectionRequest, WeightSource};
use crate::lumi::LumiMask;
use crate::objects::{ColumnObjects, ObjectRequest, ObjectSelector};
use crate::processor::{EventFilters, Outputs, Processor, ProcessorOutput, context_for, sum_gen_weight};
use crate::working_point::{Channel, Year};

/// Label of the single control region of each channel.
pub const CONTROL_REGION: &str = "control";

/// Selections in registration (and cutflow) order.
pub const TTBAR_SELECTIONS: [&str; 7] =
    ["trigger", "lumi", "metfilters", "two_bjets", "one_lepton", "deltaR", "notaus"];

const DELTA_R_MIN: f64 = 0.4;

/// Lepton scale factors of a channel.
pub fn lepton_weights(channel: Channel) -> &'static [&'static str] {
    match channel {
        Channel::Ele => &["electronID_wp80noiso", "electronRecoAbove20"],
        Channel::Mu => &["muonId", "muonIso", "muonTriggerIso"],
    }
}

/// Event-level weights; `L1Prefiring` only exists for 2016 and 2017.
pub fn common_weights(year: Year) -> Vec<&'static str> {
    let mut w = vec!["genweight"];
    if year.has_l1_prefiring() {
        w.push("L1Prefiring");
    }
    w.extend(["pileup", "btagSF"]);
    w
}

/// Built-in control regions of both channels.
pub fn default_catalog(year: Year) -> Result<RegionCatalog> {
    let mut builder = RegionCatalog::builder();
    for channel in [Channel::Ele, Channel::Mu] {
        let weights: Vec<&str> = lepton_weights(channel).iter().copied().chain(common_weights(year)).collect();
        builder = builder.region(channel.as_str(), CONTROL_REGION, TTBAR_SELECTIONS, weights);
    }
    builder.build()
}

/// Output variables: `(name, source column)`. Lepton sources depend on the
/// channel.
fn variables(channel: Channel) -> Vec<(String, String)> {
    let lep = channel.lepton();
    let mut vars: Vec<(String, String)> = ["pt", "relIso", "miniIso", "met_mt", "bjet_dr"]
        .iter()
        .map(|q| {
            let name = match *q {
                "relIso" => "lep_reliso".to_string(),
                "miniIso" => "lep_miniso".to_string(),
                other => format!("lep_{other}"),
            };
            (name, format!("{lep}_{q}"))
        })
        .collect();
    vars.extend(["met", "met_phi", "jet_pt", "jet_eta", "jet_phi"].iter().map(|v| (v.to_string(), v.to_string())));
    vars
}

/// ttbar control-region processor.
pub struct TTBarControlRegionProcessor {
    channel: Channel,
    year: Year,
    filters: EventFilters,
    catalog: RegionCatalog,
    schema: HistogramSchema,
    objects: ObjectRequest,
    corrections: CorrectionRequest,
    selector: Box<dyn ObjectSelector>,
    provider: Box<dyn CorrectionProvider>,
}

impl TTBarControlRegionProcessor {
    /// Build from a run configuration and an already loaded lumi mask.
    pub fn new(config: &RunConfig, lumi: Option<LumiMask>) -> Result<Self> {
        let catalog = match config.region_override()? {
            Some(catalog) => catalog,
            None => default_catalog(config.year)?,
        };
        catalog.region(config.channel.as_str(), CONTROL_REGION)?;

        let wp = config.working_points();
        let objects = variables(config.channel)
            .iter()
            .fold(ObjectRequest::new(wp.electron_id, wp.muon_id), |r, (name, source)| r.renamed(name, source));
        let corrections = common_weights(config.year)
            .into_iter()
            .chain(lepton_weights(config.channel).iter().copied())
            .fold(CorrectionRequest::for_era(config.year, &config.yearmod), |req, name| match name {
                "genweight" => req.weight(WeightSource::genweight()),
                _ => req.weight(WeightSource::new(name)),
            });

        Ok(Self {
            channel: config.channel,
            year: config.year,
            filters: EventFilters::new(config, lumi),
            catalog,
            schema: HistogramSchema::new(),
            objects,
            corrections,
            selector: Box::new(ColumnObjects),
            provider: Box::new(ColumnCorrections),
        })
    }

    /// Replace the column-backed collaborators.
    pub fn with_collaborators(
        mut self,
        selector: Box<dyn ObjectSelector>,
        provider: Box<dyn CorrectionProvider>,
    ) -> Self {
        self.selector = selector;
        self.provider = provider;
        self
    }

    /// Per-factor columns for the region's weights, plus the lepton and
    /// common partial products.
    fn weight_columns(&self, ctx: &BatchContext, region: &Region) -> Result<BTreeMap<String, Vec<f64>>> {
        let mut out = BTreeMap::new();
        for name in &region.weights {
            out.insert(format!("{name}_weight"), ctx.weights.partial(&[name.as_str()])?);
        }
        let lepton_names = lepton_weights(self.channel);
        let (lepton, common): (Vec<&str>, Vec<&str>) =
            region.weights.iter().map(String::as_str).partition(|w| lepton_names.iter().any(|l| l == w));
        out.insert("common_weight".to_string(), ctx.weights.partial(&common)?);
        out.insert("lepton_weight".to_string(), ctx.weights.partial(&lepton)?);
        Ok(out)
    }
}

impl Processor for TTBarControlRegionProcessor {
    fn name(&self) -> &'static str {
        "ttbar"
    }

    fn schema(&self) -> &HistogramSchema {
        &self.schema
    }

    fn catalog(&self) -> &RegionCatalog {
        &self.catalog
    }

    fn process(&self, batch: &EventBatch) -> Result<Outputs> {
        let mut ctx = context_for(batch);
        let objects = self.selector.select(batch, &self.objects)?;
        let simulated = ctx.mode().is_simulated();
        if simulated {
            self.provider.add_weights(batch, &objects, &self.corrections, &mut ctx.weights)?;
        }

        let one_lepton: Vec<bool> = objects
            .n_muons
            .iter()
            .zip(&objects.n_electrons)
            .map(|(&m, &e)| match self.channel {
                Channel::Ele => m == 0 && e == 1,
                Channel::Mu => m == 1 && e == 0,
            })
            .collect();
        let sel = &mut ctx.selections;
        sel.register("trigger", self.filters.trigger(batch, self.channel))?;
        sel.register("lumi", self.filters.lumi(batch)?)?;
        sel.register("metfilters", self.filters.met_filters(batch))?;
        sel.register("two_bjets", objects.n_bjets.iter().map(|&n| n >= 2).collect())?;
        sel.register("one_lepton", one_lepton)?;
        sel.register("deltaR", objects.quantity("lep_bjet_dr")?.iter().map(|&dr| dr > DELTA_R_MIN).collect())?;
        sel.register("notaus", objects.n_taus.iter().map(|&n| n == 0).collect())?;

        let region = self.catalog.region(self.channel.as_str(), CONTROL_REGION)?;
        let scale = ctx.region_scale(region)?;
        let cutflow = ctx.selections.cutflow(ctx.selections.names(), Some(scale.as_slice()))?;

        let mask = ctx.selections.combine(&region.selections)?;
        let selected = count_true(&mask);
        let primary = self.channel.primary_dataset(self.year);
        let wanted = simulated || batch.dataset().contains(primary);

        let mut columns = BTreeMap::new();
        if wanted && selected > 0 {
            for (name, values) in &objects.quantities {
                columns.insert(name.clone(), restrict(values, &mask));
            }
            if simulated {
                for (name, values) in self.weight_columns(&ctx, region)? {
                    columns.insert(name, restrict(&values, &mask));
                }
            }
        } else {
            tracing::debug!(dataset = batch.dataset(), selected, wanted, "no columns kept");
        }

        tracing::info!(
            processor = self.name(),
            dataset = batch.dataset(),
            events = batch.len(),
            simulated,
            selected,
            "batch processed"
        );
        let output = ProcessorOutput { sumw: sum_gen_weight(batch)?, histograms: self.schema.build(), cutflow, columns };
        let mut outputs = Outputs::new();
        outputs.insert(batch.dataset().to_string(), output);
        Ok(outputs)
    }
}

impl std::fmt::Debug for TTBarControlRegionProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TTBarControlRegionProcessor")
            .field("channel", &self.channel)
            .field("year", &self.year)
            .finish_non_exhaustive()
    }
}
