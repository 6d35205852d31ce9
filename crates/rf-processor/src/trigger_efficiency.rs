//! Trigger-efficiency processor.
//!
//! Fills kinematic and weight-monitor histograms for a numerator region
//! (reference trigger and measured trigger) and a denominator region
//! (reference trigger only). The efficiency itself is computed downstream.

use std::collections::BTreeMap;

use rf_core::{Error, Result};
use rf_hist::{Axis, HistogramSchema, Storage};
use rf_select::{EfficiencyPair, FillPlan, FillSpec, Quantity, RegionCatalog, aggregate_channel};

use crate::batch::EventBatch;
use crate::config::RunConfig;
use crate::corrections::{ColumnCorrections, CorrectionProvider, CorrectionRequest, WeightSource};
use crate::lumi::LumiMask;
use crate::objects::{ColumnObjects, ObjectRequest, ObjectSelector};
use crate::processor::{EventFilters, Outputs, Processor, ProcessorOutput, context_for, sum_gen_weight};
use crate::working_point::{Channel, WorkingPoints, Year};

const PT_EDGES: [f64; 10] = [30.0, 60.0, 90.0, 120.0, 150.0, 180.0, 210.0, 240.0, 300.0, 500.0];
const MET_EDGES: [f64; 9] = [50.0, 75.0, 100.0, 125.0, 150.0, 175.0, 200.0, 300.0, 500.0];

const KINEMATICS: [&str; 13] = [
    "electron_pt",
    "electron_relIso",
    "electron_eta",
    "muon_pt",
    "muon_relIso",
    "muon_eta",
    "jet_pt",
    "jet_eta",
    "met",
    "electron_met_mt",
    "muon_met_mt",
    "electron_bjet_dr",
    "muon_bjet_dr",
];

/// Minimum lepton–b-jet separation in the muon channel.
const DELTA_R_MIN: f64 = 0.4;

/// Histograms filled by [`TriggerEfficiencyProcessor`].
pub fn trigger_efficiency_schema() -> Result<HistogramSchema> {
    let weight_axis = |name: &str| Axis::regular(25, 0.0, 2.0, name, name);
    HistogramSchema::new()
        .histogram(
            "electron_kin",
            Storage::Weight,
            vec![
                Axis::variable("electron_pt", "electron pT [GeV]", PT_EDGES.to_vec()),
                Axis::regular(25, 0.0, 1.0, "electron_relIso", "electron RelIso"),
                Axis::regular(50, -2.4, 2.4, "electron_eta", "electron eta"),
            ],
        )?
        .histogram(
            "muon_kin",
            Storage::Weight,
            vec![
                Axis::variable("muon_pt", "muon pT [GeV]", PT_EDGES.to_vec()),
                Axis::regular(25, 0.0, 1.0, "muon_relIso", "muon RelIso"),
                Axis::regular(50, -2.4, 2.4, "muon_eta", "muon eta"),
            ],
        )?
        .histogram(
            "jet_kin",
            Storage::Weight,
            vec![
                Axis::variable("jet_pt", "bJet pT [GeV]", PT_EDGES.to_vec()),
                Axis::regular(50, -2.4, 2.4, "jet_eta", "bJet eta"),
            ],
        )?
        .histogram("met_kin", Storage::Weight, vec![Axis::variable("met", "MET [GeV]", MET_EDGES.to_vec())])?
        .histogram(
            "mix_kin",
            Storage::Weight,
            vec![
                Axis::regular(40, 10.0, 800.0, "electron_met_mt", "MT(electron, MET) [GeV]"),
                Axis::regular(40, 10.0, 800.0, "muon_met_mt", "MT(muon, MET) [GeV]"),
                Axis::regular(30, 0.0, 5.0, "electron_bjet_dr", "dR(electron, bJet)"),
                Axis::regular(30, 0.0, 5.0, "muon_bjet_dr", "dR(muon, bJet)"),
            ],
        )?
        .histogram("common_weights", Storage::Double, vec![weight_axis("pileup"), weight_axis("btagSF")])?
        .histogram(
            "electron_weights",
            Storage::Double,
            vec![weight_axis("electronID"), weight_axis("electronReco"), weight_axis("electronTrigger")],
        )?
        .histogram(
            "muon_weights",
            Storage::Double,
            vec![weight_axis("muonId"), weight_axis("muonIso"), weight_axis("muonTriggerIso")],
        )
}

fn fill_plan() -> FillPlan {
    let monitor = |histogram: &str, weights: &[&str]| {
        weights
            .iter()
            .fold(FillSpec::new(histogram), |spec, w| spec.axis(*w, Quantity::weight(*w)))
            .unweighted()
            .simulated_only()
    };
    FillPlan::new()
        .fill(FillSpec::new("jet_kin").column("jet_pt").column("jet_eta"))
        .fill(FillSpec::new("met_kin").column("met"))
        .fill(FillSpec::new("electron_kin").column("electron_pt").column("electron_relIso").column("electron_eta"))
        .fill(FillSpec::new("muon_kin").column("muon_pt").column("muon_relIso").column("muon_eta"))
        .fill(
            FillSpec::new("mix_kin")
                .column("electron_met_mt")
                .column("muon_met_mt")
                .column("electron_bjet_dr")
                .column("muon_bjet_dr"),
        )
        .fill(monitor("common_weights", &["pileup", "btagSF"]))
        .fill(monitor("electron_weights", &["electronID", "electronReco", "electronTrigger"]))
        .fill(monitor("muon_weights", &["muonId", "muonIso", "muonTriggerIso"]))
}

fn base_weights(year: Year) -> Vec<&'static str> {
    let mut w = vec!["genweight"];
    if year.has_l1_prefiring() {
        w.push("L1Prefiring");
    }
    w.extend(["pileup", "btagSF", "electronID", "electronReco", "muonId", "muonIso"]);
    w
}

fn correction_request(year: Year, yearmod: &str) -> CorrectionRequest {
    base_weights(year)
        .into_iter()
        .chain(["electronTrigger", "muonTriggerIso"])
        .fold(CorrectionRequest::for_era(year, yearmod), |req, name| match name {
            "genweight" => req.weight(WeightSource::genweight()),
            _ => req.weight(WeightSource::new(name)),
        })
}

/// Built-in numerator/denominator regions of both channels.
///
/// The denominator requires the other channel's (reference) trigger and
/// carries its trigger scale factor; the numerator adds the measured trigger
/// and its scale factor.
pub fn default_catalog(year: Year, enforce_isolation: bool) -> Result<RegionCatalog> {
    let mut builder = RegionCatalog::builder();
    for channel in [Channel::Ele, Channel::Mu] {
        let (measured, reference, measured_sf, reference_sf) = match channel {
            Channel::Ele => ("trigger_ele", "trigger_mu", "electronTrigger", "muonTriggerIso"),
            Channel::Mu => ("trigger_mu", "trigger_ele", "muonTriggerIso", "electronTrigger"),
        };
        let mut denominator =
            vec!["lumi", "metfilters", "two_bjets", "one_lepton", reference, "good_electron", "good_muon", "deltaR"];
        if enforce_isolation {
            denominator.extend(["electronIso", "muonIso"]);
        }
        let mut numerator = denominator.clone();
        numerator.insert(4, measured);

        let mut den_weights = base_weights(year);
        den_weights.push(reference_sf);
        let mut num_weights = den_weights.clone();
        num_weights.push(measured_sf);

        builder = builder
            .region(channel.as_str(), "numerator", numerator, num_weights)
            .region(channel.as_str(), "denominator", denominator, den_weights)
            .efficiency_pair(
                channel.as_str(),
                EfficiencyPair {
                    numerator: "numerator".into(),
                    denominator: "denominator".into(),
                    trigger_selections: vec![measured.into()],
                    trigger_weights: vec![measured_sf.into()],
                },
            );
    }
    builder.build()
}

/// Trigger-efficiency numerator/denominator processor.
pub struct TriggerEfficiencyProcessor {
    channel: Channel,
    working_points: WorkingPoints,
    enforce_isolation: bool,
    filters: EventFilters,
    catalog: RegionCatalog,
    schema: HistogramSchema,
    plan: FillPlan,
    objects: ObjectRequest,
    corrections: CorrectionRequest,
    selector: Box<dyn ObjectSelector>,
    provider: Box<dyn CorrectionProvider>,
}

impl TriggerEfficiencyProcessor {
    /// Build from a run configuration and an already loaded lumi mask.
    pub fn new(config: &RunConfig, lumi: Option<LumiMask>) -> Result<Self> {
        let catalog = match config.region_override()? {
            Some(catalog) => catalog,
            None => default_catalog(config.year, config.enforce_isolation)?,
        };
        let channel = config.channel.as_str();
        catalog.regions(channel)?;
        if catalog.efficiency_pair(channel).is_none() {
            return Err(Error::InvalidRegion(format!(
                "channel '{channel}' declares no numerator/denominator efficiency pair"
            )));
        }
        let working_points = config.working_points();
        let objects = KINEMATICS
            .iter()
            .fold(ObjectRequest::new(working_points.electron_id, working_points.muon_id), |r, q| r.quantity(q));
        Ok(Self {
            channel: config.channel,
            working_points,
            enforce_isolation: config.enforce_isolation,
            filters: EventFilters::new(config, lumi),
            catalog,
            schema: trigger_efficiency_schema()?,
            plan: fill_plan(),
            objects,
            corrections: correction_request(config.year, &config.yearmod),
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

    /// Fill plan applied to every region.
    pub fn plan(&self) -> &FillPlan {
        &self.plan
    }
}

impl Processor for TriggerEfficiencyProcessor {
    fn name(&self) -> &'static str {
        "trigger_efficiency"
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

        let sel = &mut ctx.selections;
        sel.register("trigger_ele", self.filters.trigger(batch, Channel::Ele))?;
        sel.register("trigger_mu", self.filters.trigger(batch, Channel::Mu))?;
        sel.register("lumi", self.filters.lumi(batch)?)?;
        sel.register("metfilters", self.filters.met_filters(batch))?;
        sel.register("two_bjets", objects.n_bjets.iter().map(|&n| n >= 1).collect())?;
        sel.register(
            "one_lepton",
            objects.n_muons.iter().zip(&objects.n_electrons).map(|(&m, &e)| m == 1 && e == 1).collect(),
        )?;
        sel.register("good_electron", objects.good_electron.clone())?;
        sel.register("good_muon", objects.good_muon.clone())?;
        let delta_r = match self.channel {
            Channel::Mu => objects.quantity("muon_bjet_dr")?.iter().map(|&dr| dr > DELTA_R_MIN).collect(),
            Channel::Ele => vec![true; batch.len()],
        };
        sel.register("deltaR", delta_r)?;
        if self.enforce_isolation {
            let iso = self.working_points.isolation;
            sel.register("electronIso", objects.quantity("electron_relIso")?.iter().map(|&r| iso.passes(r)).collect())?;
            sel.register("muonIso", objects.quantity("muon_relIso")?.iter().map(|&r| iso.passes(r)).collect())?;
        }

        if ctx.mode().is_simulated() {
            self.provider.add_weights(batch, &objects, &self.corrections, &mut ctx.weights)?;
        }
        for (name, values) in objects.quantities {
            ctx.add_quantity(name, values)?;
        }

        let channel = self.channel.as_str();
        let mut histograms = self.schema.build();
        let summaries = aggregate_channel(&ctx, &self.catalog, channel, &self.plan, &mut histograms)?;

        let pair = self
            .catalog
            .efficiency_pair(channel)
            .ok_or_else(|| Error::InvalidRegion(format!("channel '{channel}' has no efficiency pair")))?;
        let numerator = self.catalog.region(channel, &pair.numerator)?;
        let scale = ctx.region_scale(numerator)?;
        let cutflow = ctx.selections.cutflow(&numerator.selections, Some(scale.as_slice()))?;

        let output = ProcessorOutput {
            sumw: sum_gen_weight(batch)?,
            histograms,
            cutflow,
            columns: BTreeMap::new(),
        };
        tracing::info!(
            processor = self.name(),
            dataset = batch.dataset(),
            events = batch.len(),
            simulated = ctx.mode().is_simulated(),
            regions = summaries.len(),
            "batch processed"
        );

        let mut outputs = Outputs::new();
        outputs.insert(batch.dataset().to_string(), output);
        Ok(outputs)
    }
}

impl std::fmt::Debug for TriggerEfficiencyProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerEfficiencyProcessor")
            .field("channel", &self.channel)
            .field("working_points", &self.working_points)
            .field("enforce_isolation", &self.enforce_isolation)
            .finish_non_exhaustive()
    }
}
