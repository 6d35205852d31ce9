#![allow(dead_code)]

use std::collections::BTreeMap;

use rf_processor::{EventBatch, ProcessorKind, RunConfig, TriggerPaths, Year, Channel, MetFilters};

/// Column-wise batch builder for tests.
#[derive(Default)]
pub struct BatchBuilder {
    dataset: String,
    columns: BTreeMap<String, Vec<f64>>,
    flags: BTreeMap<String, Vec<bool>>,
}

impl BatchBuilder {
    pub fn new(dataset: &str) -> Self {
        Self { dataset: dataset.to_string(), ..Default::default() }
    }

    pub fn column(mut self, name: &str, values: &[f64]) -> Self {
        self.columns.insert(name.to_string(), values.to_vec());
        self
    }

    pub fn fill(self, name: &str, value: f64, n: usize) -> Self {
        self.column(name, &vec![value; n])
    }

    pub fn flag(mut self, name: &str, values: &[bool]) -> Self {
        self.flags.insert(name.to_string(), values.to_vec());
        self
    }

    pub fn build(self) -> EventBatch {
        EventBatch::new(self.dataset, self.columns, self.flags).unwrap()
    }
}

pub fn config(processor: ProcessorKind, year: Year, channel: Channel) -> RunConfig {
    let mut cfg = RunConfig::new(processor, year, channel);
    cfg.triggers = TriggerPaths {
        ele: vec!["HLT_Ele35_WPTight_Gsf".into(), "HLT_Photon200".into()],
        mu: vec!["HLT_IsoMu27".into()],
    };
    cfg.met_filters = MetFilters {
        mc: vec!["Flag_goodVertices".into()],
        data: vec!["Flag_goodVertices".into(), "Flag_eeBadScFilter".into()],
    };
    cfg
}

pub const KINEMATICS: [(&str, f64); 12] = [
    ("electron_pt", 45.0),
    ("Electron_pfRelIso04_all", 0.05),
    ("electron_eta", 0.3),
    ("muon_pt", 70.0),
    ("Muon_pfRelIso03_all", 0.1),
    ("muon_eta", -1.1),
    ("jet_pt", 95.0),
    ("jet_eta", 0.8),
    ("met", 110.0),
    ("electron_met_mt", 80.0),
    ("muon_met_mt", 60.0),
    ("electron_bjet_dr", 1.5),
];
