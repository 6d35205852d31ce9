mod common;

use approx::assert_relative_eq;
use common::{BatchBuilder, KINEMATICS, config};
use rf_core::Error;
use rf_processor::{
    Channel, EventBatch, Processor, ProcessorKind, SchemaAdapter, TriggerEfficiencyProcessor, Year,
    prepare_batches, run_batches, run_batches_sequential,
};

const T: bool = true;
const F: bool = false;

const WEIGHTS: [&str; 9] = [
    "L1Prefiring",
    "pileup",
    "btagSF",
    "electronID",
    "electronReco",
    "electronTrigger",
    "muonId",
    "muonIso",
    "muonTriggerIso",
];

/// Four simulated events; denominator keeps events 0 and 1, numerator event 0.
fn simulated_batch(dataset: &str) -> EventBatch {
    let n = 4;
    let mut b = BatchBuilder::new(dataset)
        .column("genWeight", &[1.0, 1.0, 1.0, 1.0])
        .column("n_electrons", &[1.0, 1.0, 1.0, 1.0])
        .column("n_muons", &[1.0, 1.0, 2.0, 1.0])
        .column("n_bjets", &[1.0, 2.0, 1.0, 0.0])
        .fill("n_taus", 0.0, n)
        .column("muon_bjet_dr", &[0.3, 2.0, 2.0, 2.0])
        .flag("good_electron", &[T; 4])
        .flag("good_muon", &[T; 4])
        .flag("HLT_IsoMu27", &[T, T, T, F])
        .flag("HLT_Ele35_WPTight_Gsf", &[T, F, T, T])
        .flag("Flag_goodVertices", &[T; 4]);
    for (name, value) in KINEMATICS {
        b = b.fill(name, value, n);
    }
    for name in WEIGHTS {
        b = b.fill(&format!("weight_{name}"), 1.0, n);
    }
    b = b
        .column("weight_pileup", &[1.0, 1.5, 1.0, 1.0])
        .column("weight_electronTrigger", &[0.9, 0.95, 0.95, 0.95])
        .fill("weight_L1Prefiring_up", 1.0, n)
        .fill("weight_L1Prefiring_down", 1.0, n);
    let mut batch = b.build();
    SchemaAdapter::default().apply(&mut batch).unwrap();
    batch
}

fn processor(channel: Channel) -> TriggerEfficiencyProcessor {
    TriggerEfficiencyProcessor::new(&config(ProcessorKind::TriggerEfficiency, Year::Y2017, channel), None).unwrap()
}

#[test]
fn electron_channel_numerator_and_denominator() {
    let out = processor(Channel::Ele).process(&simulated_batch("TTToSemiLeptonic")).unwrap();
    let out = &out["TTToSemiLeptonic"];
    assert_eq!(out.sumw, 4.0);

    let met = out.histograms.get("met_kin").unwrap();
    assert_eq!(met.entries("denominator"), 2);
    assert_relative_eq!(met.sum_of_weights("denominator"), 2.5);
    assert_eq!(met.entries("numerator"), 1);
    assert_relative_eq!(met.sum_of_weights("numerator"), 0.9);

    let monitors = out.histograms.get("electron_weights").unwrap();
    assert_eq!(monitors.entries("numerator"), 1);
    assert_eq!(monitors.sum_of_weights("numerator"), 1.0);

    // relIso came through the isolation alias.
    let electrons = out.histograms.get("electron_kin").unwrap();
    assert_eq!(electrons.entries("denominator"), 2);

    let last = out.cutflow.last().unwrap();
    assert_relative_eq!(last.passed, 0.9);
    assert_eq!(out.cutflow.len(), 9);
}

#[test]
fn muon_channel_applies_delta_r() {
    let out = processor(Channel::Mu).process(&simulated_batch("TTToSemiLeptonic")).unwrap();
    let met = out["TTToSemiLeptonic"].histograms.get("met_kin").unwrap();
    // Denominator: trigger_ele, one_lepton, two_bjets, deltaR -> event 3 fails two_bjets,
    // event 2 fails one_lepton, event 0 fails deltaR; event 1 fails trigger_ele.
    assert_eq!(met.entries("denominator"), 0);
    assert!(met.region_labels().any(|r| r == "numerator"));
}

#[test]
fn observed_batches_fill_kinematics_only() {
    let n = 2;
    let mut b = BatchBuilder::new("SingleMuon")
        .column("n_electrons", &[1.0, 1.0])
        .column("n_muons", &[1.0, 1.0])
        .column("n_bjets", &[1.0, 1.0])
        .fill("n_taus", 0.0, n)
        .fill("muon_bjet_dr", 1.0, n)
        .flag("good_electron", &[T, T])
        .flag("good_muon", &[T, T])
        .flag("HLT_IsoMu27", &[T, T])
        .flag("HLT_Ele35_WPTight_Gsf", &[T, F]);
    for (name, value) in KINEMATICS {
        b = b.fill(name, value, n);
    }
    let mut batch = b.build();
    SchemaAdapter::default().apply(&mut batch).unwrap();

    let out = processor(Channel::Ele).process(&batch).unwrap();
    let out = &out["SingleMuon"];
    assert_eq!(out.sumw, 0.0);
    assert_eq!(out.histograms.get("met_kin").unwrap().sum_of_weights("denominator"), 2.0);
    assert_eq!(out.histograms.get("met_kin").unwrap().sum_of_weights("numerator"), 1.0);
    assert_eq!(out.histograms.get("common_weights").unwrap().region_labels().count(), 0);
}

#[test]
fn missing_isolation_column_names_the_region() {
    let mut batch = simulated_batch("TTToSemiLeptonic");
    // Rebuild without the electron isolation source.
    let columns = batch
        .column_names()
        .filter(|n| !n.contains("RelIso") && !n.contains("relIso"))
        .map(|n| (n.to_string(), batch.column(n).unwrap().to_vec()))
        .collect();
    let flags = batch.flag_names().map(|n| (n.to_string(), batch.flag(n).unwrap().to_vec())).collect();
    batch = EventBatch::new("TTToSemiLeptonic", columns, flags).unwrap();
    SchemaAdapter::default().apply(&mut batch).unwrap();

    let err = processor(Channel::Ele).process(&batch).unwrap_err();
    assert!(matches!(err, Error::UnknownQuantity(ref n) if n == "electron_relIso"));
}

#[test]
fn parallel_run_matches_sequential() {
    let mut batches: Vec<EventBatch> =
        (0..6).map(|i| simulated_batch(if i % 2 == 0 { "TTToSemiLeptonic" } else { "WJetsToLNu" })).collect();
    prepare_batches(&SchemaAdapter::default(), &mut batches).unwrap();
    let p = processor(Channel::Ele);

    let parallel = run_batches(&p, &batches).unwrap();
    let sequential = run_batches_sequential(&p, &batches).unwrap();
    assert_eq!(parallel.keys().collect::<Vec<_>>(), vec!["TTToSemiLeptonic", "WJetsToLNu"]);
    for (dataset, out) in &parallel {
        let reference = &sequential[dataset];
        assert_eq!(out.sumw, 12.0);
        for name in p.schema().defs().iter().map(|d| d.name.as_str()) {
            let (a, b) = (out.histograms.get(name).unwrap(), reference.histograms.get(name).unwrap());
            for region in ["numerator", "denominator"] {
                assert_eq!(a.entries(region), b.entries(region));
                assert_relative_eq!(a.sum_of_weights(region), b.sum_of_weights(region), epsilon = 1e-12);
            }
        }
        assert_relative_eq!(out.histograms.get("met_kin").unwrap().sum_of_weights("denominator"), 7.5);
    }
}
