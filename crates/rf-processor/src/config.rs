//! Run configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use rf_core::{Error, Result};
use rf_select::{ChannelSpec, RegionCatalog};

use crate::lumi::LumiMask;
use crate::working_point::{Channel, ElectronId, IsoWp, MuonId, WorkingPoints, Year};

/// Which processor a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorKind {
    /// Trigger-efficiency numerator/denominator histograms.
    TriggerEfficiency,
    /// ttbar control-region cutflow and selected columns.
    Ttbar,
}

/// HLT paths per channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerPaths {
    /// Electron-channel paths (OR-ed).
    #[serde(default)]
    pub ele: Vec<String>,
    /// Muon-channel paths (OR-ed).
    #[serde(default)]
    pub mu: Vec<String>,
}

impl TriggerPaths {
    /// Paths of one channel.
    pub fn for_channel(&self, channel: Channel) -> &[String] {
        match channel {
            Channel::Ele => &self.ele,
            Channel::Mu => &self.mu,
        }
    }
}

/// MET filter flags per mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetFilters {
    /// Filters applied to simulated batches (AND-ed).
    #[serde(default)]
    pub mc: Vec<String>,
    /// Filters applied to observed batches (AND-ed).
    #[serde(default)]
    pub data: Vec<String>,
}

/// Top-level run configuration (YAML or JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Processor to run.
    pub processor: ProcessorKind,
    /// Data-taking year.
    pub year: Year,
    /// Year modifier (e.g. `"APV"`).
    #[serde(default)]
    pub yearmod: String,
    /// Lepton channel.
    pub channel: Channel,
    /// HLT paths.
    #[serde(default)]
    pub triggers: TriggerPaths,
    /// MET filters.
    #[serde(default)]
    pub met_filters: MetFilters,
    /// Golden JSON applied to observed batches.
    #[serde(default)]
    pub lumi_mask: Option<PathBuf>,
    /// Require `electronIso` and `muonIso` in every trigger-efficiency region.
    #[serde(default)]
    pub enforce_isolation: bool,
    /// Object working points; processor defaults when absent.
    #[serde(default)]
    pub working_points: Option<WorkingPoints>,
    /// Explicit region catalog replacing the built-in one.
    #[serde(default)]
    pub regions: Option<BTreeMap<String, ChannelSpec>>,
}

/// Read a run configuration (`.json` as JSON, anything else as YAML).
pub fn read_run_config(path: &Path) -> Result<RunConfig> {
    let bytes = std::fs::read(path)?;
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
    let cfg: RunConfig = if ext == "json" {
        serde_json::from_slice(&bytes)?
    } else {
        serde_yaml_ng::from_slice(&bytes).map_err(|e| Error::Config(e.to_string()))?
    };
    cfg.validate()?;
    Ok(cfg)
}

impl RunConfig {
    /// Minimal configuration with empty trigger and filter lists.
    pub fn new(processor: ProcessorKind, year: Year, channel: Channel) -> Self {
        Self {
            processor,
            year,
            yearmod: String::new(),
            channel,
            triggers: TriggerPaths::default(),
            met_filters: MetFilters::default(),
            lumi_mask: None,
            enforce_isolation: false,
            working_points: None,
            regions: None,
        }
    }

    /// Check cross-field consistency.
    pub fn validate(&self) -> Result<()> {
        let needed: &[Channel] = match self.processor {
            ProcessorKind::TriggerEfficiency => &[Channel::Ele, Channel::Mu],
            ProcessorKind::Ttbar => &[self.channel],
        };
        if let Some(ch) = needed.iter().find(|ch| self.triggers.for_channel(**ch).is_empty()) {
            return Err(Error::Config(format!("no trigger paths configured for channel '{ch}'")));
        }
        if let Some(regions) = &self.regions
            && !regions.contains_key(self.channel.as_str())
        {
            return Err(Error::Config(format!(
                "regions override has no entry for channel '{}'",
                self.channel
            )));
        }
        if self.enforce_isolation && self.processor == ProcessorKind::Ttbar {
            tracing::warn!("enforce_isolation has no effect on the ttbar processor");
        }
        Ok(())
    }

    /// Configured working points, or the processor defaults.
    ///
    /// Trigger efficiency: MVA-with-isolation electrons (80% in the electron
    /// channel, 90% otherwise). ttbar: HEEP electrons. Muons are medium in
    /// the electron channel and tight in the muon channel.
    pub fn working_points(&self) -> WorkingPoints {
        if let Some(wp) = self.working_points {
            return wp;
        }
        let electron_id = match (self.processor, self.channel) {
            (ProcessorKind::TriggerEfficiency, Channel::Ele) => ElectronId::Wp80Iso,
            (ProcessorKind::TriggerEfficiency, Channel::Mu) => ElectronId::Wp90Iso,
            (ProcessorKind::Ttbar, _) => ElectronId::Heep,
        };
        let muon_id = match self.channel {
            Channel::Ele => MuonId::Medium,
            Channel::Mu => MuonId::Tight,
        };
        WorkingPoints { electron_id, muon_id, isolation: IsoWp::default() }
    }

    /// Load the configured lumi mask, if any.
    pub fn load_lumi_mask(&self) -> Result<Option<LumiMask>> {
        self.lumi_mask.as_deref().map(LumiMask::from_path).transpose()
    }

    /// Region catalog from the `regions` override, if present.
    pub fn region_override(&self) -> Result<Option<RegionCatalog>> {
        self.regions.as_ref().map(RegionCatalog::from_specs).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
processor: trigger_efficiency
year: "2017"
channel: mu
triggers:
  ele: [HLT_Ele35_WPTight_Gsf, HLT_Photon200]
  mu: [HLT_IsoMu27]
met_filters:
  mc: [goodVertices, globalSuperTightHalo2016Filter]
  data: [goodVertices, eeBadScFilter]
enforce_isolation: true
"#;

    #[test]
    fn parses_yaml() {
        let cfg: RunConfig = serde_yaml_ng::from_str(YAML).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.processor, ProcessorKind::TriggerEfficiency);
        assert_eq!(cfg.year, Year::Y2017);
        assert_eq!(cfg.channel, Channel::Mu);
        assert_eq!(cfg.triggers.for_channel(Channel::Ele).len(), 2);
        assert!(cfg.enforce_isolation);
        assert!(cfg.lumi_mask.is_none());
        let wp = cfg.working_points();
        assert_eq!(wp.electron_id, ElectronId::Wp90Iso);
        assert_eq!(wp.muon_id, MuonId::Tight);
    }

    #[test]
    fn unknown_working_point_is_a_parse_error() {
        let yaml = format!("{YAML}working_points:\n  electron_id: wp70\n  muon_id: tight\n");
        assert!(serde_yaml_ng::from_str::<RunConfig>(&yaml).is_err());
    }

    #[test]
    fn validation() {
        let cfg = RunConfig::new(ProcessorKind::Ttbar, Year::Y2018, Channel::Ele);
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));

        let mut cfg = cfg;
        cfg.triggers.ele = vec!["HLT_Ele32_WPTight_Gsf".into()];
        cfg.validate().unwrap();
        assert_eq!(cfg.working_points().electron_id, ElectronId::Heep);

        cfg.regions = Some(BTreeMap::from([("mu".to_string(), ChannelSpec::default())]));
        assert!(cfg.validate().is_err());
    }
}
