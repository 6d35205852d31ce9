//! Closed enums for data-taking year, channel and object working points.
//!
//! Strings only exist at the serde boundary; everything past configuration
//! parsing matches on these enums.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Data-taking year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Year {
    /// 2016
    #[serde(rename = "2016")]
    Y2016,
    /// 2017
    #[serde(rename = "2017")]
    Y2017,
    /// 2018
    #[serde(rename = "2018")]
    Y2018,
}

impl Year {
    /// Four-digit label.
    pub fn as_str(self) -> &'static str {
        match self {
            Year::Y2016 => "2016",
            Year::Y2017 => "2017",
            Year::Y2018 => "2018",
        }
    }

    /// Whether the L1 prefiring correction applies.
    pub fn has_l1_prefiring(self) -> bool {
        matches!(self, Year::Y2016 | Year::Y2017)
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lepton channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Electron channel.
    Ele,
    /// Muon channel.
    Mu,
}

impl Channel {
    /// `"ele"` / `"mu"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Ele => "ele",
            Channel::Mu => "mu",
        }
    }

    /// Column prefix of the channel lepton (`"electron"` / `"muon"`).
    pub fn lepton(self) -> &'static str {
        match self {
            Channel::Ele => "electron",
            Channel::Mu => "muon",
        }
    }

    /// Primary observed dataset of the channel.
    pub fn primary_dataset(self, year: Year) -> &'static str {
        match (self, year) {
            (Channel::Ele, Year::Y2018) => "EGamma",
            (Channel::Ele, _) => "SingleElectron",
            (Channel::Mu, _) => "SingleMuon",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Electron identification working point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectronId {
    /// MVA 80% with isolation.
    Wp80Iso,
    /// MVA 90% with isolation.
    Wp90Iso,
    /// MVA 80% without isolation.
    Wp80NoIso,
    /// MVA 90% without isolation.
    Wp90NoIso,
    /// Cut-based loose.
    Loose,
    /// Cut-based medium.
    Medium,
    /// Cut-based tight.
    Tight,
    /// High-energy electron pairs.
    Heep,
}

impl ElectronId {
    /// Serialized name, also used as column suffix.
    pub fn as_str(self) -> &'static str {
        match self {
            ElectronId::Wp80Iso => "wp80iso",
            ElectronId::Wp90Iso => "wp90iso",
            ElectronId::Wp80NoIso => "wp80noiso",
            ElectronId::Wp90NoIso => "wp90noiso",
            ElectronId::Loose => "loose",
            ElectronId::Medium => "medium",
            ElectronId::Tight => "tight",
            ElectronId::Heep => "heep",
        }
    }
}

/// Muon identification working point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MuonId {
    /// Loose.
    Loose,
    /// Medium.
    Medium,
    /// Tight.
    Tight,
}

impl MuonId {
    /// Serialized name, also used as column suffix.
    pub fn as_str(self) -> &'static str {
        match self {
            MuonId::Loose => "loose",
            MuonId::Medium => "medium",
            MuonId::Tight => "tight",
        }
    }
}

/// Relative isolation working point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsoWp {
    /// relIso < 0.25
    #[default]
    Loose,
    /// relIso < 0.20
    Medium,
    /// relIso < 0.15
    Tight,
}

impl IsoWp {
    /// Upper bound on the relative isolation.
    pub fn threshold(self) -> f64 {
        match self {
            IsoWp::Loose => 0.25,
            IsoWp::Medium => 0.20,
            IsoWp::Tight => 0.15,
        }
    }

    /// `relIso < threshold`; NaN fails.
    pub fn passes(self, rel_iso: f64) -> bool {
        rel_iso < self.threshold()
    }
}

/// Object working points of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingPoints {
    /// Electron ID.
    pub electron_id: ElectronId,
    /// Muon ID.
    pub muon_id: MuonId,
    /// Isolation used by `electronIso`/`muonIso`.
    #[serde(default)]
    pub isolation: IsoWp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_names() {
        assert_eq!(serde_json::to_string(&Year::Y2017).unwrap(), "\"2017\"");
        assert_eq!(serde_json::from_str::<Channel>("\"mu\"").unwrap(), Channel::Mu);
        assert_eq!(serde_json::from_str::<ElectronId>("\"wp80noiso\"").unwrap(), ElectronId::Wp80NoIso);
        assert!(serde_json::from_str::<MuonId>("\"superTight\"").is_err());
        assert!(serde_json::from_str::<Year>("\"2019\"").is_err());
    }

    #[test]
    fn primary_datasets() {
        assert_eq!(Channel::Ele.primary_dataset(Year::Y2018), "EGamma");
        assert_eq!(Channel::Ele.primary_dataset(Year::Y2017), "SingleElectron");
        assert_eq!(Channel::Mu.primary_dataset(Year::Y2018), "SingleMuon");
    }

    #[test]
    fn isolation_thresholds() {
        assert!(IsoWp::Loose.passes(0.2));
        assert!(!IsoWp::Tight.passes(0.2));
        assert!(!IsoWp::Medium.passes(f64::NAN));
        assert!(!Year::Y2018.has_l1_prefiring());
    }
}
