//! Static catalog of analysis regions.
//!
//! A region is an ordered list of selection names plus the set of weight
//! names whose product scales it. Regions only reference masks and weights
//! by name; the catalog never sees per-event data.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use rf_core::{Error, Result};

/// One `(channel, label)` slice of events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Channel the region belongs to.
    pub channel: String,
    /// Region label (the value of the histogram `region` axis).
    pub label: String,
    /// Selections AND-ed together, in cutflow order.
    pub selections: Vec<String>,
    /// Weight factors multiplied into the region scale.
    pub weights: Vec<String>,
}

/// A numerator/denominator pair of a trigger-efficiency measurement.
///
/// The numerator must equal the denominator plus exactly the trigger
/// selections, and its weights the denominator weights plus exactly the
/// trigger-efficiency weights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EfficiencyPair {
    /// Numerator region label.
    pub numerator: String,
    /// Denominator region label.
    pub denominator: String,
    /// Selections present only in the numerator.
    pub trigger_selections: Vec<String>,
    /// Weights present only in the numerator.
    #[serde(default)]
    pub trigger_weights: Vec<String>,
}

/// Region declaration as written in a run configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSpec {
    /// Region label.
    pub label: String,
    /// Ordered selection names.
    pub selections: Vec<String>,
    /// Weight names.
    #[serde(default)]
    pub weights: Vec<String>,
}

/// All regions of one channel, as written in a run configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSpec {
    /// Regions, in processing order.
    pub regions: Vec<RegionSpec>,
    /// Optional efficiency pair to enforce.
    #[serde(default)]
    pub efficiency: Option<EfficiencyPair>,
}

#[derive(Debug, Clone, Default)]
struct ChannelRegions {
    regions: Vec<Region>,
    efficiency: Option<EfficiencyPair>,
}

/// Immutable `channel -> label -> Region` mapping.
#[derive(Debug, Clone, Default)]
pub struct RegionCatalog {
    channels: BTreeMap<String, ChannelRegions>,
}

/// Builder for [`RegionCatalog`]; all invariants are checked in `build`.
#[derive(Debug, Clone, Default)]
pub struct RegionCatalogBuilder {
    channels: BTreeMap<String, ChannelRegions>,
}

impl RegionCatalogBuilder {
    /// Declare a region. Labels keep their declaration order.
    pub fn region<S: Into<String>>(
        mut self,
        channel: impl Into<String>,
        label: impl Into<String>,
        selections: impl IntoIterator<Item = S>,
        weights: impl IntoIterator<Item = S>,
    ) -> Self {
        let channel = channel.into();
        let region = Region {
            channel: channel.clone(),
            label: label.into(),
            selections: selections.into_iter().map(Into::into).collect(),
            weights: weights.into_iter().map(Into::into).collect(),
        };
        self.channels.entry(channel).or_default().regions.push(region);
        self
    }

    /// Declare the efficiency pair of a channel.
    pub fn efficiency_pair(mut self, channel: impl Into<String>, pair: EfficiencyPair) -> Self {
        self.channels.entry(channel.into()).or_default().efficiency = Some(pair);
        self
    }

    /// Validate and freeze the catalog.
    pub fn build(self) -> Result<RegionCatalog> {
        for (channel, ch) in &self.channels {
            let mut labels = HashSet::new();
            for region in &ch.regions {
                if !labels.insert(region.label.as_str()) {
                    return Err(Error::InvalidRegion(format!(
                        "channel '{channel}' declares region '{}' twice",
                        region.label
                    )));
                }
                check_unique(channel, &region.label, "selection", &region.selections)?;
                check_unique(channel, &region.label, "weight", &region.weights)?;
            }
            if let Some(pair) = &ch.efficiency {
                check_efficiency_pair(channel, ch, pair)?;
            }
        }
        Ok(RegionCatalog { channels: self.channels })
    }
}

fn check_unique(channel: &str, label: &str, kind: &str, names: &[String]) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(Error::InvalidRegion(format!(
                "channel '{channel}', region '{label}': {kind} '{name}' listed twice"
            )));
        }
    }
    Ok(())
}

fn find<'a>(channel: &str, ch: &'a ChannelRegions, label: &str) -> Result<&'a Region> {
    ch.regions.iter().find(|r| r.label == label).ok_or_else(|| {
        Error::InvalidRegion(format!("channel '{channel}': efficiency pair references missing region '{label}'"))
    })
}

/// `numerator == denominator ⊎ extra`, compared as sets.
fn differs_by_exactly(numerator: &[String], denominator: &[String], extra: &[String]) -> bool {
    let num: HashSet<&str> = numerator.iter().map(String::as_str).collect();
    let den: HashSet<&str> = denominator.iter().map(String::as_str).collect();
    let ext: HashSet<&str> = extra.iter().map(String::as_str).collect();
    if ext.len() != extra.len() || !den.is_disjoint(&ext) {
        return false;
    }
    let expected: HashSet<&str> = den.union(&ext).copied().collect();
    num == expected
}

fn check_efficiency_pair(channel: &str, ch: &ChannelRegions, pair: &EfficiencyPair) -> Result<()> {
    if pair.trigger_selections.is_empty() {
        return Err(Error::InvalidRegion(format!(
            "channel '{channel}': efficiency pair has no trigger selections"
        )));
    }
    let num = find(channel, ch, &pair.numerator)?;
    let den = find(channel, ch, &pair.denominator)?;
    if !differs_by_exactly(&num.selections, &den.selections, &pair.trigger_selections) {
        return Err(Error::InvalidRegion(format!(
            "channel '{channel}': selections of '{}' must equal those of '{}' plus exactly {:?}",
            pair.numerator, pair.denominator, pair.trigger_selections
        )));
    }
    if !differs_by_exactly(&num.weights, &den.weights, &pair.trigger_weights) {
        return Err(Error::InvalidRegion(format!(
            "channel '{channel}': weights of '{}' must equal those of '{}' plus exactly {:?}",
            pair.numerator, pair.denominator, pair.trigger_weights
        )));
    }
    Ok(())
}

impl RegionCatalog {
    /// Start a catalog.
    pub fn builder() -> RegionCatalogBuilder {
        RegionCatalogBuilder::default()
    }

    /// Build from configuration specs.
    pub fn from_specs(specs: &BTreeMap<String, ChannelSpec>) -> Result<Self> {
        let mut builder = Self::builder();
        for (channel, spec) in specs {
            for r in &spec.regions {
                builder = builder.region(
                    channel.as_str(),
                    r.label.as_str(),
                    r.selections.iter().map(String::as_str),
                    r.weights.iter().map(String::as_str),
                );
            }
            if let Some(pair) = &spec.efficiency {
                builder = builder.efficiency_pair(channel.as_str(), pair.clone());
            }
        }
        builder.build()
    }

    /// Export back to configuration specs.
    pub fn to_specs(&self) -> BTreeMap<String, ChannelSpec> {
        self.channels
            .iter()
            .map(|(channel, ch)| {
                let regions = ch
                    .regions
                    .iter()
                    .map(|r| RegionSpec {
                        label: r.label.clone(),
                        selections: r.selections.clone(),
                        weights: r.weights.clone(),
                    })
                    .collect();
                (channel.clone(), ChannelSpec { regions, efficiency: ch.efficiency.clone() })
            })
            .collect()
    }

    /// Channel names.
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    /// Regions of `channel`, in declaration order.
    pub fn regions(&self, channel: &str) -> Result<&[Region]> {
        self.channels
            .get(channel)
            .map(|c| c.regions.as_slice())
            .ok_or_else(|| Error::UnknownChannel(channel.to_string()))
    }

    /// One region.
    pub fn region(&self, channel: &str, label: &str) -> Result<&Region> {
        self.regions(channel)?.iter().find(|r| r.label == label).ok_or_else(|| {
            Error::InvalidRegion(format!("channel '{channel}' has no region '{label}'"))
        })
    }

    /// Efficiency pair declared for `channel`, if any.
    pub fn efficiency_pair(&self, channel: &str) -> Option<&EfficiencyPair> {
        self.channels.get(channel).and_then(|c| c.efficiency.as_ref())
    }
}
