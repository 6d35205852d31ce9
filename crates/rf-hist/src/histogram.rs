//! Multi-axis weighted accumulator with a categorical region axis.

use serde::{Deserialize, Serialize};

use rf_core::{Error, Merge, Result, check_len};

use crate::axis::Axis;

/// Name reserved for the categorical axis.
pub const REGION_AXIS: &str = "region";

/// Per-bin storage kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Storage {
    /// Sum of weights and sum of squared weights.
    Weight,
    /// Sum of weights only.
    Double,
}

/// Under/overflow handling policy for projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPolicy {
    /// Keep under/overflow out of the visible bins (reported separately).
    Drop,
    /// Fold underflow into the first bin and overflow into the last bin.
    Fold,
}

/// Dense storage for one region category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RegionBlock {
    label: String,
    sumw: Vec<f64>,
    sumw2: Option<Vec<f64>>,
    entries: u64,
}

impl RegionBlock {
    fn new(label: &str, n_cells: usize, storage: Storage) -> Self {
        Self {
            label: label.to_string(),
            sumw: vec![0.0; n_cells],
            sumw2: match storage {
                Storage::Weight => Some(vec![0.0; n_cells]),
                Storage::Double => None,
            },
            entries: 0,
        }
    }

    fn add(&mut self, other: &RegionBlock) {
        for (a, b) in self.sumw.iter_mut().zip(&other.sumw) {
            *a += b;
        }
        if let (Some(a2), Some(b2)) = (self.sumw2.as_mut(), other.sumw2.as_ref()) {
            for (a, b) in a2.iter_mut().zip(b2) {
                *a += b;
            }
        }
        self.entries += other.entries;
    }
}

/// A named weighted histogram: `region` category × numeric axes.
///
/// Cells of every numeric axis include underflow and overflow, laid out
/// row-major in axis order (see [`Axis::index`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRegionHistogram")]
pub struct RegionHistogram {
    name: String,
    storage: Storage,
    axes: Vec<Axis>,
    regions: Vec<RegionBlock>,
}

/// Unchecked serialized form; binning and blocks are validated on conversion.
#[derive(Deserialize)]
struct RawRegionHistogram {
    name: String,
    storage: Storage,
    axes: Vec<Axis>,
    regions: Vec<RegionBlock>,
}

impl TryFrom<RawRegionHistogram> for RegionHistogram {
    type Error = Error;

    fn try_from(raw: RawRegionHistogram) -> Result<Self> {
        let mut hist = RegionHistogram::new(raw.name, raw.storage, raw.axes)?;
        let n_cells = hist.n_cells();
        for block in raw.regions {
            check_len("region cells", n_cells, block.sumw.len())?;
            match (hist.storage, &block.sumw2) {
                (Storage::Weight, Some(sumw2)) => check_len("region variances", n_cells, sumw2.len())?,
                (Storage::Double, None) => {}
                _ => {
                    return Err(Error::Histogram(format!(
                        "histogram '{}': region '{}' does not match {:?} storage",
                        hist.name, block.label, hist.storage
                    )));
                }
            }
            if hist.block(&block.label).is_some() {
                return Err(Error::Histogram(format!(
                    "histogram '{}': duplicate region '{}'",
                    hist.name, block.label
                )));
            }
            hist.block_mut(&block.label).add(&block);
        }
        Ok(hist)
    }
}

/// A 1D projection of one region, with explicit flow bins.
#[derive(Debug, Clone)]
pub struct Histogram1D {
    /// Histogram name.
    pub name: String,
    /// Region label.
    pub region: String,
    /// Projected axis name.
    pub axis: String,
    /// Bin edges (length = n_bins + 1).
    pub bin_edges: Vec<f64>,
    /// Bin contents (sum of weights per bin).
    pub bin_content: Vec<f64>,
    /// Sum of weights squared per bin, if stored.
    pub sumw2: Option<Vec<f64>>,
    /// Underflow sum of weights (before optional folding).
    pub underflow: f64,
    /// Overflow sum of weights (before optional folding).
    pub overflow: f64,
    /// Entries filled into the region.
    pub entries: u64,
}

impl RegionHistogram {
    /// Create an empty histogram.
    pub fn new(name: impl Into<String>, storage: Storage, axes: Vec<Axis>) -> Result<Self> {
        let name = name.into();
        if axes.is_empty() {
            return Err(Error::Histogram(format!("histogram '{name}' has no numeric axes")));
        }
        for (i, axis) in axes.iter().enumerate() {
            axis.validate()?;
            if axis.name() == REGION_AXIS {
                return Err(Error::Histogram(format!(
                    "histogram '{name}': axis name '{REGION_AXIS}' is reserved"
                )));
            }
            if axes[..i].iter().any(|a| a.name() == axis.name()) {
                return Err(Error::Histogram(format!(
                    "histogram '{name}': duplicate axis '{}'",
                    axis.name()
                )));
            }
        }
        Ok(Self { name, storage, axes, regions: Vec::new() })
    }

    /// Histogram name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Storage kind.
    pub fn storage(&self) -> Storage {
        self.storage
    }

    /// Numeric axes, in fill order.
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Number of cells per region (flow bins included).
    pub fn n_cells(&self) -> usize {
        self.axes.iter().map(Axis::extent).product()
    }

    /// Region labels, sorted.
    pub fn region_labels(&self) -> impl Iterator<Item = &str> {
        self.regions.iter().map(|r| r.label.as_str())
    }

    fn block(&self, region: &str) -> Option<&RegionBlock> {
        self.regions
            .binary_search_by(|r| r.label.as_str().cmp(region))
            .ok()
            .map(|pos| &self.regions[pos])
    }

    // Blocks are kept sorted by label.
    fn block_mut(&mut self, region: &str) -> &mut RegionBlock {
        let pos = match self.regions.binary_search_by(|r| r.label.as_str().cmp(region)) {
            Ok(pos) => pos,
            Err(pos) => {
                let block = RegionBlock::new(region, self.n_cells(), self.storage);
                self.regions.insert(pos, block);
                pos
            }
        };
        &mut self.regions[pos]
    }

    /// Fill `region` with one value array per axis (in axis order).
    ///
    /// `weight = None` fills with unit weight. Zero-length inputs still
    /// register the region category.
    pub fn fill(&mut self, region: &str, values: &[&[f64]], weight: Option<&[f64]>) -> Result<()> {
        if values.len() != self.axes.len() {
            return Err(Error::Histogram(format!(
                "histogram '{}' has {} axes, got {} value arrays",
                self.name,
                self.axes.len(),
                values.len()
            )));
        }
        let n = values[0].len();
        for (axis, column) in self.axes.iter().zip(values) {
            check_len(axis.name(), n, column.len())?;
        }
        if let Some(w) = weight {
            check_len("weight", n, w.len())?;
        }

        let strides = self.strides();
        let cells: Vec<usize> = (0..n)
            .map(|row| {
                self.axes
                    .iter()
                    .zip(values)
                    .zip(&strides)
                    .map(|((axis, col), stride)| axis.index(col[row]) * stride)
                    .sum()
            })
            .collect();

        let block = self.block_mut(region);
        for (row, &cell) in cells.iter().enumerate() {
            let w = weight.map_or(1.0, |w| w[row]);
            block.sumw[cell] += w;
            if let Some(sumw2) = block.sumw2.as_mut() {
                sumw2[cell] += w * w;
            }
        }
        block.entries += n as u64;
        Ok(())
    }

    fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1; self.axes.len()];
        for i in (0..self.axes.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.axes[i + 1].extent();
        }
        strides
    }

    /// Number of entries filled into `region` (0 if never filled).
    pub fn entries(&self, region: &str) -> u64 {
        self.block(region).map_or(0, |b| b.entries)
    }

    /// Total sum of weights in `region`, flow bins included.
    pub fn sum_of_weights(&self, region: &str) -> f64 {
        self.block(region).map_or(0.0, |b| b.sumw.iter().sum())
    }

    /// Raw cell contents of `region` (row-major, flow bins included).
    pub fn values(&self, region: &str) -> Option<&[f64]> {
        self.block(region).map(|b| b.sumw.as_slice())
    }

    /// Raw sum of squared weights of `region`; `None` for [`Storage::Double`].
    pub fn variances(&self, region: &str) -> Option<&[f64]> {
        self.block(region).and_then(|b| b.sumw2.as_deref())
    }

    /// Content of one cell addressed by extended per-axis indices.
    pub fn cell(&self, region: &str, index: &[usize]) -> Result<f64> {
        if index.len() != self.axes.len() {
            return Err(Error::Histogram(format!(
                "histogram '{}' expects {} indices, got {}",
                self.name,
                self.axes.len(),
                index.len()
            )));
        }
        if let Some((axis, &i)) = self.axes.iter().zip(index).find(|(a, i)| **i >= a.extent()) {
            return Err(Error::Histogram(format!(
                "index {i} out of range for axis '{}' (extent {})",
                axis.name(),
                axis.extent()
            )));
        }
        let flat: usize = index.iter().zip(self.strides()).map(|(i, s)| i * s).sum();
        Ok(self.block(region).map_or(0.0, |b| b.sumw[flat]))
    }

    /// Project `region` onto one axis, summing over all others.
    pub fn project(&self, region: &str, axis: &str, flow: FlowPolicy) -> Result<Histogram1D> {
        let (k, target) =
            self.axes.iter().enumerate().find(|(_, a)| a.name() == axis).ok_or_else(|| {
                Error::Histogram(format!("histogram '{}' has no axis '{axis}'", self.name))
            })?;

        let extent = target.extent();
        let mut sumw = vec![0.0; extent];
        let mut sumw2 = (self.storage == Storage::Weight).then(|| vec![0.0; extent]);
        let mut entries = 0;

        if let Some(block) = self.block(region) {
            let stride = self.strides()[k];
            for (cell, &w) in block.sumw.iter().enumerate() {
                let i = (cell / stride) % extent;
                sumw[i] += w;
                if let (Some(acc), Some(src)) = (sumw2.as_mut(), block.sumw2.as_ref()) {
                    acc[i] += src[cell];
                }
            }
            entries = block.entries;
        }

        let n = target.n_bins();
        let underflow = sumw[0];
        let overflow = sumw[n + 1];
        let mut bin_content = sumw[1..=n].to_vec();
        let mut bin_sumw2 = sumw2.as_ref().map(|s| s[1..=n].to_vec());
        if flow == FlowPolicy::Fold {
            bin_content[0] += underflow;
            bin_content[n - 1] += overflow;
            if let (Some(b), Some(s)) = (bin_sumw2.as_mut(), sumw2.as_ref()) {
                b[0] += s[0];
                b[n - 1] += s[n + 1];
            }
        }

        Ok(Histogram1D {
            name: self.name.clone(),
            region: region.to_string(),
            axis: axis.to_string(),
            bin_edges: target.edges(),
            bin_content,
            sumw2: bin_sumw2,
            underflow,
            overflow,
            entries,
        })
    }

    /// Whether `other` has the same name, storage and binning.
    pub fn is_compatible(&self, other: &RegionHistogram) -> bool {
        self.name == other.name && self.storage == other.storage && self.axes == other.axes
    }
}

impl Merge for RegionHistogram {
    fn merge(&mut self, other: Self) -> Result<()> {
        if !self.is_compatible(&other) {
            return Err(Error::Histogram(format!(
                "cannot merge histogram '{}' with incompatible '{}'",
                self.name, other.name
            )));
        }
        for block in &other.regions {
            self.block_mut(&block.label).add(block);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn kin() -> RegionHistogram {
        RegionHistogram::new(
            "kin",
            Storage::Weight,
            vec![
                Axis::variable("pt", "pt", vec![30.0, 60.0, 90.0]),
                Axis::regular(2, -2.4, 2.4, "eta", "eta"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn fill_two_axes_with_weight() {
        let mut h = kin();
        h.fill("numerator", &[&[35.0, 70.0, 35.0], &[-1.0, 1.0, -1.0]], Some(&[2.0, 3.0, 1.0]))
            .unwrap();

        assert_eq!(h.entries("numerator"), 3);
        assert_relative_eq!(h.sum_of_weights("numerator"), 6.0);
        // pt bin 1, eta bin 1
        assert_eq!(h.cell("numerator", &[1, 1]).unwrap(), 3.0);
        assert_eq!(h.cell("numerator", &[2, 2]).unwrap(), 3.0);
        let var = h.variances("numerator").unwrap();
        assert_eq!(var.iter().sum::<f64>(), 4.0 + 9.0 + 1.0);
    }

    #[test]
    fn merge_is_order_independent() {
        let mut a = kin();
        a.fill("numerator", &[&[35.0], &[0.5]], None).unwrap();
        a.fill("denominator", &[&[65.0], &[0.5]], None).unwrap();
        let mut b = kin();
        b.fill("denominator", &[&[35.0], &[-0.5]], Some(&[2.0])).unwrap();
        b.fill("control", &[&[95.0], &[0.5]], None).unwrap();

        let mut ab = a.clone();
        ab.merge(b.clone()).unwrap();
        let mut ba = b;
        ba.merge(a).unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.region_labels().collect::<Vec<_>>(), vec!["control", "denominator", "numerator"]);
        assert_eq!(
            serde_json::to_string(&ab).unwrap(),
            serde_json::to_string(&ba).unwrap()
        );
    }

    #[test]
    fn deserialize_checks_binning_and_blocks() {
        let mut h = kin();
        h.fill("numerator", &[&[35.0], &[0.5]], Some(&[2.0])).unwrap();
        let json = serde_json::to_value(&h).unwrap();
        let back: RegionHistogram = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back, h);

        let mut bad_axis = json.clone();
        bad_axis["axes"][0] = serde_json::to_value(Axis::variable("pt", "pt", vec![30.0])).unwrap();
        assert!(serde_json::from_value::<RegionHistogram>(bad_axis).is_err());

        let mut short = json.clone();
        short["regions"][0]["sumw"] = serde_json::json!([1.0]);
        assert!(serde_json::from_value::<RegionHistogram>(short).is_err());

        let mut no_sumw2 = json;
        no_sumw2["regions"][0]["sumw2"] = serde_json::Value::Null;
        assert!(serde_json::from_value::<RegionHistogram>(no_sumw2).is_err());
    }

    #[test]
    fn regions_are_independent_categories() {
        let mut h = kin();
        h.fill("numerator", &[&[35.0], &[0.5]], None).unwrap();
        h.fill("denominator", &[&[35.0, 65.0], &[0.5, 0.5]], None).unwrap();
        assert_eq!(h.region_labels().collect::<Vec<_>>(), vec!["denominator", "numerator"]);
        assert_eq!(h.entries("numerator"), 1);
        assert_eq!(h.entries("denominator"), 2);
        assert_eq!(h.entries("other"), 0);
    }

    #[test]
    fn empty_fill_registers_region() {
        let mut h = kin();
        h.fill("numerator", &[&[], &[]], Some(&[])).unwrap();
        assert_eq!(h.region_labels().count(), 1);
        assert_eq!(h.entries("numerator"), 0);
        assert!(h.values("numerator").unwrap().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn nan_goes_to_overflow() {
        let mut h = kin();
        h.fill("r", &[&[f64::NAN], &[0.5]], None).unwrap();
        let p = h.project("r", "pt", FlowPolicy::Drop).unwrap();
        assert_eq!(p.overflow, 1.0);
        assert_eq!(p.bin_content, vec![0.0, 0.0]);
    }

    #[test]
    fn fill_rejects_misaligned_arrays() {
        let mut h = kin();
        let err = h.fill("r", &[&[35.0, 40.0], &[0.5]], None).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { .. }));
        let err = h.fill("r", &[&[35.0]], None).unwrap_err();
        assert!(matches!(err, Error::Histogram(_)));
        let err = h.fill("r", &[&[35.0], &[0.5]], Some(&[1.0, 2.0])).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { .. }));
    }

    #[test]
    fn projection_sums_other_axes_and_folds() {
        let mut h = kin();
        h.fill("r", &[&[10.0, 35.0, 35.0, 95.0], &[-1.0, -1.0, 1.0, 1.0]], None).unwrap();
        let p = h.project("r", "pt", FlowPolicy::Drop).unwrap();
        assert_eq!(p.bin_content, vec![2.0, 0.0]);
        assert_eq!(p.underflow, 1.0);
        assert_eq!(p.overflow, 1.0);
        assert_eq!(p.bin_edges, vec![30.0, 60.0, 90.0]);
        assert_eq!(p.entries, 4);

        let folded = h.project("r", "pt", FlowPolicy::Fold).unwrap();
        assert_eq!(folded.bin_content, vec![3.0, 1.0]);
        assert_eq!(folded.sumw2.unwrap(), vec![3.0, 1.0]);

        let eta = h.project("r", "eta", FlowPolicy::Drop).unwrap();
        assert_eq!(eta.bin_content, vec![2.0, 2.0]);
        assert!(h.project("r", "phi", FlowPolicy::Drop).is_err());
    }

    #[test]
    fn double_storage_has_no_variances() {
        let mut h =
            RegionHistogram::new("w", Storage::Double, vec![Axis::regular(25, 0.0, 2.0, "pu", "pu")])
                .unwrap();
        h.fill("r", &[&[1.0, 1.1]], None).unwrap();
        assert!(h.variances("r").is_none());
        assert!(h.project("r", "pu", FlowPolicy::Drop).unwrap().sumw2.is_none());
    }

    #[test]
    fn construction_rejects_bad_axes() {
        assert!(RegionHistogram::new("h", Storage::Weight, vec![]).is_err());
        let dup = vec![Axis::regular(1, 0.0, 1.0, "x", "x"), Axis::regular(2, 0.0, 1.0, "x", "x")];
        assert!(RegionHistogram::new("h", Storage::Weight, dup).is_err());
        let reserved = vec![Axis::regular(1, 0.0, 1.0, REGION_AXIS, "r")];
        assert!(RegionHistogram::new("h", Storage::Weight, reserved).is_err());
    }

    #[test]
    fn merge_adds_bins_and_unions_regions() {
        let mut a = kin();
        a.fill("numerator", &[&[35.0], &[0.5]], Some(&[1.5])).unwrap();
        let mut b = kin();
        b.fill("numerator", &[&[35.0], &[0.5]], Some(&[0.5])).unwrap();
        b.fill("denominator", &[&[70.0], &[0.5]], Some(&[2.0])).unwrap();

        a.merge(b).unwrap();
        assert_eq!(a.cell("numerator", &[1, 2]).unwrap(), 2.0);
        assert_eq!(a.entries("numerator"), 2);
        assert_eq!(a.sum_of_weights("denominator"), 2.0);
    }

    #[test]
    fn merge_rejects_incompatible_binning() {
        let mut a = kin();
        let b = RegionHistogram::new("kin", Storage::Weight, vec![Axis::regular(3, 0.0, 1.0, "pt", "pt")])
            .unwrap();
        assert!(a.merge(b).is_err());
    }
}
