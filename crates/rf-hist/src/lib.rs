//! # rf-hist
//!
//! Weighted multi-axis histograms with a growing categorical `region` axis.
//!
//! A [`HistogramSchema`] declares a fixed set of named sinks; every batch
//! builds a fresh [`HistogramSet`] from it, fills it region by region, and
//! the per-batch sets are summed afterwards through [`rf_core::Merge`].
//!
//! ## Example
//!
//! ```
//! use rf_hist::{Axis, HistogramSchema, Storage};
//!
//! let schema = HistogramSchema::new()
//!     .histogram("met_kin", Storage::Weight, vec![
//!         Axis::variable("met", "MET [GeV]", vec![50.0, 100.0, 200.0, 500.0]),
//!     ])
//!     .unwrap();
//! let mut set = schema.build();
//! let h = set.get_mut("met_kin").unwrap();
//! h.fill("numerator", &[&[75.0, 120.0]], Some(&[1.0, 0.5])).unwrap();
//! assert_eq!(h.sum_of_weights("numerator"), 1.5);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod axis;
pub mod histogram;
pub mod schema;
pub mod set;

pub use axis::Axis;
pub use histogram::{FlowPolicy, Histogram1D, RegionHistogram, Storage};
pub use schema::{HistogramDef, HistogramSchema};
pub use set::HistogramSet;
