//! # rf-select
//!
//! The selection/weight bookkeeping engine.
//!
//! - [`SelectionRegistry`]: named per-event boolean masks, AND-combination
//!   and cumulative cutflows.
//! - [`WeightLedger`]: named per-event weight factors with up/down variants,
//!   total and partial products.
//! - [`RegionCatalog`]: static `channel -> label -> (selections, weights)`.
//! - [`aggregate_region`] / [`aggregate_channel`]: mask, scale and fill the
//!   declared histograms for each region.
//!
//! One [`BatchContext`] bundles the registry, the ledger and the axis
//! quantities of a single batch; nothing here is process-wide state.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregate;
pub mod context;
pub mod region;
pub mod selection;
pub mod weights;

pub use aggregate::{FillPlan, FillSpec, Quantity, RegionSummary, aggregate_channel, aggregate_region};
pub use context::{BatchContext, EventMode};
pub use region::{ChannelSpec, EfficiencyPair, Region, RegionCatalog, RegionCatalogBuilder, RegionSpec};
pub use selection::{CutflowStep, SelectionRegistry};
pub use weights::{NamedWeight, Variation, WeightLedger};
