//! # rf-processor
//!
//! Batch driver for RegioFill.
//!
//! An [`EventBatch`] is adapted once ([`SchemaAdapter`]), handed to the
//! external collaborators ([`ObjectSelector`], [`CorrectionProvider`]) and
//! turned into a [`rf_select::BatchContext`]. The processor then runs the
//! aggregation step for every region of the active channel and returns a
//! [`ProcessorOutput`] per dataset. [`run_batches`] does this for many
//! batches in parallel and merges the results.
//!
//! Two processors are provided:
//! - [`TriggerEfficiencyProcessor`]: numerator/denominator histograms.
//! - [`TTBarControlRegionProcessor`]: cutflow and selected columns.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod config;
pub mod corrections;
pub mod lumi;
pub mod objects;
pub mod processor;
pub mod runner;
pub mod schema;
pub mod trigger_efficiency;
pub mod ttbar;
pub mod working_point;

pub use batch::{BatchFile, EventBatch, GEN_WEIGHT};
pub use config::{MetFilters, ProcessorKind, RunConfig, TriggerPaths, read_run_config};
pub use corrections::{ColumnCorrections, CorrectionProvider, CorrectionRequest, WeightSource};
pub use lumi::LumiMask;
pub use objects::{ColumnObjects, ObjectRequest, ObjectSelector, SelectedObjects};
pub use processor::{Outputs, Processor, ProcessorOutput};
pub use runner::{build_processor, prepare_batches, run_batches, run_batches_sequential};
pub use schema::{ColumnAlias, SchemaAdapter};
pub use trigger_efficiency::TriggerEfficiencyProcessor;
pub use ttbar::TTBarControlRegionProcessor;
pub use working_point::{Channel, ElectronId, IsoWp, MuonId, WorkingPoints, Year};
