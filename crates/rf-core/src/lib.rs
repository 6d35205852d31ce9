//! # rf-core
//!
//! Core types for RegioFill: the error taxonomy shared by every crate,
//! columnar mask/weight helpers, and the [`Merge`] contract that per-batch
//! outputs satisfy.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::Merge;
pub use types::{and_assign, check_len, count_true, restrict, weighted_sum};

/// RegioFill version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
