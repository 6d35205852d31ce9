//! Error types for RegioFill

use thiserror::Error;

/// RegioFill error type
#[derive(Error, Debug)]
pub enum Error {
    /// A per-event array does not have the batch length.
    #[error("length mismatch for '{what}': expected {expected}, got {actual}")]
    LengthMismatch {
        /// Name of the offending array.
        what: String,
        /// Batch length.
        expected: usize,
        /// Length of the array.
        actual: usize,
    },

    /// A selection name was registered twice within one batch.
    #[error("selection '{0}' already registered")]
    DuplicateSelection(String),

    /// A weight name was added twice within one batch.
    #[error("weight '{0}' already added")]
    DuplicateWeight(String),

    /// A selection name was referenced but never registered.
    #[error("unknown selection '{0}'")]
    UnknownSelection(String),

    /// A weight name was referenced but never added.
    #[error("unknown weight '{0}'")]
    UnknownWeight(String),

    /// A histogram axis quantity was referenced but never supplied.
    #[error("unknown quantity '{0}'")]
    UnknownQuantity(String),

    /// A fill targeted a histogram that is not in the set.
    #[error("unknown histogram '{0}'")]
    UnknownHistogram(String),

    /// The region catalog has no entry for this channel.
    #[error("unknown channel '{0}'")]
    UnknownChannel(String),

    /// A region definition violates a catalog invariant.
    #[error("invalid region: {0}")]
    InvalidRegion(String),

    /// Failure while aggregating one region, with full context.
    #[error("channel '{channel}', region '{label}': {source}")]
    Region {
        /// Active channel.
        channel: String,
        /// Region label.
        label: String,
        /// Underlying error.
        #[source]
        source: Box<Error>,
    },

    /// Histogram construction, fill or merge error
    #[error("Histogram error: {0}")]
    Histogram(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Run configuration could not be parsed or is inconsistent.
    #[error("Config error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap `self` with the channel/region it occurred in.
    pub fn in_region(self, channel: impl Into<String>, label: impl Into<String>) -> Self {
        Error::Region { channel: channel.into(), label: label.into(), source: Box::new(self) }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
