//! Error types for the prediction engine.

use data_loader::DataError;
use sources::{NeighborhoodError, RuleError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while configuring the engine, predicting or evaluating
#[derive(Error, Debug)]
pub enum PredictError {
    /// Store lookups (unknown user or movie) and loading failures
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Neighborhood(#[from] NeighborhoodError),

    #[error(transparent)]
    Rule(#[from] RuleError),

    /// More ratings requested for hold-out than the store contains
    #[error("Cannot sample {requested} ratings from a store of {available}")]
    SampleTooLarge { requested: usize, available: usize },

    #[error("Failed to read config {}: {source}", .path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A configuration value outside its valid range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, PredictError>;
