//! Error types for clustering and rule mining.

use pipeline::FeatureError;
use thiserror::Error;

/// Errors raised by the neighborhood finder
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NeighborhoodError {
    /// The target is not among the rows being clustered
    #[error("No {entity} with id {id} in the clustering input")]
    UnknownEntity { entity: &'static str, id: u32 },

    /// k-means rejected its input or parameters
    #[error("Clustering failed: {0}")]
    Clustering(String),

    #[error(transparent)]
    Feature(#[from] FeatureError),
}

/// Errors raised by the rule miner
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    /// Minimum itemset support must be strictly positive
    #[error("Minimum itemset support must be positive, got {0}")]
    InvalidSupport(f64),

    #[error("Unsupported rule metric: {0}")]
    UnsupportedMetric(String),
}
