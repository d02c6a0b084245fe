//! Error types for feature building.

use thiserror::Error;

/// Errors raised while turning the rating store into feature matrices
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeatureError {
    /// Feature-extraction method that is not implemented
    #[error("Unsupported dimensionality reduction method: {0}")]
    UnsupportedMethod(String),

    #[error("Dimensionality reduction failed: {0}")]
    Reduction(String),
}

pub type Result<T> = std::result::Result<T, FeatureError>;
