//! Feature engineering over the rating store.
//!
//! This crate provides:
//! - Genre one-hot encoding, standardization and PCA for movie clustering
//! - Genre-weighted user profiles for user clustering
//! - The boolean ratings design matrix for association rule mining
//!
//! ## Architecture
//! `FeatureBuilder` borrows a `DataIndex` and derives matrices on demand.
//! Consumers depend on the capability traits (`ClusteringFeatures`,
//! `RuleMiningFeatures`) rather than on the builder itself.
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{ClusteringFeatures, FeatureBuilder};
//!
//! let builder = FeatureBuilder::new(&index);
//! let movies = builder.reduce_dimensions(builder.movie_features(), "pca", 5)?;
//! ```

pub mod builder;
pub mod design_matrix;
pub mod error;
pub mod features;
pub mod reduction;
pub mod traits;

// Re-export main types
pub use builder::FeatureBuilder;
pub use design_matrix::{Item, RatingDesignMatrix};
pub use error::{FeatureError, Result};
pub use features::{FeatureMatrix, decode_genres, genre_one_hot, standardize};
pub use reduction::{ReductionMethod, reduce_dimensions};
pub use traits::{ClusteringFeatures, RuleMiningFeatures};
