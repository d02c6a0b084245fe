//! Capability traits for the two preprocessing flavours.
//!
//! Clustering needs numeric matrices (genre vectors, user profiles); rule
//! mining needs the boolean ratings design matrix. Keeping them as separate
//! traits lets a consumer ask only for the capability it uses.

use crate::design_matrix::RatingDesignMatrix;
use crate::features::FeatureMatrix;
use data_loader::{MovieId, UserId};
use std::collections::BTreeSet;

/// Features consumed by the neighborhood finder.
pub trait ClusteringFeatures {
    /// Standardized one-hot genre vectors of every movie, rows by movie id.
    fn movie_features(&self) -> FeatureMatrix;

    /// Genre-weighted rating profile of every user who rated a movie in
    /// `movie_cluster`, rows by user id.
    ///
    /// Cell `g` is the average over the user's in-cluster ratings of the
    /// rating when the movie has genre `g`, and of the cluster's mean
    /// rating otherwise.
    fn user_profiles(&self, movie_cluster: &BTreeSet<MovieId>) -> FeatureMatrix;
}

/// Features consumed by the rule miner.
pub trait RuleMiningFeatures {
    /// Ratings design matrix, optionally restricted to one user's rows.
    fn design_matrix(&self, user_id: Option<UserId>) -> RatingDesignMatrix;
}
