//! Neighborhood Finder - cluster-based peer sets
//!
//! Finds the movies and users that land in the same k-means cluster as a
//! target, which stands in for similarity.
//!
//! ## Algorithm
//! 1. Movies: k-means over the standardized genre vectors of every movie
//! 2. Users: restrict ratings to the target movie's cluster, build a
//!    genre-weighted profile per user, standardize, reduce with PCA, then
//!    k-means over the profiles
//! 3. Return every member sharing the target's label (target included)
//!
//! Clustering is recomputed per call unless memoization is switched on.
//! Memoized results are tagged with the store revision they were computed
//! from, so neither a deletion nor a different store is served a stale
//! cluster.

use crate::error::NeighborhoodError;
use crate::kmeans;
use data_loader::{DataIndex, MovieId, UserId};
use pipeline::{ClusteringFeatures, FeatureBuilder, FeatureMatrix};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, instrument};

pub type Result<T> = std::result::Result<T, NeighborhoodError>;

/// Clustering parameters shared by every call
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterConfig {
    /// Seed for the k-means initialization
    pub seed: u64,

    /// Keep cluster memberships between calls
    pub memoize: bool,

    /// PCA components kept for user profiles
    pub pca_components: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            memoize: false,
            pca_components: 5,
        }
    }
}

impl ClusterConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_memoize(mut self, memoize: bool) -> Self {
        self.memoize = memoize;
        self
    }

    pub fn with_pca_components(mut self, components: usize) -> Self {
        self.pca_components = components;
        self
    }
}

type UserKey = (UserId, MovieId, usize, usize);

/// Memoized memberships for one store revision
#[derive(Debug, Default)]
struct ClusterCache {
    revision: u64,
    movies: HashMap<(MovieId, usize), BTreeSet<MovieId>>,
    users: HashMap<UserKey, BTreeSet<UserId>>,
}

impl ClusterCache {
    fn reset(&mut self, revision: u64) {
        self.revision = revision;
        self.movies.clear();
        self.users.clear();
    }
}

/// Computes movie and user neighborhoods over a rating store
#[derive(Debug, Default)]
pub struct NeighborhoodFinder {
    config: ClusterConfig,
    cache: Mutex<ClusterCache>,
}

impl NeighborhoodFinder {
    pub fn new(config: ClusterConfig) -> Self {
        Self {
            config,
            cache: Mutex::new(ClusterCache::default()),
        }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Drop every memoized membership
    pub fn invalidate(&self) {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        let revision = cache.revision;
        cache.reset(revision);
    }

    /// Lock the cache, clearing it if it was filled from other store contents
    fn cache_for(&self, index: &DataIndex) -> MutexGuard<'_, ClusterCache> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if cache.revision != index.revision() {
            cache.reset(index.revision());
        }
        cache
    }

    /// Movies in the same genre cluster as `movie_id`, the movie included.
    #[instrument(skip(self, index))]
    pub fn movie_cluster(
        &self,
        index: &DataIndex,
        movie_id: MovieId,
        k: usize,
    ) -> Result<BTreeSet<MovieId>> {
        if self.config.memoize {
            if let Some(cluster) = self.cache_for(index).movies.get(&(movie_id, k)) {
                return Ok(cluster.clone());
            }
        }

        let features = FeatureBuilder::new(index).movie_features();
        let cluster = self.cluster_of(&features, movie_id, "movie", k)?;
        debug!(size = cluster.len(), "Movie cluster");

        if self.config.memoize {
            self.cache_for(index)
                .movies
                .insert((movie_id, k), cluster.clone());
        }
        Ok(cluster)
    }

    /// Users whose rating profile over `movie_id`'s cluster falls in the same
    /// cluster as `user_id`'s, the user included.
    #[instrument(skip(self, index))]
    pub fn user_cluster(
        &self,
        index: &DataIndex,
        user_id: UserId,
        movie_id: MovieId,
        user_k: usize,
        movie_k: usize,
    ) -> Result<BTreeSet<UserId>> {
        let key = (user_id, movie_id, user_k, movie_k);
        if self.config.memoize {
            if let Some(cluster) = self.cache_for(index).users.get(&key) {
                return Ok(cluster.clone());
            }
        }

        let movies = self.movie_cluster(index, movie_id, movie_k)?;
        let builder = FeatureBuilder::new(index);
        let profiles = builder.user_profiles(&movies);
        if profiles.position(user_id).is_none() {
            return Err(NeighborhoodError::UnknownEntity {
                entity: "user",
                id: user_id,
            });
        }

        let reduced = builder.reduce_dimensions(
            builder.standardize(profiles),
            "pca",
            self.config.pca_components,
        )?;
        let cluster = self.cluster_of(&reduced, user_id, "user", user_k)?;
        debug!(size = cluster.len(), "User cluster");

        if self.config.memoize {
            self.cache_for(index).users.insert(key, cluster.clone());
        }
        Ok(cluster)
    }

    /// Mean rating of `movie_id` among the other members of `user_id`'s
    /// cluster, or `None` if none of them rated it.
    pub fn neighborhood_average(
        &self,
        index: &DataIndex,
        user_id: UserId,
        movie_id: MovieId,
        user_k: usize,
        movie_k: usize,
    ) -> Result<Option<f64>> {
        let peers = self.user_cluster(index, user_id, movie_id, user_k, movie_k)?;

        let ratings: Vec<f64> = index
            .movie_ratings(movie_id)
            .filter(|rating| rating.user_id != user_id && peers.contains(&rating.user_id))
            .map(|rating| rating.rating as f64)
            .collect();

        if ratings.is_empty() {
            return Ok(None);
        }
        Ok(Some(ratings.iter().sum::<f64>() / ratings.len() as f64))
    }

    /// Rows of `features` that share the label of `target`
    fn cluster_of(
        &self,
        features: &FeatureMatrix,
        target: u32,
        entity: &'static str,
        k: usize,
    ) -> Result<BTreeSet<u32>> {
        let row = features
            .position(target)
            .ok_or(NeighborhoodError::UnknownEntity { entity, id: target })?;

        let labels = kmeans::cluster_labels(features.data(), k, self.config.seed)?;
        let label = labels[row];

        Ok(features
            .ids()
            .iter()
            .zip(labels.iter())
            .filter(|&(_, &other)| other == label)
            .map(|(&id, _)| id)
            .collect())
    }
}
