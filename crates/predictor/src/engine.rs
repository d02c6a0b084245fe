//! # Prediction Engine
//!
//! Blends the rating signals into a single estimate:
//! 1. Baseline: movie average and user average, weighted by `alpha`
//! 2. Rules: the user's genre → rating rules that apply to the movie,
//!    weighted by the configured metric (falls back to the baseline)
//! 3. Blend: rule prediction and baseline, weighted by `beta`
//! 4. Optionally the cluster-neighborhood average, weighted by `gamma`
//!    (falls back to the baseline)
//!
//! Only unknown movies abort a prediction. Missing statistics (unrated
//! movie, user without ratings, no applicable rules, empty neighborhood)
//! fall back to defaults instead of failing.
//!
//! The engine owns the rating store. Predictions take `&self` and may run in
//! parallel; `delete_rating` takes `&mut self`, so it can never overlap a
//! prediction.

use crate::config::{EngineConfig, MissingUserPolicy};
use crate::error::Result;
use data_loader::{DataIndex, MovieId, UserId};
use pipeline::FeatureBuilder;
use serde::Serialize;
use sources::{NeighborhoodError, NeighborhoodFinder, RuleMiner};
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Rating used when rounding has nothing to round
pub const NAN_RATING: f64 = 3.0;
pub const MIN_RATING: f64 = 0.5;
pub const MAX_RATING: f64 = 5.0;

/// A prediction together with every signal that went into it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub movie_average: f64,
    pub user_average: Option<f64>,
    pub baseline: f64,
    pub rule_prediction: Option<f64>,
    pub relevant_rules: usize,
    pub neighborhood_average: Option<f64>,
    /// Blended estimate
    pub value: f64,
    /// `value` rounded to the half-star scale
    pub rounded: f64,
}

/// Rating predictor over an owned rating store
#[derive(Debug)]
pub struct PredictionEngine {
    data_index: DataIndex,
    neighborhoods: NeighborhoodFinder,
    rule_miner: RuleMiner,
    config: EngineConfig,
}

impl PredictionEngine {
    /// Create an engine, rejecting out-of-range configuration values.
    pub fn new(data_index: DataIndex, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            neighborhoods: NeighborhoodFinder::new(config.cluster_config()),
            rule_miner: config.rule_miner(),
            data_index,
            config,
        })
    }

    pub fn data_index(&self) -> &DataIndex {
        &self.data_index
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn neighborhoods(&self) -> &NeighborhoodFinder {
        &self.neighborhoods
    }

    /// Mean rating of a movie, or the configured default if it is unrated
    pub fn average_movie_rating(&self, movie_id: MovieId) -> f64 {
        mean(self.data_index.movie_ratings(movie_id).map(|r| r.rating as f64))
            .unwrap_or(self.config.default_movie_rating)
    }

    /// Mean rating given by a user, `None` if they have no ratings
    pub fn average_user_rating(&self, user_id: UserId) -> Option<f64> {
        mean(self.data_index.user_ratings(user_id).map(|r| r.rating as f64))
    }

    /// Average-based prediction
    pub fn baseline(&self, user_id: UserId, movie_id: MovieId) -> f64 {
        blend_averages(
            self.average_movie_rating(movie_id),
            self.average_user_rating(user_id),
            self.config.alpha,
            self.config.missing_user_policy,
        )
    }

    /// Blended prediction for `user_id` rating `movie_id`.
    ///
    /// Fails with `UnknownMovie` if the movie isn't in the store.
    pub fn predict(&self, user_id: UserId, movie_id: MovieId) -> Result<f64> {
        self.predict_detailed(user_id, movie_id)
            .map(|prediction| prediction.value)
    }

    /// Like [`PredictionEngine::predict`], keeping the intermediate signals
    #[instrument(skip(self))]
    pub fn predict_detailed(&self, user_id: UserId, movie_id: MovieId) -> Result<Prediction> {
        let start_time = Instant::now();
        let movie = self.data_index.movie_by_id(movie_id)?;

        // Step 1: Baseline from averages
        let movie_average = self.average_movie_rating(movie_id);
        let user_average = self.average_user_rating(user_id);
        let baseline = blend_averages(
            movie_average,
            user_average,
            self.config.alpha,
            self.config.missing_user_policy,
        );

        // Step 2: Rules that apply to this movie's genres
        let rules = self
            .rule_miner
            .mined_rules(&FeatureBuilder::new(&self.data_index), user_id)?;
        let relevant = sources::relevant_rules(&rules, &movie.genre_set());
        let rule_prediction = sources::rule_weighted_prediction(&relevant, self.config.metric);
        debug!(
            mined = rules.len(),
            relevant = relevant.len(),
            ?rule_prediction,
            "Rule signal"
        );

        // Step 3: Blend rules with the baseline
        let rules_term = rule_prediction.unwrap_or(baseline);
        let mut value = rules_term * self.config.beta + baseline * (1.0 - self.config.beta);

        // Step 4: Neighborhood signal, only when weighted in
        let mut neighborhood_average = None;
        if self.config.gamma > 0.0 {
            neighborhood_average = self.neighborhood_signal(user_id, movie_id)?;
            let neighborhood_term = neighborhood_average.unwrap_or(baseline);
            value = value * (1.0 - self.config.gamma) + neighborhood_term * self.config.gamma;
        }

        debug!(
            value,
            elapsed = ?start_time.elapsed(),
            "Predicted rating"
        );
        Ok(Prediction {
            user_id,
            movie_id,
            movie_average,
            user_average,
            baseline,
            rule_prediction,
            relevant_rules: relevant.len(),
            neighborhood_average,
            value,
            rounded: round_to_half_star(value),
        })
    }

    /// Neighborhood average, treating a user with no ratings in the movie's
    /// cluster as having no neighborhood
    fn neighborhood_signal(&self, user_id: UserId, movie_id: MovieId) -> Result<Option<f64>> {
        match self.neighborhoods.neighborhood_average(
            &self.data_index,
            user_id,
            movie_id,
            self.config.user_k,
            self.config.movie_k,
        ) {
            Ok(average) => Ok(average),
            Err(NeighborhoodError::UnknownEntity { entity, id }) => {
                debug!(entity, id, "No neighborhood, falling back to baseline");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a rating from the store.
    ///
    /// Same checks and result as [`DataIndex::delete_rating`]; memoized
    /// clusters are dropped when a rating is actually removed.
    pub fn delete_rating(&mut self, user_id: UserId, movie_id: MovieId) -> Result<bool> {
        let removed = self.data_index.delete_rating(user_id, movie_id)?;
        if removed {
            self.neighborhoods.invalidate();
            info!(user_id, movie_id, "Held out rating");
        }
        Ok(removed)
    }
}

/// `movie_average·alpha + user_average·(1 - alpha)`, with the user term
/// handled by `policy` when the user has no average.
pub fn blend_averages(
    movie_average: f64,
    user_average: Option<f64>,
    alpha: f64,
    policy: MissingUserPolicy,
) -> f64 {
    match (user_average, policy) {
        (Some(user_average), _) => movie_average * alpha + user_average * (1.0 - alpha),
        (None, MissingUserPolicy::Renormalize) => movie_average,
        (None, MissingUserPolicy::ZeroContribution) => movie_average * alpha,
    }
}

/// Round to the nearest half star (ties away from zero), clamped to the
/// rating scale. NaN maps to 3.0.
pub fn round_to_half_star(value: f64) -> f64 {
    if value.is_nan() {
        return NAN_RATING;
    }
    ((value * 2.0).round() / 2.0).clamp(MIN_RATING, MAX_RATING)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}
