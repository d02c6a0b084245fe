//! Hold-out evaluation.
//!
//! A random sample of ratings is removed from the store, then each removed
//! rating is predicted from what remains. The model and the average-only
//! baseline are scored by mean squared error, and both are also reported
//! relative to the variance of the remaining ratings.

use crate::engine::PredictionEngine;
use crate::error::{PredictError, Result};
use data_loader::Rating;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;
use rayon::prelude::*;
use serde::Serialize;
use std::time::Instant;
use tracing::{info, instrument};

/// Scores of one evaluation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub sample_size: usize,
    pub mse_model: f64,
    pub mse_baseline: f64,
    /// Sample variance of the ratings left in the store
    pub variance: Option<f64>,
    pub normalized_model: Option<f64>,
    pub normalized_baseline: Option<f64>,
}

/// Runs seeded hold-out evaluations
#[derive(Debug, Clone)]
pub struct Evaluator {
    seed: u64,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self { seed: 42 }
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Hold out `sample_size` ratings and score the predictions for them.
    ///
    /// Every sampled rating is deleted before the first prediction, so no
    /// prediction sees any held-out value. The store keeps the deletions.
    #[instrument(skip(self, engine))]
    pub fn run(&self, engine: &mut PredictionEngine, sample_size: usize) -> Result<EvaluationReport> {
        let start_time = Instant::now();

        let ratings = engine.data_index().ratings_for(None, None);
        if sample_size > ratings.len() {
            return Err(PredictError::SampleTooLarge {
                requested: sample_size,
                available: ratings.len(),
            });
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let held_out: Vec<Rating> = index::sample(&mut rng, ratings.len(), sample_size)
            .into_iter()
            .map(|i| ratings[i])
            .collect();

        for rating in &held_out {
            engine.delete_rating(rating.user_id, rating.movie_id)?;
        }
        info!(held_out = held_out.len(), "Deleted sampled ratings");

        let engine: &PredictionEngine = engine;
        let scored: Vec<(f64, f64, f64)> = held_out
            .par_iter()
            .map(|rating| {
                let prediction = engine.predict_detailed(rating.user_id, rating.movie_id)?;
                Ok((rating.rating as f64, prediction.value, prediction.baseline))
            })
            .collect::<Result<_>>()?;

        let mse_model = mean_squared_error(scored.iter().map(|&(truth, model, _)| (truth, model)));
        let mse_baseline =
            mean_squared_error(scored.iter().map(|&(truth, _, baseline)| (truth, baseline)));

        let remaining: Vec<f64> = engine
            .data_index()
            .ratings_for(None, None)
            .iter()
            .map(|rating| rating.rating as f64)
            .collect();
        let variance = sample_variance(&remaining).filter(|&variance| variance > 0.0);

        let report = EvaluationReport {
            sample_size,
            mse_model,
            mse_baseline,
            variance,
            normalized_model: variance.map(|variance| mse_model / variance),
            normalized_baseline: variance.map(|variance| mse_baseline / variance),
        };

        info!(
            mse_model,
            mse_baseline,
            elapsed = ?start_time.elapsed(),
            "Evaluation finished"
        );
        Ok(report)
    }
}

/// Mean of squared differences; 0 for an empty sample
fn mean_squared_error(pairs: impl Iterator<Item = (f64, f64)>) -> f64 {
    let (sum, count) = pairs.fold((0.0, 0usize), |(sum, count), (truth, predicted)| {
        (sum + (truth - predicted).powi(2), count + 1)
    });
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Variance with one degree of freedom removed; `None` below two values
fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    Some(values.iter().map(|value| (value - mean).powi(2)).sum::<f64>() / (n - 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use data_loader::{DataIndex, Genre, Movie};

    fn create_engine() -> PredictionEngine {
        let mut index = DataIndex::new();
        for id in 1..=6 {
            let genres = if id % 2 == 0 {
                vec![Genre::Drama]
            } else {
                vec![Genre::Comedy, Genre::Romance]
            };
            index.insert_movie(Movie {
                id,
                title: format!("Movie {} (2001)", id),
                genres,
            });
        }
        for user_id in 1..=5 {
            for movie_id in 1..=6 {
                let half_stars = (user_id + movie_id) % 10 + 1;
                index.insert_rating(Rating {
                    user_id,
                    movie_id,
                    rating: half_stars as f32 / 2.0,
                    timestamp: 0,
                });
            }
        }
        PredictionEngine::new(index, EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_sample_too_large() {
        let mut engine = create_engine();
        assert!(matches!(
            Evaluator::new().run(&mut engine, 31),
            Err(PredictError::SampleTooLarge {
                requested: 31,
                available: 30
            })
        ));
        assert_eq!(engine.data_index().rating_count(), 30);
    }

    #[test]
    fn test_run_deletes_sample_and_scores() {
        let mut engine = create_engine();
        let report = Evaluator::new().run(&mut engine, 10).unwrap();

        assert_eq!(report.sample_size, 10);
        assert_eq!(engine.data_index().rating_count(), 20);
        assert!(report.mse_model.is_finite() && report.mse_model >= 0.0);
        assert!(report.mse_baseline.is_finite() && report.mse_baseline >= 0.0);

        let variance = report.variance.unwrap();
        assert!((report.normalized_model.unwrap() - report.mse_model / variance).abs() < 1e-12);
    }

    #[test]
    fn test_same_seed_same_report() {
        let first = Evaluator::new().with_seed(7).run(&mut create_engine(), 8).unwrap();
        let second = Evaluator::new().with_seed(7).run(&mut create_engine(), 8).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_helpers() {
        assert_eq!(mean_squared_error([(4.0, 3.0), (2.0, 4.0)].into_iter()), 2.5);
        assert_eq!(mean_squared_error(std::iter::empty()), 0.0);
        assert_eq!(sample_variance(&[1.0, 2.0, 3.0]), Some(1.0));
        assert_eq!(sample_variance(&[4.0]), None);
    }
}
