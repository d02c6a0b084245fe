//! Prediction engine for MovieLens ratings.
//!
//! This crate ties the rating store, the neighborhood finder and the rule
//! miner together: `PredictionEngine` blends their signals into one rating,
//! and `Evaluator` measures it against held-out ratings.

pub mod config;
pub mod engine;
pub mod error;
pub mod evaluation;

pub use config::{EngineConfig, MissingUserPolicy};
pub use engine::{Prediction, PredictionEngine, blend_averages, round_to_half_star};
pub use error::{PredictError, Result};
pub use evaluation::{EvaluationReport, Evaluator};
