//! # Sources Crate
//!
//! The two data-driven signals the predictor blends with the averages.
//!
//! ## Components
//!
//! ### Neighborhood Finder
//! Cluster-based peer sets:
//! - Movies sharing a k-means cluster over standardized genre vectors
//! - Users sharing a k-means cluster over PCA-reduced rating profiles,
//!   computed within one movie cluster
//! - Optional memoization, dropped whenever the store changes
//!
//! ### Rule Miner
//! Per-user association rules:
//! - "When this user watches Horror + SciFi, they rate it 4.5"
//! - Apriori frequent itemsets (aprender) over genre and rating-bucket items
//! - Rules weighted by a chosen metric into a single predicted rating
//!
//! ## Example Usage
//!
//! ```ignore
//! use sources::{ClusterConfig, NeighborhoodFinder, RuleMiner, RuleMetric};
//! use pipeline::FeatureBuilder;
//!
//! let finder = NeighborhoodFinder::new(ClusterConfig::default());
//! let peers = finder.user_cluster(&index, user_id, movie_id, 8, 8)?;
//!
//! let rules = RuleMiner::new().mined_rules(&FeatureBuilder::new(&index), user_id)?;
//! let relevant = sources::relevant_rules(&rules, &movie.genre_set());
//! let rating = sources::rule_weighted_prediction(&relevant, RuleMetric::Confidence);
//! ```

// Public modules
pub mod error;
pub mod kmeans;
pub mod neighborhood;
pub mod rules;

// Re-export commonly used types
pub use error::{NeighborhoodError, RuleError};
pub use neighborhood::{ClusterConfig, NeighborhoodFinder};
pub use rules::{Rule, RuleMetric, RuleMiner, relevant_rules, rule_weighted_prediction};
