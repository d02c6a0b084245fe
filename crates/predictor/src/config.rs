//! Engine configuration.
//!
//! Every field has a default, so a JSON config file only needs the values it
//! changes:
//!
//! ```json
//! { "alpha": 0.7, "metric": "lift", "missing_user_policy": "zero_contribution" }
//! ```

use crate::error::{PredictError, Result};
use serde::{Deserialize, Serialize};
use sources::{ClusterConfig, RuleMetric, RuleMiner};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// What the baseline does when the user has no ratings to average
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingUserPolicy {
    /// Drop the user term and renormalize the weights: the baseline is the
    /// movie average
    #[default]
    Renormalize,

    /// Count the missing user average as 0
    ZeroContribution,
}

impl FromStr for MissingUserPolicy {
    type Err = PredictError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "renormalize" => Ok(MissingUserPolicy::Renormalize),
            "zero_contribution" | "zero" => Ok(MissingUserPolicy::ZeroContribution),
            _ => Err(PredictError::InvalidConfig(format!(
                "unknown missing-user policy '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for MissingUserPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingUserPolicy::Renormalize => write!(f, "renormalize"),
            MissingUserPolicy::ZeroContribution => write!(f, "zero_contribution"),
        }
    }
}

/// Tunable parameters of the prediction engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Weight of the movie average in the baseline
    pub alpha: f64,

    /// Weight of the rule prediction against the baseline
    pub beta: f64,

    /// Weight of the cluster-neighborhood average (0 disables it)
    pub gamma: f64,

    /// Rule metric used to weight rule predictions
    pub metric: RuleMetric,

    pub itemset_support: f64,
    pub rule_support: f64,

    pub movie_k: usize,
    pub user_k: usize,
    pub pca_components: usize,
    pub seed: u64,
    pub memoize: bool,

    pub missing_user_policy: MissingUserPolicy,

    /// Average used for movies nobody has rated
    pub default_movie_rating: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            beta: 0.5,
            gamma: 0.0,
            metric: RuleMetric::Confidence,
            itemset_support: 0.01,
            rule_support: 0.01,
            movie_k: 8,
            user_k: 8,
            pca_components: 5,
            seed: 42,
            memoize: false,
            missing_user_policy: MissingUserPolicy::Renormalize,
            default_movie_rating: 3.5,
        }
    }
}

impl EngineConfig {
    /// Load a JSON config file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| PredictError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&contents).map_err(|source| PredictError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value is in range
    pub fn validate(&self) -> Result<()> {
        for (name, weight) in [("alpha", self.alpha), ("beta", self.beta), ("gamma", self.gamma)] {
            if !(0.0..=1.0).contains(&weight) {
                return Err(PredictError::InvalidConfig(format!(
                    "{} must be in [0, 1], got {}",
                    name, weight
                )));
            }
        }
        if self.itemset_support.is_nan() || self.itemset_support <= 0.0 {
            return Err(PredictError::InvalidConfig(format!(
                "itemset_support must be positive, got {}",
                self.itemset_support
            )));
        }
        if self.rule_support.is_nan() {
            return Err(PredictError::InvalidConfig(
                "rule_support must be a number".to_string(),
            ));
        }
        if self.movie_k == 0 || self.user_k == 0 || self.pca_components == 0 {
            return Err(PredictError::InvalidConfig(
                "movie_k, user_k and pca_components must be at least 1".to_string(),
            ));
        }
        if !self.default_movie_rating.is_finite() {
            return Err(PredictError::InvalidConfig(format!(
                "default_movie_rating must be finite, got {}",
                self.default_movie_rating
            )));
        }
        Ok(())
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_metric(mut self, metric: RuleMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_supports(mut self, itemset_support: f64, rule_support: f64) -> Self {
        self.itemset_support = itemset_support;
        self.rule_support = rule_support;
        self
    }

    pub fn with_cluster_counts(mut self, user_k: usize, movie_k: usize) -> Self {
        self.user_k = user_k;
        self.movie_k = movie_k;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_memoize(mut self, memoize: bool) -> Self {
        self.memoize = memoize;
        self
    }

    pub fn with_missing_user_policy(mut self, policy: MissingUserPolicy) -> Self {
        self.missing_user_policy = policy;
        self
    }

    /// Clustering part of the configuration
    pub fn cluster_config(&self) -> ClusterConfig {
        ClusterConfig::default()
            .with_seed(self.seed)
            .with_memoize(self.memoize)
            .with_pca_components(self.pca_components)
    }

    /// Rule miner with the configured supports
    pub fn rule_miner(&self) -> RuleMiner {
        RuleMiner::new()
            .with_itemset_support(self.itemset_support)
            .with_rule_support(self.rule_support)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.alpha, 0.5);
        assert_eq!(config.beta, 0.5);
        assert_eq!(config.gamma, 0.0);
        assert_eq!(config.metric, RuleMetric::Confidence);
        assert_eq!(config.missing_user_policy, MissingUserPolicy::Renormalize);
        assert_eq!(config.default_movie_rating, 3.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{ "alpha": 0.7, "metric": "antecedent-support", "missing_user_policy": "zero_contribution" }}"#
        )
        .unwrap();

        let config = EngineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.alpha, 0.7);
        assert_eq!(config.metric, RuleMetric::AntecedentSupport);
        assert_eq!(config.missing_user_policy, MissingUserPolicy::ZeroContribution);
        assert_eq!(config.beta, 0.5);
        assert_eq!(config.movie_k, 8);
    }

    #[test]
    fn test_bad_json_files() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "metric": "leverage" }}"#).unwrap();
        assert!(matches!(
            EngineConfig::from_json_file(file.path()),
            Err(PredictError::ConfigParse { .. })
        ));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "alpha": 1.5 }}"#).unwrap();
        assert!(matches!(
            EngineConfig::from_json_file(file.path()),
            Err(PredictError::InvalidConfig(_))
        ));

        assert!(matches!(
            EngineConfig::from_json_file("/nonexistent/engine.json"),
            Err(PredictError::ConfigIo { .. })
        ));
    }

    #[test]
    fn test_zero_itemset_support_rejected() {
        let config = EngineConfig::default().with_supports(0.0, 0.01);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(
            "renormalize".parse::<MissingUserPolicy>().unwrap(),
            MissingUserPolicy::Renormalize
        );
        assert_eq!(
            "zero-contribution".parse::<MissingUserPolicy>().unwrap(),
            MissingUserPolicy::ZeroContribution
        );
        assert!("ignore".parse::<MissingUserPolicy>().is_err());
    }
}
