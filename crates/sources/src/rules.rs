//! Genre → rating association rules mined per user.
//!
//! A user's rating history becomes one transaction per rating (the movie's
//! genres plus the rating bucket). Frequent itemsets are mined with
//! aprender's Apriori, and only rules that predict a rating bucket from a set
//! of genres are kept.
//!
//! Metrics: `confidence = support(A ∪ C) / support(A)` and
//! `lift = confidence / support(C)`.

use crate::error::RuleError;
use aprender::mining::Apriori;
use data_loader::{Genre, RatingBucket, UserId};
use pipeline::{Item, RatingDesignMatrix, RuleMiningFeatures};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument};

/// A mined rule `genres → rating bucket` with its metrics
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub antecedent: BTreeSet<Genre>,
    pub consequent: RatingBucket,
    pub antecedent_support: f64,
    pub consequent_support: f64,
    pub support: f64,
    pub confidence: f64,
    pub lift: f64,
}

impl Rule {
    /// Value of the chosen metric for this rule
    pub fn metric(&self, metric: RuleMetric) -> f64 {
        match metric {
            RuleMetric::AntecedentSupport => self.antecedent_support,
            RuleMetric::ConsequentSupport => self.consequent_support,
            RuleMetric::Support => self.support,
            RuleMetric::Confidence => self.confidence,
            RuleMetric::Lift => self.lift,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let genres: Vec<&str> = self.antecedent.iter().map(Genre::label).collect();
        write!(
            f,
            "{{{}}} -> {} (support {:.3}, confidence {:.3}, lift {:.3})",
            genres.join(", "),
            self.consequent,
            self.support,
            self.confidence,
            self.lift
        )
    }
}

/// Rule metric used as the weight of a rule's predicted rating
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RuleMetric {
    AntecedentSupport,
    ConsequentSupport,
    Support,
    #[default]
    Confidence,
    Lift,
}

impl RuleMetric {
    pub fn name(&self) -> &'static str {
        match self {
            RuleMetric::AntecedentSupport => "antecedent support",
            RuleMetric::ConsequentSupport => "consequent support",
            RuleMetric::Support => "support",
            RuleMetric::Confidence => "confidence",
            RuleMetric::Lift => "lift",
        }
    }
}

impl fmt::Display for RuleMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RuleMetric {
    type Err = RuleError;

    /// Accepts `antecedent support`, `antecedent-support` and
    /// `antecedent_support` alike, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "antecedent support" => Ok(RuleMetric::AntecedentSupport),
            "consequent support" => Ok(RuleMetric::ConsequentSupport),
            "support" => Ok(RuleMetric::Support),
            "confidence" => Ok(RuleMetric::Confidence),
            "lift" => Ok(RuleMetric::Lift),
            _ => Err(RuleError::UnsupportedMetric(s.to_string())),
        }
    }
}

impl TryFrom<String> for RuleMetric {
    type Error = RuleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RuleMetric> for String {
    fn from(metric: RuleMetric) -> Self {
        metric.name().to_string()
    }
}

/// Mines genre → rating rules from one user's ratings
#[derive(Debug, Clone)]
pub struct RuleMiner {
    /// Minimum support for frequent itemsets; bounds the search space
    itemset_support: f64,

    /// Minimum support for a rule to be kept
    rule_support: f64,
}

impl Default for RuleMiner {
    fn default() -> Self {
        Self {
            itemset_support: 0.01,
            rule_support: 0.01,
        }
    }
}

impl RuleMiner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the minimum itemset support (default: 0.01)
    pub fn with_itemset_support(mut self, support: f64) -> Self {
        self.itemset_support = support;
        self
    }

    /// Configure the minimum rule support (default: 0.01)
    pub fn with_rule_support(mut self, support: f64) -> Self {
        self.rule_support = support;
        self
    }

    /// Rules predicting a rating bucket from genres, mined from the user's
    /// rows of the design matrix.
    ///
    /// Returns an empty list when the user has no ratings or nothing clears
    /// the support threshold. Fails with `InvalidSupport` unless the itemset
    /// support is a positive number.
    #[instrument(skip(self, features))]
    pub fn mined_rules<F>(&self, features: &F, user_id: UserId) -> Result<Vec<Rule>, RuleError>
    where
        F: RuleMiningFeatures + ?Sized,
    {
        if self.itemset_support.is_nan() || self.itemset_support <= 0.0 {
            return Err(RuleError::InvalidSupport(self.itemset_support));
        }

        let matrix = features.design_matrix(Some(user_id));
        if matrix.is_empty() {
            debug!("No ratings to mine");
            return Ok(Vec::new());
        }

        let mut apriori = Apriori::new().with_min_support(self.itemset_support);
        apriori.fit(&column_transactions(&matrix));
        let itemsets: HashMap<BTreeSet<usize>, f64> = apriori
            .get_frequent_itemsets()
            .iter()
            .map(|(itemset, support)| (itemset.iter().copied().collect(), *support))
            .collect();

        let rules = rating_rules(matrix.columns(), &itemsets, self.rule_support);

        debug!(
            itemsets = itemsets.len(),
            rules = rules.len(),
            "Mined rating rules"
        );
        Ok(rules)
    }
}

/// Design matrix rows as the column positions of their items
fn column_transactions(matrix: &RatingDesignMatrix) -> Vec<Vec<usize>> {
    let positions: HashMap<Item, usize> = matrix
        .columns()
        .iter()
        .enumerate()
        .map(|(column, &item)| (item, column))
        .collect();

    matrix
        .transactions()
        .iter()
        .map(|row| row.iter().filter_map(|item| positions.get(item).copied()).collect())
        .collect()
}

/// `genres → bucket` rules from the frequent itemsets holding one rating
/// bucket and at least one genre, keeping those with `support >= min_support`.
///
/// Every subset of a frequent itemset is frequent, so the antecedent and
/// consequent supports are always among `itemsets`.
fn rating_rules(
    columns: &[Item],
    itemsets: &HashMap<BTreeSet<usize>, f64>,
    min_support: f64,
) -> Vec<Rule> {
    let mut rules: Vec<Rule> = itemsets
        .iter()
        .filter(|&(_, &support)| support >= min_support)
        .filter_map(|(itemset, &support)| {
            let (buckets, genres): (BTreeSet<usize>, BTreeSet<usize>) = itemset
                .iter()
                .copied()
                .partition(|&column| matches!(columns.get(column), Some(Item::Rating(_))));
            if buckets.len() != 1 || genres.is_empty() {
                return None;
            }
            let bucket = *buckets.first()?;

            let antecedent_support = *itemsets.get(&genres)?;
            let consequent_support = *itemsets.get(&BTreeSet::from([bucket]))?;
            let confidence = support / antecedent_support;
            Some(Rule {
                antecedent: genres
                    .iter()
                    .map(|&column| columns.get(column).and_then(Item::as_genre))
                    .collect::<Option<BTreeSet<Genre>>>()?,
                consequent: columns.get(bucket).and_then(Item::as_rating)?,
                antecedent_support,
                consequent_support,
                support,
                confidence,
                lift: confidence / consequent_support,
            })
        })
        .collect();

    rules.sort_by(|a, b| (&a.antecedent, a.consequent).cmp(&(&b.antecedent, b.consequent)));
    rules
}

/// Rules whose antecedent is a subset of `genres`
pub fn relevant_rules<'a, I>(rules: I, genres: &BTreeSet<Genre>) -> Vec<Rule>
where
    I: IntoIterator<Item = &'a Rule>,
{
    rules
        .into_iter()
        .filter(|rule| rule.antecedent.is_subset(genres))
        .cloned()
        .collect()
}

/// Metric-weighted mean of the rules' predicted ratings.
///
/// `None` when there are no rules or all weights are zero.
pub fn rule_weighted_prediction(rules: &[Rule], metric: RuleMetric) -> Option<f64> {
    let (weighted_sum, total_weight) = rules.iter().fold((0.0, 0.0), |(sum, total), rule| {
        let weight = rule.metric(metric);
        (sum + rule.consequent.value() * weight, total + weight)
    });

    if total_weight == 0.0 || !total_weight.is_finite() {
        return None;
    }
    Some(weighted_sum / total_weight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::{DataIndex, Movie, Rating};
    use pipeline::FeatureBuilder;

    fn bucket(rating: f32) -> RatingBucket {
        RatingBucket::from_rating(rating).unwrap()
    }

    fn rule(genres: &[Genre], rating: f32, confidence: f64) -> Rule {
        Rule {
            antecedent: genres.iter().copied().collect(),
            consequent: bucket(rating),
            antecedent_support: 0.5,
            consequent_support: 0.5,
            support: 0.25,
            confidence,
            lift: confidence / 0.5,
        }
    }

    fn test_index() -> DataIndex {
        let mut index = DataIndex::new();
        index.insert_movie(Movie {
            id: 1,
            title: "Alien (1979)".to_string(),
            genres: vec![Genre::Horror, Genre::SciFi],
        });
        index.insert_movie(Movie {
            id: 2,
            title: "Aliens (1986)".to_string(),
            genres: vec![Genre::Action, Genre::Horror, Genre::SciFi],
        });
        index.insert_movie(Movie {
            id: 3,
            title: "Annie Hall (1977)".to_string(),
            genres: vec![Genre::Comedy, Genre::Romance],
        });
        for (user_id, movie_id, rating) in [(1, 1, 5.0), (1, 2, 5.0), (1, 3, 2.0), (2, 3, 4.0)] {
            index.insert_rating(Rating {
                user_id,
                movie_id,
                rating,
                timestamp: 0,
            });
        }
        index
    }

    #[test]
    fn test_metric_names() {
        assert_eq!("confidence".parse::<RuleMetric>().unwrap(), RuleMetric::Confidence);
        assert_eq!(
            "antecedent support".parse::<RuleMetric>().unwrap(),
            RuleMetric::AntecedentSupport
        );
        assert_eq!(
            "Consequent-Support".parse::<RuleMetric>().unwrap(),
            RuleMetric::ConsequentSupport
        );
        assert_eq!(
            "leverage".parse::<RuleMetric>(),
            Err(RuleError::UnsupportedMetric("leverage".to_string()))
        );
        assert_eq!(RuleMetric::default(), RuleMetric::Confidence);
    }

    #[test]
    fn test_mined_rules_predict_ratings_from_genres() {
        let index = test_index();
        let rules = RuleMiner::new()
            .mined_rules(&FeatureBuilder::new(&index), 1)
            .unwrap();

        assert!(!rules.is_empty());
        // Horror and SciFi always come with five stars for user 1
        let horror = rules
            .iter()
            .find(|rule| rule.antecedent == BTreeSet::from([Genre::Horror]))
            .unwrap();
        assert_eq!(horror.consequent, bucket(5.0));
        assert!((horror.confidence - 1.0).abs() < 1e-12);
        assert!((horror.support - 2.0 / 3.0).abs() < 1e-12);
        assert!((horror.lift - 1.5).abs() < 1e-12);

        for rule in &rules {
            assert!(!rule.antecedent.is_empty());
        }
    }

    #[test]
    fn test_mined_rules_edge_cases() {
        let index = test_index();
        let features = FeatureBuilder::new(&index);

        assert!(RuleMiner::new().mined_rules(&features, 99).unwrap().is_empty());
        // Support above 1 can never be met
        assert!(
            RuleMiner::new()
                .with_itemset_support(1.5)
                .mined_rules(&features, 1)
                .unwrap()
                .is_empty()
        );
        assert_eq!(
            RuleMiner::new().with_itemset_support(0.0).mined_rules(&features, 1),
            Err(RuleError::InvalidSupport(0.0))
        );
    }

    type Row = (BTreeSet<Genre>, RatingBucket);

    const PALETTE: [Genre; 5] = [
        Genre::Action,
        Genre::Comedy,
        Genre::Drama,
        Genre::Horror,
        Genre::SciFi,
    ];

    /// Movies 1..=31 carry every non-empty subset of the palette
    fn synthetic_index() -> DataIndex {
        let mut index = DataIndex::new();
        for id in 1..=31u32 {
            let genres = PALETTE
                .iter()
                .enumerate()
                .filter(|&(bit, _)| (id >> bit) & 1 == 1)
                .map(|(_, &genre)| genre)
                .collect();
            index.insert_movie(Movie {
                id,
                title: format!("Movie {} (1999)", id),
                genres,
            });
            for user_id in 1..=3u32 {
                let half_stars = (id * (user_id + 2)) % 10 + 1;
                index.insert_rating(Rating {
                    user_id,
                    movie_id: id,
                    rating: half_stars as f32 / 2.0,
                    timestamp: 0,
                });
            }
        }
        index
    }

    fn share<F: Fn(&Row) -> bool>(rows: &[Row], predicate: F) -> f64 {
        rows.iter().filter(|row| predicate(row)).count() as f64 / rows.len() as f64
    }

    #[test]
    fn test_rule_metrics_match_counts() {
        let index = synthetic_index();
        let features = FeatureBuilder::new(&index);
        let miner = RuleMiner::new()
            .with_itemset_support(0.05)
            .with_rule_support(0.05);

        for user_id in 1..=3 {
            let rows: Vec<Row> = index
                .user_ratings(user_id)
                .map(|rating| {
                    let genres = index.movie_by_id(rating.movie_id).unwrap().genre_set();
                    (genres, bucket(rating.rating))
                })
                .collect();
            let rules = miner.mined_rules(&features, user_id).unwrap();
            assert!(!rules.is_empty());

            for rule in &rules {
                let antecedent = share(&rows, |(genres, _)| rule.antecedent.is_subset(genres));
                let consequent = share(&rows, |(_, rated)| *rated == rule.consequent);
                let support = share(&rows, |(genres, rated)| {
                    *rated == rule.consequent && rule.antecedent.is_subset(genres)
                });

                assert!(!rule.antecedent.is_empty());
                assert!(support >= 0.05);
                assert!((rule.antecedent_support - antecedent).abs() < 1e-12);
                assert!((rule.consequent_support - consequent).abs() < 1e-12);
                assert!((rule.support - support).abs() < 1e-12);
                assert!((rule.confidence - support / antecedent).abs() < 1e-12);
                assert!((rule.lift - support / antecedent / consequent).abs() < 1e-12);
            }

            // Every single-genre rule above the threshold is found
            for genre in PALETTE {
                for half_stars in 1..=10 {
                    let rated_bucket = bucket(half_stars as f32 / 2.0);
                    let support = share(&rows, |(genres, rated)| {
                        *rated == rated_bucket && genres.contains(&genre)
                    });
                    if support >= 0.05 {
                        assert!(rules.iter().any(|rule| {
                            rule.antecedent == BTreeSet::from([genre])
                                && rule.consequent == rated_bucket
                        }));
                    }
                }
            }
        }
    }

    #[test]
    fn test_relevant_rules_subset() {
        let rules = vec![
            rule(&[Genre::Action], 4.0, 1.0),
            rule(&[Genre::Action, Genre::Drama], 3.0, 1.0),
            rule(&[Genre::Comedy], 2.0, 1.0),
        ];
        let genres: BTreeSet<Genre> = [Genre::Action, Genre::Thriller].into_iter().collect();

        let relevant = relevant_rules(&rules, &genres);
        assert_eq!(relevant.len(), 1);
        assert_eq!(relevant[0].consequent, bucket(4.0));
    }

    #[test]
    fn test_rule_weighted_prediction() {
        let rules = vec![
            rule(&[Genre::Action], 4.0, 0.75),
            rule(&[Genre::Drama], 2.0, 0.25),
        ];
        let prediction = rule_weighted_prediction(&rules, RuleMetric::Confidence).unwrap();
        assert!((prediction - 3.5).abs() < 1e-12);

        // Equal support weights give the plain mean
        let prediction = rule_weighted_prediction(&rules, RuleMetric::Support).unwrap();
        assert!((prediction - 3.0).abs() < 1e-12);

        assert_eq!(rule_weighted_prediction(&[], RuleMetric::Confidence), None);
        let zero = vec![rule(&[Genre::Action], 4.0, 0.0)];
        assert_eq!(rule_weighted_prediction(&zero, RuleMetric::Confidence), None);
    }
}
