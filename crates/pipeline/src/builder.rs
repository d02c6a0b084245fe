//! Feature building on top of the rating store.

use crate::design_matrix::RatingDesignMatrix;
use crate::error::Result;
use crate::features::{self, FeatureMatrix};
use crate::reduction;
use crate::traits::{ClusteringFeatures, RuleMiningFeatures};
use data_loader::{DataIndex, Genre, MovieId, Rating, UserId};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument};

/// Derives feature matrices from a borrowed `DataIndex`.
///
/// Nothing is cached: every call reads the current store, so a deleted
/// rating is reflected on the next call.
#[derive(Clone, Copy)]
pub struct FeatureBuilder<'a> {
    data_index: &'a DataIndex,
}

impl<'a> FeatureBuilder<'a> {
    /// Create a new FeatureBuilder.
    pub fn new(data_index: &'a DataIndex) -> Self {
        Self { data_index }
    }

    /// One-hot genre matrix of every movie, rows ordered by movie id
    pub fn genre_one_hot(&self) -> FeatureMatrix {
        features::genre_one_hot(self.data_index.movies())
    }

    /// See [`features::standardize`]
    pub fn standardize(&self, matrix: FeatureMatrix) -> FeatureMatrix {
        matrix.map_data(features::standardize)
    }

    /// See [`reduction::reduce_dimensions`]
    pub fn reduce_dimensions(
        &self,
        matrix: FeatureMatrix,
        method: &str,
        k: usize,
    ) -> Result<FeatureMatrix> {
        matrix.try_map_data(|data| reduction::reduce_dimensions(data, method, k))
    }

    /// Ratings design matrix over all ratings, or one user's ratings
    pub fn rating_design_matrix(&self, user_id: Option<UserId>) -> RatingDesignMatrix {
        match user_id {
            Some(user_id) => {
                RatingDesignMatrix::build(self.data_index, self.data_index.user_ratings(user_id))
            }
            None => RatingDesignMatrix::build(
                self.data_index,
                self.data_index.ratings_for(None, None).iter(),
            ),
        }
    }

    /// Genre flags of a movie as 0/1 values over the vocabulary
    fn genre_flags(&self, movie_id: MovieId) -> Array1<f64> {
        let mut flags = Array1::<f64>::zeros(Genre::VOCABULARY.len());
        if let Some(movie) = self.data_index.get_movie(movie_id) {
            for column in movie.genres.iter().filter_map(Genre::column) {
                flags[column] = 1.0;
            }
        }
        flags
    }
}

impl ClusteringFeatures for FeatureBuilder<'_> {
    fn movie_features(&self) -> FeatureMatrix {
        self.standardize(self.genre_one_hot())
    }

    #[instrument(skip(self, movie_cluster), fields(cluster_size = movie_cluster.len()))]
    fn user_profiles(&self, movie_cluster: &BTreeSet<MovieId>) -> FeatureMatrix {
        let n_genres = Genre::VOCABULARY.len();

        // Ratings restricted to the cluster, grouped by user
        let mut by_user: BTreeMap<UserId, Vec<&Rating>> = BTreeMap::new();
        for &movie_id in movie_cluster {
            for rating in self.data_index.movie_ratings(movie_id) {
                by_user.entry(rating.user_id).or_default().push(rating);
            }
        }

        let in_cluster: usize = by_user.values().map(Vec::len).sum();
        if in_cluster == 0 {
            return FeatureMatrix::new(Vec::new(), Array2::zeros((0, n_genres)));
        }
        let cluster_mean = by_user
            .values()
            .flatten()
            .map(|rating| rating.rating as f64)
            .sum::<f64>()
            / in_cluster as f64;

        let users: Vec<(&UserId, &Vec<&Rating>)> = by_user.iter().collect();
        let profiles: Vec<Array1<f64>> = users
            .par_iter()
            .map(|(_, ratings)| {
                let mut profile = Array1::<f64>::zeros(n_genres);
                for rating in ratings.iter() {
                    let weighted = self.genre_flags(rating.movie_id) * rating.rating as f64;
                    // Mean imputation where the product collapsed to zero
                    profile += &weighted.mapv(|value| if value == 0.0 { cluster_mean } else { value });
                }
                profile / ratings.len() as f64
            })
            .collect();

        let mut data = Array2::<f64>::zeros((profiles.len(), n_genres));
        for (row, profile) in profiles.iter().enumerate() {
            data.row_mut(row).assign(profile);
        }

        debug!(users = profiles.len(), cluster_mean, "Built user profiles");
        FeatureMatrix::new(users.iter().map(|&(&user_id, _)| user_id).collect(), data)
    }
}

impl RuleMiningFeatures for FeatureBuilder<'_> {
    fn design_matrix(&self, user_id: Option<UserId>) -> RatingDesignMatrix {
        self.rating_design_matrix(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::Movie;

    fn test_index() -> DataIndex {
        let mut index = DataIndex::new();
        index.insert_movie(Movie {
            id: 1,
            title: "Action Movie (2000)".to_string(),
            genres: vec![Genre::Action],
        });
        index.insert_movie(Movie {
            id: 2,
            title: "Drama Movie (1995)".to_string(),
            genres: vec![Genre::Drama],
        });
        index.insert_movie(Movie {
            id: 3,
            title: "Action Drama (2005)".to_string(),
            genres: vec![Genre::Action, Genre::Drama],
        });
        for (user_id, movie_id, rating) in [(1, 1, 5.0), (1, 2, 3.0), (2, 3, 2.0), (3, 3, 4.0)] {
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
    fn test_movie_features_are_standardized() {
        let index = test_index();
        let builder = FeatureBuilder::new(&index);
        let matrix = builder.movie_features();

        assert_eq!(matrix.ids(), &[1, 2, 3]);
        let action = Genre::Action.column().unwrap();
        let column_sum: f64 = matrix.data().column(action).sum();
        assert!(column_sum.abs() < 1e-9);
        // Comedy never occurs: constant column maps to zero
        let comedy = Genre::Comedy.column().unwrap();
        assert!(matrix.data().column(comedy).iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_user_profiles_impute_cluster_mean() {
        let index = test_index();
        let builder = FeatureBuilder::new(&index);
        let cluster: BTreeSet<MovieId> = [1, 2].into_iter().collect();

        let profiles = builder.user_profiles(&cluster);
        // Only user 1 rated movies 1 and 2
        assert_eq!(profiles.ids(), &[1]);

        // Cluster mean is (5 + 3) / 2 = 4
        let row = profiles.row(1).unwrap();
        let action = Genre::Action.column().unwrap();
        let drama = Genre::Drama.column().unwrap();
        let comedy = Genre::Comedy.column().unwrap();
        assert!((row[action] - (5.0 + 4.0) / 2.0).abs() < 1e-9);
        assert!((row[drama] - (4.0 + 3.0) / 2.0).abs() < 1e-9);
        assert!((row[comedy] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_user_profiles_for_unrated_cluster() {
        let index = test_index();
        let builder = FeatureBuilder::new(&index);
        let cluster: BTreeSet<MovieId> = [42].into_iter().collect();

        assert!(builder.user_profiles(&cluster).is_empty());
    }

    #[test]
    fn test_design_matrix_reflects_deletion() {
        let mut index = test_index();
        assert_eq!(FeatureBuilder::new(&index).design_matrix(Some(1)).nrows(), 2);

        index.delete_rating(1, 2).unwrap();
        assert_eq!(FeatureBuilder::new(&index).design_matrix(Some(1)).nrows(), 1);
        assert_eq!(FeatureBuilder::new(&index).design_matrix(None).nrows(), 3);
    }

    #[test]
    fn test_reduce_dimensions_keeps_ids() {
        let index = test_index();
        let builder = FeatureBuilder::new(&index);

        let reduced = builder
            .reduce_dimensions(builder.movie_features(), "pca", 2)
            .unwrap();
        assert_eq!(reduced.ids(), &[1, 2, 3]);
        assert_eq!(reduced.ncols(), 2);
        assert!(builder.reduce_dimensions(builder.movie_features(), "lda", 2).is_err());
    }
}
