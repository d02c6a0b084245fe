//! Integration tests for the pipeline.
//!
//! These tests run the feature builder against a small in-memory store and
//! check the matrices the clustering and rule-mining stages consume.

use data_loader::{DataIndex, Genre, Movie, Rating};
use pipeline::{
    ClusteringFeatures, FeatureBuilder, Item, RuleMiningFeatures, decode_genres, genre_one_hot,
};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn create_test_index() -> DataIndex {
    let mut index = DataIndex::new();

    let movies = [
        (1, "Toy Story (1995)", vec![Genre::Adventure, Genre::Animation, Genre::Children, Genre::Comedy, Genre::Fantasy]),
        (2, "Jumanji (1995)", vec![Genre::Adventure, Genre::Children, Genre::Fantasy]),
        (3, "Heat (1995)", vec![Genre::Action, Genre::Crime, Genre::Thriller]),
        (4, "Se7en (1995)", vec![Genre::Mystery, Genre::Thriller]),
        (5, "Pulp Fiction (1994)", vec![Genre::Comedy, Genre::Crime, Genre::Drama, Genre::Thriller]),
    ];
    for (id, title, genres) in movies {
        index.insert_movie(Movie {
            id,
            title: title.to_string(),
            genres,
        });
    }

    let ratings = [
        (1, 1, 4.0),
        (1, 3, 4.0),
        (1, 5, 5.0),
        (2, 1, 3.5),
        (2, 2, 3.0),
        (3, 3, 4.5),
        (3, 4, 2.0),
        (4, 5, 1.0),
    ];
    for (user_id, movie_id, rating) in ratings {
        index.insert_rating(Rating {
            user_id,
            movie_id,
            rating,
            timestamp: 964982703,
        });
    }

    index
}

#[test]
fn test_movie_features_cover_every_movie() {
    let index = create_test_index();
    let builder = FeatureBuilder::new(&index);

    let features = builder.movie_features();
    assert_eq!(features.ids(), &[1, 2, 3, 4, 5]);
    assert_eq!(features.ncols(), Genre::VOCABULARY.len());

    let reduced = builder.reduce_dimensions(features, "pca", 5).unwrap();
    assert_eq!(reduced.nrows(), 5);
    assert_eq!(reduced.ncols(), 5);
    assert!(reduced.data().iter().all(|x| x.is_finite()));
}

#[test]
fn test_user_profiles_only_include_cluster_raters() {
    let index = create_test_index();
    let builder = FeatureBuilder::new(&index);

    let cluster: BTreeSet<u32> = [3, 4].into_iter().collect();
    let profiles = builder.user_profiles(&cluster);

    assert_eq!(profiles.ids(), &[1, 3]);
    assert_eq!(profiles.ncols(), 19);
    assert!(profiles.position(2).is_none());
}

#[test]
fn test_design_matrix_for_user_matches_ratings() {
    let index = create_test_index();
    let builder = FeatureBuilder::new(&index);

    let all = builder.design_matrix(None);
    assert_eq!(all.nrows(), index.rating_count());

    let user = builder.design_matrix(Some(1));
    assert_eq!(user.nrows(), 3);
    assert!(user.user_ids().iter().all(|&id| id == 1));

    let transactions = user.transactions();
    assert!(transactions[1].contains(&Item::Genre(Genre::Crime)));
    assert!(transactions[1].iter().any(|item| item.as_rating().is_some()));
}

#[test]
fn test_deleted_rating_disappears_from_features() {
    let mut index = create_test_index();
    index.delete_rating(4, 5).unwrap();

    let builder = FeatureBuilder::new(&index);
    assert!(builder.design_matrix(Some(4)).is_empty());

    let cluster: BTreeSet<u32> = [5].into_iter().collect();
    assert_eq!(builder.user_profiles(&cluster).ids(), &[1]);
}

fn arb_genres() -> impl Strategy<Value = Vec<Genre>> {
    proptest::collection::vec(proptest::sample::select(Genre::VOCABULARY.to_vec()), 0..6)
}

proptest! {
    #[test]
    fn prop_one_hot_round_trip(genres in arb_genres()) {
        let movie = Movie { id: 1, title: "Generated (2000)".to_string(), genres };
        let matrix = genre_one_hot(std::slice::from_ref(&movie));
        prop_assert_eq!(decode_genres(matrix.row(1).unwrap()), movie.genre_set());
    }
}
