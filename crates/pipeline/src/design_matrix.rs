//! The ratings-by-genre boolean design matrix used for rule mining.
//!
//! Each rating becomes one row: the movie's one-hot genres followed by a
//! one-hot encoding of the rating value itself. Rows are labelled by user
//! id; the movie id and timestamp are dropped.

use data_loader::{DataIndex, Genre, Rating, RatingBucket, UserId};
use ndarray::Array2;
use std::collections::BTreeSet;
use std::fmt;

/// A column of the design matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Item {
    Genre(Genre),
    Rating(RatingBucket),
}

impl Item {
    pub fn as_genre(&self) -> Option<Genre> {
        match self {
            Item::Genre(genre) => Some(*genre),
            Item::Rating(_) => None,
        }
    }

    pub fn as_rating(&self) -> Option<RatingBucket> {
        match self {
            Item::Rating(bucket) => Some(*bucket),
            Item::Genre(_) => None,
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Genre(genre) => write!(f, "{}", genre),
            Item::Rating(bucket) => write!(f, "{}", bucket),
        }
    }
}

/// Boolean matrix of `user rows × (genre ∪ rating-bucket) columns`
#[derive(Debug, Clone, PartialEq)]
pub struct RatingDesignMatrix {
    user_ids: Vec<UserId>,
    columns: Vec<Item>,
    data: Array2<bool>,
}

impl RatingDesignMatrix {
    /// Build the matrix from ratings in the given order.
    ///
    /// Genre columns cover the full vocabulary; rating-bucket columns only
    /// the buckets that occur. Ratings off the half-star scale are skipped.
    pub fn build<'a, I>(index: &DataIndex, ratings: I) -> Self
    where
        I: IntoIterator<Item = &'a Rating>,
    {
        let rows: Vec<(&Rating, RatingBucket)> = ratings
            .into_iter()
            .filter_map(|rating| RatingBucket::from_rating(rating.rating).map(|b| (rating, b)))
            .collect();

        let buckets: BTreeSet<RatingBucket> = rows.iter().map(|(_, bucket)| *bucket).collect();
        let columns: Vec<Item> = Genre::VOCABULARY
            .iter()
            .map(|&genre| Item::Genre(genre))
            .chain(buckets.iter().map(|&bucket| Item::Rating(bucket)))
            .collect();
        let bucket_offset = Genre::VOCABULARY.len();

        let mut data = Array2::from_elem((rows.len(), columns.len()), false);
        for (row, (rating, bucket)) in rows.iter().enumerate() {
            if let Some(movie) = index.get_movie(rating.movie_id) {
                for column in movie.genres.iter().filter_map(Genre::column) {
                    data[[row, column]] = true;
                }
            }
            if let Some(position) = buckets.iter().position(|b| b == bucket) {
                data[[row, bucket_offset + position]] = true;
            }
        }

        Self {
            user_ids: rows.iter().map(|(rating, _)| rating.user_id).collect(),
            columns,
            data,
        }
    }

    pub fn user_ids(&self) -> &[UserId] {
        &self.user_ids
    }

    pub fn columns(&self) -> &[Item] {
        &self.columns
    }

    pub fn data(&self) -> &Array2<bool> {
        &self.data
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.user_ids.is_empty()
    }

    /// Each row as the set of items that are present
    pub fn transactions(&self) -> Vec<BTreeSet<Item>> {
        self.data
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .zip(self.columns.iter())
                    .filter(|(present, _)| **present)
                    .map(|(_, item)| *item)
                    .collect()
            })
            .collect()
    }
}
