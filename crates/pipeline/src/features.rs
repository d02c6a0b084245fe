//! Numeric feature matrices for clustering.
//!
//! This module holds the id-labelled matrix type shared by the clustering
//! steps, the genre one-hot encoding of movies, and column standardization.

use data_loader::{Genre, Movie};
use ndarray::{Array2, ArrayView1, Axis};
use std::collections::{BTreeSet, HashMap};

/// Below this variance a column is treated as constant
const ZERO_VARIANCE: f64 = 1e-12;

/// A dense matrix whose rows are labelled by entity id (movie or user).
///
/// Every transformation keeps the row order, so row `i` always belongs to
/// `ids()[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    ids: Vec<u32>,
    data: Array2<f64>,
    positions: HashMap<u32, usize>,
}

impl FeatureMatrix {
    /// Create a matrix from row ids and data with one row per id.
    pub fn new(ids: Vec<u32>, data: Array2<f64>) -> Self {
        debug_assert_eq!(ids.len(), data.nrows(), "one id per row");
        let positions = ids.iter().enumerate().map(|(row, &id)| (id, row)).collect();
        Self {
            ids,
            data,
            positions,
        }
    }

    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Row index of an entity
    pub fn position(&self, id: u32) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// Feature row of an entity
    pub fn row(&self, id: u32) -> Option<ArrayView1<'_, f64>> {
        self.position(id).map(|row| self.data.row(row))
    }

    /// Replace the data with a transformed version, keeping row identity.
    pub fn map_data<F>(self, transform: F) -> Self
    where
        F: FnOnce(&Array2<f64>) -> Array2<f64>,
    {
        let data = transform(&self.data);
        debug_assert_eq!(data.nrows(), self.ids.len(), "transform must keep rows");
        Self { data, ..self }
    }

    /// Fallible variant of [`FeatureMatrix::map_data`]
    pub fn try_map_data<F, E>(self, transform: F) -> Result<Self, E>
    where
        F: FnOnce(&Array2<f64>) -> Result<Array2<f64>, E>,
    {
        let data = transform(&self.data)?;
        debug_assert_eq!(data.nrows(), self.ids.len(), "transform must keep rows");
        Ok(Self { data, ..self })
    }
}

/// One-hot encode the genres of each movie.
///
/// Rows follow the iteration order of `movies`; columns follow
/// `Genre::VOCABULARY`. The "(no genres listed)" sentinel has no column, so
/// such movies get an all-zero row.
pub fn genre_one_hot<'a, I>(movies: I) -> FeatureMatrix
where
    I: IntoIterator<Item = &'a Movie>,
{
    let movies: Vec<&Movie> = movies.into_iter().collect();
    let mut data = Array2::<f64>::zeros((movies.len(), Genre::VOCABULARY.len()));

    for (row, movie) in movies.iter().enumerate() {
        for column in movie.genres.iter().filter_map(Genre::column) {
            data[[row, column]] = 1.0;
        }
    }

    FeatureMatrix::new(movies.iter().map(|movie| movie.id).collect(), data)
}

/// Recover the genre set from a one-hot row (nonzero columns).
pub fn decode_genres(row: ArrayView1<'_, f64>) -> BTreeSet<Genre> {
    row.iter()
        .zip(Genre::VOCABULARY.iter())
        .filter(|(value, _)| **value != 0.0)
        .map(|(_, genre)| *genre)
        .collect()
}

/// Column-wise zero-mean, unit-variance scaling.
///
/// Uses the population variance. Constant columns map to 0 instead of
/// dividing by zero.
pub fn standardize(data: &Array2<f64>) -> Array2<f64> {
    if data.nrows() == 0 {
        return data.clone();
    }

    let mut scaled = data.clone();
    for mut column in scaled.axis_iter_mut(Axis(1)) {
        let n = column.len() as f64;
        let mean = column.sum() / n;
        let variance = column.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

        if variance <= ZERO_VARIANCE {
            column.fill(0.0);
        } else {
            let std_dev = variance.sqrt();
            column.mapv_inplace(|x| (x - mean) / std_dev);
        }
    }
    scaled
}
