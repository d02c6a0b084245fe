//! Seeded k-means over feature matrices.

use crate::error::NeighborhoodError;
use linfa::prelude::*;
use linfa_clustering::KMeans;
use ndarray::{Array1, Array2};
use rand_xoshiro::Xoshiro256Plus;
use rand_xoshiro::rand_core::SeedableRng;
use std::collections::HashSet;

const MAX_ITERATIONS: u64 = 300;
const TOLERANCE: f64 = 1e-4;

/// Assign a cluster label to every row of `data`.
///
/// The effective number of clusters is `min(k, distinct rows)`, so duplicate
/// heavy inputs (many movies share a genre combination) never ask for more
/// centroids than there are points to seed them. Labels are deterministic for
/// a given `seed`.
pub fn cluster_labels(
    data: &Array2<f64>,
    k: usize,
    seed: u64,
) -> Result<Vec<usize>, NeighborhoodError> {
    if data.nrows() == 0 {
        return Ok(Vec::new());
    }

    let k = k.min(distinct_rows(data));
    if k <= 1 {
        return Ok(vec![0; data.nrows()]);
    }

    let rng = Xoshiro256Plus::seed_from_u64(seed);
    let dataset = DatasetBase::from(data.clone());
    let model = KMeans::params_with_rng(k, rng)
        .max_n_iterations(MAX_ITERATIONS)
        .tolerance(TOLERANCE)
        .fit(&dataset)
        .map_err(|e| NeighborhoodError::Clustering(e.to_string()))?;

    let labels: Array1<usize> = model.predict(data);
    Ok(labels.to_vec())
}

/// Number of distinct rows, comparing values bit for bit
fn distinct_rows(data: &Array2<f64>) -> usize {
    data.rows()
        .into_iter()
        .map(|row| row.iter().map(|value| value.to_bits()).collect::<Vec<u64>>())
        .collect::<HashSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_separated_groups() {
        let data = array![
            [0.0, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [10.0, 10.0],
            [10.1, 10.0],
            [10.0, 10.1]
        ];
        let labels = cluster_labels(&data, 2, 42).unwrap();

        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[0], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[3], labels[5]);
        assert_ne!(labels[0], labels[3]);
    }

    #[test]
    fn test_same_seed_same_labels() {
        let data = array![[1.0, 2.0], [1.5, 1.8], [5.0, 8.0], [8.0, 8.0], [1.0, 0.6], [9.0, 11.0]];
        let first = cluster_labels(&data, 3, 7).unwrap();
        let second = cluster_labels(&data, 3, 7).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_k_capped_by_distinct_rows() {
        let data = array![[1.0, 1.0], [1.0, 1.0], [2.0, 2.0], [2.0, 2.0]];
        let labels = cluster_labels(&data, 8, 42).unwrap();

        assert_eq!(labels.len(), 4);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_ne!(labels[0], labels[2]);
    }

    #[test]
    fn test_degenerate_inputs() {
        let constant = Array2::<f64>::ones((3, 4));
        assert_eq!(cluster_labels(&constant, 8, 42).unwrap(), vec![0, 0, 0]);

        let empty = Array2::<f64>::zeros((0, 4));
        assert!(cluster_labels(&empty, 8, 42).unwrap().is_empty());
    }
}
