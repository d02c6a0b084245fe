//! Dimensionality reduction.
//!
//! PCA is fitted with `linfa-reduction`. Component signs are fixed so that
//! each component's largest-magnitude loading is positive, which keeps the
//! projection (and the clustering built on it) reproducible.

use crate::error::{FeatureError, Result};
use linfa::prelude::*;
use linfa_reduction::Pca;
use ndarray::{Array2, Axis, s};
use std::str::FromStr;

/// Supported feature-extraction methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReductionMethod {
    Pca,
}

impl FromStr for ReductionMethod {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pca" => Ok(ReductionMethod::Pca),
            _ => Err(FeatureError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// Project `data` onto `min(k, n_features)` components with the named method.
///
/// Row `i` of the output corresponds to row `i` of the input. Fails with
/// `UnsupportedMethod` for anything but `"pca"`.
pub fn reduce_dimensions(data: &Array2<f64>, method: &str, k: usize) -> Result<Array2<f64>> {
    match method.parse::<ReductionMethod>()? {
        ReductionMethod::Pca => pca(data, k),
    }
}

/// Principal component scores, strongest component first.
///
/// Components beyond what the rows can support (or any component of
/// constant data) are all zero.
fn pca(data: &Array2<f64>, k: usize) -> Result<Array2<f64>> {
    let (n_rows, n_features) = data.dim();
    let k = k.min(n_features);
    let mut scores = Array2::<f64>::zeros((n_rows, k));

    let fitted = k.min(n_rows.saturating_sub(1));
    let constant = data
        .std_axis(Axis(0), 0.0)
        .iter()
        .all(|&spread| spread == 0.0);
    if fitted == 0 || constant {
        return Ok(scores);
    }

    let model = Pca::params(fitted)
        .whiten(false)
        .fit(&DatasetBase::from(data.clone()))
        .map_err(|e| FeatureError::Reduction(e.to_string()))?;
    let projected: Array2<f64> = model.predict(data);

    // Loadings are a positive multiple of centered^T . scores
    let centered = match data.mean_axis(Axis(0)) {
        Some(mean) => data - &mean,
        None => return Ok(scores),
    };
    let loadings = centered.t().dot(&projected);

    for (j, mut column) in projected.axis_iter(Axis(1)).map(|c| c.to_owned()).enumerate() {
        let pivot = loadings
            .column(j)
            .iter()
            .fold(0.0_f64, |best, &value| if value.abs() > best.abs() { value } else { best });
        if pivot < 0.0 {
            column.mapv_inplace(|value| -value);
        }
        scores.slice_mut(s![.., j]).assign(&column);
    }

    Ok(scores)
}
