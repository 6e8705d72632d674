//! Feature extraction and missing-value imputation
//!
//! Valid pixels are flattened into a (V, bands) feature matrix in row-major
//! mask order. Missing values left in that matrix are filled per band from
//! the band's present values; masked-out pixels never contribute.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, ArrayViewMut1, Axis};
use landclust_core::raster::RasterStack;
use landclust_core::{Error, Result};

use super::mask::ValidMask;

/// Fill statistic for missing band values
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ImputeStrategy {
    /// Mean of the band's present values
    #[default]
    Mean,
    /// Median of the band's present values
    Median,
    /// A fixed value, independent of the data
    Constant(f64),
}

impl FromStr for ImputeStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "mean" => Ok(ImputeStrategy::Mean),
            "median" => Ok(ImputeStrategy::Median),
            _ => {
                let value = lower
                    .strip_prefix("constant:")
                    .and_then(|v| v.trim().parse::<f64>().ok())
                    .filter(|v| v.is_finite());
                value.map(ImputeStrategy::Constant).ok_or(Error::InvalidParameter {
                    name: "impute",
                    value: s.to_string(),
                    reason: "expected mean, median or constant:<number>".into(),
                })
            }
        }
    }
}

impl fmt::Display for ImputeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImputeStrategy::Mean => write!(f, "mean"),
            ImputeStrategy::Median => write!(f, "median"),
            ImputeStrategy::Constant(v) => write!(f, "constant:{}", v),
        }
    }
}

/// Flatten the valid pixels of a feature cube into a (V, bands) matrix.
///
/// Row `i` holds the `i`-th valid pixel in row-major order. Missing values
/// are copied through as NaN.
///
/// # Errors
/// `ShapeMismatch` when the mask does not cover the cube.
pub fn extract_features(features: &RasterStack, mask: &ValidMask) -> Result<Array2<f64>> {
    if features.shape() != mask.shape() {
        return Err(Error::shape_mismatch(features.shape(), mask.shape()));
    }

    let mut matrix = Array2::from_elem((mask.count(), features.bands()), f64::NAN);
    for (mut row, (r, c)) in matrix.outer_iter_mut().zip(mask.iter_valid()) {
        row.assign(&features.pixel(r, c));
    }
    Ok(matrix)
}

/// Fill NaN entries of a feature matrix in place, band by band.
///
/// Returns the fill value used for each band (`None` where the band had
/// nothing missing). A matrix without missing values is left untouched.
///
/// # Errors
/// `ImputationFailure` when a band has missing values but no present value
/// to derive the statistic from.
pub fn impute_matrix(matrix: &mut Array2<f64>, strategy: ImputeStrategy) -> Result<Vec<Option<f64>>> {
    matrix
        .axis_iter_mut(Axis(1))
        .enumerate()
        .map(|(band, column)| impute_band(band, column, strategy))
        .collect()
}

fn impute_band(
    band: usize,
    mut column: ArrayViewMut1<'_, f64>,
    strategy: ImputeStrategy,
) -> Result<Option<f64>> {
    if !column.iter().any(|v| v.is_nan()) {
        return Ok(None);
    }

    let mut present: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
    let fill = match strategy {
        ImputeStrategy::Constant(v) => v,
        _ if present.is_empty() => return Err(Error::ImputationFailure { band }),
        ImputeStrategy::Mean => present.iter().sum::<f64>() / present.len() as f64,
        ImputeStrategy::Median => {
            present.sort_by(f64::total_cmp);
            let n = present.len();
            if n % 2 == 0 {
                (present[n / 2 - 1] + present[n / 2]) / 2.0
            } else {
                present[n / 2]
            }
        }
    };

    column.mapv_inplace(|v| if v.is_nan() { fill } else { v });
    Ok(Some(fill))
}

/// Extract the valid pixels and fill their missing band values.
///
/// Cells outside the mask are dropped before the statistic is computed, so
/// they neither contribute to it nor get imputed.
pub fn impute_features(
    features: &RasterStack,
    mask: &ValidMask,
    strategy: ImputeStrategy,
) -> Result<Array2<f64>> {
    let mut matrix = extract_features(features, mask)?;
    let fills = impute_matrix(&mut matrix, strategy)?;

    for (band, fill) in fills.iter().enumerate() {
        if let Some(value) = fill {
            tracing::debug!(band, value, %strategy, "imputed missing band values");
        }
    }

    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_mean_fills_only_missing_entries() {
        let mut m = array![[1.0, 10.0], [f64::NAN, 20.0], [3.0, f64::NAN], [5.0, 30.0]];
        let fills = impute_matrix(&mut m, ImputeStrategy::Mean).unwrap();

        assert_relative_eq!(m[[1, 0]], 3.0);
        assert_relative_eq!(m[[2, 1]], 20.0);
        assert_eq!(m[[0, 0]], 1.0);
        assert_eq!(fills, vec![Some(3.0), Some(20.0)]);
    }

    #[test]
    fn test_median_and_constant() {
        let mut m = array![[1.0], [f64::NAN], [2.0], [10.0], [4.0]];
        impute_matrix(&mut m, ImputeStrategy::Median).unwrap();
        assert_eq!(m[[1, 0]], 3.0);

        let mut m = array![[f64::NAN], [f64::NAN]];
        impute_matrix(&mut m, ImputeStrategy::Constant(-1.5)).unwrap();
        assert_eq!(m, array![[-1.5], [-1.5]]);
    }

    #[test]
    fn test_complete_matrix_is_unchanged() {
        let original = array![[0.25, 1.0, 7.0], [0.5, 2.0, 8.0]];
        let mut m = original.clone();
        let fills = impute_matrix(&mut m, ImputeStrategy::Mean).unwrap();
        assert_eq!(m, original);
        assert!(fills.iter().all(Option::is_none));

        impute_matrix(&mut m, ImputeStrategy::Mean).unwrap();
        assert_eq!(m, original);
    }

    #[test]
    fn test_band_without_observations_fails() {
        let mut m = array![[1.0, f64::NAN], [2.0, f64::NAN]];
        match impute_matrix(&mut m, ImputeStrategy::Mean) {
            Err(Error::ImputationFailure { band }) => assert_eq!(band, 1),
            other => panic!("expected imputation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_masked_cells_do_not_contribute() {
        // 1x3 scene, one band; the masked cell carries an outlier
        let stack = RasterStack::from_vec(vec![2.0, f64::NAN, 1000.0], 1, 3, 1).unwrap();
        let mask = ValidMask::from_array(array![[true, true, false]]);

        let m = impute_features(&stack, &mask, ImputeStrategy::Mean).unwrap();
        assert_eq!(m, array![[2.0], [2.0]]);
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!("mean".parse::<ImputeStrategy>().unwrap(), ImputeStrategy::Mean);
        assert_eq!("Median".parse::<ImputeStrategy>().unwrap(), ImputeStrategy::Median);
        assert_eq!(
            "constant:0.5".parse::<ImputeStrategy>().unwrap(),
            ImputeStrategy::Constant(0.5)
        );
        assert!("mode".parse::<ImputeStrategy>().is_err());
        assert!("constant:nan".parse::<ImputeStrategy>().is_err());
        assert_eq!(ImputeStrategy::Constant(2.0).to_string(), "constant:2");
    }
}
