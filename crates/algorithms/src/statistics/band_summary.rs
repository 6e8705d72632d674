//! Band summaries for quick-look rendering of a scene
//!
//! Averaging all bands gives a single-band overview of a hyperspectral cube;
//! the 2nd/98th percentile range of that overview is a robust display stretch.

use landclust_core::raster::{Raster, RasterStack};
use landclust_core::{Error, Result};

use crate::classification::ValidMask;

/// Average of the present (non-NaN) band values of each valid pixel.
///
/// Cells outside `mask`, and cells with every band missing, are NaN. The
/// output carries the stack's transform.
pub fn band_mean(stack: &RasterStack, mask: &ValidMask) -> Result<Raster<f64>> {
    if stack.shape() != mask.shape() {
        return Err(Error::shape_mismatch(stack.shape(), mask.shape()));
    }

    let (rows, cols) = stack.shape();
    let mut output = Raster::filled(rows, cols, f64::NAN);
    output.set_transform(*stack.transform());
    output.set_nodata(Some(f64::NAN));

    for (r, c) in mask.iter_valid() {
        let (sum, count) = stack
            .pixel(r, c)
            .iter()
            .filter(|v| !v.is_nan())
            .fold((0.0, 0usize), |(s, n), &v| (s + v, n + 1));
        if count > 0 {
            output.data_mut()[[r, c]] = sum / count as f64;
        }
    }

    Ok(output)
}

/// Values at the `low` and `high` percentiles (0..=100) of the finite cells,
/// with linear interpolation between ranks.
///
/// Returns `None` when the raster has no finite cell.
pub fn percentile_range(raster: &Raster<f64>, low: f64, high: f64) -> Result<Option<(f64, f64)>> {
    for (name, p) in [("low", low), ("high", high)] {
        if !(0.0..=100.0).contains(&p) {
            return Err(Error::InvalidParameter {
                name,
                value: p.to_string(),
                reason: "percentile must be within 0..=100".into(),
            });
        }
    }
    if low > high {
        return Err(Error::InvalidParameter {
            name: "low",
            value: low.to_string(),
            reason: format!("must not exceed high ({})", high),
        });
    }

    let mut values: Vec<f64> = raster.data().iter().copied().filter(|v| v.is_finite()).collect();
    if values.is_empty() {
        return Ok(None);
    }
    values.sort_by(f64::total_cmp);

    Ok(Some((percentile(&values, low), percentile(&values, high))))
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_band_mean_respects_mask_and_gaps() {
        let stack = RasterStack::from_vec(
            vec![1.0, 3.0, f64::NAN, 8.0, 100.0, 100.0, f64::NAN, f64::NAN],
            2,
            2,
            2,
        )
        .unwrap();
        let mask = ValidMask::from_array(array![[true, true], [false, true]]);

        let mean = band_mean(&stack, &mask).unwrap();
        assert_eq!(mean.get(0, 0).unwrap(), 2.0);
        assert_eq!(mean.get(0, 1).unwrap(), 8.0);
        assert!(mean.get(1, 0).unwrap().is_nan());
        assert!(mean.get(1, 1).unwrap().is_nan());
    }

    #[test]
    fn test_percentiles_interpolate() {
        let raster = Raster::from_vec((0..=100).map(f64::from).collect(), 1, 101).unwrap();
        let (lo, hi) = percentile_range(&raster, 2.0, 98.0).unwrap().unwrap();
        assert_relative_eq!(lo, 2.0);
        assert_relative_eq!(hi, 98.0);

        let small = Raster::from_vec(vec![10.0, f64::NAN, 20.0], 1, 3).unwrap();
        let (lo, hi) = percentile_range(&small, 25.0, 50.0).unwrap().unwrap();
        assert_relative_eq!(lo, 12.5);
        assert_relative_eq!(hi, 15.0);
    }

    #[test]
    fn test_percentile_edge_cases() {
        let empty = Raster::filled(2, 2, f64::NAN);
        assert_eq!(percentile_range(&empty, 2.0, 98.0).unwrap(), None);

        let raster = Raster::filled(2, 2, 1.0);
        assert!(percentile_range(&raster, -1.0, 50.0).is_err());
        assert!(percentile_range(&raster, 60.0, 50.0).is_err());
    }
}
