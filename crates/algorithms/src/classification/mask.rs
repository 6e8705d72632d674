//! Valid-pixel mask
//!
//! A pixel takes part in clustering and validation only when it has usable
//! spectral data and a meaningful reference label.

use ndarray::Array2;
use landclust_core::raster::{Raster, RasterStack};
use landclust_core::{Error, Result};

/// How pixels with missing (NaN) band values are treated by the mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingValues {
    /// Any missing band excludes the pixel
    #[default]
    Exclude,
    /// Pixels with some bands present stay valid and are filled by the
    /// imputer; pixels with every band missing are still excluded
    Impute,
}

/// Parameters for building the valid mask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskParams {
    /// Reference label meaning background / no data (default: 0)
    pub background: i32,
    /// Reference label meaning outside the region of interest (default: -1)
    pub outside: i32,
    /// Treatment of missing band values
    pub missing: MissingValues,
}

impl Default for MaskParams {
    fn default() -> Self {
        Self {
            background: 0,
            outside: -1,
            missing: MissingValues::Exclude,
        }
    }
}

impl MaskParams {
    /// Whether a reference label is one of the two sentinels
    pub fn is_sentinel(&self, label: i32) -> bool {
        label == self.background || label == self.outside
    }
}

/// Boolean grid of usable pixels. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidMask {
    cells: Array2<bool>,
    count: usize,
}

impl ValidMask {
    /// Wrap a boolean grid
    pub fn from_array(cells: Array2<bool>) -> Self {
        let count = cells.iter().filter(|&&v| v).count();
        Self { cells, count }
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.cells.dim()
    }

    /// Number of valid pixels
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Whether (row, col) is valid; out-of-range cells are not
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.cells.get((row, col)).copied().unwrap_or(false)
    }

    /// Valid cells as (row, col), in row-major order
    pub fn iter_valid(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cells
            .indexed_iter()
            .filter_map(|(idx, &valid)| valid.then_some(idx))
    }

    pub fn as_array(&self) -> &Array2<bool> {
        &self.cells
    }
}

/// Build the valid mask from a feature cube and a reference label grid.
///
/// With the default [`MissingValues::Exclude`] a cell is valid iff none of
/// its bands is NaN and its label is neither `background` nor `outside`.
///
/// # Errors
/// `ShapeMismatch` when the two grids differ in rows or columns.
pub fn valid_mask(
    features: &RasterStack,
    reference: &Raster<i32>,
    params: &MaskParams,
) -> Result<ValidMask> {
    if features.shape() != reference.shape() {
        return Err(Error::shape_mismatch(features.shape(), reference.shape()));
    }

    let labels = reference.data();
    let cells = Array2::from_shape_fn(features.shape(), |(r, c)| {
        if params.is_sentinel(labels[[r, c]]) {
            return false;
        }
        let pixel = features.pixel(r, c);
        match params.missing {
            MissingValues::Exclude => pixel.iter().all(|v| !v.is_nan()),
            MissingValues::Impute => pixel.iter().any(|v| !v.is_nan()),
        }
    });

    Ok(ValidMask::from_array(cells))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> (RasterStack, Raster<i32>) {
        // 2x3 scene, 2 bands
        let mut values: Vec<f64> = (0..12).map(f64::from).collect();
        values[2] = f64::NAN; // (0,1) band 0
        values[10] = f64::NAN; // (1,2) both bands
        values[11] = f64::NAN;
        let stack = RasterStack::from_vec(values, 2, 3, 2).unwrap();
        let labels = Raster::from_vec(vec![10, 20, 0, -1, 30, 40], 2, 3).unwrap();
        (stack, labels)
    }

    #[test]
    fn test_excludes_missing_and_sentinels() {
        let (stack, labels) = scene();
        let mask = valid_mask(&stack, &labels, &MaskParams::default()).unwrap();

        assert_eq!(mask.count(), 2);
        assert!(mask.get(0, 0));
        assert!(!mask.get(0, 1), "NaN band");
        assert!(!mask.get(0, 2), "background label");
        assert!(!mask.get(1, 0), "outside label");
        assert!(mask.get(1, 1));
        assert!(!mask.get(1, 2), "all bands missing");
        assert_eq!(mask.iter_valid().collect::<Vec<_>>(), vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn test_impute_mode_keeps_partial_pixels() {
        let (stack, labels) = scene();
        let params = MaskParams {
            missing: MissingValues::Impute,
            ..Default::default()
        };
        let mask = valid_mask(&stack, &labels, &params).unwrap();

        assert!(mask.get(0, 1));
        assert!(!mask.get(1, 2));
        assert_eq!(mask.count(), 3);
    }

    #[test]
    fn test_custom_sentinels() {
        let (stack, labels) = scene();
        let params = MaskParams {
            background: 10,
            outside: 30,
            missing: MissingValues::Exclude,
        };
        let mask = valid_mask(&stack, &labels, &params).unwrap();
        // 0 and -1 are ordinary labels now
        assert_eq!(mask.iter_valid().collect::<Vec<_>>(), vec![(0, 2), (1, 0)]);
    }

    #[test]
    fn test_shape_mismatch() {
        let (stack, _) = scene();
        let labels: Raster<i32> = Raster::new(3, 2);
        let err = valid_mask(&stack, &labels, &MaskParams::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::ShapeMismatch { expected: (2, 3), actual: (3, 2) }
        ));
    }
}
