//! Class / cluster area fractions
//!
//! The share of counted cells taken by each distinct value of a categorical
//! grid, e.g. the land-type distribution of a cluster grid.

use std::collections::BTreeMap;
use landclust_core::raster::Raster;

/// Fraction of cells per distinct value, ascending by value.
///
/// Cells equal to any value in `ignore` are left out of both the numerator
/// and the denominator. Returns an empty map when nothing is counted.
///
/// # Example
/// ```ignore
/// let shares = class_fractions(&result.cluster_grid, &[UNASSIGNED]);
/// ```
pub fn class_fractions(grid: &Raster<i32>, ignore: &[i32]) -> BTreeMap<i32, f64> {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for &value in grid.data().iter() {
        if !ignore.contains(&value) {
            *counts.entry(value).or_default() += 1;
        }
    }

    let total: usize = counts.values().sum();
    counts
        .into_iter()
        .map(|(value, count)| (value, count as f64 / total as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fractions_skip_ignored_values() {
        let grid = Raster::from_vec(vec![-1, 0, 0, 2, -1, 0, 2, 5], 2, 4).unwrap();
        let shares = class_fractions(&grid, &[-1]);

        assert_eq!(shares.keys().copied().collect::<Vec<_>>(), vec![0, 2, 5]);
        assert_relative_eq!(shares[&0], 0.5);
        assert_relative_eq!(shares[&2], 1.0 / 3.0);
        assert_relative_eq!(shares.values().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_all_ignored() {
        let grid = Raster::filled(3, 3, -1);
        assert!(class_fractions(&grid, &[-1]).is_empty());
    }
}
