//! Cross-tabulation of reference classes against clusters
//!
//! Rows are harmonized reference classes, columns are cluster ids.
//! `overlap[i][j]` counts valid pixels of class `i` placed in cluster `j`;
//! `accuracy[i][j]` is that count divided by the size of class `i`.

use ndarray::{Array1, Array2, Axis};
use landclust_core::{Error, Result};

/// Overlap counts and class-normalized accuracy fractions
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationMatrices {
    /// Raw co-occurrence counts, shape (n_classes, k)
    pub overlap: Array2<u64>,
    /// Overlap normalized by class size, shape (n_classes, k).
    /// Rows of empty classes are all zero.
    pub accuracy: Array2<f64>,
}

impl ValidationMatrices {
    /// Pixels per reference class (row sums of the overlap matrix)
    pub fn class_totals(&self) -> Array1<u64> {
        self.overlap.sum_axis(Axis(1))
    }

    /// Pixels per cluster (column sums of the overlap matrix)
    pub fn cluster_totals(&self) -> Array1<u64> {
        self.overlap.sum_axis(Axis(0))
    }

    /// Total number of tabulated pixels
    pub fn total(&self) -> u64 {
        self.overlap.sum()
    }

    /// Cluster holding the largest share of each class (`None` for empty
    /// classes); ties resolve to the lowest cluster id
    pub fn dominant_clusters(&self) -> Vec<Option<usize>> {
        self.overlap
            .outer_iter()
            .map(|row| {
                let mut best: Option<(usize, u64)> = None;
                for (j, &count) in row.iter().enumerate() {
                    if count > 0 && best.map_or(true, |(_, b)| count > b) {
                        best = Some((j, count));
                    }
                }
                best.map(|(j, _)| j)
            })
            .collect()
    }
}

/// Build overlap and accuracy matrices.
///
/// `classes` and `clusters` are aligned per valid pixel. Every pair is
/// counted exactly once. A class with no pixels yields an all-zero accuracy
/// row instead of a division by zero.
///
/// # Errors
/// `InvalidParameter` when the sequences differ in length or an entry is out
/// of range for `n_classes` / `k`.
pub fn build_validation_matrices(
    classes: &[usize],
    clusters: &[usize],
    n_classes: usize,
    k: usize,
) -> Result<ValidationMatrices> {
    if classes.len() != clusters.len() {
        return Err(Error::InvalidParameter {
            name: "clusters",
            value: clusters.len().to_string(),
            reason: format!("expected one assignment per class label ({})", classes.len()),
        });
    }

    let mut overlap = Array2::<u64>::zeros((n_classes, k));
    for (&class, &cluster) in classes.iter().zip(clusters) {
        if class >= n_classes {
            return Err(Error::InvalidParameter {
                name: "classes",
                value: class.to_string(),
                reason: format!("class index must be below {}", n_classes),
            });
        }
        if cluster >= k {
            return Err(Error::InvalidParameter {
                name: "clusters",
                value: cluster.to_string(),
                reason: format!("cluster id must be below {}", k),
            });
        }
        overlap[[class, cluster]] += 1;
    }

    let mut accuracy = Array2::<f64>::zeros((n_classes, k));
    for (counts, mut fractions) in overlap.outer_iter().zip(accuracy.outer_iter_mut()) {
        let total = counts.sum();
        if total > 0 {
            fractions.assign(&counts.mapv(|c| c as f64 / total as f64));
        }
    }

    Ok(ValidationMatrices { overlap, accuracy })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_counts_and_fractions() {
        let classes = [0, 0, 0, 1, 1, 2];
        let clusters = [1, 1, 0, 0, 0, 1];
        let m = build_validation_matrices(&classes, &clusters, 3, 2).unwrap();

        assert_eq!(m.overlap, array![[1u64, 2], [2, 0], [0, 1]]);
        assert_relative_eq!(m.accuracy[[0, 0]], 1.0 / 3.0);
        assert_relative_eq!(m.accuracy[[0, 1]], 2.0 / 3.0);
        assert_relative_eq!(m.accuracy[[1, 0]], 1.0);
        assert_eq!(m.total(), 6);
        assert_eq!(m.class_totals(), array![3u64, 2, 1]);
        assert_eq!(m.cluster_totals(), array![3u64, 3]);
        assert_eq!(m.dominant_clusters(), vec![Some(1), Some(0), Some(1)]);
    }

    #[test]
    fn test_rows_sum_to_one() {
        let classes = [0, 1, 1, 1, 0, 1, 0];
        let clusters = [2, 0, 1, 2, 2, 1, 0];
        let m = build_validation_matrices(&classes, &clusters, 2, 3).unwrap();
        for row in m.accuracy.outer_iter() {
            assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_empty_class_row_is_zero() {
        let m = build_validation_matrices(&[0, 0, 2], &[0, 1, 1], 3, 2).unwrap();
        assert_eq!(m.overlap.row(1).sum(), 0);
        assert!(m.accuracy.row(1).iter().all(|&v| v == 0.0));
        assert_eq!(m.dominant_clusters()[1], None);
    }

    #[test]
    fn test_rejects_misaligned_input() {
        assert!(build_validation_matrices(&[0, 1], &[0], 2, 1).is_err());
        assert!(build_validation_matrices(&[0, 2], &[0, 0], 2, 1).is_err());
        assert!(build_validation_matrices(&[0, 1], &[0, 1], 2, 1).is_err());
    }

    #[test]
    fn test_no_pixels() {
        let m = build_validation_matrices(&[], &[], 2, 3).unwrap();
        assert_eq!(m.overlap.dim(), (2, 3));
        assert_eq!(m.total(), 0);
        assert!(m.accuracy.iter().all(|&v| v == 0.0));
    }
}
