//! End-to-end behaviour of the clustering and validation pipeline on small
//! synthetic scenes.

use approx::assert_relative_eq;
use landclust_algorithms::classification::{
    build_validation_matrices, cluster_validation, extract_features, harmonize_labels,
    impute_features, kmeans, valid_mask, ImputeStrategy, KmeansParams, MaskParams,
    MissingValues, PipelineParams, UNASSIGNED,
};
use landclust_algorithms::statistics::class_fractions;
use landclust_core::{Raster, RasterStack};
use ndarray::{array, Array2};

/// Deterministic pseudo-random scene with scattered NaNs and sentinel labels.
fn noisy_scene(rows: usize, cols: usize, bands: usize, salt: usize) -> (RasterStack, Raster<i32>) {
    let mut values = Vec::with_capacity(rows * cols * bands);
    for i in 0..rows * cols * bands {
        let h = (i * 2654435761 + salt * 40503) % 1009;
        values.push(if h % 23 == 0 { f64::NAN } else { h as f64 / 10.0 });
    }
    let labels = (0..rows * cols)
        .map(|i| match (i * 31 + salt) % 7 {
            0 => 0,
            1 => -1,
            n => 10 * n as i32,
        })
        .collect();
    (
        RasterStack::from_vec(values, rows, cols, bands).unwrap(),
        Raster::from_vec(labels, rows, cols).unwrap(),
    )
}

// ---------------------------------------------------------------------------
// Masking and imputation
// ---------------------------------------------------------------------------

#[test]
fn mask_and_feature_matrix_are_in_bijection() {
    for salt in 0..5 {
        let (stack, reference) = noisy_scene(9, 7, 4, salt);
        for missing in [MissingValues::Exclude, MissingValues::Impute] {
            let params = MaskParams { missing, ..Default::default() };
            let mask = valid_mask(&stack, &reference, &params).unwrap();
            let matrix = extract_features(&stack, &mask).unwrap();

            assert_eq!(matrix.nrows(), mask.count());
            for (row, (r, c)) in matrix.outer_iter().zip(mask.iter_valid()) {
                for (a, b) in row.iter().zip(stack.pixel(r, c).iter()) {
                    assert!(a == b || (a.is_nan() && b.is_nan()));
                }
            }
        }
    }
}

#[test]
fn imputing_complete_data_changes_nothing() {
    let (stack, reference) = noisy_scene(8, 8, 3, 1);
    let mask = valid_mask(&stack, &reference, &MaskParams::default()).unwrap();

    let once = impute_features(&stack, &mask, ImputeStrategy::Mean).unwrap();
    let direct = extract_features(&stack, &mask).unwrap();
    assert_eq!(once, direct);

    let again = impute_features(&stack, &mask, ImputeStrategy::Mean).unwrap();
    assert_eq!(once, again);
}

#[test]
fn single_missing_value_is_replaced_by_band_mean() {
    // 4x4x3: bands 0 and 2 complete, band 1 missing at (2, 1)
    let mut values = Vec::new();
    for r in 0..4 {
        for c in 0..4 {
            let p = (r * 4 + c) as f64;
            values.extend([p, 100.0 + p * 2.0, -p]);
        }
    }
    values[(2 * 4 + 1) * 3 + 1] = f64::NAN;
    let stack = RasterStack::from_vec(values.clone(), 4, 4, 3).unwrap();

    // last row is background
    let labels = (0..16).map(|i| if i >= 12 { 0 } else { 1 }).collect();
    let reference = Raster::from_vec(labels, 4, 4).unwrap();
    let params = MaskParams { missing: MissingValues::Impute, ..Default::default() };
    let mask = valid_mask(&stack, &reference, &params).unwrap();
    assert_eq!(mask.count(), 12);
    assert!(mask.get(2, 1));

    let imputed = impute_features(&stack, &mask, ImputeStrategy::Mean).unwrap();

    // band 1 over valid pixels 0..12, excluding the missing one (p = 9)
    let present: Vec<f64> = (0..12).filter(|&p| p != 9).map(|p| 100.0 + p as f64 * 2.0).collect();
    let expected = present.iter().sum::<f64>() / present.len() as f64;
    assert_relative_eq!(imputed[[9, 1]], expected, epsilon = 1e-12);

    let original = extract_features(&stack, &mask).unwrap();
    for ((i, j), &v) in imputed.indexed_iter() {
        if (i, j) != (9, 1) {
            assert_eq!(v, original[[i, j]]);
        }
    }
}

// ---------------------------------------------------------------------------
// Label harmonization
// ---------------------------------------------------------------------------

#[test]
fn harmonized_classes_exclude_background() {
    let reference = Raster::from_vec(vec![0, 5, 5, 7, 12, 0], 1, 6).unwrap();
    let stack = RasterStack::from_vec(vec![1.0; 6], 1, 6, 1).unwrap();
    let mask = valid_mask(&stack, &reference, &MaskParams::default()).unwrap();

    let (map, indices) = harmonize_labels(&reference, &mask).unwrap();
    assert_eq!(map.labels(), &[5, 7, 12]);
    assert_eq!(map.index_of(5), Some(0));
    assert_eq!(map.index_of(7), Some(1));
    assert_eq!(map.index_of(12), Some(2));
    assert_eq!(map.index_of(0), None);
    assert_eq!(indices, vec![0, 0, 1, 2]);
}

// ---------------------------------------------------------------------------
// Clustering
// ---------------------------------------------------------------------------

#[test]
fn two_separated_groups_get_two_clusters() {
    let points = array![
        [1.0, 1.0],
        [1.5, 0.8],
        [0.7, 1.2],
        [20.0, 21.0],
        [21.0, 20.5],
        [20.4, 19.8],
    ];
    for seed in [0, 42, 99] {
        let params = KmeansParams { k: 2, seed, ..Default::default() };
        let result = kmeans(&points, &params).unwrap();
        let l = &result.labels;
        assert!(l[..3].iter().all(|&c| c == l[0]));
        assert!(l[3..].iter().all(|&c| c == l[3]));
        assert_ne!(l[0], l[3]);
    }
}

#[test]
fn clustering_is_reproducible() {
    let (stack, reference) = noisy_scene(12, 12, 5, 3);
    let params = PipelineParams {
        kmeans: KmeansParams { k: 6, seed: 2024, ..Default::default() },
        ..Default::default()
    };

    let a = cluster_validation(&stack, &reference, &params).unwrap();
    let b = cluster_validation(&stack, &reference, &params).unwrap();
    assert_eq!(a.clustering, b.clustering);
    assert_eq!(a.matrices, b.matrices);
    assert_eq!(a.cluster_grid.data(), b.cluster_grid.data());
}

#[test]
fn no_cluster_starves_without_reseed() {
    let features = Array2::from_shape_fn((60, 2), |(i, j)| {
        let centre = (i % 4) as f64 * 10.0;
        centre + ((i * 13 + j * 7) % 5) as f64 * 0.1
    });
    for seed in 0..5 {
        let result = kmeans(&features, &KmeansParams { k: 4, seed, ..Default::default() }).unwrap();
        assert!(result.converged);
        for (c, &size) in result.cluster_sizes().iter().enumerate() {
            assert!(size > 0 || result.reseeded.contains(&c), "cluster {} starved", c);
        }
    }
}

#[test]
fn capped_runs_never_hide_an_empty_cluster() {
    let features = Array2::from_shape_fn((12, 1), |(i, _)| (i as f64).powf(1.5) + (i % 3) as f64 * 0.2);
    for seed in 0..500 {
        for k in 2..6 {
            for max_iterations in 1..5 {
                for tolerance in [0.0, 0.5, 2.0] {
                    let params = KmeansParams { k, max_iterations, tolerance, seed, ..Default::default() };
                    let result = kmeans(&features, &params).unwrap();
                    for (c, &size) in result.cluster_sizes().iter().enumerate() {
                        assert!(
                            size > 0 || result.reseeded.contains(&c),
                            "cluster {} empty and unreported (seed {}, k {}, cap {})",
                            c,
                            seed,
                            k,
                            max_iterations
                        );
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Validation matrices
// ---------------------------------------------------------------------------

#[test]
fn matrices_account_for_every_valid_pixel() {
    let (stack, reference) = noisy_scene(10, 10, 3, 2);
    let params = PipelineParams {
        kmeans: KmeansParams { k: 4, ..Default::default() },
        ..Default::default()
    };
    let out = cluster_validation(&stack, &reference, &params).unwrap();
    let (_, indices) = harmonize_labels(&reference, &out.mask).unwrap();

    assert_eq!(out.matrices.total() as usize, out.mask.count());
    for (i, &total) in out.matrices.class_totals().iter().enumerate() {
        let expected = indices.iter().filter(|&&c| c == i).count();
        assert_eq!(total as usize, expected);
    }
    for row in out.matrices.accuracy.outer_iter() {
        assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-9);
    }

    let assigned = out.cluster_grid.data().iter().filter(|&&v| v != UNASSIGNED).count();
    assert_eq!(assigned, out.mask.count());
    let shares = class_fractions(&out.cluster_grid, &[UNASSIGNED]);
    assert_relative_eq!(shares.values().sum::<f64>(), 1.0, epsilon = 1e-12);
}

#[test]
fn class_without_overlap_has_zero_row() {
    // class 1 declared but never observed
    let classes = [0, 0, 2, 2, 2];
    let clusters = [0, 1, 1, 1, 0];
    let m = build_validation_matrices(&classes, &clusters, 3, 2).unwrap();

    assert_eq!(m.overlap.row(1).sum(), 0);
    assert!(m.accuracy.row(1).iter().all(|&v| v == 0.0));
    assert_relative_eq!(m.accuracy.row(0).sum(), 1.0);
    assert_relative_eq!(m.accuracy.row(2).sum(), 1.0);
}
