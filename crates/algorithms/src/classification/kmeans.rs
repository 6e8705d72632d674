//! K-means clustering of spectral feature vectors
//!
//! Lloyd iterations over a (V, bands) feature matrix with squared Euclidean
//! distance. Seeding is driven by an explicit seed, so identical inputs and
//! parameters always give bit-identical labels and centroids.

use ndarray::{Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::maybe_rayon::*;
use landclust_core::{Error, Result};

/// Centroid seeding strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Initialization {
    /// k-means++: first centre uniform, later centres weighted by squared
    /// distance to the nearest chosen centre
    #[default]
    KMeansPlusPlus,
    /// k distinct data points drawn uniformly
    RandomSample,
}

/// Parameters for K-means clustering
#[derive(Debug, Clone)]
pub struct KmeansParams {
    /// Number of clusters (default: 10)
    pub k: usize,
    /// Maximum Lloyd iterations (default: 300)
    pub max_iterations: usize,
    /// Stop once no centroid moves farther than this (default: 1e-4)
    pub tolerance: f64,
    /// Seed for centroid initialization (default: 42)
    pub seed: u64,
    /// Seeding strategy
    pub init: Initialization,
}

impl Default for KmeansParams {
    fn default() -> Self {
        Self {
            k: 10,
            max_iterations: 300,
            tolerance: 1e-4,
            seed: 42,
            init: Initialization::KMeansPlusPlus,
        }
    }
}

/// Output of [`kmeans`]
#[derive(Debug, Clone, PartialEq)]
pub struct KmeansResult {
    /// Cluster id in `0..k` for every input vector
    pub labels: Vec<usize>,
    /// Final centroids, shape (k, bands)
    pub centroids: Array2<f64>,
    /// Lloyd iterations performed
    pub iterations: usize,
    /// False when the iteration cap stopped the run
    pub converged: bool,
    /// Cluster ids that were reseeded after going empty, in the order it happened
    pub reseeded: Vec<usize>,
    /// Sum of squared distances from each vector to its centroid
    pub inertia: f64,
}

impl KmeansResult {
    /// Number of vectors assigned to each cluster
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.centroids.nrows()];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}

/// Cluster the rows of `features` into `params.k` groups.
///
/// Each iteration assigns every vector to its nearest centroid (ties go to
/// the lowest cluster id), then moves every centroid to the mean of its
/// members. A cluster left without members is reseeded to the vector that
/// lies farthest from its own centroid. Iteration stops when no label
/// changes, when no centroid moves more than `tolerance`, or after
/// `max_iterations`.
///
/// # Errors
/// - `InvalidClusterCount` if `k == 0` or `k` exceeds the number of vectors
/// - `InvalidParameter` for a zero iteration cap, a negative or NaN
///   tolerance, or non-finite feature values
pub fn kmeans(features: &Array2<f64>, params: &KmeansParams) -> Result<KmeansResult> {
    let n = features.nrows();
    let k = params.k;

    if k == 0 || k > n {
        return Err(Error::InvalidClusterCount { k, valid: n });
    }
    if params.max_iterations == 0 {
        return Err(Error::InvalidParameter {
            name: "max_iterations",
            value: "0".into(),
            reason: "at least one iteration is required".into(),
        });
    }
    if params.tolerance.is_nan() || params.tolerance < 0.0 {
        return Err(Error::InvalidParameter {
            name: "tolerance",
            value: params.tolerance.to_string(),
            reason: "must be a non-negative number".into(),
        });
    }
    if features.iter().any(|v| !v.is_finite()) {
        return Err(Error::InvalidParameter {
            name: "features",
            value: "non-finite".into(),
            reason: "impute missing values before clustering".into(),
        });
    }

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut centroids = match params.init {
        Initialization::KMeansPlusPlus => init_plus_plus(features, k, &mut rng),
        Initialization::RandomSample => init_random_sample(features, k, &mut rng),
    };

    let mut labels: Vec<usize> = Vec::new();
    let mut reseeded = Vec::new();
    let mut converged = false;
    let mut iterations = 0;

    while iterations < params.max_iterations {
        iterations += 1;

        let next = assign(features, &centroids);
        let changed = labels.len() != n || next.iter().zip(&labels).any(|(a, b)| a != b);
        labels = next;
        if !changed {
            converged = true;
            break;
        }

        let (updated, empty) = update_centroids(features, &labels, &centroids);
        let shift = max_shift(&centroids, &updated);
        centroids = updated;
        tracing::trace!(iteration = iterations, shift, empty = empty.len(), "k-means step");

        if !empty.is_empty() {
            reseeded.extend(empty);
        } else if shift <= params.tolerance {
            converged = true;
            labels = assign(features, &centroids);
            break;
        }
    }

    if !converged {
        labels = assign(features, &centroids);
        tracing::debug!(iterations, "k-means stopped at the iteration cap");
    }
    fill_empty_clusters(features, &mut centroids, &mut labels, &mut reseeded);

    let inertia = labels
        .iter()
        .enumerate()
        .map(|(i, &c)| squared_distance(features.row(i), centroids.row(c)))
        .sum();

    Ok(KmeansResult {
        labels,
        centroids,
        iterations,
        converged,
        reseeded,
        inertia,
    })
}

/// Squared Euclidean distance between two vectors
pub(crate) fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Index and squared distance of the nearest centroid; lowest index wins ties
fn nearest(point: ArrayView1<'_, f64>, centroids: &Array2<f64>) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (c, centroid) in centroids.outer_iter().enumerate() {
        let d = squared_distance(point, centroid);
        if d < best.1 {
            best = (c, d);
        }
    }
    best
}

/// Assignment step. Each vector is independent, so this runs in parallel
/// when the `parallel` feature is on; the caller's update step is the barrier.
fn assign(features: &Array2<f64>, centroids: &Array2<f64>) -> Vec<usize> {
    (0..features.nrows())
        .into_par_iter()
        .map(|i| nearest(features.row(i), centroids).0)
        .collect()
}

/// Update step. Returns the new centroids and the ids of clusters that had
/// no members and were reseeded.
fn update_centroids(
    features: &Array2<f64>,
    labels: &[usize],
    previous: &Array2<f64>,
) -> (Array2<f64>, Vec<usize>) {
    let k = previous.nrows();
    let mut sums = Array2::<f64>::zeros(previous.raw_dim());
    let mut counts = vec![0usize; k];

    for (row, &c) in features.outer_iter().zip(labels) {
        let mut sum = sums.row_mut(c);
        sum += &row;
        counts[c] += 1;
    }

    let empty: Vec<usize> = (0..k).filter(|&c| counts[c] == 0).collect();
    for (c, mut sum) in sums.outer_iter_mut().enumerate() {
        if counts[c] > 0 {
            sum /= counts[c] as f64;
        }
    }

    if !empty.is_empty() {
        // Measured against the centroids used for this assignment
        let donors = farthest_points(features, labels, previous);
        for (&c, &i) in empty.iter().zip(&donors) {
            sums.row_mut(c).assign(&features.row(i));
        }
    }

    (sums, empty)
}

/// Point indices by descending squared distance to their own centroid,
/// lowest index first on ties.
fn farthest_points(features: &Array2<f64>, labels: &[usize], centroids: &Array2<f64>) -> Vec<usize> {
    let mut order: Vec<(usize, f64)> = labels
        .iter()
        .enumerate()
        .map(|(i, &c)| (i, squared_distance(features.row(i), centroids.row(c))))
        .collect();
    order.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    order.into_iter().map(|(i, _)| i).collect()
}

/// Reseed clusters left empty by the final assignment and reassign.
///
/// Runs at most `k` rounds. Clusters still empty afterwards (fewer distinct
/// vectors than clusters) are recorded all the same.
fn fill_empty_clusters(
    features: &Array2<f64>,
    centroids: &mut Array2<f64>,
    labels: &mut Vec<usize>,
    reseeded: &mut Vec<usize>,
) {
    let k = centroids.nrows();
    for round in 0..=k {
        let mut counts = vec![0usize; k];
        for &c in labels.iter() {
            counts[c] += 1;
        }
        let empty: Vec<usize> = (0..k).filter(|&c| counts[c] == 0).collect();
        if empty.is_empty() {
            return;
        }
        tracing::debug!(round, empty = ?empty, "reseeding clusters emptied by the final assignment");
        reseeded.extend(&empty);
        if round == k {
            return;
        }

        let donors = farthest_points(features, labels, centroids);
        for (&c, &i) in empty.iter().zip(&donors) {
            centroids.row_mut(c).assign(&features.row(i));
        }
        *labels = assign(features, centroids);
    }
}

fn max_shift(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    a.outer_iter()
        .zip(b.outer_iter())
        .map(|(x, y)| squared_distance(x, y).sqrt())
        .fold(0.0, f64::max)
}

fn init_random_sample(features: &Array2<f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
    let mut picks = rand::seq::index::sample(rng, features.nrows(), k).into_vec();
    picks.sort_unstable();
    features.select(Axis(0), &picks)
}

fn init_plus_plus(features: &Array2<f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
    let n = features.nrows();
    let mut picks = Vec::with_capacity(k);
    picks.push(rng.random_range(0..n));

    let mut closest: Vec<f64> = (0..n)
        .map(|i| squared_distance(features.row(i), features.row(picks[0])))
        .collect();

    while picks.len() < k {
        let total: f64 = closest.iter().sum();
        let next = if total > 0.0 {
            let target = rng.random::<f64>() * total;
            let mut acc = 0.0;
            let mut chosen = None;
            for (i, &d) in closest.iter().enumerate() {
                acc += d;
                if d > 0.0 && acc >= target {
                    chosen = Some(i);
                    break;
                }
            }
            // Rounding can leave target just above the final sum
            chosen.unwrap_or_else(|| closest.iter().rposition(|&d| d > 0.0).unwrap_or(0))
        } else {
            // Every point coincides with a chosen centre
            (0..n).find(|i| !picks.contains(i)).unwrap_or(0)
        };

        picks.push(next);
        for (i, d) in closest.iter_mut().enumerate() {
            *d = d.min(squared_distance(features.row(i), features.row(next)));
        }
    }

    features.select(Axis(0), &picks)
}
