//! End-to-end cluster validation of one scene
//!
//! mask → impute → k-means → harmonize reference labels → overlap and
//! accuracy matrices, plus the cluster grid rebuilt at scene resolution.

use landclust_core::raster::{Raster, RasterStack};
use landclust_core::{Algorithm, Error, Result};

use super::harmonize::{harmonize_labels, ClassIndexMap};
use super::impute::{impute_features, ImputeStrategy};
use super::kmeans::{kmeans, KmeansParams, KmeansResult};
use super::mask::{valid_mask, MaskParams, ValidMask};
use super::validation::{build_validation_matrices, ValidationMatrices};

/// Cluster id written to masked-out cells of the cluster grid
pub const UNASSIGNED: i32 = -1;

/// All knobs of one pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineParams {
    pub mask: MaskParams,
    pub impute: ImputeStrategy,
    pub kmeans: KmeansParams,
}

/// Everything a pipeline run produces
#[derive(Debug, Clone)]
pub struct ClusterValidation {
    /// Pixels that took part
    pub mask: ValidMask,
    /// Cluster id per cell, [`UNASSIGNED`] outside the mask
    pub cluster_grid: Raster<i32>,
    /// Labels, centroids and convergence diagnostics
    pub clustering: KmeansResult,
    /// Matrix row index → original reference label
    pub classes: ClassIndexMap,
    /// Overlap and accuracy matrices
    pub matrices: ValidationMatrices,
}

/// Place per-pixel cluster ids back onto the scene grid.
///
/// `labels[i]` belongs to the `i`-th valid cell in row-major order; every
/// other cell gets [`UNASSIGNED`]. The output shares `template`'s transform.
pub fn assignment_grid(mask: &ValidMask, labels: &[usize], template: &Raster<i32>) -> Result<Raster<i32>> {
    if labels.len() != mask.count() {
        return Err(Error::InvalidParameter {
            name: "labels",
            value: labels.len().to_string(),
            reason: format!("expected one label per valid pixel ({})", mask.count()),
        });
    }

    let (rows, cols) = mask.shape();
    let mut grid = template.with_same_meta::<i32>(rows, cols);
    grid.data_mut().fill(UNASSIGNED);
    for ((r, c), &label) in mask.iter_valid().zip(labels) {
        grid.data_mut()[[r, c]] = i32::try_from(label)
            .map_err(|_| Error::Other(format!("cluster id {} does not fit the grid", label)))?;
    }
    grid.set_nodata(Some(UNASSIGNED));
    Ok(grid)
}

/// Run the full clustering and validation pipeline on one scene.
///
/// # Errors
/// - `ShapeMismatch` if the feature cube and reference grid differ in extent
/// - `EmptyValidRegion` if no pixel survives the mask
/// - `ImputationFailure` if a band has nothing to impute from
/// - `InvalidClusterCount` if `k` is zero or exceeds the valid pixel count
pub fn cluster_validation(
    features: &RasterStack,
    reference: &Raster<i32>,
    params: &PipelineParams,
) -> Result<ClusterValidation> {
    let mask = valid_mask(features, reference, &params.mask)?;
    tracing::debug!(
        valid = mask.count(),
        total = reference.len(),
        "built valid mask"
    );
    if mask.is_empty() {
        return Err(Error::EmptyValidRegion);
    }

    let matrix = impute_features(features, &mask, params.impute)?;
    let clustering = kmeans(&matrix, &params.kmeans)?;
    tracing::info!(
        pixels = mask.count(),
        bands = features.bands(),
        k = params.kmeans.k,
        iterations = clustering.iterations,
        converged = clustering.converged,
        "clustered valid pixels"
    );
    if !clustering.reseeded.is_empty() {
        tracing::debug!(reseeded = ?clustering.reseeded, "empty clusters were reseeded");
    }

    let (classes, class_indices) = harmonize_labels(reference, &mask)?;
    let matrices = build_validation_matrices(
        &class_indices,
        &clustering.labels,
        classes.len(),
        params.kmeans.k,
    )?;
    let cluster_grid = assignment_grid(&mask, &clustering.labels, reference)?;

    Ok(ClusterValidation {
        mask,
        cluster_grid,
        clustering,
        classes,
        matrices,
    })
}

/// [`cluster_validation`] behind the [`Algorithm`] interface
#[derive(Debug, Clone, Copy, Default)]
pub struct SpectralValidation;

impl Algorithm for SpectralValidation {
    type Input = (RasterStack, Raster<i32>);
    type Output = ClusterValidation;
    type Params = PipelineParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Spectral cluster validation"
    }

    fn description(&self) -> &'static str {
        "Cluster valid pixels with k-means and cross-tabulate clusters against reference classes"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (features, reference) = input;
        cluster_validation(&features, &reference, &params)
    }
}
