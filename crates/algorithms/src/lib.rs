//! # landclust Algorithms
//!
//! Unsupervised spectral clustering of raster scenes and validation of the
//! clusters against an independent reference land-cover classification.
//!
//! ## Available Algorithm Categories
//!
//! - **classification**: Pixel masking, imputation, k-means, label
//!   harmonization, overlap/accuracy matrices and the end-to-end pipeline
//! - **statistics**: Area fractions and band summaries of scene grids

pub mod classification;
pub mod statistics;

mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classification::{
        assignment_grid, build_validation_matrices, cluster_validation, harmonize_labels,
        impute_features, kmeans, valid_mask, ClassIndexMap, ClusterValidation, ImputeStrategy,
        Initialization, KmeansParams, KmeansResult, MaskParams, MissingValues, PipelineParams,
        SpectralValidation, ValidMask, ValidationMatrices, UNASSIGNED,
    };
    pub use crate::statistics::{band_mean, class_fractions, percentile_range};
    pub use landclust_core::prelude::*;
}
