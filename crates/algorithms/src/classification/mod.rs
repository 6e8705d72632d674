//! Unsupervised classification and validation against reference labels
//!
//! - **mask**: Valid-pixel mask (complete spectra, non-sentinel label)
//! - **impute**: Feature matrix extraction and per-band imputation
//! - **kmeans**: Seeded Lloyd k-means with empty-cluster reseeding
//! - **harmonize**: Reference labels → dense class indices
//! - **validation**: Overlap and accuracy matrices
//! - **pipeline**: All of the above for one scene

mod harmonize;
mod impute;
mod kmeans;
mod mask;
mod pipeline;
mod validation;

pub use harmonize::{harmonize_labels, ClassIndexMap};
pub use impute::{extract_features, impute_features, impute_matrix, ImputeStrategy};
pub use kmeans::{kmeans, Initialization, KmeansParams, KmeansResult};
pub use mask::{valid_mask, MaskParams, MissingValues, ValidMask};
pub use pipeline::{
    assignment_grid, cluster_validation, ClusterValidation, PipelineParams, SpectralValidation,
    UNASSIGNED,
};
pub use validation::{build_validation_matrices, ValidationMatrices};
