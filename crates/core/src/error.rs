//! Error types for landclust

use thiserror::Error;

/// Main error type for landclust operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Grid shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Cannot impute band {band}: no valid observations")]
    ImputationFailure { band: usize },

    #[error("Invalid cluster count {k} for {valid} valid pixels")]
    InvalidClusterCount { k: usize, valid: usize },

    #[error("Valid region is empty: no pixel passed the mask")]
    EmptyValidRegion,

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for [`Error::ShapeMismatch`]
    pub fn shape_mismatch(expected: (usize, usize), actual: (usize, usize)) -> Self {
        Error::ShapeMismatch { expected, actual }
    }
}

/// Result type alias for landclust operations
pub type Result<T> = std::result::Result<T, Error>;
