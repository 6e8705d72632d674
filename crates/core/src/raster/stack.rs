//! Multi-band feature cube

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster};
use ndarray::{Array3, ArrayView1, ArrayView2, Axis};

/// Per-pixel spectral measurements indexed (row, col, band).
///
/// Missing reflectance values are stored as NaN. All bands share one
/// extent and one geotransform.
#[derive(Debug, Clone)]
pub struct RasterStack {
    data: Array3<f64>,
    transform: GeoTransform,
}

impl RasterStack {
    /// Wrap an existing (rows, cols, bands) array
    pub fn from_array(data: Array3<f64>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
        }
    }

    /// Build from row-major, band-interleaved-by-pixel data
    pub fn from_vec(data: Vec<f64>, rows: usize, cols: usize, bands: usize) -> Result<Self> {
        if data.len() != rows * cols * bands {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        let array = Array3::from_shape_vec((rows, cols, bands), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self::from_array(array))
    }

    /// Stack single-band rasters into a cube.
    ///
    /// The first band's transform is kept. Every band must share its extent.
    pub fn from_bands(bands: &[Raster<f64>]) -> Result<Self> {
        let first = bands.first().ok_or(Error::InvalidParameter {
            name: "bands",
            value: "0".into(),
            reason: "at least one band is required".into(),
        })?;
        let (rows, cols) = first.shape();

        for band in &bands[1..] {
            if band.shape() != (rows, cols) {
                return Err(Error::shape_mismatch((rows, cols), band.shape()));
            }
        }

        let mut data = Array3::from_elem((rows, cols, bands.len()), f64::NAN);
        for (b, band) in bands.iter().enumerate() {
            data.index_axis_mut(Axis(2), b).assign(band.data());
        }

        Ok(Self {
            data,
            transform: *first.transform(),
        })
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.dim().0
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.dim().1
    }

    /// Number of spectral bands
    pub fn bands(&self) -> usize {
        self.data.dim().2
    }

    /// Spatial dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        let (rows, cols, _) = self.data.dim();
        (rows, cols)
    }

    /// Spectral vector of one pixel
    pub fn pixel(&self, row: usize, col: usize) -> ArrayView1<'_, f64> {
        self.data.slice(ndarray::s![row, col, ..])
    }

    /// One band as a (rows, cols) view
    pub fn band(&self, band: usize) -> ArrayView2<'_, f64> {
        self.data.index_axis(Axis(2), band)
    }

    /// Underlying array
    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }
}
