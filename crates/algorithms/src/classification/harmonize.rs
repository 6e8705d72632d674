//! Reference label harmonization
//!
//! Reference classes arrive with arbitrary integer codes (e.g. 10, 20, 80 in
//! land-cover products). Validation matrices need dense row indices, so the
//! codes present in the valid region are mapped to `0..n_classes` in
//! ascending code order.

use landclust_core::raster::Raster;
use landclust_core::{Error, Result};

use super::mask::ValidMask;

/// Ascending map between original reference labels and dense class indices
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassIndexMap {
    labels: Vec<i32>,
}

impl ClassIndexMap {
    /// Build from any collection of labels; duplicates collapse
    pub fn from_labels(labels: impl IntoIterator<Item = i32>) -> Self {
        let mut labels: Vec<i32> = labels.into_iter().collect();
        labels.sort_unstable();
        labels.dedup();
        Self { labels }
    }

    /// Dense index of an original label
    pub fn index_of(&self, label: i32) -> Option<usize> {
        self.labels.binary_search(&label).ok()
    }

    /// Original label of a dense index
    pub fn label_of(&self, index: usize) -> Option<i32> {
        self.labels.get(index).copied()
    }

    /// Original labels, position = dense index
    pub fn labels(&self) -> &[i32] {
        &self.labels
    }

    /// Number of classes
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Harmonize the reference labels of the valid pixels.
///
/// Returns the class map together with the dense class index of every valid
/// pixel, in the same row-major order as the feature matrix.
///
/// # Errors
/// `ShapeMismatch` when the mask does not cover the reference grid.
pub fn harmonize_labels(reference: &Raster<i32>, mask: &ValidMask) -> Result<(ClassIndexMap, Vec<usize>)> {
    if reference.shape() != mask.shape() {
        return Err(Error::shape_mismatch(mask.shape(), reference.shape()));
    }

    let data = reference.data();
    let raw: Vec<i32> = mask.iter_valid().map(|(r, c)| data[[r, c]]).collect();
    let map = ClassIndexMap::from_labels(raw.iter().copied());

    let indices = raw
        .iter()
        .map(|&label| {
            map.index_of(label)
                .ok_or_else(|| Error::Other(format!("label {} missing from class map", label)))
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(classes = map.len(), labels = ?map.labels(), "harmonized reference labels");
    Ok((map, indices))
}
