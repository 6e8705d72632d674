//! Statistical summaries of scene grids
//!
//! - **distribution**: Area fraction of each class or cluster
//! - **band_summary**: Per-pixel band mean and percentile display range

pub mod band_summary;
pub mod distribution;

pub use band_summary::{band_mean, percentile_range};
pub use distribution::class_fractions;
