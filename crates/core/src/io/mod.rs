//! I/O for scene bands, reference labels and cluster grids

mod native;

pub use native::{
    read_band_stack, read_geotiff, read_geotiff_from_buffer, write_geotiff,
    write_geotiff_to_buffer,
};
