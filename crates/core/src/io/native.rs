//! Native GeoTIFF reading/writing
//!
//! Uses the `tiff` crate. Only the pixel-scale/tiepoint georeferencing tags
//! and the GDAL no-data tag are understood; projections are not carried.

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement, RasterStack};
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

// The decoder files these codes under their named variants, so lookups by
// `Tag::Unknown(code)` would never match.
const MODEL_PIXEL_SCALE: Tag = Tag::ModelPixelScaleTag;
const MODEL_TIEPOINT: Tag = Tag::ModelTiepointTag;
const GEO_KEY_DIRECTORY: Tag = Tag::GeoKeyDirectoryTag;
const GDAL_NODATA: Tag = Tag::GdalNodata;

/// Read a single-band GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(file)
}

/// Read a GeoTIFF from an in-memory buffer into a Raster
pub fn read_geotiff_from_buffer<T>(data: &[u8]) -> Result<Raster<T>>
where
    T: RasterElement,
{
    decode_geotiff(Cursor::new(data))
}

/// Read one single-band file per spectral band and stack them.
///
/// Bands keep the order of `paths`. Fails with `ShapeMismatch` if any band's
/// extent differs from the first.
pub fn read_band_stack<P: AsRef<Path>>(paths: &[P]) -> Result<RasterStack> {
    let bands = paths
        .iter()
        .map(|p| {
            let mut band: Raster<f64> = read_geotiff(p)?;
            mark_nodata_as_nan(&mut band);
            Ok(band)
        })
        .collect::<Result<Vec<_>>>()?;
    RasterStack::from_bands(&bands)
}

/// Rewrite a band's explicit no-data cells as NaN, the missing marker used downstream
fn mark_nodata_as_nan(band: &mut Raster<f64>) {
    if let Some(nd) = band.nodata() {
        band.data_mut()
            .mapv_inplace(|v| if v.is_nodata(Some(nd)) { f64::NAN } else { v });
        band.set_nodata(Some(f64::NAN));
    }
}

fn decode_geotiff<T, R>(reader: R) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder = Decoder::new(reader)
        .map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;

    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;

    let data: Vec<T> = match result {
        DecodingResult::F32(buf) => cast_all(&buf),
        DecodingResult::F64(buf) => cast_all(&buf),
        DecodingResult::U8(buf) => cast_all(&buf),
        DecodingResult::U16(buf) => cast_all(&buf),
        DecodingResult::U32(buf) => cast_all(&buf),
        DecodingResult::I8(buf) => cast_all(&buf),
        DecodingResult::I16(buf) => cast_all(&buf),
        DecodingResult::I32(buf) => cast_all(&buf),
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF pixel format".to_string())),
    };

    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Some(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    if let Ok(text) = decoder.get_tag_ascii_string(GDAL_NODATA) {
        let nodata = text
            .trim_matches(char::from(0))
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(num_traits::cast);
        raster.set_nodata(nodata);
    }

    Ok(raster)
}

fn cast_all<S, T>(buf: &[S]) -> Vec<T>
where
    S: num_traits::NumCast + Copy,
    T: RasterElement,
{
    buf.iter()
        .map(|&v| num_traits::cast(v).unwrap_or(T::default_nodata()))
        .collect()
}

/// ModelPixelScale + ModelTiepoint, if both are present
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(MODEL_PIXEL_SCALE).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(MODEL_TIEPOINT).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

/// Write a Raster to a GeoTIFF file as 32-bit float
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    encode_geotiff(raster, file)
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let mut encoder = TiffEncoder::new(writer)
        .map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;

    let (rows, cols) = raster.shape();

    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

    let gt = raster.transform();
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    // GeoKey directory v1.1.0 with two keys: projected model, pixel-is-area
    let geokeys: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 1, 1025, 0, 1, 1];

    let tag_err = |e: tiff::TiffError| Error::Other(format!("Cannot write GeoTIFF tag: {}", e));
    image
        .encoder()
        .write_tag(MODEL_PIXEL_SCALE, &scale[..])
        .map_err(tag_err)?;
    image
        .encoder()
        .write_tag(MODEL_TIEPOINT, &tiepoint[..])
        .map_err(tag_err)?;
    image
        .encoder()
        .write_tag(GEO_KEY_DIRECTORY, &geokeys[..])
        .map_err(tag_err)?;
    if let Some(nd) = raster.nodata().and_then(|v| v.to_f64()) {
        image
            .encoder()
            .write_tag(GDAL_NODATA, nd.to_string().as_str())
            .map_err(tag_err)?;
    }

    image
        .write_data(&data)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;

    Ok(())
}
