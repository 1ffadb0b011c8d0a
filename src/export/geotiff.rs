// src/export/geotiff.rs
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use gdal::raster::{Buffer, RasterCreationOptions};
use gdal::{DriverManager, Metadata};

use crate::export::ExportRequest;
use crate::geo::GridSpec;
use crate::processing::{YearComposite, NODATA};
use crate::utils::fixed_point::{to_fixed_point, NODATA_VALUE_INT};

/// Write one yearly composite as a GeoTIFF, clipped to the request region.
///
/// The writer enforces the request contract the way the original export
/// service did: a clip exceeding `max_pixels` is rejected outright rather
/// than downsampled, and a composite with no contributing scenes fails with
/// a descriptive reason. Both surface through the job status channel.
pub fn write_composite(
    composite: &YearComposite,
    grid: &GridSpec,
    request: &ExportRequest,
) -> Result<PathBuf> {
    let Some(data) = &composite.grid else {
        return Err(anyhow!(
            "no qualifying scenes for {}; nothing to export",
            composite.year
        ));
    };
    if data.shape() != grid.shape() {
        return Err(anyhow!(
            "composite for {} is {}x{} but the grid is {}x{}",
            composite.year,
            data.shape().0,
            data.shape().1,
            grid.width,
            grid.height
        ));
    }
    if grid.epsg != request.crs_epsg {
        return Err(anyhow!(
            "composite grid is EPSG:{} but the export requests EPSG:{}",
            grid.epsg,
            request.crs_epsg
        ));
    }
    let (pixel_w, pixel_h) = grid.pixel_size();
    if (pixel_w - request.scale).abs() > 1e-6 || (pixel_h - request.scale).abs() > 1e-6 {
        return Err(anyhow!(
            "composite grid resolution {}x{} does not match the requested scale {}",
            pixel_w,
            pixel_h,
            request.scale
        ));
    }

    let ((col, row), (width, height)) = grid.window_for(&request.region)?;
    if width == 0 || height == 0 {
        return Err(anyhow!(
            "clip region does not intersect the composite grid"
        ));
    }
    let clip_pixels = width as u64 * height as u64;
    if clip_pixels > request.max_pixels {
        return Err(anyhow!(
            "clip of {} pixels exceeds the maximum of {}",
            clip_pixels,
            request.max_pixels
        ));
    }

    // Copy the clip window out of the full-grid buffer.
    let source = data.data();
    let mut clipped = Vec::with_capacity(width * height);
    for r in 0..height {
        let start = (row as usize + r) * grid.width + col as usize;
        clipped.extend_from_slice(&source[start..start + width]);
    }

    let clip_transform = [
        grid.geo_transform[0] + col as f64 * grid.geo_transform[1],
        grid.geo_transform[1],
        0.0,
        grid.geo_transform[3] + row as f64 * grid.geo_transform[5],
        0.0,
        grid.geo_transform[5],
    ];

    fs::create_dir_all(&request.folder)?;
    let output_path = request.output_path();

    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let creation_options =
        RasterCreationOptions::from_iter(["COMPRESS=DEFLATE", "TILED=YES", "NUM_THREADS=ALL_CPUS"]);

    if request.fixed_point {
        let mut out_ds = driver.create_with_band_type_with_options::<i16, _>(
            &output_path,
            width,
            height,
            1,
            &creation_options,
        )?;
        out_ds.set_projection(&grid.projection_wkt()?)?;
        out_ds.set_geo_transform(&clip_transform)?;

        let mut band = out_ds.rasterband(1)?;
        band.set_no_data_value(Some(NODATA_VALUE_INT as f64))?;
        band.set_metadata_item("SCALE", &format!("{}", 1.0 / request.scale_factor as f64), "")?;
        band.set_metadata_item("OFFSET", "0", "")?;
        band.set_description(&format!(
            "{} (scaled by {})",
            request.description, request.scale_factor
        ))?;

        let fixed = to_fixed_point(&clipped, request.scale_factor);
        let mut buffer = Buffer::new((width, height), fixed);
        band.write((0, 0), (width, height), &mut buffer)?;
        out_ds.flush_cache()?;
    } else {
        let mut out_ds = driver.create_with_band_type_with_options::<f32, _>(
            &output_path,
            width,
            height,
            1,
            &creation_options,
        )?;
        out_ds.set_projection(&grid.projection_wkt()?)?;
        out_ds.set_geo_transform(&clip_transform)?;

        let mut band = out_ds.rasterband(1)?;
        band.set_no_data_value(Some(NODATA as f64))?;
        band.set_description(&request.description)?;

        let mut buffer = Buffer::new((width, height), clipped);
        band.write((0, 0), (width, height), &mut buffer)?;
        out_ds.flush_cache()?;
    }

    Ok(output_path)
}
