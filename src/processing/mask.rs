// src/processing/mask.rs
use gdal::raster::Buffer;
use rayon::prelude::*;

use crate::catalog::landsat::QA_CONDITION_BITS;
use crate::catalog::Scene;
use crate::processing::NODATA;

/// A grid of the given shape with every pixel masked.
pub fn all_masked(shape: (usize, usize)) -> Buffer<f32> {
    Buffer::new(shape, vec![NODATA; shape.0 * shape.1])
}

/// Mask a reflectance band against the scene's quality grids.
///
/// A pixel becomes no-data when any of the five low-order condition bits of
/// `QA_PIXEL` is set, or when `QA_RADSAT` flags saturation in any band.
/// Absent or mis-shaped quality grids mask everything; this function never
/// fails.
pub fn apply_quality_mask(
    band: &Buffer<f32>,
    qa_pixel: Option<&Buffer<u16>>,
    qa_radsat: Option<&Buffer<u16>>,
) -> Buffer<f32> {
    let shape = band.shape();
    let (Some(qa_pixel), Some(qa_radsat)) = (qa_pixel, qa_radsat) else {
        return all_masked(shape);
    };
    if qa_pixel.shape() != shape || qa_radsat.shape() != shape {
        return all_masked(shape);
    }

    let qa = qa_pixel.data();
    let saturation = qa_radsat.data();
    let mut masked = band.data().to_vec();
    masked.par_iter_mut().enumerate().for_each(|(i, value)| {
        if qa[i] & QA_CONDITION_BITS != 0 || saturation[i] != 0 {
            *value = NODATA;
        }
    });
    Buffer::new(shape, masked)
}

/// Fetch `band` from a scene and mask it, expecting the catalog grid shape.
///
/// A band the scene does not carry, or one off the expected grid, degrades
/// to an all-masked result rather than an error.
pub fn masked_scene_band(scene: &Scene, band: &str, shape: (usize, usize)) -> Buffer<f32> {
    match scene.bands.get(band) {
        Some(data) if data.shape() == shape => {
            apply_quality_mask(data, scene.qa_pixel.as_ref(), scene.qa_radsat.as_ref())
        }
        _ => all_masked(shape),
    }
}
