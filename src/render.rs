// src/render.rs
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use gdal::raster::Buffer;
use image::RgbaImage;

use crate::processing::NODATA;

/// Display range used for NDWI previews.
pub const DISPLAY_MIN: f32 = -1.0;
pub const DISPLAY_MAX: f32 = 1.0;

/// A color stop: position in [0, 1] mapped to an RGB color.
struct RampStop {
    t: f32,
    color: [u8; 3],
}

/// The blue -> white -> green ramp: open water at the low end, white around
/// zero, vegetation/land toward the high end.
const WATER_RAMP: &[RampStop] = &[
    RampStop {
        t: 0.0,
        color: [0, 0, 255],
    },
    RampStop {
        t: 0.5,
        color: [255, 255, 255],
    },
    RampStop {
        t: 1.0,
        color: [0, 128, 0],
    },
];

/// Evaluate the ramp at `t`, clamped to [0, 1], interpolating linearly
/// between adjacent stops.
pub fn ramp_color(t: f32) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    let mut lower = &WATER_RAMP[0];
    for stop in WATER_RAMP {
        if t >= stop.t {
            lower = stop;
        }
    }
    let upper = WATER_RAMP
        .iter()
        .find(|s| s.t >= t)
        .unwrap_or(&WATER_RAMP[WATER_RAMP.len() - 1]);

    if (upper.t - lower.t).abs() < f32::EPSILON {
        return lower.color;
    }
    let f = (t - lower.t) / (upper.t - lower.t);
    let mut color = [0u8; 3];
    for (i, c) in color.iter_mut().enumerate() {
        let a = lower.color[i] as f32;
        let b = upper.color[i] as f32;
        *c = (a + (b - a) * f).round() as u8;
    }
    color
}

/// Convert a composite grid to an RGBA buffer: values normalized into
/// [min, max] through the ramp, no-data fully transparent.
pub fn colorize(grid: &Buffer<f32>, min: f32, max: f32) -> Vec<u8> {
    let (width, height) = grid.shape();
    let range = max - min;
    let inv_range = if range.abs() > f32::EPSILON {
        1.0 / range
    } else {
        1.0
    };

    let mut rgba = vec![0u8; width * height * 4];
    for (i, &value) in grid.data().iter().enumerate() {
        if value == NODATA || !value.is_finite() {
            continue; // transparent
        }
        let [r, g, b] = ramp_color((value - min) * inv_range);
        let offset = i * 4;
        rgba[offset] = r;
        rgba[offset + 1] = g;
        rgba[offset + 2] = b;
        rgba[offset + 3] = 255;
    }
    rgba
}

/// Render a composite grid to a PNG with the water ramp.
pub fn render_preview(grid: &Buffer<f32>, min: f32, max: f32, path: &Path) -> Result<()> {
    let (width, height) = grid.shape();
    let rgba = colorize(grid, min, max);
    let image = RgbaImage::from_raw(width as u32, height as u32, rgba)
        .ok_or_else(|| anyhow!("rendered buffer does not match {}x{}", width, height))?;
    image
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
