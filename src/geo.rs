// src/geo.rs
use anyhow::{anyhow, Context, Result};
use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use serde::{Deserialize, Serialize};

/// EPSG code of geographic lon/lat coordinates used for AOI definitions.
pub const GEOGRAPHIC_EPSG: u32 = 4326;

/// Rectangular area of interest in geographic (EPSG:4326) degrees.
///
/// Used both as the spatial query filter and as the export clip region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aoi {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Aoi {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }
}

/// Georeferencing of a raster grid: projected CRS, affine transform and size.
///
/// Every scene a catalog serves is co-registered on its grid, so composites
/// and exports inherit the grid unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub epsg: u32,
    /// GDAL-style geotransform: [origin_x, pixel_w, 0, origin_y, 0, -pixel_h].
    pub geo_transform: [f64; 6],
    pub width: usize,
    pub height: usize,
}

impl GridSpec {
    pub fn new(
        epsg: u32,
        origin_x: f64,
        origin_y: f64,
        pixel_size: f64,
        width: usize,
        height: usize,
    ) -> Self {
        Self {
            epsg,
            geo_transform: [origin_x, pixel_size, 0.0, origin_y, 0.0, -pixel_size],
            width,
            height,
        }
    }

    /// Derive the grid covering `aoi` in the projected CRS `epsg` at the given
    /// pixel size. The AOI corners are projected and the envelope snapped
    /// outward to whole pixels.
    pub fn from_aoi(aoi: &Aoi, epsg: u32, pixel_size: f64) -> Result<Self> {
        if pixel_size <= 0.0 {
            return Err(anyhow!("pixel size must be positive, got {pixel_size}"));
        }
        let (min_x, min_y, max_x, max_y) = projected_envelope(aoi, epsg)?;
        let width = (((max_x - min_x) / pixel_size).ceil() as usize).max(1);
        let height = (((max_y - min_y) / pixel_size).ceil() as usize).max(1);
        Ok(Self::new(epsg, min_x, max_y, pixel_size, width, height))
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Pixel size as (width, height), both positive.
    pub fn pixel_size(&self) -> (f64, f64) {
        (self.geo_transform[1], -self.geo_transform[5])
    }

    /// WKT of the grid's spatial reference.
    pub fn projection_wkt(&self) -> Result<String> {
        let srs = SpatialRef::from_epsg(self.epsg)
            .with_context(|| format!("unknown EPSG code {}", self.epsg))?;
        Ok(srs.to_wkt()?)
    }

    /// Projected (min_x, min_y, max_x, max_y) envelope of the full grid.
    pub fn envelope(&self) -> (f64, f64, f64, f64) {
        let (pw, ph) = self.pixel_size();
        let min_x = self.geo_transform[0];
        let max_y = self.geo_transform[3];
        (
            min_x,
            max_y - ph * self.height as f64,
            min_x + pw * self.width as f64,
            max_y,
        )
    }

    /// Whether this grid can serve data for `other`: same CRS, same pixel
    /// size, and an envelope that contains `other`'s envelope.
    pub fn covers(&self, other: &GridSpec) -> bool {
        const EPS: f64 = 1e-6;
        if self.epsg != other.epsg {
            return false;
        }
        let (pw, ph) = self.pixel_size();
        let (opw, oph) = other.pixel_size();
        if (pw - opw).abs() > EPS || (ph - oph).abs() > EPS {
            return false;
        }
        let (ax0, ay0, ax1, ay1) = self.envelope();
        let (bx0, by0, bx1, by1) = other.envelope();
        // allow half a pixel of slack for envelope snapping differences
        let slack = pw.max(ph) / 2.0;
        ax0 <= bx0 + slack && ay0 <= by0 + slack && ax1 >= bx1 - slack && ay1 >= by1 - slack
    }

    /// Pixel window of this grid covering `aoi`, as ((col, row), (w, h)),
    /// clamped to the grid bounds. A disjoint AOI yields a zero-sized window.
    pub fn window_for(&self, aoi: &Aoi) -> Result<((isize, isize), (usize, usize))> {
        let (min_x, min_y, max_x, max_y) = projected_envelope(aoi, self.epsg)?;
        let (pw, ph) = self.pixel_size();
        let origin_x = self.geo_transform[0];
        let origin_y = self.geo_transform[3];

        let col0 = (((min_x - origin_x) / pw).floor() as isize).clamp(0, self.width as isize);
        let row0 = (((origin_y - max_y) / ph).floor() as isize).clamp(0, self.height as isize);
        let col1 = (((max_x - origin_x) / pw).ceil() as isize).clamp(0, self.width as isize);
        let row1 = (((origin_y - min_y) / ph).ceil() as isize).clamp(0, self.height as isize);

        let w = (col1 - col0).max(0) as usize;
        let h = (row1 - row0).max(0) as usize;
        Ok(((col0, row0), (w, h)))
    }
}

/// Project the AOI's four corners into `epsg` and return the bounding
/// envelope (min_x, min_y, max_x, max_y).
fn projected_envelope(aoi: &Aoi, epsg: u32) -> Result<(f64, f64, f64, f64)> {
    let mut source = SpatialRef::from_epsg(GEOGRAPHIC_EPSG)?;
    source.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    let mut target =
        SpatialRef::from_epsg(epsg).with_context(|| format!("unknown EPSG code {epsg}"))?;
    target.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);

    let transform = CoordTransform::new(&source, &target)?;

    // All four corners: a projected rectangle's extrema need not lie on two
    // opposite corners alone.
    let mut xs = [aoi.west, aoi.east, aoi.east, aoi.west];
    let mut ys = [aoi.south, aoi.south, aoi.north, aoi.north];
    let mut zs = [0.0; 4];
    transform
        .transform_coords(&mut xs, &mut ys, &mut zs)
        .context("failed to project AOI corners")?;

    let min_x = xs.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_x = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min_y = ys.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_y = ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    Ok((min_x, min_y, max_x, max_y))
}
