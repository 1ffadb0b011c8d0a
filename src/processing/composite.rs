// src/processing/composite.rs
use gdal::raster::Buffer;
use rayon::prelude::*;

use crate::catalog::Generation;
use crate::processing::NODATA;

/// The temporal mean of the NDWI band across one year's qualifying scenes,
/// tagged with the year it was built for.
#[derive(Debug, Clone)]
pub struct YearComposite {
    pub year: i32,
    /// Generation whose scenes were retained. `None` only when no generation
    /// covers the year at all.
    pub generation: Option<Generation>,
    /// Number of scenes that contributed.
    pub scene_count: usize,
    /// Mean NDWI grid. `None` when no scenes qualified; downstream consumers
    /// must treat that as an empty (all no-data) result, not an error.
    pub grid: Option<Buffer<f32>>,
}

impl YearComposite {
    /// The empty composite for a year: what the aggregation yields when no
    /// scenes qualify.
    pub fn empty(year: i32) -> Self {
        Self {
            year,
            generation: None,
            scene_count: 0,
            grid: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_none()
    }
}

/// Per-pixel arithmetic mean across layers, ignoring no-data contributions.
///
/// A pixel with no valid contribution in any layer stays no-data. An empty
/// layer set yields `None` (the mean over an empty set). All layers must
/// share one shape; the pipeline guarantees this by construction.
pub fn mean_composite(layers: &[Buffer<f32>]) -> Option<Buffer<f32>> {
    let first = layers.first()?;
    let shape = first.shape();
    debug_assert!(layers.iter().all(|l| l.shape() == shape));

    let mut result_data = vec![NODATA; shape.0 * shape.1];
    result_data
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, result)| {
            let mut sum = 0.0f64;
            let mut count = 0u32;
            for layer in layers {
                let value = layer.data()[i];
                if value != NODATA {
                    sum += value as f64;
                    count += 1;
                }
            }
            if count > 0 {
                *result = (sum / count as f64) as f32;
            }
        });

    Some(Buffer::new(shape, result_data))
}
