// src/processing/indices/ndwi.rs
use gdal::raster::Buffer;
use rayon::prelude::*;

use crate::processing::indices::IndexCalculator;
use crate::processing::NODATA;

/// Normalized Difference Water Index: (GREEN - SWIR) / (GREEN + SWIR).
///
/// Finite inputs with a nonzero denominator produce values in [-1, 1].
/// No-data in either input, or a zero denominator, yields no-data.
pub struct NDWI {
    green_index: usize,
    swir_index: usize,
    name: String,
}

impl NDWI {
    pub fn new(green_index: usize, swir_index: usize, name: Option<String>) -> Self {
        Self {
            green_index,
            swir_index,
            name: name.unwrap_or_else(|| "NDWI".to_string()),
        }
    }
}

impl Default for NDWI {
    fn default() -> Self {
        Self::new(0, 1, None)
    }
}

impl IndexCalculator for NDWI {
    fn calculate(&self, inputs: &[Buffer<f32>]) -> Buffer<f32> {
        let green = &inputs[self.green_index];
        let swir = &inputs[self.swir_index];
        assert_eq!(
            green.shape(),
            swir.shape(),
            "input bands must be co-registered"
        );

        let shape = green.shape();
        let green_band = green.data();
        let swir_band = swir.data();

        let mut result_data = vec![0.0f32; shape.0 * shape.1];
        result_data
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, result)| {
                let green_val = green_band[i];
                let swir_val = swir_band[i];

                *result = if green_val == NODATA || swir_val == NODATA {
                    NODATA
                } else {
                    let sum = green_val + swir_val;
                    if sum == 0.0 {
                        NODATA
                    } else {
                        (green_val - swir_val) / sum
                    }
                };
            });

        Buffer::new(shape, result_data)
    }

    fn required_bands(&self) -> usize {
        2
    }

    fn name(&self) -> &str {
        &self.name
    }
}
