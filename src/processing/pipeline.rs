// src/processing/pipeline.rs
use anyhow::Result;
use gdal::raster::Buffer;

use crate::catalog::{generations_for_year, Generation, SceneCatalog, SceneQuery};
use crate::config::RunConfig;
use crate::processing::composite::{mean_composite, YearComposite};
use crate::processing::indices::{IndexCalculator, NDWI};
use crate::processing::mask::masked_scene_band;

/// The composite pipeline: for each year in range, pick the sensor
/// generation(s), query the catalog, mask and derive NDWI per scene, and
/// reduce to a mean composite tagged with the year.
pub struct Pipeline<'a, C: SceneCatalog> {
    catalog: &'a C,
    config: &'a RunConfig,
    index: NDWI,
}

impl<'a, C: SceneCatalog> Pipeline<'a, C> {
    pub fn new(catalog: &'a C, config: &'a RunConfig) -> Self {
        Self {
            catalog,
            config,
            index: NDWI::default(),
        }
    }

    /// Build the full composite collection, one entry per year in range,
    /// in year order.
    pub fn run(&self) -> Result<Vec<YearComposite>> {
        let years = self.config.start_year..=self.config.end_year;
        let mut composites = Vec::with_capacity(years.clone().count());
        for year in years {
            composites.push(self.year_composite(year)?);
        }
        Ok(composites)
    }

    /// Build one year's composite.
    ///
    /// Candidate generations are evaluated in order and the last candidate's
    /// composite is retained. By default every candidate is composited even
    /// when a later one supersedes it, matching the historical behavior for
    /// the 2001-2011 Landsat 7/5 overlap; `skip_superseded` elides the
    /// discarded work without changing the retained result.
    pub fn year_composite(&self, year: i32) -> Result<YearComposite> {
        let candidates = generations_for_year(year);
        let selected: &[Generation] = if self.config.skip_superseded {
            match candidates.last() {
                Some(last) => std::slice::from_ref(last),
                None => &[],
            }
        } else {
            &candidates
        };

        let mut composite = YearComposite::empty(year);
        for &generation in selected {
            composite = self.generation_composite(year, generation)?;
        }
        Ok(composite)
    }

    /// Composite one year from one generation's scenes. An empty query result
    /// degrades to an empty composite, never an error.
    fn generation_composite(&self, year: i32, generation: Generation) -> Result<YearComposite> {
        let query = SceneQuery {
            generation,
            aoi: self.config.aoi,
            start_month: self.config.start_month,
            end_month: self.config.end_month,
            year,
        };
        let scenes = self.catalog.query(&query)?;
        let shape = self.catalog.grid().shape();

        let layers: Vec<Buffer<f32>> = scenes
            .iter()
            .map(|scene| {
                let green = masked_scene_band(scene, generation.green_band(), shape);
                let swir = masked_scene_band(scene, generation.swir_band(), shape);
                self.index.calculate(&[green, swir])
            })
            .collect();

        Ok(YearComposite {
            year,
            generation: Some(generation),
            scene_count: layers.len(),
            grid: mean_composite(&layers),
        })
    }
}
