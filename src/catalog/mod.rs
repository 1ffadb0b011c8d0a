// src/catalog/mod.rs
pub mod archive;
pub mod landsat;
pub mod memory;

pub use archive::ArchiveCatalog;
pub use landsat::{effective_generation, generations_for_year, Generation};
pub use memory::MemoryCatalog;

use std::collections::HashMap;

use anyhow::Result;
use chrono::NaiveDate;
use gdal::raster::Buffer;

use crate::geo::{Aoi, GridSpec};

/// One satellite observation, co-registered on the catalog grid.
///
/// Reflectance bands are keyed by their raw per-generation names
/// (e.g. `SR_B3`). QA grids are optional; preprocessing treats their
/// absence as "nothing can be trusted" and masks every pixel.
#[derive(Debug, Clone)]
pub struct Scene {
    pub id: String,
    pub generation: Generation,
    pub acquired: NaiveDate,
    pub bands: HashMap<String, Buffer<f32>>,
    pub qa_pixel: Option<Buffer<u16>>,
    pub qa_radsat: Option<Buffer<u16>>,
}

/// Filter shape of a catalog query: one sensor generation, a spatial bound,
/// a calendar-month range and a calendar year.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneQuery {
    pub generation: Generation,
    pub aoi: Aoi,
    pub start_month: u32,
    pub end_month: u32,
    pub year: i32,
}

/// The contract this pipeline expects from an imagery catalog.
///
/// Implementations own scene storage and filtering; callers never mutate
/// scenes in place. All served scenes share the catalog's [`GridSpec`].
pub trait SceneCatalog {
    /// The grid every served scene is registered on.
    fn grid(&self) -> &GridSpec;

    /// All scenes matching the query, ordered by acquisition date.
    /// An empty result is a normal outcome, not an error.
    fn query(&self, query: &SceneQuery) -> Result<Vec<Scene>>;
}
