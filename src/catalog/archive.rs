// src/catalog/archive.rs
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, NaiveDate};
use gdal::raster::Buffer;
use gdal::raster::GdalType;
use gdal::Dataset;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{Generation, Scene, SceneCatalog, SceneQuery};
use crate::geo::GridSpec;

/// Manifest file name expected at the archive root.
pub const INDEX_FILE: &str = "index.json";

/// `index.json` manifest of a local scene archive: the shared grid all
/// band files are registered on, plus one entry per scene.
#[derive(Debug, Serialize, Deserialize)]
pub struct ArchiveIndex {
    pub grid: GridSpec,
    pub scenes: Vec<SceneEntry>,
}

/// One scene's metadata and band file locations, relative to the archive root.
#[derive(Debug, Serialize, Deserialize)]
pub struct SceneEntry {
    pub id: String,
    pub generation: Generation,
    pub acquired: NaiveDate,
    #[serde(default)]
    pub bands: HashMap<String, PathBuf>,
    #[serde(default)]
    pub qa_pixel: Option<PathBuf>,
    #[serde(default)]
    pub qa_radsat: Option<PathBuf>,
}

/// Thread-safe cache of opened GDAL datasets, keyed by path.
///
/// Scenes share QA files across band loads within a query, so keeping the
/// handles open avoids re-running driver discovery per band.
struct DatasetCache {
    datasets: Mutex<HashMap<PathBuf, Arc<Mutex<Dataset>>>>,
}

impl DatasetCache {
    fn new() -> Self {
        Self {
            datasets: Mutex::new(HashMap::new()),
        }
    }

    fn get(&self, path: &Path) -> Result<Arc<Mutex<Dataset>>> {
        let mut cache = self.datasets.lock();
        if let Some(dataset) = cache.get(path) {
            return Ok(Arc::clone(dataset));
        }
        let dataset = Arc::new(Mutex::new(
            Dataset::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        ));
        cache.insert(path.to_path_buf(), Arc::clone(&dataset));
        Ok(dataset)
    }
}

/// Local archive of co-registered GeoTIFF scene bands described by an
/// `index.json` manifest. The locally-fetched stand-in for the hosted
/// imagery catalog: filtering happens on manifest metadata, pixel data is
/// only read for scenes that match.
pub struct ArchiveCatalog {
    root: PathBuf,
    index: ArchiveIndex,
    cache: DatasetCache,
}

impl ArchiveCatalog {
    /// Open an archive directory containing [`INDEX_FILE`].
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let index_path = root.join(INDEX_FILE);
        let content = fs::read_to_string(&index_path)
            .with_context(|| format!("failed to read {}", index_path.display()))?;
        let index: ArchiveIndex = serde_json::from_str(&content)
            .with_context(|| format!("invalid archive index {}", index_path.display()))?;
        Ok(Self {
            root,
            index,
            cache: DatasetCache::new(),
        })
    }

    pub fn scene_count(&self) -> usize {
        self.index.scenes.len()
    }

    fn load_band<T: GdalType + Copy>(&self, relative: &Path) -> Result<Buffer<T>> {
        let path = self.root.join(relative);
        let dataset = self.cache.get(&path)?;
        let dataset = dataset.lock();
        let (width, height) = dataset.raster_size();
        if (width, height) != self.index.grid.shape() {
            return Err(anyhow!(
                "{}: raster is {}x{} but the archive grid is {}x{}",
                path.display(),
                width,
                height,
                self.index.grid.width,
                self.index.grid.height
            ));
        }
        let band = dataset.rasterband(1)?;
        Ok(band.read_as::<T>((0, 0), (width, height), (width, height), None)?)
    }

    fn load_scene(&self, entry: &SceneEntry) -> Result<Scene> {
        let mut bands = HashMap::with_capacity(entry.bands.len());
        for (name, file) in &entry.bands {
            bands.insert(name.clone(), self.load_band::<f32>(file)?);
        }
        let qa_pixel = match &entry.qa_pixel {
            Some(file) => Some(self.load_band::<u16>(file)?),
            None => None,
        };
        let qa_radsat = match &entry.qa_radsat {
            Some(file) => Some(self.load_band::<u16>(file)?),
            None => None,
        };
        Ok(Scene {
            id: entry.id.clone(),
            generation: entry.generation,
            acquired: entry.acquired,
            bands,
            qa_pixel,
            qa_radsat,
        })
    }
}

impl SceneCatalog for ArchiveCatalog {
    fn grid(&self) -> &GridSpec {
        &self.index.grid
    }

    fn query(&self, query: &SceneQuery) -> Result<Vec<Scene>> {
        let months = query.start_month..=query.end_month;
        let mut matching: Vec<&SceneEntry> = self
            .index
            .scenes
            .iter()
            .filter(|e| {
                e.generation == query.generation
                    && e.acquired.year() == query.year
                    && months.contains(&e.acquired.month())
            })
            .collect();
        matching.sort_by_key(|e| e.acquired);

        matching
            .into_iter()
            .map(|entry| {
                self.load_scene(entry)
                    .with_context(|| format!("failed to load scene {}", entry.id))
            })
            .collect()
    }
}
