// src/catalog/memory.rs
use anyhow::Result;
use chrono::Datelike;
use itertools::Itertools;
use parking_lot::Mutex;

use super::{Scene, SceneCatalog, SceneQuery};
use crate::geo::GridSpec;

/// In-memory scene catalog.
///
/// Serves scenes registered programmatically and records every query it
/// answers, which makes the year-to-generation selection (including the
/// compute-and-discard of superseded generations) observable from outside.
pub struct MemoryCatalog {
    grid: GridSpec,
    scenes: Vec<Scene>,
    query_log: Mutex<Vec<SceneQuery>>,
}

impl MemoryCatalog {
    pub fn new(grid: GridSpec) -> Self {
        Self {
            grid,
            scenes: Vec::new(),
            query_log: Mutex::new(Vec::new()),
        }
    }

    /// Register a scene. Scenes are assumed co-registered on the catalog grid;
    /// mismatched bands degrade to all-masked data during preprocessing.
    pub fn push(&mut self, scene: Scene) {
        self.scenes.push(scene);
    }

    /// Queries served so far, in order.
    pub fn queries(&self) -> Vec<SceneQuery> {
        self.query_log.lock().clone()
    }
}

impl SceneCatalog for MemoryCatalog {
    fn grid(&self) -> &GridSpec {
        &self.grid
    }

    fn query(&self, query: &SceneQuery) -> Result<Vec<Scene>> {
        self.query_log.lock().push(query.clone());

        let months = query.start_month..=query.end_month;
        Ok(self
            .scenes
            .iter()
            .filter(|s| {
                s.generation == query.generation
                    && s.acquired.year() == query.year
                    && months.contains(&s.acquired.month())
            })
            .cloned()
            .sorted_by_key(|s| s.acquired)
            .collect())
    }
}
