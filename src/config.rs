// src/config.rs
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::geo::Aoi;

/// Parameters of one composite run. All fields have hard-coded defaults
/// matching the historical extraction; a JSON file can override any subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_aoi")]
    pub aoi: Aoi,
    /// First calendar month of the seasonal window (February).
    #[serde(default = "default_start_month")]
    pub start_month: u32,
    /// Last calendar month of the seasonal window (May).
    #[serde(default = "default_end_month")]
    pub end_month: u32,
    #[serde(default = "default_start_year")]
    pub start_year: i32,
    #[serde(default = "default_end_year")]
    pub end_year: i32,
    /// When set, overlap years query only the retained generation instead of
    /// compositing superseded generations and discarding them.
    #[serde(default)]
    pub skip_superseded: bool,
    #[serde(default)]
    pub export: ExportConfig,
}

/// Fixed export parameters, identical for every year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_folder")]
    pub folder: PathBuf,
    /// Linear ground resolution of the output grid.
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// Projected CRS of the output grid (EPSG:26912, UTM 12N / NAD83).
    #[serde(default = "default_crs_epsg")]
    pub crs_epsg: u32,
    /// Safety ceiling; a clip exceeding it is rejected, never downsampled.
    #[serde(default = "default_max_pixels")]
    pub max_pixels: u64,
    /// Write scaled int16 instead of float32.
    #[serde(default)]
    pub fixed_point: bool,
    #[serde(default = "default_scale_factor")]
    pub scale_factor: i32,
    /// Export worker threads.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_aoi() -> Aoi {
    Aoi::new(-91.966, 31.254, -91.495, 31.540)
}

fn default_start_month() -> u32 {
    2
}

fn default_end_month() -> u32 {
    5
}

fn default_start_year() -> i32 {
    2001
}

fn default_end_year() -> i32 {
    2021
}

fn default_folder() -> PathBuf {
    PathBuf::from("exports")
}

fn default_scale() -> f64 {
    30.0
}

fn default_crs_epsg() -> u32 {
    26912
}

fn default_max_pixels() -> u64 {
    200_000_000
}

fn default_scale_factor() -> i32 {
    10000
}

fn default_workers() -> usize {
    num_cpus::get().clamp(1, 4)
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            aoi: default_aoi(),
            start_month: default_start_month(),
            end_month: default_end_month(),
            start_year: default_start_year(),
            end_year: default_end_year(),
            skip_superseded: false,
            export: ExportConfig::default(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            folder: default_folder(),
            scale: default_scale(),
            crs_epsg: default_crs_epsg(),
            max_pixels: default_max_pixels(),
            fixed_point: false,
            scale_factor: default_scale_factor(),
            workers: default_workers(),
        }
    }
}

/// Load a run configuration from a JSON file. Missing fields fall back to
/// the built-in defaults.
pub fn load_config(path: &Path) -> Result<RunConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: RunConfig = serde_json::from_str(&content)
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}
