// tests/pipeline_tests.rs
use std::collections::HashMap;

use chrono::NaiveDate;
use gdal::raster::Buffer;
use gdal::Dataset;

use ndwi_composite::catalog::{
    Generation, MemoryCatalog, Scene, SceneCatalog, SceneQuery,
};
use ndwi_composite::config::{ExportConfig, RunConfig};
use ndwi_composite::export::{ExportQueue, ExportRequest, JobStatus};
use ndwi_composite::geo::{Aoi, GridSpec};
use ndwi_composite::processing::{Pipeline, YearComposite, NODATA};

const SHAPE: (usize, usize) = (4, 4);

fn test_grid() -> GridSpec {
    GridSpec::new(26912, 500_000.0, 3_470_000.0, 30.0, SHAPE.0, SHAPE.1)
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// A cloud-free scene with uniform green/SWIR reflectance.
fn uniform_scene(id: &str, generation: Generation, acquired: NaiveDate, green: f32, swir: f32) -> Scene {
    let pixels = SHAPE.0 * SHAPE.1;
    let mut bands = HashMap::new();
    bands.insert(
        generation.green_band().to_string(),
        Buffer::new(SHAPE, vec![green; pixels]),
    );
    bands.insert(
        generation.swir_band().to_string(),
        Buffer::new(SHAPE, vec![swir; pixels]),
    );
    Scene {
        id: id.to_string(),
        generation,
        acquired,
        bands,
        qa_pixel: Some(Buffer::new(SHAPE, vec![0u16; pixels])),
        qa_radsat: Some(Buffer::new(SHAPE, vec![0u16; pixels])),
    }
}

fn config_for_years(start_year: i32, end_year: i32) -> RunConfig {
    RunConfig {
        start_year,
        end_year,
        ..RunConfig::default()
    }
}

fn queried_generations(catalog: &MemoryCatalog, year: i32) -> Vec<Generation> {
    catalog
        .queries()
        .iter()
        .filter(|q| q.year == year)
        .map(|q| q.generation)
        .collect()
}

fn composite_value(composite: &YearComposite) -> f32 {
    composite.grid.as_ref().expect("non-empty composite").data()[0]
}

#[test]
fn test_collection_has_one_composite_per_year() {
    let catalog = MemoryCatalog::new(test_grid());
    let config = RunConfig::default();
    let composites = Pipeline::new(&catalog, &config).run().unwrap();

    assert_eq!(composites.len(), 21);
    for (i, composite) in composites.iter().enumerate() {
        assert_eq!(composite.year, 2001 + i as i32);
    }
}

#[test]
fn test_landsat8_years_query_only_landsat8() {
    let catalog = MemoryCatalog::new(test_grid());
    let config = config_for_years(2013, 2021);
    Pipeline::new(&catalog, &config).run().unwrap();

    for year in 2013..=2021 {
        assert_eq!(
            queried_generations(&catalog, year),
            vec![Generation::Landsat8],
            "year {year}"
        );
    }
}

#[test]
fn test_2012_queries_only_landsat7() {
    let mut catalog = MemoryCatalog::new(test_grid());
    catalog.push(uniform_scene(
        "LE07_2012",
        Generation::Landsat7,
        date(2012, 4, 2),
        0.5,
        0.3,
    ));
    let config = config_for_years(2012, 2012);
    let composites = Pipeline::new(&catalog, &config).run().unwrap();

    assert_eq!(
        queried_generations(&catalog, 2012),
        vec![Generation::Landsat7]
    );
    assert_eq!(composites[0].generation, Some(Generation::Landsat7));
    assert!((composite_value(&composites[0]) - 0.25).abs() < 1e-6);
}

#[test]
fn test_overlap_years_compute_landsat7_but_retain_landsat5() {
    let mut catalog = MemoryCatalog::new(test_grid());
    // Landsat 7 would give 0.6, Landsat 5 gives 0.2; only the latter survives
    catalog.push(uniform_scene(
        "LE07_2005",
        Generation::Landsat7,
        date(2005, 3, 10),
        0.8,
        0.2,
    ));
    catalog.push(uniform_scene(
        "LT05_2005",
        Generation::Landsat5,
        date(2005, 3, 18),
        0.6,
        0.4,
    ));
    let config = config_for_years(2005, 2005);
    let composites = Pipeline::new(&catalog, &config).run().unwrap();

    // historical behavior: Landsat 7 is queried and composited, then discarded
    assert_eq!(
        queried_generations(&catalog, 2005),
        vec![Generation::Landsat7, Generation::Landsat5]
    );
    assert_eq!(composites[0].generation, Some(Generation::Landsat5));
    assert!((composite_value(&composites[0]) - 0.2).abs() < 1e-6);
}

#[test]
fn test_skip_superseded_elides_discarded_work() {
    let mut catalog = MemoryCatalog::new(test_grid());
    catalog.push(uniform_scene(
        "LE07_2005",
        Generation::Landsat7,
        date(2005, 3, 10),
        0.8,
        0.2,
    ));
    catalog.push(uniform_scene(
        "LT05_2005",
        Generation::Landsat5,
        date(2005, 3, 18),
        0.6,
        0.4,
    ));
    let mut config = config_for_years(2005, 2005);
    config.skip_superseded = true;
    let composites = Pipeline::new(&catalog, &config).run().unwrap();

    // only the retained generation is queried, and the result is identical
    assert_eq!(
        queried_generations(&catalog, 2005),
        vec![Generation::Landsat5]
    );
    assert_eq!(composites[0].generation, Some(Generation::Landsat5));
    assert!((composite_value(&composites[0]) - 0.2).abs() < 1e-6);
}

#[test]
fn test_empty_years_propagate_without_error() {
    let mut catalog = MemoryCatalog::new(test_grid());
    catalog.push(uniform_scene(
        "LT05_2005",
        Generation::Landsat5,
        date(2005, 2, 20),
        0.5,
        0.3,
    ));
    let config = config_for_years(2004, 2006);
    let composites = Pipeline::new(&catalog, &config).run().unwrap();

    assert_eq!(composites.len(), 3);
    assert!(composites[0].is_empty());
    assert!(!composites[1].is_empty());
    assert_eq!(composites[1].scene_count, 1);
    assert!(composites[2].is_empty());
}

#[test]
fn test_fully_masked_scene_does_not_dilute_the_mean() {
    let mut catalog = MemoryCatalog::new(test_grid());
    catalog.push(uniform_scene(
        "LC08_clear",
        Generation::Landsat8,
        date(2015, 2, 1),
        0.6,
        0.2,
    ));
    // cloudy scene: every pixel flagged in QA_PIXEL
    let mut cloudy = uniform_scene(
        "LC08_cloudy",
        Generation::Landsat8,
        date(2015, 4, 1),
        0.9,
        0.1,
    );
    cloudy.qa_pixel = Some(Buffer::new(SHAPE, vec![0b00100u16; SHAPE.0 * SHAPE.1]));
    catalog.push(cloudy);

    let config = config_for_years(2015, 2015);
    let composites = Pipeline::new(&catalog, &config).run().unwrap();

    assert_eq!(composites[0].scene_count, 2);
    // only the clear scene contributes: (0.6-0.2)/(0.6+0.2) = 0.5
    assert!((composite_value(&composites[0]) - 0.5).abs() < 1e-6);
}

#[test]
fn test_query_filters_months_and_orders_by_date() {
    let mut catalog = MemoryCatalog::new(test_grid());
    catalog.push(uniform_scene(
        "may",
        Generation::Landsat8,
        date(2015, 5, 30),
        0.5,
        0.3,
    ));
    catalog.push(uniform_scene(
        "january",
        Generation::Landsat8,
        date(2015, 1, 15),
        0.5,
        0.3,
    ));
    catalog.push(uniform_scene(
        "february",
        Generation::Landsat8,
        date(2015, 2, 1),
        0.5,
        0.3,
    ));
    catalog.push(uniform_scene(
        "june",
        Generation::Landsat8,
        date(2015, 6, 1),
        0.5,
        0.3,
    ));

    let query = SceneQuery {
        generation: Generation::Landsat8,
        aoi: RunConfig::default().aoi,
        start_month: 2,
        end_month: 5,
        year: 2015,
    };
    let scenes = catalog.query(&query).unwrap();

    let ids: Vec<&str> = scenes.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["february", "may"]);
}

// ── Export ──────────────────────────────────────────────────────────

/// Small AOI so export tests work on a handful of pixels.
fn small_aoi() -> Aoi {
    Aoi::new(-91.966, 31.254, -91.960, 31.258)
}

fn export_dir(label: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("ndwi-composite-{}-{}", label, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn filled_composite(year: i32, grid: &GridSpec, value: f32) -> YearComposite {
    YearComposite {
        year,
        generation: Some(Generation::Landsat8),
        scene_count: 1,
        grid: Some(Buffer::new(grid.shape(), vec![value; grid.width * grid.height])),
    }
}

#[test]
fn test_export_request_uses_fixed_constants_for_every_year() {
    let config = ExportConfig::default();
    let aoi = RunConfig::default().aoi;

    for year in [2001, 2012, 2021] {
        let request = ExportRequest::for_year(&config, aoi, year);
        assert_eq!(request.description, format!("NDWI_Feb_May_{year}"));
        assert_eq!(request.region, aoi);
        assert_eq!(request.scale, 30.0);
        assert_eq!(request.crs_epsg, 26912);
        assert_eq!(request.max_pixels, 200_000_000);
    }
}

#[test]
fn test_export_writes_clipped_geotiff() {
    let aoi = small_aoi();
    let grid = GridSpec::from_aoi(&aoi, 26912, 30.0).unwrap();
    let composite = filled_composite(2021, &grid, 0.25);

    let mut config = ExportConfig::default();
    config.folder = export_dir("roundtrip");
    let request = ExportRequest::for_year(&config, aoi, 2021);

    let queue = ExportQueue::new(1);
    let handle = queue.submit(composite, grid.clone(), request);
    queue.join();

    let path = match handle.status() {
        JobStatus::Completed(path) => path,
        status => panic!("expected completion, got {status:?}"),
    };
    assert!(path.ends_with("NDWI_Feb_May_2021.tif"));

    let dataset = Dataset::open(&path).unwrap();
    let (width, height) = dataset.raster_size();
    assert_eq!((width, height), grid.shape());
    let band = dataset.rasterband(1).unwrap();
    assert_eq!(band.no_data_value(), Some(NODATA as f64));
    let buffer = band
        .read_as::<f32>((0, 0), (width, height), (width, height), None)
        .unwrap();
    assert!((buffer.data()[0] - 0.25).abs() < 1e-6);

    let _ = std::fs::remove_dir_all(&config.folder);
}

#[test]
fn test_export_rejects_clip_over_pixel_cap() {
    let aoi = small_aoi();
    let grid = GridSpec::from_aoi(&aoi, 26912, 30.0).unwrap();
    let composite = filled_composite(2019, &grid, 0.1);

    let mut config = ExportConfig::default();
    config.folder = export_dir("cap");
    config.max_pixels = 4; // far below the clip size
    let request = ExportRequest::for_year(&config, aoi, 2019);

    let queue = ExportQueue::new(1);
    let handle = queue.submit(composite, grid, request);
    queue.join();

    match handle.status() {
        JobStatus::Failed(reason) => assert!(reason.contains("exceeds"), "reason: {reason}"),
        status => panic!("expected failure, got {status:?}"),
    }
    // the job was rejected, nothing was written
    assert!(!config.folder.join("NDWI_Feb_May_2019.tif").exists());
}

#[test]
fn test_export_of_empty_composite_fails_with_reason() {
    let aoi = small_aoi();
    let grid = GridSpec::from_aoi(&aoi, 26912, 30.0).unwrap();

    let mut config = ExportConfig::default();
    config.folder = export_dir("empty");
    let request = ExportRequest::for_year(&config, aoi, 2003);

    let queue = ExportQueue::new(1);
    let handle = queue.submit(YearComposite::empty(2003), grid, request);
    queue.join();

    match handle.status() {
        JobStatus::Failed(reason) => {
            assert!(reason.contains("no qualifying scenes"), "reason: {reason}")
        }
        status => panic!("expected failure, got {status:?}"),
    }
}
