// src/main.rs
use std::path::Path;

use anyhow::{bail, Result};
use clap::Parser;

use ndwi_composite::catalog::{ArchiveCatalog, SceneCatalog};
use ndwi_composite::cli::{Cli, Commands};
use ndwi_composite::config::{load_config, RunConfig};
use ndwi_composite::export::{ExportQueue, ExportRequest, JobStatus};
use ndwi_composite::geo::GridSpec;
use ndwi_composite::processing::Pipeline;
use ndwi_composite::render::{render_preview, DISPLAY_MAX, DISPLAY_MIN};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RunConfig::default(),
    };

    match &cli.command {
        Commands::Run {
            archive,
            output,
            skip_superseded,
            fixed_point,
            scale_factor,
        } => {
            if let Some(output) = output {
                config.export.folder = output.clone();
            }
            if *skip_superseded {
                config.skip_superseded = true;
            }
            if *fixed_point {
                config.export.fixed_point = true;
                config.export.scale_factor = *scale_factor;
            }
            run(&config, archive)
        }
        Commands::Preview {
            archive,
            year,
            output,
        } => preview(&config, archive, *year, output),
    }
}

/// Open the archive and check it can actually serve the configured run:
/// same CRS and resolution as the export contract, covering the AOI.
fn open_catalog(config: &RunConfig, archive: &Path) -> Result<ArchiveCatalog> {
    let catalog = ArchiveCatalog::open(archive)?;
    let expected = GridSpec::from_aoi(&config.aoi, config.export.crs_epsg, config.export.scale)?;
    if !catalog.grid().covers(&expected) {
        bail!(
            "archive grid (EPSG:{}, {}x{}) does not cover the AOI at scale {} in EPSG:{}",
            catalog.grid().epsg,
            catalog.grid().width,
            catalog.grid().height,
            config.export.scale,
            config.export.crs_epsg
        );
    }
    Ok(catalog)
}

fn run(config: &RunConfig, archive: &Path) -> Result<()> {
    let catalog = open_catalog(config, archive)?;
    println!(
        "Archive: {} scenes on a {}x{} grid (EPSG:{})",
        catalog.scene_count(),
        catalog.grid().width,
        catalog.grid().height,
        catalog.grid().epsg
    );

    let pipeline = Pipeline::new(&catalog, config);
    let total = (config.end_year - config.start_year + 1) as usize;
    let mut composites = Vec::with_capacity(total);
    for (i, year) in (config.start_year..=config.end_year).enumerate() {
        let composite = pipeline.year_composite(year)?;
        if composite.is_empty() {
            println!("[{}/{}] {}: no qualifying scenes", i + 1, total, year);
        } else if let Some(generation) = composite.generation {
            println!(
                "[{}/{}] {}: {} scenes from {}",
                i + 1,
                total,
                year,
                composite.scene_count,
                generation
            );
        }
        composites.push(composite);
    }

    let queue = ExportQueue::new(config.export.workers);
    let grid = catalog.grid().clone();
    let handles: Vec<_> = composites
        .into_iter()
        .map(|composite| {
            let request = ExportRequest::for_year(&config.export, config.aoi, composite.year);
            queue.submit(composite, grid.clone(), request)
        })
        .collect();
    queue.join();

    let mut succeeded = 0;
    let mut failed = 0;
    for handle in &handles {
        match handle.status() {
            JobStatus::Completed(path) => {
                succeeded += 1;
                println!("{}: exported {}", handle.year, path.display());
            }
            JobStatus::Failed(reason) => {
                failed += 1;
                eprintln!("{}: export failed: {}", handle.year, reason);
            }
            JobStatus::Queued | JobStatus::Running => {
                failed += 1;
                eprintln!("{}: export never reached a terminal status", handle.year);
            }
        }
    }
    println!("Export complete: {succeeded} succeeded, {failed} failed");
    Ok(())
}

fn preview(config: &RunConfig, archive: &Path, year: i32, output: &Path) -> Result<()> {
    let catalog = open_catalog(config, archive)?;
    let pipeline = Pipeline::new(&catalog, config);
    let composite = pipeline.year_composite(year)?;
    let Some(grid) = &composite.grid else {
        bail!("no qualifying scenes for {year}; nothing to render");
    };
    render_preview(grid, DISPLAY_MIN, DISPLAY_MAX, output)?;
    println!(
        "Preview written: {} ({} scenes)",
        output.display(),
        composite.scene_count
    );
    Ok(())
}
