// src/cli.rs
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ndwi-composite")]
#[command(about = "Yearly NDWI water-index composites from Landsat surface reflectance archives")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// JSON run configuration; built-in defaults cover the historical
    /// extraction (AOI, Feb-May, 2001-2021, EPSG:26912 at 30 m)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build all yearly composites and export each as a GeoTIFF
    Run {
        /// Scene archive directory (must contain index.json)
        archive: PathBuf,

        /// Destination folder for exported rasters
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Query only the retained generation for 2001-2011 instead of
        /// compositing Landsat 7 and discarding it
        #[arg(long)]
        skip_superseded: bool,

        /// Export scaled int16 instead of float32
        #[arg(long)]
        fixed_point: bool,

        /// Scaling factor for fixed-point output
        #[arg(long, default_value = "10000")]
        scale_factor: i32,
    },

    /// Render one year's composite to a PNG preview
    Preview {
        /// Scene archive directory (must contain index.json)
        archive: PathBuf,

        /// Year to render
        #[arg(short, long, default_value = "2021")]
        year: i32,

        /// Output PNG path
        #[arg(short, long, default_value = "ndwi_preview.png")]
        output: PathBuf,
    },
}
