// src/export/mod.rs
pub mod geotiff;

pub use geotiff::write_composite;

use std::panic;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use flume::Sender;
use parking_lot::Mutex;

use crate::config::ExportConfig;
use crate::geo::{Aoi, GridSpec};
use crate::processing::YearComposite;

/// One export submission: a yearly composite plus the fixed delivery
/// parameters. Identical for every year except the description.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    /// Human-readable name encoding the band set and year; also the output
    /// file stem.
    pub description: String,
    pub folder: PathBuf,
    /// Clip region, always the run AOI.
    pub region: Aoi,
    pub scale: f64,
    pub crs_epsg: u32,
    pub max_pixels: u64,
    pub fixed_point: bool,
    pub scale_factor: i32,
}

impl ExportRequest {
    /// The request for one year's composite under the run's export settings.
    pub fn for_year(config: &ExportConfig, region: Aoi, year: i32) -> Self {
        Self {
            description: format!("NDWI_Feb_May_{year}"),
            folder: config.folder.clone(),
            region,
            scale: config.scale,
            crs_epsg: config.crs_epsg,
            max_pixels: config.max_pixels,
            fixed_point: config.fixed_point,
            scale_factor: config.scale_factor,
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.folder.join(format!("{}.tif", self.description))
    }
}

/// Lifecycle of a submitted export job.
#[derive(Debug, Clone)]
pub enum JobStatus {
    Queued,
    Running,
    Completed(PathBuf),
    Failed(String),
}

/// Pollable handle to a submitted export job.
#[derive(Clone)]
pub struct JobHandle {
    pub year: i32,
    pub description: String,
    status: Arc<Mutex<JobStatus>>,
}

impl JobHandle {
    pub fn status(&self) -> JobStatus {
        self.status.lock().clone()
    }
}

struct ExportJob {
    composite: YearComposite,
    grid: GridSpec,
    request: ExportRequest,
    status: Arc<Mutex<JobStatus>>,
}

/// Background export queue: submissions return immediately with a
/// [`JobHandle`]; worker threads drain the queue and record each job's
/// terminal status. There is no retry; a failed job stays failed.
pub struct ExportQueue {
    req_tx: Sender<ExportJob>,
    workers: Vec<JoinHandle<()>>,
}

impl ExportQueue {
    pub fn new(threads: usize) -> Self {
        let (req_tx, req_rx) = flume::unbounded::<ExportJob>();

        let mut workers = Vec::with_capacity(threads.max(1));
        for _ in 0..threads.max(1) {
            let req_rx = req_rx.clone();
            workers.push(thread::spawn(move || {
                for job in req_rx {
                    *job.status.lock() = JobStatus::Running;
                    let result = write_composite(&job.composite, &job.grid, &job.request);
                    *job.status.lock() = match result {
                        Ok(path) => JobStatus::Completed(path),
                        Err(e) => JobStatus::Failed(format!("{e:#}")),
                    };
                }
            }));
        }

        Self { req_tx, workers }
    }

    /// Queue one composite for export. The composite is moved into the job;
    /// the returned handle is the only way to observe its outcome.
    pub fn submit(
        &self,
        composite: YearComposite,
        grid: GridSpec,
        request: ExportRequest,
    ) -> JobHandle {
        let status = Arc::new(Mutex::new(JobStatus::Queued));
        let handle = JobHandle {
            year: composite.year,
            description: request.description.clone(),
            status: Arc::clone(&status),
        };
        self.req_tx
            .send(ExportJob {
                composite,
                grid,
                request,
                status,
            })
            .expect("export workers stopped before the queue closed");
        handle
    }

    /// Close the queue and wait for every submitted job to reach a terminal
    /// status.
    pub fn join(self) {
        drop(self.req_tx);

        let mut errors = Vec::new();
        for worker in self.workers {
            if let Err(e) = worker.join() {
                errors.push(e);
            }
        }
        if !errors.is_empty() {
            panic::resume_unwind(Box::new(errors));
        }
    }
}
