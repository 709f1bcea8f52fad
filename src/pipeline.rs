//! Batch compositing of collage jobs.
//!
//! A [`Pipeline`] owns a list of [`CollageJob`]s and runs them either on the
//! calling thread ([`Pipeline::run`]) or on a pool of worker threads
//! ([`Pipeline::run_parallel`]). Progress is reported through a [`Visitor`].
//! A failing job is handed to [`Visitor::on_iter_err`] and the batch goes on.

mod manifest;
mod parallel;
mod sequential;

pub use crate::pipeline::manifest::Manifest;
pub use crate::pipeline::parallel::{ParallelismOptions, PipelineJoinHandle};

use crate::compose::Compositor;
use crate::error::{Error, Result};
use crate::image::Color;
use crate::registry::LayoutRegistry;

use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One collage to produce.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CollageJob {
    pub layout: String,
    pub photos: Vec<PathBuf>,
    #[serde(default)]
    pub frame: Option<PathBuf>,
    pub output: PathBuf,
}

impl CollageJob {
    pub fn new(layout: impl Into<String>, photos: Vec<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self { layout: layout.into(), photos, frame: None, output: output.into() }
    }

    pub fn with_frame(mut self, frame: impl Into<PathBuf>) -> Self {
        self.frame = Some(frame.into());
        self
    }
}

/// Hooks called while a pipeline runs.
///
/// `worker` is 0 for the thread driving the batch and `1..=n` for pool
/// workers; `i` is the job's position in the batch.
#[allow(unused_variables)]
pub trait Visitor {
    fn on_start(&self, worker: usize) {}

    fn on_total(&self, total: usize) {}

    fn on_iter_start(&self, worker: usize, i: usize, job: &CollageJob) {}

    fn on_iter_ok(&self, worker: usize, i: usize, job: CollageJob) {}

    fn on_iter_err(&self, worker: usize, i: usize, job: CollageJob, e: Error) {}

    fn on_finish(&self, worker: usize, result: &Result<()>) {}
}

impl Visitor for () {}

/// Counts finished and failed jobs.
#[derive(Debug, Clone, Default)]
pub struct Tally {
    ok: Arc<AtomicUsize>,
    failed: Arc<AtomicUsize>,
}

impl Tally {
    pub fn ok(&self) -> usize {
        self.ok.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }
}

impl Visitor for Tally {
    fn on_iter_ok(&self, _worker: usize, _i: usize, _job: CollageJob) {
        self.ok.fetch_add(1, Ordering::Relaxed);
    }

    fn on_iter_err(&self, _worker: usize, i: usize, job: CollageJob, e: Error) {
        log::warn!("job {i} ({}) failed: {e}", job.output.display());
        self.failed.fetch_add(1, Ordering::Relaxed);
    }
}

impl<A: Visitor, B: Visitor> Visitor for (A, B) {
    fn on_start(&self, worker: usize) {
        self.0.on_start(worker);
        self.1.on_start(worker);
    }

    fn on_total(&self, total: usize) {
        self.0.on_total(total);
        self.1.on_total(total);
    }

    fn on_iter_start(&self, worker: usize, i: usize, job: &CollageJob) {
        self.0.on_iter_start(worker, i, job);
        self.1.on_iter_start(worker, i, job);
    }

    fn on_iter_ok(&self, worker: usize, i: usize, job: CollageJob) {
        self.0.on_iter_ok(worker, i, job.clone());
        self.1.on_iter_ok(worker, i, job);
    }

    fn on_iter_err(&self, worker: usize, i: usize, job: CollageJob, e: Error) {
        self.0.on_iter_err(worker, i, job.clone(), e.clone());
        self.1.on_iter_err(worker, i, job, e);
    }

    fn on_finish(&self, worker: usize, result: &Result<()>) {
        self.0.on_finish(worker, result);
        self.1.on_finish(worker, result);
    }
}

pub struct Pipeline<V: Visitor = ()> {
    registry: Arc<LayoutRegistry>,
    background: Color,
    jobs: Vec<CollageJob>,
    visitor: V,
}

impl Pipeline {
    pub fn new(registry: Arc<LayoutRegistry>, jobs: Vec<CollageJob>) -> Self {
        Self { registry, background: Color::BLACK, jobs, visitor: () }
    }
}

impl<V: Visitor> Pipeline<V> {
    pub fn with_visitor<W: Visitor>(self, visitor: W) -> Pipeline<W> {
        Pipeline {
            registry: self.registry,
            background: self.background,
            jobs: self.jobs,
            visitor,
        }
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    pub fn jobs(&self) -> &[CollageJob] {
        &self.jobs
    }
}

/// Resolves, composes, frames and writes a single job.
fn process(job: &CollageJob, registry: &LayoutRegistry, compositor: &Compositor) -> Result<()> {
    let ib = compositor.backend();
    let geometry = registry.resolve(&job.layout)?;
    let photos = job
        .photos
        .iter()
        .map(|fp| ib.open_photo(fp))
        .collect::<Result<Vec<_>>>()?;
    let collage = compositor.compose(&photos, &geometry)?;
    let img = match &job.frame {
        Some(fp) => {
            let template = ib.open_frame(fp)?;
            collage.framed(compositor, &template)?
        }
        None => collage.into_image(),
    };
    if let Some(folder) = job.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(folder).map_err(|e| Error::output_folder(folder, e))?;
    }
    ib.write(&img, &job.output)?;
    log::debug!("wrote {}", job.output.display());
    Ok(())
}
