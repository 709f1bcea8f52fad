use crate::compose::Compositor;
use crate::error::Result;
use crate::image::{Color, ImgBackend};
use crate::pipeline::{process, CollageJob, Pipeline, Visitor};
use crate::registry::LayoutRegistry;

impl<V: Visitor> Pipeline<V> {
    /// Runs every job on the calling thread, in order.
    pub fn run(self) -> V {
        let visitor = self.visitor;
        let result = Self::run_internal(&self.registry, self.background, self.jobs, &visitor);
        visitor.on_finish(0, &result);
        visitor
    }

    fn run_internal(
        registry: &LayoutRegistry,
        background: Color,
        jobs: Vec<CollageJob>,
        visitor: &V,
    ) -> Result<()> {
        visitor.on_start(0);
        visitor.on_total(jobs.len());
        let backend = ImgBackend::new()?;
        let compositor = Compositor::new(&backend).with_background(background);
        for (i, job) in jobs.into_iter().enumerate() {
            visitor.on_iter_start(0, i, &job);
            match process(&job, registry, &compositor) {
                Ok(()) => visitor.on_iter_ok(0, i, job),
                Err(e) => visitor.on_iter_err(0, i, job, e),
            }
        }
        Ok(())
    }
}
