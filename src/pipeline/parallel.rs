use crate::compose::Compositor;
use crate::error::{Error, Result};
use crate::image::{Color, ImgBackend};
use crate::pipeline::{process, CollageJob, Pipeline, Visitor};
use crate::registry::LayoutRegistry;

use std::collections::VecDeque;
use std::num::NonZero;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

macro_rules! lock {
    ($T:literal $lock:expr) => {
        $lock.lock().map_err(|e| Error::mutex_lock($T, e))?
    };
}

#[derive(Debug, Clone, Copy)]
pub struct ParallelismOptions {
    n_workers: usize,
    batch_size: usize,
}

impl ParallelismOptions {
    pub fn new(n_workers: NonZero<usize>) -> Self {
        let n_workers = Self::check_n_workers(n_workers);
        Self { n_workers, batch_size: n_workers * 2 }
    }

    pub fn n_workers(&self) -> usize {
        self.n_workers
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn check_n_workers(n_workers: NonZero<usize>) -> usize {
        let av_workers = thread::available_parallelism().map_or(1, NonZero::get);
        n_workers.get().min(av_workers).max(1)
    }

    pub fn with_batch_size(mut self, batch_size: Option<NonZero<usize>>) -> Self {
        if let Some(batch_size) = batch_size {
            self.batch_size = batch_size.get();
        }
        self
    }
}

impl<V> Pipeline<V>
where
    V: Visitor + Send + Clone + 'static,
{
    /// Starts the batch on `opt.n_workers()` threads fed by a bounded queue.
    ///
    /// Returns at once; [`PipelineJoinHandle::join`] waits for the batch.
    pub fn run_parallel(self, opt: ParallelismOptions) -> PipelineJoinHandle<V> {
        let queue = Arc::new(JobQueue::new(opt.batch_size));
        let visitor = self.visitor;

        let mut handles = Vec::with_capacity(opt.n_workers + 1);
        handles.push(spawn_feeder(self.jobs, queue.clone(), visitor.clone()));

        for id in 1..=opt.n_workers {
            let worker = Worker {
                id,
                queue: queue.clone(),
                registry: self.registry.clone(),
                background: self.background,
                visitor: visitor.clone(),
            };
            handles.push(thread::spawn(move || worker.run_to_end()));
        }

        PipelineJoinHandle { visitor, handles }
    }
}

fn spawn_feeder<V>(jobs: Vec<CollageJob>, queue: Arc<JobQueue>, visitor: V) -> JoinHandle<Result<()>>
where
    V: Visitor + Send + 'static,
{
    thread::spawn(move || {
        visitor.on_start(0);
        visitor.on_total(jobs.len());
        let fed = jobs
            .into_iter()
            .enumerate()
            .try_for_each(|(i, job)| queue.push(i, job));
        let done = queue.done();
        fed.and(done)
    })
}

pub struct PipelineJoinHandle<V: Visitor = ()> {
    visitor: V,
    handles: Vec<JoinHandle<Result<()>>>,
}

impl<V: Visitor> PipelineJoinHandle<V> {
    /// Waits for every thread, then reports the batch result to
    /// [`Visitor::on_finish`] with worker id 0.
    ///
    /// A worker that stopped early fails the batch with its own error.
    pub fn join(self) -> Result<V> {
        let visitor = self.visitor;
        let mut feeder_result = Ok(());
        let mut worker_err = None;
        for (i, handle) in self.handles.into_iter().enumerate() {
            match handle.join().map_err(|_| Error::thread_join(i))? {
                Err(e) if i > 0 => {
                    worker_err.get_or_insert(e);
                }
                result if i == 0 => feeder_result = result,
                _ => {}
            }
        }
        let result = worker_err.map_or(feeder_result, Err);
        visitor.on_finish(0, &result);
        result.map(|()| visitor)
    }
}

struct JobQueue {
    state: Mutex<JobQueueState>,
    capacity: usize,
    cond: Condvar,
}

struct JobQueueState {
    queue: VecDeque<(usize, CollageJob)>,
    done: bool,
    closed: bool,
}

impl JobQueue {
    fn new(capacity: usize) -> Self {
        let state = JobQueueState {
            queue: VecDeque::with_capacity(capacity),
            done: false,
            closed: false,
        };
        Self { state: Mutex::new(state), capacity: capacity.max(1), cond: Condvar::new() }
    }

    fn push(&self, index: usize, job: CollageJob) -> Result<()> {
        let state = lock!("job queue" self.state);
        let mut state = self
            .cond
            .wait_while(state, |s| s.queue.len() >= self.capacity && !s.closed)
            .map_err(|e| Error::mutex_lock("job queue", e))?;
        if state.closed {
            return Err(Error::BatchAborted(index));
        }
        state.queue.push_back((index, job));
        self.cond.notify_all();
        Ok(())
    }

    fn pop(&self) -> Result<Option<(usize, CollageJob)>> {
        let state = lock!("job queue" self.state);
        let mut state = self
            .cond
            .wait_while(state, |s| s.queue.is_empty() && !s.done && !s.closed)
            .map_err(|e| Error::mutex_lock("job queue", e))?;
        let job = state.queue.pop_front();
        self.cond.notify_all();
        Ok(job)
    }

    fn done(&self) -> Result<()> {
        let mut state = lock!("job queue" self.state);
        state.done = true;
        self.cond.notify_all();
        Ok(())
    }

    /// Stops the feeder. Jobs already queued are still handed out.
    fn close(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.closed = true;
        self.cond.notify_all();
    }
}

struct Worker<V: Visitor> {
    id: usize,
    queue: Arc<JobQueue>,
    registry: Arc<LayoutRegistry>,
    background: Color,
    visitor: V,
}

impl<V: Visitor> Worker<V> {
    fn run_to_end(self) -> Result<()> {
        let result = self.run();
        if result.is_err() {
            self.queue.close();
        }
        self.visitor.on_finish(self.id, &result);
        result
    }

    fn run(&self) -> Result<()> {
        let backend = ImgBackend::new()?;
        let compositor = Compositor::new(&backend).with_background(self.background);
        self.visitor.on_start(self.id);
        while let Some((i, job)) = self.queue.pop()? {
            self.visitor.on_iter_start(self.id, i, &job);
            match process(&job, &self.registry, &compositor) {
                Ok(()) => self.visitor.on_iter_ok(self.id, i, job),
                Err(e) => self.visitor.on_iter_err(self.id, i, job, e),
            }
        }
        Ok(())
    }
}
