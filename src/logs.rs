//! Terminal progress display for batch runs.

use crate::error::Error;
use crate::pipeline::{CollageJob, Visitor};

use std::io::{stderr, Error as IoError, Stderr, Write};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
enum WorkerStatus {
    Running(String),
    Failed(String),
    Done(String),
}

impl Default for WorkerStatus {
    fn default() -> Self {
        Self::Running(String::new())
    }
}

/// A status line per worker plus an overall bar, redrawn at the bottom of
/// the terminal. Warnings scroll above it.
#[derive(Debug)]
pub struct ProgressBar<T: Write> {
    n_workers: usize,
    tty: T,
    status: Vec<WorkerStatus>,
    counts: Vec<usize>,
    failed: usize,
    total: usize,
}

impl ProgressBar<Stderr> {
    pub fn new_stderr(n_workers: usize) -> Result<Self, IoError> {
        Self::new(n_workers, stderr())
    }
}

impl<T: Write> ProgressBar<T> {
    const BAR_WIDTH: usize = 16;
    const WORKER_BAR_WIDTH: usize = 8;

    pub fn new(n_workers: usize, tty: T) -> Result<Self, IoError> {
        let mut pbar = Self {
            n_workers,
            tty,
            status: vec![WorkerStatus::default(); n_workers + 1],
            counts: vec![0; n_workers + 1],
            failed: 0,
            total: 0,
        };
        for _ in 0..=n_workers {
            writeln!(pbar.tty)?;
        }
        pbar.show()?;
        Ok(pbar)
    }

    pub fn set_total(&mut self, total: usize) -> Result<(), IoError> {
        self.total = total;
        self.show()
    }

    pub fn status(&mut self, id: usize, msg: String) -> Result<(), IoError> {
        if let Some(s) = self.status.get_mut(id) {
            *s = WorkerStatus::Running(msg);
        }
        self.show()
    }

    pub fn count(&mut self, id: usize) -> Result<(), IoError> {
        self.counts[0] += 1;
        if id > 0 {
            if let Some(n) = self.counts.get_mut(id) {
                *n += 1;
            }
        }
        self.show()
    }

    pub fn warn(&mut self, id: usize, msg: String) -> Result<(), IoError> {
        self.failed += 1;
        self.counts[0] += 1;
        self.log_message(id, "WARN", msg, termion::color::LightYellow)?;
        self.show()
    }

    pub fn finish(&mut self, id: usize, failure: Option<String>) -> Result<(), IoError> {
        if let Some(s) = self.status.get_mut(id) {
            *s = match failure {
                Some(msg) => WorkerStatus::Failed(msg),
                None if id == 0 => WorkerStatus::Done(format!("done, {} failed", self.failed)),
                None => WorkerStatus::Done("done!".into()),
            };
        }
        self.show()
    }

    fn log_message(
        &mut self,
        id: usize,
        label: &'static str,
        msg: String,
        color: impl termion::color::Color,
    ) -> Result<(), IoError> {
        let (_w, h) = termion::terminal_size()?;
        let nl = msg.chars().filter(|c| *c == '\n').count() as u16;
        let msg = msg
            .replace('\t', "    ")
            .replace('\n', &format!("{}\n", termion::clear::UntilNewline));
        let y = h.saturating_sub(self.n_workers as u16 + 2 + nl).max(1);
        let up = termion::scroll::Up(1 + nl);
        let goto = termion::cursor::Goto(1, y);
        let id_color = termion::color::Fg(termion::color::LightBlack);
        let color = termion::color::Fg(color);
        let reset = termion::style::Reset;
        let clear = termion::clear::UntilNewline;
        if id > 0 {
            write!(self.tty, "{up}{goto}{id_color}{id:02} {color}[{label}] {reset}{msg}{clear}")
        } else {
            write!(self.tty, "{up}{goto}{id_color}   {color}[{label}] {reset}{msg}{clear}")
        }
    }

    fn show(&mut self) -> Result<(), IoError> {
        let (w, h) = termion::terminal_size()?;
        let y = h.saturating_sub(self.n_workers as u16 + 1).max(1);
        write!(self.tty, "{}", termion::cursor::Goto(1, y))?;
        for id in 1..=self.n_workers {
            self.show_worker(w, id)?;
        }
        self.show_base(w)?;
        self.tty.flush()
    }

    fn show_worker(&mut self, w: u16, id: usize) -> Result<(), IoError> {
        let (label, color, msg) = match &self.status[id] {
            WorkerStatus::Running(msg) if msg.is_empty() => {
                (" ".repeat(Self::WORKER_BAR_WIDTH), termion::color::Blue.fg_str(), msg)
            }
            WorkerStatus::Running(msg) => {
                (format!("{:^1$}", "busy", Self::WORKER_BAR_WIDTH), termion::color::Blue.fg_str(), msg)
            }
            WorkerStatus::Failed(msg) => {
                ("!".repeat(Self::WORKER_BAR_WIDTH), termion::color::LightRed.fg_str(), msg)
            }
            WorkerStatus::Done(msg) => {
                ("-".repeat(Self::WORKER_BAR_WIDTH), termion::color::LightGreen.fg_str(), msg)
            }
        };
        let id_color = termion::color::Fg(termion::color::LightBlack);
        let msg = ellipsize(msg, w, 18);
        let reset = termion::style::Reset;
        let clear = termion::clear::UntilNewline;
        let n = self.counts[id];
        writeln!(self.tty, "{id_color}{id:02} {color}[{label} {n:3}] {reset}{msg}{clear}")
    }

    fn show_base(&mut self, w: u16) -> Result<(), IoError> {
        let n = self.counts[0];
        let total = self.total;
        let (label, color, msg) = match &self.status[0] {
            WorkerStatus::Running(msg) => {
                let done = if total > 0 {
                    (n as f64 / total as f64 * Self::BAR_WIDTH as f64).round() as usize
                } else {
                    0
                };
                let done = done.min(Self::BAR_WIDTH);
                let arrows = format!("{}{}", "▶".repeat(done), "▷".repeat(Self::BAR_WIDTH - done));
                (arrows, termion::color::LightBlue.fg_str(), msg)
            }
            WorkerStatus::Failed(msg) => {
                ("!".repeat(Self::BAR_WIDTH), termion::color::LightRed.fg_str(), msg)
            }
            WorkerStatus::Done(msg) => {
                ("=".repeat(Self::BAR_WIDTH), termion::color::LightGreen.fg_str(), msg)
            }
        };
        let msg = ellipsize(msg, w, 27);
        let reset = termion::style::Reset;
        let clear = termion::clear::UntilNewline;
        writeln!(self.tty, "{color}[{label} {n:3}/{total:3}] {reset}{msg}{clear}")
    }
}

fn ellipsize(s: &str, w: u16, used: u16) -> String {
    let w = w.saturating_sub(used) as usize;
    if s.chars().count() >= w {
        format!("{}...", s.chars().take(w.saturating_sub(4)).collect::<String>())
    } else {
        s.to_string()
    }
}

/// Shares a [`ProgressBar`] between pipeline threads.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    pbar: Arc<Mutex<ProgressBar<Stderr>>>,
}

impl ProgressReporter {
    pub fn new(n_workers: usize) -> Result<Self, IoError> {
        let pbar = ProgressBar::new_stderr(n_workers)?;
        Ok(Self { pbar: Arc::new(Mutex::new(pbar)) })
    }

    fn with(&self, f: impl FnOnce(&mut ProgressBar<Stderr>) -> Result<(), IoError>) {
        // drawing errors are ignored
        if let Ok(mut pbar) = self.pbar.lock() {
            let _ = f(&mut pbar);
        }
    }
}

impl Visitor for ProgressReporter {
    fn on_total(&self, total: usize) {
        self.with(|p| p.set_total(total));
    }

    fn on_iter_start(&self, worker: usize, i: usize, job: &CollageJob) {
        let msg = format!("#{i} {} -> {}", job.layout, job.output.display());
        self.with(|p| p.status(worker, msg));
    }

    fn on_iter_ok(&self, worker: usize, _i: usize, _job: CollageJob) {
        self.with(|p| p.count(worker));
    }

    fn on_iter_err(&self, worker: usize, i: usize, job: CollageJob, e: Error) {
        let msg = format!("#{i} {}: {e}", job.output.display());
        self.with(|p| p.warn(worker, msg));
    }

    fn on_finish(&self, worker: usize, result: &crate::error::Result<()>) {
        let failure = result.as_ref().err().map(|e| e.to_string());
        self.with(|p| p.finish(worker, failure));
    }
}
