//! Band scheduler.
//!
//! A frame is split into horizontal bands, one OS thread each. Workers check a shared
//! cancellation flag before every row and count down a [Latch] when they finish, however
//! they finish; terminating a job is "raise the flag, wait for the latch, join".

use std::{
    ops::Range,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
};

use crate::{
    backend::RowSource,
    frame::FrameBuffer,
    latch::{Completion, CountGuard, Latch},
    palette::Palette,
    Error, Result,
};

/// Splits `height` rows into `threads` contiguous bands.
///
/// Every band gets `height / threads` rows; the last band also takes the remainder.
/// Bands are empty when there are more threads than rows.
pub fn bands(height: usize, threads: usize) -> Vec<Range<usize>> {
    if threads == 0 {
        return Vec::new();
    }
    let step = height / threads;
    (0..threads)
        .map(|i| {
            let start = i * step;
            let end = if i + 1 == threads { height } else { start + step };
            start..end
        })
        .collect()
}

/// How a band ended.
#[derive(Clone, Debug, PartialEq)]
pub enum BandOutcome {
    Completed,
    Cancelled,
    Failed(mandel_core::Error),
}

/// Reported once per band.
#[derive(Clone, Debug, PartialEq)]
pub struct BandEvent {
    pub band: usize,
    pub rows: Range<usize>,
    pub outcome: BandOutcome,
}

/// Called from worker threads as bands finish.
pub type BandListener = Arc<dyn Fn(&BandEvent) + Send + Sync>;

/// Everything a render job needs.
#[derive(Clone)]
pub struct Job {
    pub source: Arc<dyn RowSource>,
    pub frame: Arc<FrameBuffer>,
    pub palette: Arc<Palette>,
    pub threads: usize,
    pub listener: Option<BandListener>,
}

/// Runs at most one job at a time.
#[derive(Default)]
pub struct TileScheduler {
    cancel: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
    latch: Option<Latch>,
}

impl TileScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `job`, first terminating whatever was running.
    pub fn start(&mut self, job: Job) -> Result<()> {
        self.terminate();

        if job.threads == 0 {
            return Err(Error::InvalidArgument("must provide >=1 thread".to_string()));
        }
        let size = job.source.size();
        if size != job.frame.size() {
            return Err(Error::InvalidArgument(format!(
                "row source is {}x{} but the frame is {}x{}",
                size.width,
                size.height,
                job.frame.size().width,
                job.frame.size().height
            )));
        }

        let bands = bands(size.height, job.threads);
        let count = bands.len();
        let latch = Latch::new(count);
        self.latch = Some(latch.clone());
        tracing::debug!("starting {} bands over {} rows", count, size.height);

        for (band, rows) in bands.into_iter().enumerate() {
            let worker = Worker {
                band,
                rows,
                job: job.clone(),
                cancel: self.cancel.clone(),
                guard: latch.guard(),
            };
            let spawned = std::thread::Builder::new()
                .name(format!("band-{}", band))
                .spawn(move || worker.run());
            match spawned {
                Ok(handle) => self.workers.push(handle),
                Err(err) => {
                    // The failed worker's guard was dropped with its closure;
                    // release the bands that were never started.
                    for _ in band + 1..count {
                        latch.count_down();
                    }
                    tracing::error!("failed to spawn band {}: {}", band, err);
                    self.terminate();
                    return Err(Error::Internal(format!(
                        "failed to spawn band {}: {}",
                        band, err
                    )));
                }
            }
        }
        Ok(())
    }

    /// Cancels the running job and waits for every worker to exit.
    pub fn terminate(&mut self) {
        if self.latch.is_none() && self.workers.is_empty() {
            return;
        }
        self.cancel.store(true, Ordering::Release);
        self.drain();
        self.cancel.store(false, Ordering::Release);
    }

    /// Waits for the running job to finish without cancelling it.
    pub fn wait(&mut self) {
        self.drain();
    }

    pub fn is_running(&self) -> bool {
        self.latch.as_ref().map_or(false, |l| !l.is_done())
    }

    /// Resolves when the current job finishes; immediately if there is none.
    pub fn completion(&self) -> Completion {
        self.latch
            .clone()
            .unwrap_or_else(|| Latch::new(0))
            .completion()
    }

    fn drain(&mut self) {
        if let Some(latch) = self.latch.take() {
            latch.wait();
        }
        for handle in self.workers.drain(..) {
            let name = handle.thread().name().unwrap_or("band").to_string();
            if handle.join().is_err() {
                tracing::error!("worker {} panicked", name);
            }
        }
    }
}

impl Drop for TileScheduler {
    fn drop(&mut self) {
        self.terminate();
    }
}

struct Worker {
    band: usize,
    rows: Range<usize>,
    job: Job,
    cancel: Arc<AtomicBool>,
    guard: CountGuard,
}

impl Worker {
    fn run(self) {
        let span = tracing::debug_span!("band", band = self.band);
        let _enter = span.enter();

        let width = self.job.source.size().width;
        let scale = self
            .job
            .palette
            .iteration_scale(self.job.source.max_iterations());
        let mut escapes = vec![None; width];
        let mut colors = vec![0u32; width];

        let mut outcome = BandOutcome::Completed;
        for y in self.rows.clone() {
            if self.cancel.load(Ordering::Acquire) {
                outcome = BandOutcome::Cancelled;
                break;
            }
            if let Err(err) = self.job.source.row(y, &mut escapes) {
                tracing::error!("row {} failed: {}", y, err);
                outcome = BandOutcome::Failed(err);
                break;
            }
            for (color, escape) in colors.iter_mut().zip(&escapes) {
                *color = self.job.palette.pixel(*escape, scale);
            }
            if let Err(err) = self.job.frame.write_row(y, &colors) {
                tracing::error!("row {} could not be stored: {}", y, err);
                outcome = BandOutcome::Failed(mandel_core::Error::InvalidArgument(err.to_string()));
                break;
            }
        }
        tracing::debug!("band {:?} finished: {:?}", self.rows, outcome);

        if let Some(listener) = &self.job.listener {
            listener(&BandEvent {
                band: self.band,
                rows: self.rows.clone(),
                outcome,
            });
        }
        drop(self.guard);
    }
}
