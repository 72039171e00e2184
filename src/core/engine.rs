use crate::core::copier::{create_destination, open_source, ChunkCopier};
use crate::core::error::{Result, SplitError};
use crate::core::events::SplitEvent;
use crate::core::model::*;
use crate::core::planner::plan_ranges;
use futures::stream::{FuturesUnordered, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncSeek};
use tokio::sync::{broadcast, Mutex, Semaphore};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Output paths this run created, for opt-in cleanup after a failure.
type CreatedFiles = Arc<Mutex<Vec<PathBuf>>>;

/// Splits one input file according to an immutable [`SplitConfig`].
#[derive(Clone)]
pub struct Splitter {
    config: Arc<SplitConfig>,
    event_tx: broadcast::Sender<SplitEvent>,
}

impl Splitter {
    pub fn new(config: SplitConfig) -> Result<Self> {
        config.validate()?;
        let (event_tx, _) = broadcast::channel(event_capacity(config.output_count));
        Ok(Self { config: Arc::new(config), event_tx })
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SplitEvent> {
        self.event_tx.subscribe()
    }

    /// Plans and copies every chunk. Always ends with a
    /// [`SplitEvent::Finished`] event, whether or not the split succeeded.
    pub async fn run(&self) -> Result<SplitReport> {
        let start = Instant::now();
        let created: CreatedFiles = Arc::new(Mutex::new(Vec::new()));
        let result = self.execute(start, created.clone()).await;

        match &result {
            Ok(report) => {
                info!(bytes = report.total_bytes, files = report.outputs.len(), "split finished");
                let _ = self.event_tx.send(SplitEvent::Finished {
                    total_bytes: report.total_bytes,
                    chunks_done: report.outputs.len(),
                    elapsed: report.elapsed,
                    ok: true,
                });
            }
            Err(e) => {
                warn!(error = %e, "split failed");
                if self.config.cleanup_on_failure {
                    remove_outputs(&created).await;
                }
                let _ = self.event_tx.send(SplitEvent::Finished {
                    total_bytes: 0,
                    chunks_done: 0,
                    elapsed: start.elapsed(),
                    ok: false,
                });
            }
        }
        result
    }

    async fn execute(&self, start: Instant, created: CreatedFiles) -> Result<SplitReport> {
        let input = &self.config.input;
        let file_size = tokio::fs::metadata(input)
            .await
            .map_err(|e| SplitError::open(input, e))?
            .len();
        let plan = SplitPlan::new(file_size, self.config.record_width, self.config.output_count)?;
        let ranges = plan_ranges(&plan);
        let workers = if self.config.parallel { self.config.effective_workers() } else { 1 };

        info!(
            input = %input.display(),
            file_size,
            chunk_size = plan.chunk_size(),
            chunks = ranges.len(),
            workers,
            parallel = self.config.parallel,
            "planned split"
        );
        let _ = self.event_tx.send(SplitEvent::Planned {
            file_size,
            chunk_size: plan.chunk_size(),
            chunks: ranges.len(),
            workers,
        });

        let (mut outputs, peak_workers) = if self.config.parallel {
            self.run_parallel(&plan, ranges, workers, created).await?
        } else {
            self.run_sequential(&plan, &ranges, created).await?
        };

        outputs.sort_by_key(|o| o.index);
        let total_bytes = outputs.iter().map(|o| o.bytes).sum();
        Ok(SplitReport {
            file_size,
            chunk_size: plan.chunk_size(),
            outputs,
            total_bytes,
            elapsed: start.elapsed(),
            peak_workers,
        })
    }

    /// One source handle, re-seeked per chunk. Stops at the first error.
    async fn run_sequential(
        &self,
        plan: &SplitPlan,
        ranges: &[ChunkRange],
        created: CreatedFiles,
    ) -> Result<(Vec<ChunkOutput>, usize)> {
        let mut src = open_source(&self.config.input).await?;
        let copier = ChunkCopier::new(self.config.buffer_size, plan.file_size);

        let mut outputs = Vec::with_capacity(ranges.len());
        for range in ranges {
            let dst_path = self.config.output_path(range.index);
            let out = write_chunk(&mut src, range, dst_path, copier, &self.event_tx, &created).await?;
            outputs.push(out);
        }
        Ok((outputs, 1))
    }

    /// One task per chunk, at most `workers` copying at once. Each task
    /// opens its own source handle. After the first failure, chunks that
    /// have not started are skipped; running ones finish.
    async fn run_parallel(
        &self,
        plan: &SplitPlan,
        ranges: Vec<ChunkRange>,
        workers: usize,
        created: CreatedFiles,
    ) -> Result<(Vec<ChunkOutput>, usize)> {
        let semaphore = Arc::new(Semaphore::new(workers));
        let failed = Arc::new(AtomicBool::new(false));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let copier = ChunkCopier::new(self.config.buffer_size, plan.file_size);

        let mut futs = FuturesUnordered::new();
        let mut first_err: Option<SplitError> = None;

        // Permits are taken here, in chunk order, so dispatch order is
        // deterministic and queued chunks see a failure before they start.
        for range in ranges {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    first_err = Some(SplitError::Worker(e.to_string()));
                    break;
                }
            };

            if failed.load(Ordering::SeqCst) {
                debug!(chunk = range.index + 1, "skipped after earlier failure");
                let _ = self.event_tx.send(SplitEvent::ChunkSkipped { index: range.index });
                continue;
            }

            let failed = failed.clone();
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            let created = created.clone();
            let tx = self.event_tx.clone();
            let input = self.config.input.clone();
            let dst_path = self.config.output_path(range.index);

            futs.push(tokio::spawn(async move {
                let _permit = permit;
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);

                let res = match open_source(&input).await {
                    Ok(mut src) => write_chunk(&mut src, &range, dst_path, copier, &tx, &created).await,
                    Err(e) => {
                        let _ = tx.send(SplitEvent::ChunkFailed { index: range.index, message: e.to_string() });
                        Err(e)
                    }
                };

                in_flight.fetch_sub(1, Ordering::SeqCst);
                if res.is_err() {
                    failed.store(true, Ordering::SeqCst);
                }
                res
            }));
        }

        let mut outputs = Vec::new();
        while let Some(joined) = futs.next().await {
            match joined {
                Ok(Ok(out)) => outputs.push(out),
                Ok(Err(e)) => {
                    first_err.get_or_insert(e);
                }
                Err(join_err) => {
                    failed.store(true, Ordering::SeqCst);
                    first_err.get_or_insert(SplitError::Worker(join_err.to_string()));
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok((outputs, peak.load(Ordering::SeqCst))),
        }
    }
}

/// Room for every event of a run: `Planned`, at most two per chunk, and
/// `Finished`. A subscriber that keeps up never sees `Lagged`.
pub fn event_capacity(output_count: usize) -> usize {
    output_count.saturating_mul(2).saturating_add(2).clamp(256, 1 << 16)
}

/// Convenience wrapper: validate, plan and copy in one call.
pub async fn split(config: SplitConfig) -> Result<SplitReport> {
    Splitter::new(config)?.run().await
}

async fn write_chunk<R>(
    src: &mut R,
    range: &ChunkRange,
    dst_path: PathBuf,
    copier: ChunkCopier,
    tx: &broadcast::Sender<SplitEvent>,
    created: &CreatedFiles,
) -> Result<ChunkOutput>
where
    R: AsyncRead + AsyncSeek + Unpin,
{
    let index = range.index;
    let _ = tx.send(SplitEvent::ChunkStarted { index, path: dst_path.clone() });

    let res = copy_into(src, range, &dst_path, copier, created).await;
    match res {
        Ok(bytes) => {
            let _ = tx.send(SplitEvent::ChunkDone { index, bytes });
            Ok(ChunkOutput { index, path: dst_path, bytes })
        }
        Err(e) => {
            warn!(chunk = index + 1, path = %dst_path.display(), error = %e, "chunk failed");
            let _ = tx.send(SplitEvent::ChunkFailed { index, message: e.to_string() });
            Err(e)
        }
    }
}

async fn copy_into<R>(
    src: &mut R,
    range: &ChunkRange,
    dst_path: &Path,
    copier: ChunkCopier,
    created: &CreatedFiles,
) -> Result<u64>
where
    R: AsyncRead + AsyncSeek + Unpin,
{
    let mut dst = create_destination(dst_path).await?;
    created.lock().await.push(dst_path.to_path_buf());
    copier.copy(src, &mut dst, range, dst_path).await
}

async fn remove_outputs(created: &CreatedFiles) {
    let paths = std::mem::take(&mut *created.lock().await);
    for path in paths {
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(path = %path.display(), "removed partial output"),
            Err(e) => warn!(path = %path.display(), error = %e, "could not remove output"),
        }
    }
}
