use std::path::PathBuf;
use std::time::Duration;

/// Progress of one [`Splitter::run`](crate::Splitter::run), in send order.
#[derive(Debug, Clone)]
pub enum SplitEvent {
    /// Sent once the input size is known, before any chunk is copied.
    Planned { file_size: u64, chunk_size: u64, chunks: usize, workers: usize },
    ChunkStarted { index: usize, path: PathBuf },
    ChunkDone { index: usize, bytes: u64 },
    /// In parallel mode this can arrive without a `ChunkStarted` when the
    /// task could not open its own source handle.
    ChunkFailed { index: usize, message: String },
    /// Not started because an earlier chunk already failed.
    ChunkSkipped { index: usize },
    /// Always the last event. Totals are authoritative for a successful run
    /// and zero when it failed.
    Finished { total_bytes: u64, chunks_done: usize, elapsed: Duration, ok: bool },
}
