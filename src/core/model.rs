use crate::core::error::{Result, SplitError};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Width of one record in the default input format: 16 digits plus `\n`.
pub const DEFAULT_RECORD_WIDTH: u64 = 17;
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Partition parameters for one split. Derived per run, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitPlan {
    pub file_size: u64,
    pub record_width: u64,
    pub output_count: usize,
}

impl SplitPlan {
    pub fn new(file_size: u64, record_width: u64, output_count: usize) -> Result<Self> {
        if record_width == 0 {
            return Err(SplitError::InvalidConfiguration("record width must be > 0".to_string()));
        }
        if output_count == 0 {
            return Err(SplitError::InvalidConfiguration("count is required".to_string()));
        }
        Ok(Self { file_size, record_width, output_count })
    }

    pub fn total_records(&self) -> u64 {
        self.file_size / self.record_width
    }

    /// Whole records per non-final chunk. Rounded down so every non-final
    /// boundary sits on a record boundary.
    pub fn lines_per_chunk(&self) -> u64 {
        self.total_records() / self.output_count as u64
    }

    pub fn chunk_size(&self) -> u64 {
        self.lines_per_chunk() * self.record_width
    }

    /// Bytes the final chunk receives: everything after the last full chunk.
    pub fn final_chunk_size(&self) -> u64 {
        self.file_size - self.chunk_size() * (self.output_count as u64 - 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkLen {
    Exact(u64),
    /// Copy until the source reports end of stream.
    ToEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    /// 0-based; the output file name uses `index + 1`.
    pub index: usize,
    pub offset: u64,
    pub len: ChunkLen,
}

impl ChunkRange {
    pub fn is_final(&self) -> bool {
        matches!(self.len, ChunkLen::ToEnd)
    }

    /// Byte count this range covers in a file of `file_size` bytes.
    pub fn expected_len(&self, file_size: u64) -> u64 {
        match self.len {
            ChunkLen::Exact(n) => n,
            ChunkLen::ToEnd => file_size.saturating_sub(self.offset),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SplitConfig {
    pub input: PathBuf,
    pub output_count: usize,
    pub record_width: u64,
    /// Upper bound of the per-chunk transfer buffer, in bytes.
    pub buffer_size: usize,
    pub parallel: bool,
    pub workers: usize,
    /// Defaults to the input path with its extension stripped.
    pub output_prefix: Option<PathBuf>,
    pub cleanup_on_failure: bool,
}

impl SplitConfig {
    pub fn new(input: impl Into<PathBuf>, output_count: usize) -> Self {
        Self {
            input: input.into(),
            output_count,
            record_width: DEFAULT_RECORD_WIDTH,
            buffer_size: DEFAULT_BUFFER_SIZE,
            parallel: false,
            workers: default_workers(),
            output_prefix: None,
            cleanup_on_failure: false,
        }
    }

    pub fn with_record_width(mut self, record_width: u64) -> Self {
        self.record_width = record_width;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_output_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.output_prefix = Some(prefix.into());
        self
    }

    pub fn with_cleanup_on_failure(mut self, cleanup: bool) -> Self {
        self.cleanup_on_failure = cleanup;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.output_count == 0 {
            return Err(SplitError::InvalidConfiguration("count is required".to_string()));
        }
        if self.record_width == 0 {
            return Err(SplitError::InvalidConfiguration("record width must be > 0".to_string()));
        }
        if self.buffer_size == 0 {
            return Err(SplitError::InvalidConfiguration("buffer size must be > 0".to_string()));
        }
        if self.workers == 0 {
            return Err(SplitError::InvalidConfiguration("worker count must be > 0".to_string()));
        }
        Ok(())
    }

    /// Never more workers than chunks.
    pub fn effective_workers(&self) -> usize {
        self.workers.min(self.output_count).max(1)
    }

    pub fn prefix(&self) -> PathBuf {
        match &self.output_prefix {
            Some(p) => p.clone(),
            None => strip_extension(&self.input),
        }
    }

    pub fn output_path(&self, index: usize) -> PathBuf {
        output_path(&self.prefix(), index)
    }
}

pub fn default_workers() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

fn strip_extension(path: &Path) -> PathBuf {
    match path.file_stem() {
        Some(stem) => path.with_file_name(stem),
        None => path.to_path_buf(),
    }
}

/// `{prefix}_{index+1:04}.txt`; zero padded so names sort in chunk order.
pub fn output_path(prefix: &Path, index: usize) -> PathBuf {
    let mut name = prefix.as_os_str().to_os_string();
    name.push(format!("_{:04}.txt", index + 1));
    PathBuf::from(name)
}

#[derive(Debug, Clone)]
pub struct ChunkOutput {
    pub index: usize,
    pub path: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Clone)]
pub struct SplitReport {
    pub file_size: u64,
    pub chunk_size: u64,
    /// Sorted by chunk index.
    pub outputs: Vec<ChunkOutput>,
    pub total_bytes: u64,
    pub elapsed: Duration,
    /// Highest number of chunk copies observed running at once.
    pub peak_workers: usize,
}
