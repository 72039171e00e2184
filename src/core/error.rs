use std::io;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum SplitError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("open {}: {source}", path.display())]
    OpenFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("seek for chunk {index}: {source}")]
    Seek {
        index: usize,
        #[source]
        source: io::Error,
    },

    #[error("read for chunk {index}: {source}")]
    Read {
        index: usize,
        #[source]
        source: io::Error,
    },

    /// Source ended before a non-final chunk was filled; the input changed
    /// size between planning and copying.
    #[error("short read on chunk {index}: expected {expected} bytes, source ended after {copied}")]
    ShortRead { index: usize, expected: u64, copied: u64 },

    #[error("write {}: {source}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("worker failed: {0}")]
    Worker(String),
}

impl SplitError {
    /// Maps an open error, keeping "not found" distinct from other failures.
    pub fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            SplitError::FileNotFound { path }
        } else {
            SplitError::OpenFailure { path, source }
        }
    }
}

pub type Result<T> = std::result::Result<T, SplitError>;
