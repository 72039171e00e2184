use crate::core::error::{Result, SplitError};
use crate::core::model::{ChunkLen, ChunkRange};
use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Creates (or truncates) an output file, creating missing parent dirs.
pub async fn create_destination(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SplitError::open(parent, e))?;
        }
    }

    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .await
        .map_err(|e| SplitError::open(path, e))
}

pub async fn open_source(path: &Path) -> Result<File> {
    File::open(path).await.map_err(|e| SplitError::open(path, e))
}

/// Copies one planned range from a seekable source into a destination.
#[derive(Debug, Clone, Copy)]
pub struct ChunkCopier {
    buffer_size: usize,
    /// Size the plan was computed against; sizes the final chunk's buffer.
    file_size: u64,
}

impl ChunkCopier {
    pub fn new(buffer_size: usize, file_size: u64) -> Self {
        Self { buffer_size: buffer_size.max(1), file_size }
    }

    /// Transfer buffer length: capped by the configured size and by the
    /// chunk itself. The final chunk always gets at least one byte so it
    /// can observe end of stream.
    pub fn buffer_len(&self, range: &ChunkRange) -> usize {
        let expected = range.expected_len(self.file_size);
        let expected = if range.is_final() { expected.max(1) } else { expected };
        usize::try_from(expected).map_or(self.buffer_size, |n| n.min(self.buffer_size))
    }

    /// Seeks `src` to the range start and copies it into `dst`.
    ///
    /// A non-final range must be filled completely, otherwise the copy
    /// fails with [`SplitError::ShortRead`] after flushing the bytes it did
    /// copy. The final range copies until end of stream. `dst_path` only
    /// labels write errors.
    pub async fn copy<R, W>(&self, src: &mut R, dst: &mut W, range: &ChunkRange, dst_path: &Path) -> Result<u64>
    where
        R: AsyncRead + AsyncSeek + Unpin,
        W: AsyncWrite + Unpin,
    {
        let index = range.index;
        src.seek(SeekFrom::Start(range.offset))
            .await
            .map_err(|source| SplitError::Seek { index, source })?;

        let mut buf = vec![0u8; self.buffer_len(range)];
        let write_err = |source: std::io::Error| SplitError::WriteFailure { path: dst_path.to_path_buf(), source };
        let mut copied = 0u64;

        match range.len {
            ChunkLen::Exact(expected) => {
                while copied < expected {
                    let want = (expected - copied).min(buf.len() as u64) as usize;
                    let n = src
                        .read(&mut buf[..want])
                        .await
                        .map_err(|source| SplitError::Read { index, source })?;
                    if n == 0 {
                        // Leave what was copied on disk before reporting.
                        dst.flush().await.map_err(write_err)?;
                        return Err(SplitError::ShortRead { index, expected, copied });
                    }
                    dst.write_all(&buf[..n]).await.map_err(write_err)?;
                    copied += n as u64;
                }
            }
            ChunkLen::ToEnd => loop {
                let n = src
                    .read(&mut buf)
                    .await
                    .map_err(|source| SplitError::Read { index, source })?;
                if n == 0 {
                    break;
                }
                dst.write_all(&buf[..n]).await.map_err(write_err)?;
                copied += n as u64;
            },
        }

        dst.flush().await.map_err(write_err)?;
        debug!(chunk = index + 1, offset = range.offset, bytes = copied, "chunk copied");
        Ok(copied)
    }
}
