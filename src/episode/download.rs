use std::path::Path;

use bytes::BytesMut;
use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::cancel::CancelSignal;
use crate::error::DownloadError;
use crate::http::HttpClient;
use crate::progress::{ProgressEvent, SharedProgressReporter};

/// Size of every write to the output file, except possibly the last one
pub const CHUNK_SIZE: usize = 32 * 1024;

/// Position of a download within its podcast's queue
#[derive(Debug, Clone, Copy)]
pub struct DownloadContext {
    /// Index of this episode in the download queue
    pub episode_index: usize,
    /// Total number of episodes to download
    pub total_to_download: usize,
}

/// How a download that did not fail ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    Completed { bytes_written: u64 },
    /// Stopped at a chunk boundary; the partial file stays on disk
    Cancelled { bytes_written: u64 },
}

/// Download `url` into `output_path`, writing it in [`CHUNK_SIZE`] pieces
///
/// The cancel signal is checked before every write. The server must announce
/// a Content-Length; without one nothing is written.
pub async fn download_episode<C: HttpClient>(
    client: &C,
    url: &str,
    filename: &str,
    output_path: &Path,
    context: DownloadContext,
    cancel: &CancelSignal,
    reporter: &SharedProgressReporter,
) -> Result<DownloadOutcome, DownloadError> {
    let response = client
        .get_stream(url)
        .await
        .map_err(|e| DownloadError::HttpFailed {
            url: url.to_string(),
            source: e,
        })?;

    if response.status >= 400 {
        return Err(DownloadError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    let total_bytes = response
        .content_length
        .ok_or_else(|| DownloadError::MissingContentLength {
            url: url.to_string(),
        })?;

    reporter.report(ProgressEvent::DownloadStarting {
        filename: filename.to_string(),
        episode_index: context.episode_index,
        total_to_download: context.total_to_download,
        content_length: total_bytes,
    });

    let mut output = ChunkedFile {
        file: File::create(output_path)
            .await
            .map_err(|e| DownloadError::FileCreateFailed {
                path: output_path.to_path_buf(),
                source: e,
            })?,
        path: output_path,
        filename,
        total_bytes,
        bytes_written: 0,
        reporter,
    };

    let mut pending = BytesMut::with_capacity(CHUNK_SIZE * 2);
    let mut stream = response.body;
    let mut cancelled = false;

    'body: while let Some(chunk_result) = stream.next().await {
        let bytes = chunk_result.map_err(|e| DownloadError::StreamFailed {
            url: url.to_string(),
            source: e,
        })?;
        pending.extend_from_slice(&bytes);

        while pending.len() >= CHUNK_SIZE {
            if cancel.is_cancelled() {
                cancelled = true;
                break 'body;
            }
            let chunk = pending.split_to(CHUNK_SIZE);
            output.write_chunk(&chunk).await?;
        }
    }

    if !cancelled && !pending.is_empty() {
        if cancel.is_cancelled() {
            cancelled = true;
        } else {
            output.write_chunk(&pending).await?;
        }
    }

    output.flush().await?;

    let bytes_written = output.bytes_written;
    if cancelled {
        tracing::debug!(filename, bytes_written, "Download cancelled");
        reporter.report(ProgressEvent::DownloadCancelled {
            filename: filename.to_string(),
            bytes_downloaded: bytes_written,
        });
        return Ok(DownloadOutcome::Cancelled { bytes_written });
    }

    reporter.report(ProgressEvent::DownloadCompleted {
        filename: filename.to_string(),
        bytes_downloaded: bytes_written,
    });

    Ok(DownloadOutcome::Completed { bytes_written })
}

/// Output file that reports progress after every written chunk
struct ChunkedFile<'a> {
    file: File,
    path: &'a Path,
    filename: &'a str,
    total_bytes: u64,
    bytes_written: u64,
    reporter: &'a SharedProgressReporter,
}

impl ChunkedFile<'_> {
    async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), DownloadError> {
        self.file
            .write_all(chunk)
            .await
            .map_err(|e| self.write_error(e))?;
        self.bytes_written += chunk.len() as u64;

        self.reporter.report(ProgressEvent::DownloadProgress {
            filename: self.filename.to_string(),
            bytes_downloaded: self.bytes_written,
            total_bytes: self.total_bytes,
        });
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), DownloadError> {
        self.file.flush().await.map_err(|e| self.write_error(e))
    }

    fn write_error(&self, source: std::io::Error) -> DownloadError {
        DownloadError::FileWriteFailed {
            path: self.path.to_path_buf(),
            source,
        }
    }
}
