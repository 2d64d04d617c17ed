use std::path::PathBuf;
use std::sync::Arc;

/// Events emitted during a run for progress reporting
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Feed is being fetched from URL
    FetchingFeed { url: String },

    /// Feed could not be fetched or parsed and is skipped
    FeedFailed { url: String, error: String },

    /// The podcast directory could not be prepared, the podcast is skipped
    DirectoryFailed { url: String, error: String },

    /// Feed reconciled against the podcast directory
    PodcastReady {
        podcast_title: String,
        directory: PathBuf,
        total_episodes: usize,
        new_episodes: usize,
    },

    /// Episode skipped because its file already exists (only with warnings enabled)
    AlreadyDownloaded { filename: String },

    /// URL not tried because another URL already produced the same file
    FilenameCollision { filename: String, url: String },

    /// A download is starting
    DownloadStarting {
        filename: String,
        /// Index of this episode in the podcast's download queue
        episode_index: usize,
        total_to_download: usize,
        content_length: u64,
    },

    /// A chunk has been written to disk
    DownloadProgress {
        filename: String,
        bytes_downloaded: u64,
        total_bytes: u64,
    },

    /// A download completed successfully
    DownloadCompleted {
        filename: String,
        bytes_downloaded: u64,
    },

    /// A download stopped early because cancellation was requested
    DownloadCancelled {
        filename: String,
        bytes_downloaded: u64,
    },

    /// A download failed
    DownloadFailed { filename: String, error: String },

    /// Cancellation was observed between feeds or episodes
    Cancelled,

    /// The run finished
    RunCompleted {
        downloaded_count: usize,
        skipped_count: usize,
        failed_count: usize,
        failed_feeds: usize,
    },
}

/// Trait for reporting progress events during a run.
///
/// Implementations can use this to display progress bars, log messages,
/// or collect statistics.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event
    fn report(&self, event: ProgressEvent);
}

/// A shared reference to a progress reporter
pub type SharedProgressReporter = Arc<dyn ProgressReporter>;

/// A no-op progress reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {}
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}
