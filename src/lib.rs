pub mod cancel;
pub mod episode;
pub mod error;
pub mod feed;
pub mod http;
pub mod progress;
pub mod sanitize;
pub mod sources;
pub mod state;
pub mod sync;

// Re-export main types for convenience
pub use cancel::{CancelSignal, CancelSource};
pub use episode::{
    DownloadContext, DownloadOutcome, EpisodeMap, EpisodeRecord, download_episode,
    extract_episodes,
};
pub use error::{DownloadError, FeedError, OpmlError, StateError, SyncError};
pub use feed::{Entry, Link, ParsedFeed, fetch_feed, parse_feed};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use progress::{NoopReporter, ProgressEvent, ProgressReporter, SharedProgressReporter};
pub use sanitize::{episode_filename, normalize_title, podcast_dir_name, sanitize};
pub use sources::{DEFAULT_FEEDS, default_sources, parse_opml, resolve_sources};
pub use state::{PlannedDownload, Reconciliation, SyncPlan, reconcile};
pub use sync::{FeedSummary, RunSummary, SyncOptions, run, sync_feed};
