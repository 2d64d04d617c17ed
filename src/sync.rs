// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use crate::cancel::CancelSignal;
use crate::episode::{DownloadContext, DownloadOutcome, download_episode, extract_episodes};
use crate::error::SyncError;
use crate::feed::fetch_feed;
use crate::http::HttpClient;
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::sanitize::podcast_dir_name;
use crate::state::reconcile;

/// Options for a sync run
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Report every episode skipped because its file already exists
    pub warn_existing: bool,
}

/// Result of synchronizing a single feed
#[derive(Debug, Clone)]
pub struct FeedSummary {
    pub podcast_title: String,
    pub directory: PathBuf,
    /// Number of episodes successfully downloaded
    pub downloaded: usize,
    /// Episodes skipped as already present or as filename collisions
    pub skipped: usize,
    /// Number of episodes that failed to download
    pub failed: usize,
    /// Details of failed episodes (filename, error message)
    pub failed_episodes: Vec<(String, String)>,
    /// Cancellation stopped this feed before all episodes were handled
    pub cancelled: bool,
}

/// Result of a whole run over all feed sources
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failed_episodes: Vec<(String, String)>,
    /// Feeds that were skipped entirely (url, error message)
    pub failed_feeds: Vec<(String, String)>,
    pub cancelled: bool,
}

/// Synchronize one feed into its podcast directory below `base_dir`
///
/// This:
/// 1. Fetches and parses the feed
/// 2. Derives the podcast directory name from the feed title
/// 3. Creates the directory if needed and snapshots its files
/// 4. Downloads the missing episodes one after another
pub async fn sync_feed<C: HttpClient>(
    client: &C,
    feed_url: &str,
    base_dir: &Path,
    options: &SyncOptions,
    cancel: &CancelSignal,
    reporter: &SharedProgressReporter,
) -> Result<FeedSummary, SyncError> {
    reporter.report(ProgressEvent::FetchingFeed {
        url: feed_url.to_string(),
    });

    let feed = fetch_feed(client, feed_url).await?;
    let dir_name = podcast_dir_name(&feed.title);
    let episodes = extract_episodes(&feed);

    let reconciliation = reconcile(base_dir, &dir_name, episodes)?;
    let plan = reconciliation.plan;
    let target_dir = reconciliation.target_dir;

    reporter.report(ProgressEvent::PodcastReady {
        podcast_title: feed.title.clone(),
        directory: target_dir.clone(),
        total_episodes: plan.total_episodes,
        new_episodes: plan.to_download.len(),
    });

    if options.warn_existing {
        for record in &plan.already_present {
            reporter.report(ProgressEvent::AlreadyDownloaded {
                filename: record.filename.clone(),
            });
        }
    }

    let mut summary = FeedSummary {
        podcast_title: feed.title,
        directory: target_dir,
        downloaded: 0,
        skipped: plan.already_present.len(),
        failed: 0,
        failed_episodes: Vec::new(),
        cancelled: false,
    };

    let total_to_download = plan.to_download.len();
    'episodes: for (episode_index, planned) in plan.to_download.into_iter().enumerate() {
        let output_path = summary.directory.join(&planned.filename);
        let context = DownloadContext {
            episode_index,
            total_to_download,
        };
        let mut last_error = None;

        for (attempt, url) in planned.urls.iter().enumerate() {
            if cancel.is_cancelled() {
                reporter.report(ProgressEvent::Cancelled);
                summary.cancelled = true;
                break 'episodes;
            }

            let result = download_episode(
                client,
                url,
                &planned.filename,
                &output_path,
                context,
                cancel,
                reporter,
            )
            .await;

            match result {
                Ok(DownloadOutcome::Completed { .. }) => {
                    summary.downloaded += 1;
                    last_error = None;
                    for skipped_url in &planned.urls[attempt + 1..] {
                        tracing::warn!(
                            url = %skipped_url,
                            filename = %planned.filename,
                            "Filename already used by another episode"
                        );
                        reporter.report(ProgressEvent::FilenameCollision {
                            filename: planned.filename.clone(),
                            url: skipped_url.clone(),
                        });
                        summary.skipped += 1;
                    }
                    break;
                }
                Ok(DownloadOutcome::Cancelled { .. }) => {
                    summary.cancelled = true;
                    break 'episodes;
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Episode download failed");
                    reporter.report(ProgressEvent::DownloadFailed {
                        filename: planned.filename.clone(),
                        error: e.to_string(),
                    });
                    last_error = Some(e);
                }
            }
        }

        if let Some(e) = last_error {
            summary.failed += 1;
            summary.failed_episodes.push((planned.filename, e.to_string()));
        }
    }

    Ok(summary)
}

/// Synchronize every feed in `sources`, in order
///
/// A failing feed is reported and skipped. Cancellation is checked before
/// each feed and ends the run early.
pub async fn run<C: HttpClient>(
    client: &C,
    sources: &[String],
    base_dir: &Path,
    options: &SyncOptions,
    cancel: &CancelSignal,
    reporter: &SharedProgressReporter,
) -> RunSummary {
    let mut summary = RunSummary::default();

    for url in sources {
        if cancel.is_cancelled() {
            reporter.report(ProgressEvent::Cancelled);
            summary.cancelled = true;
            break;
        }

        match sync_feed(client, url, base_dir, options, cancel, reporter).await {
            Ok(feed) => {
                tracing::debug!(
                    podcast = %feed.podcast_title,
                    downloaded = feed.downloaded,
                    skipped = feed.skipped,
                    failed = feed.failed,
                    "Feed synchronized"
                );
                summary.downloaded += feed.downloaded;
                summary.skipped += feed.skipped;
                summary.failed += feed.failed;
                summary.failed_episodes.extend(feed.failed_episodes);
                if feed.cancelled {
                    summary.cancelled = true;
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Skipping feed");
                let event = match &e {
                    SyncError::Feed(inner) => ProgressEvent::FeedFailed {
                        url: url.clone(),
                        error: inner.to_string(),
                    },
                    SyncError::State(inner) => ProgressEvent::DirectoryFailed {
                        url: url.clone(),
                        error: inner.to_string(),
                    },
                };
                reporter.report(event);
                summary.failed_feeds.push((url.clone(), e.to_string()));
            }
        }
    }

    reporter.report(ProgressEvent::RunCompleted {
        downloaded_count: summary.downloaded,
        skipped_count: summary.skipped,
        failed_count: summary.failed,
        failed_feeds: summary.failed_feeds.len(),
    });

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::cancel::CancelSource;
    use crate::http::{ByteStream, HttpBody, HttpResponse};
    use crate::progress::{NoopReporter, ProgressReporter};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    /// Serves feeds and audio from memory, everything else is a 404
    #[derive(Default)]
    struct MockHttpClient {
        feeds: HashMap<String, String>,
        audio: HashMap<String, Vec<u8>>,
        streamed: Mutex<Vec<String>>,
    }

    impl MockHttpClient {
        fn with_feed(mut self, url: &str, xml: &str) -> Self {
            self.feeds.insert(url.to_string(), xml.to_string());
            self
        }

        fn with_audio(mut self, url: &str, data: &[u8]) -> Self {
            self.audio.insert(url.to_string(), data.to_vec());
            self
        }

        fn streamed(&self) -> Vec<String> {
            self.streamed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn get_bytes(&self, url: &str) -> Result<HttpBody, reqwest::Error> {
            Ok(match self.feeds.get(url) {
                Some(xml) => HttpBody {
                    status: 200,
                    bytes: Bytes::from(xml.clone()),
                },
                None => HttpBody {
                    status: 404,
                    bytes: Bytes::new(),
                },
            })
        }

        async fn get_stream(&self, url: &str) -> Result<HttpResponse, reqwest::Error> {
            self.streamed.lock().unwrap().push(url.to_string());

            let (status, data) = match self.audio.get(url) {
                Some(data) => (200, data.clone()),
                None => (404, Vec::new()),
            };
            let len = data.len() as u64;
            let body: ByteStream =
                Box::pin(futures::stream::once(async move { Ok(Bytes::from(data)) }));

            Ok(HttpResponse {
                status,
                content_length: Some(len),
                body,
            })
        }
    }

    #[derive(Default)]
    struct EventLog {
        events: Mutex<Vec<ProgressEvent>>,
    }

    impl ProgressReporter for EventLog {
        fn report(&self, event: ProgressEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl EventLog {
        fn count(&self, predicate: impl Fn(&ProgressEvent) -> bool) -> usize {
            self.events.lock().unwrap().iter().filter(|e| predicate(*e)).count()
        }
    }

    const FEED_URL: &str = "https://example.com/feed.xml";

    const SAMPLE_FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Test: Podcast</title>
    <description>A test podcast</description>
    <item>
      <title>A</title>
      <enclosure url="https://example.com/a.mp3" length="1" type="audio/mpeg"/>
    </item>
    <item>
      <title>B</title>
      <enclosure url="https://example.com/b.mp3" length="1" type="audio/mpeg"/>
    </item>
  </channel>
</rss>"#;

    fn sample_client() -> MockHttpClient {
        MockHttpClient::default()
            .with_feed(FEED_URL, SAMPLE_FEED)
            .with_audio("https://example.com/a.mp3", b"audio a")
            .with_audio("https://example.com/b.mp3", b"audio b")
    }

    #[tokio::test]
    async fn sync_downloads_all_episodes() {
        let dir = tempdir().unwrap();
        let client = sample_client();

        let summary = sync_feed(
            &client,
            FEED_URL,
            dir.path(),
            &SyncOptions::default(),
            &CancelSignal::never(),
            &NoopReporter::shared(),
        )
        .await
        .unwrap();

        assert_eq!(summary.downloaded, 2);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.directory, dir.path().join("Test Podcast"));
        assert_eq!(
            std::fs::read(dir.path().join("Test Podcast").join("A.mp3")).unwrap(),
            b"audio a"
        );
    }

    #[tokio::test]
    async fn sync_warns_once_per_existing_episode() {
        let dir = tempdir().unwrap();
        let podcast_dir = dir.path().join("Test Podcast");
        std::fs::create_dir(&podcast_dir).unwrap();
        std::fs::write(podcast_dir.join("A.mp3"), b"old").unwrap();

        let client = sample_client();
        let log = Arc::new(EventLog::default());
        let reporter: SharedProgressReporter = log.clone();
        let options = SyncOptions {
            warn_existing: true,
        };

        let summary = sync_feed(
            &client,
            FEED_URL,
            dir.path(),
            &options,
            &CancelSignal::never(),
            &reporter,
        )
        .await
        .unwrap();

        assert_eq!(summary.downloaded, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(client.streamed(), vec!["https://example.com/b.mp3"]);
        assert_eq!(
            log.count(|e| matches!(
                e,
                ProgressEvent::AlreadyDownloaded { filename } if filename == "A.mp3"
            )),
            1
        );
        // Existing file is left untouched
        assert_eq!(std::fs::read(podcast_dir.join("A.mp3")).unwrap(), b"old");
    }

    #[tokio::test]
    async fn sync_stays_quiet_about_existing_without_warnings() {
        let dir = tempdir().unwrap();
        let podcast_dir = dir.path().join("Test Podcast");
        std::fs::create_dir(&podcast_dir).unwrap();
        std::fs::write(podcast_dir.join("A.mp3"), b"old").unwrap();

        let log = Arc::new(EventLog::default());
        let reporter: SharedProgressReporter = log.clone();

        sync_feed(
            &sample_client(),
            FEED_URL,
            dir.path(),
            &SyncOptions::default(),
            &CancelSignal::never(),
            &reporter,
        )
        .await
        .unwrap();

        assert_eq!(
            log.count(|e| matches!(e, ProgressEvent::AlreadyDownloaded { .. })),
            0
        );
    }

    #[tokio::test]
    async fn sync_continues_after_failed_download() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient::default()
            .with_feed(FEED_URL, SAMPLE_FEED)
            .with_audio("https://example.com/b.mp3", b"audio b");

        let summary = sync_feed(
            &client,
            FEED_URL,
            dir.path(),
            &SyncOptions::default(),
            &CancelSignal::never(),
            &NoopReporter::shared(),
        )
        .await
        .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failed_episodes[0].0, "A.mp3");
        assert_eq!(summary.downloaded, 1);
    }

    const MIRRORED_FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>Mirrored</title>
    <description>One episode, two hosts</description>
    <item>
      <title>Ep</title>
      <enclosure url="https://dead.example.com/ep.mp3" length="1" type="audio/mpeg"/>
      <atom:link href="https://live.example.com/ep.mp3" rel="enclosure" type="audio/mpeg"/>
    </item>
  </channel>
</rss>"#;

    #[tokio::test]
    async fn sync_falls_back_to_next_url_for_the_same_file() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient::default()
            .with_feed(FEED_URL, MIRRORED_FEED)
            .with_audio("https://live.example.com/ep.mp3", b"live audio");
        let log = Arc::new(EventLog::default());
        let reporter: SharedProgressReporter = log.clone();

        let summary = sync_feed(
            &client,
            FEED_URL,
            dir.path(),
            &SyncOptions::default(),
            &CancelSignal::never(),
            &reporter,
        )
        .await
        .unwrap();

        assert_eq!(summary.downloaded, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.skipped, 0);
        assert_eq!(
            client.streamed(),
            vec![
                "https://dead.example.com/ep.mp3",
                "https://live.example.com/ep.mp3"
            ]
        );
        assert_eq!(
            std::fs::read(dir.path().join("Mirrored").join("Ep.mp3")).unwrap(),
            b"live audio"
        );
        assert_eq!(
            log.count(|e| matches!(e, ProgressEvent::DownloadFailed { .. })),
            1
        );
        assert_eq!(
            log.count(|e| matches!(e, ProgressEvent::FilenameCollision { .. })),
            0
        );
    }

    #[tokio::test]
    async fn sync_skips_remaining_urls_once_the_file_is_written() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient::default()
            .with_feed(FEED_URL, MIRRORED_FEED)
            .with_audio("https://dead.example.com/ep.mp3", b"first")
            .with_audio("https://live.example.com/ep.mp3", b"second");
        let log = Arc::new(EventLog::default());
        let reporter: SharedProgressReporter = log.clone();

        let summary = sync_feed(
            &client,
            FEED_URL,
            dir.path(),
            &SyncOptions::default(),
            &CancelSignal::never(),
            &reporter,
        )
        .await
        .unwrap();

        assert_eq!(summary.downloaded, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(client.streamed(), vec!["https://dead.example.com/ep.mp3"]);
        assert_eq!(
            std::fs::read(dir.path().join("Mirrored").join("Ep.mp3")).unwrap(),
            b"first"
        );
        assert_eq!(
            log.count(|e| matches!(
                e,
                ProgressEvent::FilenameCollision { url, .. }
                    if url == "https://live.example.com/ep.mp3"
            )),
            1
        );
    }

    #[tokio::test]
    async fn sync_counts_one_failure_when_every_url_fails() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient::default().with_feed(FEED_URL, MIRRORED_FEED);

        let summary = sync_feed(
            &client,
            FEED_URL,
            dir.path(),
            &SyncOptions::default(),
            &CancelSignal::never(),
            &NoopReporter::shared(),
        )
        .await
        .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failed_episodes[0].0, "Ep.mp3");
        assert_eq!(client.streamed().len(), 2);
    }

    #[tokio::test]
    async fn run_skips_feed_whose_title_names_the_parent_dir() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("pods");
        std::fs::create_dir(&base).unwrap();

        let escaping_feed = SAMPLE_FEED.replace("Test: Podcast", "..");
        let client = sample_client().with_feed("https://evil.example.com/feed", &escaping_feed);
        let log = Arc::new(EventLog::default());
        let reporter: SharedProgressReporter = log.clone();

        let summary = run(
            &client,
            &["https://evil.example.com/feed".to_string()],
            &base,
            &SyncOptions::default(),
            &CancelSignal::never(),
            &reporter,
        )
        .await;

        assert_eq!(summary.downloaded, 0);
        assert_eq!(summary.failed_feeds.len(), 1);
        assert!(client.streamed().is_empty());
        assert!(!dir.path().join("A.mp3").exists());
        assert_eq!(
            log.count(|e| matches!(e, ProgressEvent::DirectoryFailed { .. })),
            1
        );
    }

    #[tokio::test]
    async fn run_skips_broken_feeds() {
        let dir = tempdir().unwrap();
        let client = sample_client();
        let log = Arc::new(EventLog::default());
        let reporter: SharedProgressReporter = log.clone();

        let sources = vec![
            "https://missing.example.com/feed".to_string(),
            FEED_URL.to_string(),
        ];
        let summary = run(
            &client,
            &sources,
            dir.path(),
            &SyncOptions::default(),
            &CancelSignal::never(),
            &reporter,
        )
        .await;

        assert_eq!(summary.failed_feeds.len(), 1);
        assert_eq!(summary.failed_feeds[0].0, "https://missing.example.com/feed");
        assert_eq!(summary.downloaded, 2);
        assert_eq!(
            log.count(|e| matches!(e, ProgressEvent::FeedFailed { .. })),
            1
        );
        assert_eq!(
            log.count(|e| matches!(e, ProgressEvent::RunCompleted { .. })),
            1
        );
    }

    #[tokio::test]
    async fn run_reports_directory_failure_and_continues() {
        let dir = tempdir().unwrap();
        // A plain file occupies the podcast directory name
        std::fs::write(dir.path().join("Test Podcast"), b"in the way").unwrap();

        let other_feed = SAMPLE_FEED.replace("Test: Podcast", "Other Show");
        let client = sample_client().with_feed("https://other.example.com/feed", &other_feed);
        let log = Arc::new(EventLog::default());
        let reporter: SharedProgressReporter = log.clone();

        let sources = vec![
            FEED_URL.to_string(),
            "https://other.example.com/feed".to_string(),
        ];
        let summary = run(
            &client,
            &sources,
            dir.path(),
            &SyncOptions::default(),
            &CancelSignal::never(),
            &reporter,
        )
        .await;

        assert_eq!(
            log.count(|e| matches!(e, ProgressEvent::DirectoryFailed { .. })),
            1
        );
        assert_eq!(summary.downloaded, 2);
        assert!(dir.path().join("Other Show").join("B.mp3").exists());
    }

    #[tokio::test]
    async fn run_stops_before_first_feed_when_cancelled() {
        let dir = tempdir().unwrap();
        let client = sample_client();
        let source = CancelSource::new();
        source.cancel();

        let summary = run(
            &client,
            &[FEED_URL.to_string()],
            dir.path(),
            &SyncOptions::default(),
            &source.signal(),
            &NoopReporter::shared(),
        )
        .await;

        assert!(summary.cancelled);
        assert_eq!(summary.downloaded, 0);
        assert!(client.streamed().is_empty());
        assert!(!dir.path().join("Test Podcast").exists());
    }

    #[tokio::test]
    async fn cancellation_during_feed_skips_remaining_episodes() {
        /// Cancels the run as soon as the first download completes
        struct CancelAfterFirst(CancelSource);

        impl ProgressReporter for CancelAfterFirst {
            fn report(&self, event: ProgressEvent) {
                if let ProgressEvent::DownloadCompleted { .. } = event {
                    self.0.cancel();
                }
            }
        }

        let dir = tempdir().unwrap();
        let client = sample_client();
        let source = CancelSource::new();
        let reporter: SharedProgressReporter = Arc::new(CancelAfterFirst(source.clone()));

        let summary = run(
            &client,
            &[FEED_URL.to_string(), FEED_URL.to_string()],
            dir.path(),
            &SyncOptions::default(),
            &source.signal(),
            &reporter,
        )
        .await;

        assert!(summary.cancelled);
        assert_eq!(summary.downloaded, 1);
        assert_eq!(client.streamed(), vec!["https://example.com/a.mp3"]);
    }
}
