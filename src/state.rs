use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use crate::episode::{EpisodeMap, EpisodeRecord};
use crate::error::StateError;

/// One missing file and every URL that would produce it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedDownload {
    pub filename: String,
    /// Candidate URLs in feed order. A later one is only tried if the
    /// earlier ones fail.
    pub urls: Vec<String>,
}

/// Plan for one podcast, indicating what needs to be downloaded
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    /// Missing files, in the feed order of their first URL
    pub to_download: Vec<PlannedDownload>,
    /// Episodes whose filename already exists in the directory
    pub already_present: Vec<EpisodeRecord>,
    /// Total number of audio episodes in the feed
    pub total_episodes: usize,
}

/// Result of reconciling a feed against its podcast directory
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub target_dir: PathBuf,
    pub plan: SyncPlan,
}

/// Make sure `base_dir/podcast_name` exists and return its path
///
/// Only the podcast directory itself is created; a missing parent is an error.
/// The name must be a single plain path component, so `""`, `"."` and `".."`
/// are rejected.
pub fn ensure_podcast_dir(base_dir: &Path, podcast_name: &str) -> Result<PathBuf, StateError> {
    let mut components = Path::new(podcast_name).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single_normal {
        return Err(StateError::InvalidName {
            name: podcast_name.to_string(),
        });
    }

    let target_dir = base_dir.join(podcast_name);

    if !target_dir.is_dir() {
        tracing::debug!(path = %target_dir.display(), "Creating podcast directory");
        std::fs::create_dir(&target_dir).map_err(|e| StateError::CreateDirectoryFailed {
            path: target_dir.clone(),
            source: e,
        })?;
    }

    Ok(target_dir)
}

/// Snapshot the names of the entries directly inside `dir`
pub fn scan_existing_files(dir: &Path) -> Result<HashSet<String>, StateError> {
    let read_error = |e: std::io::Error| StateError::ReadDirectoryFailed {
        path: dir.to_path_buf(),
        source: e,
    };

    let mut existing_files = HashSet::new();
    for entry in std::fs::read_dir(dir).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        existing_files.insert(entry.file_name().to_string_lossy().into_owned());
    }

    Ok(existing_files)
}

/// Split episodes into those to download and those to skip
///
/// `existing_files` is a single snapshot; files written later in the run are
/// not seen here. URLs sharing a filename are grouped into one planned
/// download so that each file is written at most once.
pub fn create_sync_plan(episodes: EpisodeMap, existing_files: &HashSet<String>) -> SyncPlan {
    let total_episodes = episodes.len();
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut plan = SyncPlan {
        total_episodes,
        ..Default::default()
    };

    for record in episodes {
        if existing_files.contains(&record.filename) {
            plan.already_present.push(record);
        } else if let Some(&slot) = slots.get(&record.filename) {
            plan.to_download[slot].urls.push(record.url);
        } else {
            slots.insert(record.filename.clone(), plan.to_download.len());
            plan.to_download.push(PlannedDownload {
                filename: record.filename,
                urls: vec![record.url],
            });
        }
    }

    plan
}

/// Create the podcast directory if needed, snapshot it and plan the downloads
pub fn reconcile(
    base_dir: &Path,
    podcast_name: &str,
    episodes: EpisodeMap,
) -> Result<Reconciliation, StateError> {
    let target_dir = ensure_podcast_dir(base_dir, podcast_name)?;
    let existing_files = scan_existing_files(&target_dir)?;
    let plan = create_sync_plan(episodes, &existing_files);

    Ok(Reconciliation { target_dir, plan })
}
