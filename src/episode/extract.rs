use std::collections::HashMap;

use crate::feed::ParsedFeed;
use crate::sanitize::episode_filename;

/// Media type of the links that are downloaded
pub const AUDIO_MEDIA_TYPE: &str = "audio/mpeg";

/// An audio URL and the filename it is saved under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeRecord {
    pub url: String,
    pub filename: String,
}

/// Insertion-ordered mapping from download URL to filename
///
/// Inserting a URL that is already present replaces its filename but keeps
/// its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpisodeMap {
    records: Vec<EpisodeRecord>,
    index: HashMap<String, usize>,
}

impl EpisodeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, filename: impl Into<String>) {
        let url = url.into();
        let filename = filename.into();

        match self.index.get(&url) {
            Some(&pos) => self.records[pos].filename = filename,
            None => {
                self.index.insert(url.clone(), self.records.len());
                self.records.push(EpisodeRecord { url, filename });
            }
        }
    }

    pub fn get(&self, url: &str) -> Option<&str> {
        self.index
            .get(url)
            .map(|&pos| self.records[pos].filename.as_str())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EpisodeRecord> {
        self.records.iter()
    }
}

impl IntoIterator for EpisodeMap {
    type Item = EpisodeRecord;
    type IntoIter = std::vec::IntoIter<EpisodeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<U: Into<String>, F: Into<String>> FromIterator<(U, F)> for EpisodeMap {
    fn from_iter<I: IntoIterator<Item = (U, F)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (url, filename) in iter {
            map.insert(url, filename);
        }
        map
    }
}

/// Map every `audio/mpeg` link in the feed to the filename of its entry
pub fn extract_episodes(feed: &ParsedFeed) -> EpisodeMap {
    let mut episodes = EpisodeMap::new();

    for entry in &feed.entries {
        let audio_links = entry
            .links
            .iter()
            .filter(|link| link.media_type.as_deref() == Some(AUDIO_MEDIA_TYPE));

        for link in audio_links {
            episodes.insert(link.href.as_str(), episode_filename(&entry.title));
        }
    }

    episodes
}
