// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::OpmlError;

/// Feeds synchronized when no OPML file is imported
pub const DEFAULT_FEEDS: [&str; 10] = [
    "https://www.patreon.com/rss/darknetdiaries?auth=AGjk3H83-m6SXXOSdN1Ewt3QuIrvU0i6",
    "https://darknetdiaries.com/feedfree.xml",
    "https://realpython.com/podcasts/rpp/feed",
    "https://feeds.megaphone.fm/darknetdiaries",
    "https://feeds.eff.org/howtofixtheinternet",
    "https://malicious.life/feed/podcast/",
    "https://headstuff.org/tag/fireside-podcast/feed/",
    "https://www.aclu.org/podcast/feed/",
    "https://feeds.soundcloud.com/users/soundcloud:users:40330678/sounds.rss",
    "http://www.2600.com/oth-broadband.xml",
];

/// The built-in feed list as owned strings
pub fn default_sources() -> Vec<String> {
    DEFAULT_FEEDS.iter().map(|url| url.to_string()).collect()
}

/// Produce the ordered list of feed URLs for this run
///
/// An imported OPML file replaces `defaults` entirely. A broken import is an
/// error, never an empty list.
pub fn resolve_sources(
    defaults: &[String],
    import: Option<&Path>,
) -> Result<Vec<String>, OpmlError> {
    match import {
        Some(path) => read_opml(path),
        None => Ok(defaults.to_vec()),
    }
}

/// Read an OPML file from disk and collect its feed URLs
pub fn read_opml(path: &Path) -> Result<Vec<String>, OpmlError> {
    let content = std::fs::read_to_string(path).map_err(|e| OpmlError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_opml(&content)
}

/// Collect the `xmlUrl` of every outline, depth-first in document order
///
/// Group outlines without `xmlUrl` are walked but contribute nothing.
pub fn parse_opml(content: &str) -> Result<Vec<String>, OpmlError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut feeds = Vec::new();
    let mut saw_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"opml" => {
                saw_root = true;
            }
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"outline" => {
                if let Some(url) = outline_feed_url(&e, &reader)? {
                    tracing::debug!(url = %url, "Found feed in OPML outline");
                    feeds.push(url);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(OpmlError::NotOpml);
    }

    Ok(feeds)
}

fn outline_feed_url(
    outline: &BytesStart<'_>,
    reader: &Reader<&[u8]>,
) -> Result<Option<String>, OpmlError> {
    for attr in outline.attributes() {
        let attr = attr.map_err(|e| OpmlError::InvalidAttribute(e.to_string()))?;
        if attr.key.as_ref() == b"xmlUrl" {
            let value = attr
                .decode_and_unescape_value(reader.decoder())
                .map_err(|e| OpmlError::InvalidAttribute(e.to_string()))?;
            let value = value.trim();
            if value.is_empty() {
                return Ok(None);
            }
            return Ok(Some(value.to_string()));
        }
    }
    Ok(None)
}
