// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::FeedError;

/// Title used for entries that do not carry one
pub const UNTITLED_ENTRY: &str = "Untitled Episode";

/// A fetched and parsed RSS or Atom feed
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub title: String,
    pub entries: Vec<Entry>,
}

/// A single episode within a feed
#[derive(Debug, Clone)]
pub struct Entry {
    pub title: String,
    pub links: Vec<Link>,
}

/// A typed link attached to an entry (enclosure, page link, atom link)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub media_type: Option<String>,
    pub href: String,
}

impl Link {
    fn new(media_type: Option<&str>, href: &str) -> Self {
        Self {
            media_type: media_type.map(String::from).filter(|s| !s.is_empty()),
            href: href.to_string(),
        }
    }
}

/// Parse feed bytes as RSS 2.0, falling back to Atom
pub fn parse_feed(xml_bytes: &[u8]) -> Result<ParsedFeed, FeedError> {
    let feed = match rss::Channel::read_from(xml_bytes) {
        Ok(channel) => from_rss(&channel),
        Err(rss_error) => match atom_syndication::Feed::read_from(xml_bytes) {
            Ok(feed) => from_atom(&feed),
            Err(atom_error) => {
                return Err(FeedError::ParseFailed {
                    reason: format!("RSS: {rss_error}; Atom: {atom_error}"),
                });
            }
        },
    };

    if feed.title.trim().is_empty() {
        return Err(FeedError::MissingTitle);
    }

    Ok(feed)
}

fn from_rss(channel: &rss::Channel) -> ParsedFeed {
    let entries = channel
        .items()
        .iter()
        .map(|item| {
            let mut links = Vec::new();

            if let Some(enclosure) = item.enclosure() {
                links.push(Link::new(Some(enclosure.mime_type()), enclosure.url()));
            }
            if let Some(link) = item.link() {
                links.push(Link::new(Some("text/html"), link));
            }
            if let Some(atom) = item.atom_ext() {
                links.extend(
                    atom.links()
                        .iter()
                        .map(|link| Link::new(link.mime_type(), link.href())),
                );
            }

            Entry {
                title: entry_title(item.title()),
                links,
            }
        })
        .collect();

    ParsedFeed {
        title: channel.title().to_string(),
        entries,
    }
}

fn from_atom(feed: &atom_syndication::Feed) -> ParsedFeed {
    let entries = feed
        .entries()
        .iter()
        .map(|entry| Entry {
            title: entry_title(Some(entry.title().value.as_str())),
            links: entry
                .links()
                .iter()
                .map(|link| Link::new(link.mime_type(), link.href()))
                .collect(),
        })
        .collect();

    ParsedFeed {
        title: feed.title().value.clone(),
        entries,
    }
}

fn entry_title(title: Option<&str>) -> String {
    title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(UNTITLED_ENTRY)
        .to_string()
}
