//! Turning feed and episode titles into directory and file names.

/// Characters stripped from every title before it touches the filesystem
pub const UNSAFE_CHARS: [char; 18] = [
    ':', '-', '?', '+', '@', ',', '|', '[', ']', '"', '>', '<', '/', '\\', '*', '#', '%', '^',
];

/// Extension appended to every episode filename
pub const EPISODE_EXTENSION: &str = ".mp3";

/// Feed titles that are known to be malformed, mapped to the directory name to use.
/// Keys are matched against the already sanitized title.
const TITLE_OVERRIDES: [(&str, &str); 3] = [
    (
        "At Liberty Podcast  American Civil Liberties Union",
        "At Liberty Podcast American Civil Liberties Union",
    ),
    ("Darknet Diaries Bonus Episodes", "Darknet Diaries"),
    ("Fireside Podcast – HeadStuff", "Fireside Podcast"),
];

/// Remove every blacklisted character from `text`
pub fn sanitize(text: &str) -> String {
    text.chars().filter(|c| !UNSAFE_CHARS.contains(c)).collect()
}

/// Replace a known malformed title with its curated name
///
/// Only exact matches are replaced, everything else passes through.
pub fn normalize_title(text: &str) -> String {
    TITLE_OVERRIDES
        .iter()
        .find(|(malformed, _)| *malformed == text)
        .map(|(_, fixed)| (*fixed).to_string())
        .unwrap_or_else(|| text.to_string())
}

/// Directory name for a podcast: sanitize first, then normalize
pub fn podcast_dir_name(feed_title: &str) -> String {
    normalize_title(&sanitize(feed_title))
}

/// Filename for an episode: the sanitized title plus `.mp3`
pub fn episode_filename(episode_title: &str) -> String {
    format!("{}{}", sanitize(episode_title), EPISODE_EXTENSION)
}
