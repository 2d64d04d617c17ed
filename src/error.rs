use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when reading an OPML subscription list
#[derive(Error, Debug)]
pub enum OpmlError {
    #[error("Failed to read OPML file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse OPML document: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("Malformed outline attribute: {0}")]
    InvalidAttribute(String),

    #[error("Document has no <opml> root element")]
    NotOpml,
}

/// Errors that can occur when fetching or parsing RSS/Atom feeds
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to fetch feed from {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for feed {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Invalid feed URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Malformed feed, neither RSS nor Atom: {reason}")]
    ParseFailed { reason: String },

    #[error("Feed has no title")]
    MissingTitle,
}

/// Errors that can occur during episode downloads
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP request failed for {url}: {source}")]
    HttpFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Response for {url} has no Content-Length header")]
    MissingContentLength { url: String },

    #[error("Failed to create file {path}: {source}")]
    FileCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to file {path}: {source}")]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stream error while downloading {url}: {source}")]
    StreamFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Errors that can occur while preparing a podcast directory
#[derive(Error, Debug)]
pub enum StateError {
    #[error("Podcast name {name:?} is not a usable directory name")]
    InvalidName { name: String },

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that abort the processing of a single feed
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Directory error: {0}")]
    State(#[from] StateError),
}
