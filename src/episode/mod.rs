mod download;
mod extract;

pub use download::{CHUNK_SIZE, DownloadContext, DownloadOutcome, download_episode};
pub use extract::{AUDIO_MEDIA_TYPE, EpisodeMap, EpisodeRecord, extract_episodes};
