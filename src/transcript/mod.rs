//! Transcript sources.
//!
//! A transcript source turns a source ID into plain transcript text. Failures that mean
//! "there is no transcript to be had" are reported as `SporError::TranscriptsDisabled`
//! or `SporError::SourceUnavailable` so callers can tell them apart from other errors.

mod file;
mod youtube;

pub use file::FileTranscripts;
pub use youtube::{parse_video_id, YoutubeTranscripts};

use crate::config::{Settings, TranscriptProvider};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for anything that can produce a transcript for a source ID.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch the full transcript text for `source_id`.
    async fn fetch(&self, source_id: &str) -> Result<String>;
}

/// Create the transcript source configured in `settings`.
pub fn create_transcript_source(settings: &Settings) -> Result<Arc<dyn TranscriptSource>> {
    match settings.transcript.provider {
        TranscriptProvider::Youtube => Ok(Arc::new(YoutubeTranscripts::new(
            settings.transcript.languages.clone(),
        )?)),
        TranscriptProvider::File => Ok(Arc::new(FileTranscripts::new(settings.transcript_dir()))),
    }
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a\n\nb \t c "), "a b c");
        assert_eq!(collapse_whitespace("   "), "");
    }

    #[tokio::test]
    async fn test_create_file_source_from_settings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vid.txt"), "hello there").unwrap();

        let mut settings = Settings::default();
        settings.transcript.provider = TranscriptProvider::File;
        settings.transcript.transcript_dir = dir.path().to_string_lossy().to_string();

        let source = create_transcript_source(&settings).unwrap();
        assert_eq!(source.fetch("vid").await.unwrap(), "hello there");
    }
}
