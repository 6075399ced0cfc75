//! Transcripts stored as plain-text files.

use super::TranscriptSource;
use crate::error::{Result, SporError};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, instrument};

/// Reads `<dir>/<source_id>.txt`.
pub struct FileTranscripts {
    dir: PathBuf,
}

impl FileTranscripts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, source_id: &str) -> Result<PathBuf> {
        let invalid = source_id.is_empty()
            || source_id == "."
            || source_id == ".."
            || source_id.contains(['/', '\\']);
        if invalid {
            return Err(SporError::InvalidInput(format!(
                "Invalid transcript source ID: {:?}",
                source_id
            )));
        }
        Ok(self.dir.join(format!("{}.txt", source_id)))
    }
}

#[async_trait]
impl TranscriptSource for FileTranscripts {
    #[instrument(skip(self))]
    async fn fetch(&self, source_id: &str) -> Result<String> {
        let path = self.path_for(source_id)?;
        debug!("Reading transcript from {}", path.display());

        tokio::fs::read_to_string(&path)
            .await
            .map(|text| text.trim().to_string())
            .map_err(|e| SporError::SourceUnavailable {
                source_id: source_id.to_string(),
                reason: format!("{}: {}", path.display(), e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_transcript_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("abc123.txt"), "  first line\nsecond line\n").unwrap();

        let source = FileTranscripts::new(dir.path());
        let text = source.fetch("abc123").await.unwrap();
        assert_eq!(text, "first line\nsecond line");
    }

    #[tokio::test]
    async fn test_missing_file_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileTranscripts::new(dir.path());

        let err = source.fetch("nope").await.unwrap_err();
        assert!(matches!(err, SporError::SourceUnavailable { .. }));
        assert!(err.is_source_unavailable());
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileTranscripts::new(dir.path());

        for id in ["../secret", "a/b", "..", ""] {
            let err = source.fetch(id).await.unwrap_err();
            assert!(matches!(err, SporError::InvalidInput(_)), "{:?} accepted", id);
        }
    }
}
