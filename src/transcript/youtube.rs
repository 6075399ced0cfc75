//! YouTube captions via yt-dlp.

use super::{collapse_whitespace, TranscriptSource};
use crate::error::{Result, SporError};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, instrument};

static VIDEO_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    // Matches the common YouTube URL formats and bare video IDs
    Regex::new(
        r"(?x)
        (?:
            (?:https?://)?
            (?:www\.|m\.)?
            (?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/|youtube\.com/shorts/)
            ([a-zA-Z0-9_-]{11})
        )
        |
        ^([a-zA-Z0-9_-]{11})$
    ",
    )
    .expect("Invalid regex")
});

/// Extract the video ID from a YouTube URL or a bare ID.
pub fn parse_video_id(input: &str) -> Option<String> {
    let caps = VIDEO_ID_REGEX.captures(input.trim())?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Caption track listing as reported by `yt-dlp --dump-json`.
#[derive(Debug, Deserialize)]
struct VideoInfo {
    #[serde(default)]
    subtitles: std::collections::HashMap<String, Vec<CaptionFormat>>,
    #[serde(default)]
    automatic_captions: std::collections::HashMap<String, Vec<CaptionFormat>>,
}

#[derive(Debug, Deserialize)]
struct CaptionFormat {
    ext: String,
    url: String,
}

/// Timed-text document in YouTube's `json3` format.
#[derive(Debug, Deserialize)]
struct TimedText {
    #[serde(default)]
    events: Vec<TimedEvent>,
}

#[derive(Debug, Deserialize)]
struct TimedEvent {
    #[serde(default)]
    segs: Vec<TimedSegment>,
}

#[derive(Debug, Deserialize)]
struct TimedSegment {
    #[serde(default)]
    utf8: String,
}

/// Fetches transcripts from YouTube's caption tracks.
pub struct YoutubeTranscripts {
    languages: Vec<String>,
    http: reqwest::Client,
}

impl YoutubeTranscripts {
    /// Create a source that prefers the given caption languages, in order.
    pub fn new(languages: Vec<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| SporError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { languages, http })
    }

    /// Fetch the video's caption listing using yt-dlp.
    async fn fetch_info(&self, video_id: &str) -> Result<VideoInfo> {
        let url = format!("https://www.youtube.com/watch?v={}", video_id);

        let output = tokio::process::Command::new("yt-dlp")
            .args(["--dump-json", "--skip-download", "--no-warnings", &url])
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SporError::ToolNotFound("yt-dlp".to_string())
                } else {
                    unavailable(video_id, format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(unavailable(video_id, stderr.trim().to_string()));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| unavailable(video_id, format!("Failed to parse yt-dlp output: {}", e)))
    }

    async fn download(&self, video_id: &str, caption_url: &str) -> Result<String> {
        let response = self
            .http
            .get(caption_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| unavailable(video_id, format!("Caption download failed: {}", e)))?;

        response
            .text()
            .await
            .map_err(|e| unavailable(video_id, format!("Caption download failed: {}", e)))
    }
}

fn unavailable(video_id: &str, reason: String) -> SporError {
    SporError::SourceUnavailable {
        source_id: video_id.to_string(),
        reason,
    }
}

/// Pick a `json3` caption URL, preferring manual subtitles over automatic captions
/// and earlier languages over later ones.
fn select_caption_url(info: &VideoInfo, languages: &[String]) -> Option<String> {
    for tracks in [&info.subtitles, &info.automatic_captions] {
        for language in languages {
            let exact = tracks.get(language);
            let regional = || {
                let prefix = format!("{}-", language);
                let mut keys: Vec<&String> =
                    tracks.keys().filter(|k| k.starts_with(&prefix)).collect();
                keys.sort();
                keys.first().and_then(|k| tracks.get(*k))
            };

            let formats = exact.or_else(regional);
            if let Some(format) = formats.and_then(|f| f.iter().find(|f| f.ext == "json3")) {
                return Some(format.url.clone());
            }
        }
    }
    None
}

/// Join the caption events of a `json3` document into one line of text.
fn parse_json3(body: &str) -> Result<String> {
    let timed: TimedText = serde_json::from_str(body)?;
    let lines: Vec<String> = timed
        .events
        .iter()
        .map(|event| event.segs.iter().map(|seg| seg.utf8.as_str()).collect())
        .collect();
    Ok(collapse_whitespace(&lines.join(" ")))
}

#[async_trait]
impl TranscriptSource for YoutubeTranscripts {
    #[instrument(skip(self))]
    async fn fetch(&self, source_id: &str) -> Result<String> {
        let video_id = parse_video_id(source_id).ok_or_else(|| {
            SporError::InvalidInput(format!("Invalid YouTube video ID or URL: {}", source_id))
        })?;

        let info = self.fetch_info(&video_id).await?;
        let caption_url = select_caption_url(&info, &self.languages)
            .ok_or_else(|| SporError::TranscriptsDisabled(video_id.clone()))?;

        debug!("Downloading captions for {}", video_id);
        let body = self.download(&video_id, &caption_url).await?;
        let text = parse_json3(&body)
            .map_err(|e| unavailable(&video_id, format!("Unreadable captions: {}", e)))?;

        if text.is_empty() {
            return Err(SporError::TranscriptsDisabled(video_id));
        }

        info!("Fetched transcript for {} ({} chars)", video_id, text.len());
        Ok(text)
    }
}
