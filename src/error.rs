//! Error types for Spor.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Library-level error type for Spor operations.
#[derive(Error, Debug)]
pub enum SporError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transcripts are disabled for video ID: {0}")]
    TranscriptsDisabled(String),

    #[error("Error fetching transcript for {source_id}: {reason}")]
    SourceUnavailable { source_id: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector index error: {0}")]
    Index(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl SporError {
    /// Whether this error means the transcript could not be obtained at all.
    pub fn is_source_unavailable(&self) -> bool {
        matches!(
            self,
            SporError::TranscriptsDisabled(_)
                | SporError::SourceUnavailable { .. }
                | SporError::ToolNotFound(_)
        )
    }
}

/// Coarse reason an answer is an apology rather than a grounded response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// The transcript could not be fetched.
    SourceUnavailable,
    /// Chunking, embedding or indexing failed.
    IndexBuild,
    /// No generation model was bound at startup.
    GenerationUnconfigured,
    /// The provider reported quota or rate limiting.
    QuotaExceeded,
    /// The provider refused the request (permissions or credentials).
    PermissionDenied,
    /// Any other provider-side failure.
    ProviderError,
    /// The provider answered without usable text (blocked or empty).
    EmptyResponse,
    /// The provider response could not be decoded.
    MalformedResponse,
}

impl FailureCategory {
    /// Fixed user-facing text for this category.
    ///
    /// Failures before generation are followed by the error itself, see [`FailureCategory::describe`].
    pub fn apology(&self) -> &'static str {
        match self {
            FailureCategory::SourceUnavailable | FailureCategory::IndexBuild => {
                "Sorry, I encountered an error"
            }
            FailureCategory::GenerationUnconfigured => {
                "Sorry, the language model is not configured properly. Please check your API key."
            }
            FailureCategory::QuotaExceeded => {
                "Sorry, the language model quota has been exceeded. Please try again later."
            }
            FailureCategory::PermissionDenied => {
                "Sorry, the language model refused the request due to a permission problem."
            }
            FailureCategory::ProviderError => {
                "Sorry, the language model ran into an error while generating a response."
            }
            FailureCategory::EmptyResponse => "Sorry, I couldn't generate a meaningful response.",
            FailureCategory::MalformedResponse => {
                "Sorry, the language model returned a response I couldn't read."
            }
        }
    }

    /// User-facing text for a failure caused by `err`.
    ///
    /// Source and index failures name the error; generation failures use the fixed apology.
    pub fn describe(&self, err: &SporError) -> String {
        match self {
            FailureCategory::SourceUnavailable | FailureCategory::IndexBuild => {
                format!("{}: {}", self.apology(), err)
            }
            _ => self.apology().to_string(),
        }
    }
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureCategory::SourceUnavailable => "source_unavailable",
            FailureCategory::IndexBuild => "index_build",
            FailureCategory::GenerationUnconfigured => "generation_unconfigured",
            FailureCategory::QuotaExceeded => "quota_exceeded",
            FailureCategory::PermissionDenied => "permission_denied",
            FailureCategory::ProviderError => "provider_error",
            FailureCategory::EmptyResponse => "empty_response",
            FailureCategory::MalformedResponse => "malformed_response",
        };
        write!(f, "{}", name)
    }
}

/// Result type alias for Spor operations.
pub type Result<T> = std::result::Result<T, SporError>;
