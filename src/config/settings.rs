//! Configuration settings for Spor.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub transcript: TranscriptSettings,
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
    pub generation: GenerationSettings,
    pub confidence: ConfidenceSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Where transcripts come from.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptProvider {
    /// YouTube captions via yt-dlp.
    #[default]
    Youtube,
    /// Plain-text files named `<source_id>.txt`.
    File,
}

impl std::str::FromStr for TranscriptProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "youtube" => Ok(TranscriptProvider::Youtube),
            "file" | "files" => Ok(TranscriptProvider::File),
            _ => Err(format!("Unknown transcript provider: {}", s)),
        }
    }
}

/// Transcript fetching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptSettings {
    /// Transcript provider (youtube, file).
    pub provider: TranscriptProvider,
    /// Caption languages to try, in order.
    pub languages: Vec<String>,
    /// Directory of transcript files (for the file provider).
    pub transcript_dir: String,
}

impl Default for TranscriptSettings {
    fn default() -> Self {
        Self {
            provider: TranscriptProvider::Youtube,
            languages: vec!["en".to_string()],
            transcript_dir: "~/.spor/transcripts".to_string(),
        }
    }
}

/// Transcript chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Target maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (hashing, openai). `hashing` runs locally and needs no key.
    pub provider: String,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "hashing".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of chunks retrieved per question.
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

/// Generation provider type.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProviderKind {
    /// Google Gemini (generateContent REST API).
    #[default]
    Gemini,
    /// OpenAI chat completions.
    Openai,
}

impl std::str::FromStr for GenerationProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Ok(GenerationProviderKind::Gemini),
            "openai" => Ok(GenerationProviderKind::Openai),
            _ => Err(format!("Unknown generation provider: {}", s)),
        }
    }
}

impl std::fmt::Display for GenerationProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationProviderKind::Gemini => write!(f, "gemini"),
            GenerationProviderKind::Openai => write!(f, "openai"),
        }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Generation provider (gemini, openai).
    pub provider: GenerationProviderKind,
    /// Candidate models, tried in order at startup.
    pub models: Vec<String>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum output tokens per answer.
    pub max_tokens: u32,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// Override for the provider endpoint (mainly for proxies).
    pub endpoint: Option<String>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            provider: GenerationProviderKind::Gemini,
            models: vec![
                "gemini-1.5-flash".to_string(),
                "gemini-1.5-pro".to_string(),
                "gemini-pro".to_string(),
            ],
            api_key_env: "GOOGLE_API_KEY".to_string(),
            temperature: 0.2,
            max_tokens: 256,
            timeout_seconds: 120,
            endpoint: None,
        }
    }
}

impl GenerationSettings {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

/// Score reported when nothing was retrieved.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmptyRetrieval {
    /// Keep the baseline score even without evidence.
    #[default]
    Baseline,
    /// Report 0.0 when nothing was retrieved.
    Zero,
}

/// Confidence heuristic settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceSettings {
    pub baseline: f64,
    pub per_chunk: f64,
    pub ceiling: f64,
    pub empty_retrieval: EmptyRetrieval,
}

impl Default for ConfidenceSettings {
    fn default() -> Self {
        Self {
            baseline: 0.6,
            per_chunk: 0.1,
            ceiling: 0.95,
            empty_retrieval: EmptyRetrieval::Baseline,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::SporError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("spor")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded transcript directory path.
    pub fn transcript_dir(&self) -> PathBuf {
        Self::expand_path(&self.transcript.transcript_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_pipeline_policy() {
        let settings = Settings::default();
        assert_eq!(settings.chunking.chunk_size, 1000);
        assert_eq!(settings.chunking.chunk_overlap, 200);
        assert_eq!(settings.retrieval.top_k, 4);
        assert_eq!(settings.generation.models[0], "gemini-1.5-flash");
        assert_eq!(settings.confidence.empty_retrieval, EmptyRetrieval::Baseline);
        assert_eq!(settings.embedding.provider, "hashing");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [retrieval]
            top_k = 6

            [generation]
            provider = "openai"
            models = ["gpt-4o-mini"]
            "#,
        )
        .unwrap();

        assert_eq!(settings.retrieval.top_k, 6);
        assert_eq!(settings.generation.provider, GenerationProviderKind::Openai);
        assert_eq!(settings.generation.models, vec!["gpt-4o-mini".to_string()]);
        assert_eq!(settings.generation.max_tokens, 256);
        assert_eq!(settings.chunking.chunk_size, 1000);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.server.port = 9090;
        settings.confidence.empty_retrieval = EmptyRetrieval::Zero;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.server.port, 9090);
        assert_eq!(loaded.confidence.empty_retrieval, EmptyRetrieval::Zero);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.server.port, 8000);
    }
}
