//! Answer generation through an external text-generation provider.
//!
//! Model selection happens once, in [`bind_model`], by smoke-testing an ordered list
//! of candidate models. The resulting [`ModelBinding`] is handed to a
//! [`GenerationClient`], which never fails its caller: every provider problem is
//! turned into an apology text tagged with a [`FailureCategory`].

mod binding;
mod client;
mod gemini;
mod openai;

pub use binding::{bind_model, ModelBinding, Unconfigured, SMOKE_TEST_PROMPT};
pub use client::{Generation, GenerationClient};
pub use gemini::GeminiProvider;
pub use openai::OpenAIProvider;

use crate::config::{GenerationProviderKind, GenerationSettings};
use crate::error::{FailureCategory, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Value shipped in sample `.env` files; treated as no key at all.
pub const PLACEHOLDER_API_KEY: &str = "your_google_api_key_here";

/// A single generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            temperature,
            max_tokens,
        }
    }
}

/// What a provider returned for a successful call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderOutput {
    /// Generated text, if any.
    pub text: Option<String>,
    /// Why the provider withheld content (safety block, content filter).
    pub blocked: Option<String>,
}

impl ProviderOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            blocked: None,
        }
    }
}

/// Failure reported by a generation provider.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Provider temporarily unavailable: {0}")]
    Transient(String),

    #[error("Malformed provider response: {0}")]
    Malformed(String),

    #[error("Provider error: {0}")]
    Other(String),
}

impl ProviderError {
    /// Coarse category reported to callers.
    pub fn category(&self) -> FailureCategory {
        match self {
            ProviderError::Authentication(_) | ProviderError::PermissionDenied(_) => {
                FailureCategory::PermissionDenied
            }
            ProviderError::QuotaExceeded(_) => FailureCategory::QuotaExceeded,
            ProviderError::Malformed(_) => FailureCategory::MalformedResponse,
            ProviderError::ModelNotFound(_)
            | ProviderError::Transient(_)
            | ProviderError::Other(_) => FailureCategory::ProviderError,
        }
    }
}

/// Trait for text-generation providers.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Generate text with the given model.
    async fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> std::result::Result<ProviderOutput, ProviderError>;
}

/// Build the configured provider and bind a model.
///
/// Only configuration problems are errors. A missing key or an unusable model list
/// yields a disabled client.
pub async fn connect_generation(settings: &GenerationSettings) -> Result<GenerationClient> {
    let api_key = match settings.api_key() {
        Some(key) if key != PLACEHOLDER_API_KEY => key,
        _ => {
            warn!(
                "{} not set; answer generation is disabled",
                settings.api_key_env
            );
            return Ok(GenerationClient::disabled(Unconfigured::MissingApiKey));
        }
    };

    let timeout = Duration::from_secs(settings.timeout_seconds);
    let provider: Arc<dyn GenerationProvider> = match settings.provider {
        GenerationProviderKind::Gemini => Arc::new(GeminiProvider::with_options(
            api_key,
            settings.endpoint.clone(),
            timeout,
        )?),
        GenerationProviderKind::Openai => Arc::new(OpenAIProvider::with_options(
            &api_key,
            settings.endpoint.as_deref(),
            timeout,
        )?),
    };

    Ok(GenerationClient::connect(provider, &settings.models).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_categories() {
        assert_eq!(
            ProviderError::QuotaExceeded("429".into()).category(),
            FailureCategory::QuotaExceeded
        );
        assert_eq!(
            ProviderError::Authentication("bad key".into()).category(),
            FailureCategory::PermissionDenied
        );
        assert_eq!(
            ProviderError::Transient("503".into()).category(),
            FailureCategory::ProviderError
        );
        assert_eq!(
            ProviderError::Malformed("not json".into()).category(),
            FailureCategory::MalformedResponse
        );
    }

    #[tokio::test]
    async fn test_missing_key_disables_without_network() {
        let settings = GenerationSettings {
            api_key_env: "SPOR_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..GenerationSettings::default()
        };

        let client = connect_generation(&settings).await.unwrap();
        assert!(!client.is_enabled());
        assert_eq!(
            client.binding(),
            &ModelBinding::Unconfigured {
                reason: Unconfigured::MissingApiKey
            }
        );
    }
}
