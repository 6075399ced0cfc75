//! Generation client bound to a single model.

use super::{
    bind_model, GenerationProvider, GenerationRequest, ModelBinding, ProviderError, Unconfigured,
};
use crate::error::FailureCategory;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

/// Result of a generation call: text plus the failure category when the text is an apology.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Generation {
    pub text: String,
    pub failure: Option<FailureCategory>,
}

impl Generation {
    pub fn answered(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            failure: None,
        }
    }

    pub fn failed(category: FailureCategory) -> Self {
        Self {
            text: category.apology().to_string(),
            failure: Some(category),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// Stateless wrapper around a provider and the model bound at startup.
#[derive(Clone)]
pub struct GenerationClient {
    provider: Option<Arc<dyn GenerationProvider>>,
    binding: ModelBinding,
}

impl GenerationClient {
    /// Wrap a provider with an already decided binding.
    pub fn new(provider: Arc<dyn GenerationProvider>, binding: ModelBinding) -> Self {
        Self {
            provider: Some(provider),
            binding,
        }
    }

    /// Smoke-test `candidates` against `provider` and bind the first usable model.
    pub async fn connect(provider: Arc<dyn GenerationProvider>, candidates: &[String]) -> Self {
        let binding = bind_model(provider.as_ref(), candidates).await;
        Self::new(provider, binding)
    }

    /// A client that only ever apologizes.
    pub fn disabled(reason: Unconfigured) -> Self {
        Self {
            provider: None,
            binding: ModelBinding::Unconfigured { reason },
        }
    }

    pub fn binding(&self) -> &ModelBinding {
        &self.binding
    }

    /// The bound model, if any.
    pub fn model(&self) -> Option<&str> {
        self.binding.model()
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some() && self.model().is_some()
    }

    /// Generate an answer. Never fails: problems become apology text.
    #[instrument(skip(self, prompt), fields(model = self.model().unwrap_or("none"), prompt_chars = prompt.len()))]
    pub async fn generate(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Generation {
        let (provider, model) = match (&self.provider, self.binding.model()) {
            (Some(provider), Some(model)) => (provider, model),
            _ => {
                debug!("Generation requested while unconfigured");
                return Generation::failed(FailureCategory::GenerationUnconfigured);
            }
        };

        let request = GenerationRequest::new(prompt, temperature, max_tokens);

        match provider.generate(model, &request).await {
            Ok(output) => match output.text.as_deref().map(str::trim) {
                Some(text) if !text.is_empty() => Generation::answered(text),
                _ => {
                    warn!(
                        "Model {} returned no usable text (blocked: {})",
                        model,
                        output.blocked.as_deref().unwrap_or("no")
                    );
                    Generation::failed(FailureCategory::EmptyResponse)
                }
            },
            Err(e) => {
                match &e {
                    ProviderError::QuotaExceeded(_) | ProviderError::Transient(_) => {
                        warn!("Generation with {} failed: {}", model, e)
                    }
                    _ => error!("Generation with {} failed: {}", model, e),
                }
                Generation::failed(e.category())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::ProviderOutput;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedProvider {
        reply: Result<ProviderOutput, ProviderError>,
        requests: Mutex<Vec<(String, GenerationRequest)>>,
    }

    impl FixedProvider {
        fn new(reply: Result<ProviderOutput, ProviderError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl GenerationProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn generate(
            &self,
            model: &str,
            request: &GenerationRequest,
        ) -> Result<ProviderOutput, ProviderError> {
            self.requests
                .lock()
                .unwrap()
                .push((model.to_string(), request.clone()));
            self.reply.clone()
        }
    }

    fn bound(provider: Arc<FixedProvider>) -> GenerationClient {
        GenerationClient::new(
            provider,
            ModelBinding::Bound {
                model: "gemini-1.5-flash".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_successful_generation_is_trimmed() {
        let provider = FixedProvider::new(Ok(ProviderOutput::text("  The topic is Rust.\n")));
        let client = bound(provider.clone());

        let generation = client.generate("prompt", 0.2, 256).await;

        assert_eq!(generation, Generation::answered("The topic is Rust."));
        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, "gemini-1.5-flash");
        assert_eq!(requests[0].1, GenerationRequest::new("prompt", 0.2, 256));
    }

    #[tokio::test]
    async fn test_disabled_client_apologizes() {
        let client = GenerationClient::disabled(Unconfigured::MissingApiKey);
        assert!(!client.is_enabled());
        assert_eq!(client.model(), None);

        let generation = client.generate("prompt", 0.2, 256).await;
        assert_eq!(generation.failure, Some(FailureCategory::GenerationUnconfigured));
        assert_eq!(
            generation.text,
            "Sorry, the language model is not configured properly. Please check your API key."
        );
    }

    #[tokio::test]
    async fn test_provider_errors_become_categories() {
        let cases = vec![
            (ProviderError::QuotaExceeded("429".into()), FailureCategory::QuotaExceeded),
            (ProviderError::PermissionDenied("403".into()), FailureCategory::PermissionDenied),
            (ProviderError::Transient("503".into()), FailureCategory::ProviderError),
            (ProviderError::Malformed("eof".into()), FailureCategory::MalformedResponse),
        ];

        for (error, category) in cases {
            let client = bound(FixedProvider::new(Err(error)));
            let generation = client.generate("prompt", 0.2, 256).await;
            assert_eq!(generation.failure, Some(category));
            assert_eq!(generation.text, category.apology());
        }
    }

    #[tokio::test]
    async fn test_blocked_or_empty_output_is_empty_response() {
        let blocked = ProviderOutput {
            text: None,
            blocked: Some("SAFETY".to_string()),
        };
        for output in [blocked, ProviderOutput::text("   "), ProviderOutput::default()] {
            let client = bound(FixedProvider::new(Ok(output)));
            let generation = client.generate("prompt", 0.2, 256).await;
            assert_eq!(generation.failure, Some(FailureCategory::EmptyResponse));
        }
    }

    #[tokio::test]
    async fn test_unconfigured_binding_never_calls_provider() {
        let provider = FixedProvider::new(Ok(ProviderOutput::text("hi")));
        let client = GenerationClient::new(
            provider.clone(),
            ModelBinding::Unconfigured {
                reason: Unconfigured::NoCandidates,
            },
        );

        let generation = client.generate("prompt", 0.2, 256).await;
        assert_eq!(generation.failure, Some(FailureCategory::GenerationUnconfigured));
        assert!(provider.requests.lock().unwrap().is_empty());
    }
}
