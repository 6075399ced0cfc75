//! OpenAI chat-completions provider.

use super::{GenerationProvider, GenerationRequest, ProviderError, ProviderOutput};
use crate::error::Result;
use crate::openai::create_client_with_key;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, FinishReason,
};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// OpenAI generation provider.
pub struct OpenAIProvider {
    client: Client<OpenAIConfig>,
}

impl OpenAIProvider {
    /// Create a provider against the public API.
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_options(api_key, None, Duration::from_secs(120))
    }

    /// Create a provider with a custom base URL and request timeout.
    pub fn with_options(api_key: &str, endpoint: Option<&str>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client_with_key(api_key, endpoint, timeout)?,
        })
    }
}

/// Map an API error's code, type and message to a provider error.
fn classify_api_error(code: Option<&str>, kind: Option<&str>, message: &str) -> ProviderError {
    let detail = message.to_string();
    let code = code.unwrap_or_default();
    let kind = kind.unwrap_or_default();

    if code == "invalid_api_key" || message.contains("Incorrect API key") {
        ProviderError::Authentication(detail)
    } else if code == "model_not_found" || message.contains("does not exist") {
        ProviderError::ModelNotFound(detail)
    } else if code == "insufficient_quota"
        || code == "rate_limit_exceeded"
        || kind == "insufficient_quota"
    {
        ProviderError::QuotaExceeded(detail)
    } else if kind == "permission_error" || code == "unsupported_country_region_territory" {
        ProviderError::PermissionDenied(detail)
    } else if kind == "server_error" {
        ProviderError::Transient(detail)
    } else {
        ProviderError::Other(detail)
    }
}

fn classify(err: OpenAIError) -> ProviderError {
    match err {
        OpenAIError::ApiError(api) => {
            classify_api_error(api.code.as_deref(), api.r#type.as_deref(), &api.message)
        }
        OpenAIError::Reqwest(e) => ProviderError::Transient(e.to_string()),
        OpenAIError::JSONDeserialize(e) => ProviderError::Malformed(e.to_string()),
        other => ProviderError::Other(other.to_string()),
    }
}

#[async_trait]
impl GenerationProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %model))]
    async fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> std::result::Result<ProviderOutput, ProviderError> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(request.prompt.as_str())
            .build()
            .map_err(|e| ProviderError::Other(e.to_string()))?;

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(vec![message.into()])
            .temperature(request.temperature)
            .max_tokens(request.max_tokens)
            .build()
            .map_err(|e| ProviderError::Other(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(classify)?;

        let Some(choice) = response.choices.into_iter().next() else {
            debug!("OpenAI returned no choices");
            return Ok(ProviderOutput::default());
        };

        let blocked = match choice.finish_reason {
            Some(FinishReason::ContentFilter) => Some("content_filter".to_string()),
            _ => None,
        };

        Ok(ProviderOutput {
            text: choice.message.content.filter(|t| !t.is_empty()),
            blocked,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_authentication() {
        let err = classify_api_error(
            Some("invalid_api_key"),
            Some("invalid_request_error"),
            "Incorrect API key provided: sk-xxx.",
        );
        assert!(matches!(err, ProviderError::Authentication(_)));
    }

    #[test]
    fn test_classify_missing_model() {
        let err = classify_api_error(
            Some("model_not_found"),
            Some("invalid_request_error"),
            "The model `gpt-9` does not exist or you do not have access to it.",
        );
        assert!(matches!(err, ProviderError::ModelNotFound(_)));
    }

    #[test]
    fn test_classify_quota_and_other() {
        assert!(matches!(
            classify_api_error(Some("insufficient_quota"), None, "You exceeded your current quota"),
            ProviderError::QuotaExceeded(_)
        ));
        assert!(matches!(
            classify_api_error(Some("rate_limit_exceeded"), None, "Rate limit reached"),
            ProviderError::QuotaExceeded(_)
        ));
        assert!(matches!(
            classify_api_error(None, Some("server_error"), "The server had an error"),
            ProviderError::Transient(_)
        ));
        assert!(matches!(
            classify_api_error(None, None, "something odd"),
            ProviderError::Other(_)
        ));
    }

    #[test]
    fn test_construct_with_custom_base() {
        let provider =
            OpenAIProvider::with_options("sk-test", Some("http://localhost:1234/v1"), Duration::from_secs(5))
                .unwrap();
        assert_eq!(provider.name(), "openai");
    }
}
