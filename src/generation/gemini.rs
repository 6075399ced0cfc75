//! Google Gemini provider (generateContent REST API).

use super::{GenerationProvider, GenerationRequest, ProviderError, ProviderOutput};
use crate::error::{Result, SporError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Gemini generation provider.
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl GeminiProvider {
    /// Create a provider against the public endpoint.
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_options(api_key, None, Duration::from_secs(120))
    }

    /// Create a provider with a custom endpoint and request timeout.
    pub fn with_options(api_key: String, endpoint: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SporError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            endpoint: endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    fn url(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.endpoint, model)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
    status: Option<String>,
}

/// Finish reasons that mean the candidate's content was withheld.
const BLOCKING_FINISH_REASONS: [&str; 5] =
    ["SAFETY", "RECITATION", "BLOCKLIST", "PROHIBITED_CONTENT", "SPII"];

/// Map an HTTP error status and body to a provider error.
fn classify_error(status: StatusCode, body: &str) -> ProviderError {
    let (message, api_status) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.message, envelope.error.status.unwrap_or_default()),
        Err(_) => (body.trim().to_string(), String::new()),
    };
    let detail = if api_status.is_empty() {
        format!("{}: {}", status, message)
    } else {
        format!("{} {}: {}", status, api_status, message)
    };

    let lowered = message.to_lowercase();
    let names_key = body.contains("API_KEY_INVALID") || lowered.contains("api key");

    match status.as_u16() {
        401 => ProviderError::Authentication(detail),
        400 | 403 if names_key => ProviderError::Authentication(detail),
        403 => ProviderError::PermissionDenied(detail),
        404 => ProviderError::ModelNotFound(detail),
        429 => ProviderError::QuotaExceeded(detail),
        500..=599 => ProviderError::Transient(detail),
        _ if lowered.contains("not found") || lowered.contains("not supported") => {
            ProviderError::ModelNotFound(detail)
        }
        _ => ProviderError::Other(detail),
    }
}

/// Extract text (or the block reason) from a successful response body.
fn parse_output(body: &str) -> std::result::Result<ProviderOutput, ProviderError> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Malformed(format!("could not decode response: {}", e)))?;

    let blocked_prompt = response.prompt_feedback.and_then(|f| f.block_reason);

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Ok(ProviderOutput {
            text: None,
            blocked: blocked_prompt,
        });
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    let blocked = blocked_prompt.or_else(|| {
        candidate
            .finish_reason
            .filter(|reason| BLOCKING_FINISH_REASONS.contains(&reason.as_str()))
    });

    Ok(ProviderOutput {
        text: if text.is_empty() { None } else { Some(text) },
        blocked,
    })
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    #[instrument(skip(self, request), fields(model = %model))]
    async fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> std::result::Result<ProviderOutput, ProviderError> {
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart {
                    text: &request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        };

        let response = self
            .client
            .post(self.url(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transient(format!("request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Transient(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(classify_error(status, &text));
        }

        debug!("Gemini responded with {} bytes", text.len());
        parse_output(&text)
    }
}
