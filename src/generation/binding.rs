//! Startup model selection.

use super::{GenerationProvider, GenerationRequest, ProviderError};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

/// Prompt sent to each candidate model to check it is usable.
pub const SMOKE_TEST_PROMPT: &str = "Say 'ok'.";

/// Why no model could be bound.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Unconfigured {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("API key rejected: {0}")]
    InvalidApiKey(String),

    #[error("no candidate models configured")]
    NoCandidates,

    #[error("none of the candidate models responded: {}", .0.join(", "))]
    Exhausted(Vec<String>),
}

/// Outcome of model selection.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelBinding {
    /// All requests go to this model for the life of the process.
    Bound { model: String },
    /// Generation is disabled.
    Unconfigured { reason: Unconfigured },
}

impl ModelBinding {
    pub fn model(&self) -> Option<&str> {
        match self {
            ModelBinding::Bound { model } => Some(model),
            ModelBinding::Unconfigured { .. } => None,
        }
    }
}

/// Smoke-test candidates in order and bind the first that answers.
///
/// An authentication failure stops the search, since every other candidate would
/// fail the same way. A missing model moves on quietly; any other failure moves on
/// with a warning.
#[instrument(skip(provider, candidates), fields(provider_name = provider.name()))]
pub async fn bind_model(provider: &dyn GenerationProvider, candidates: &[String]) -> ModelBinding {
    if candidates.is_empty() {
        warn!("No candidate generation models configured");
        return ModelBinding::Unconfigured {
            reason: Unconfigured::NoCandidates,
        };
    }

    let smoke_test = GenerationRequest::new(SMOKE_TEST_PROMPT, 0.0, 8);
    let mut tried = Vec::with_capacity(candidates.len());

    for model in candidates {
        info!("Trying generation model {}", model);

        match provider.generate(model, &smoke_test).await {
            Ok(_) => {
                info!("Bound generation model {}", model);
                return ModelBinding::Bound {
                    model: model.clone(),
                };
            }
            Err(ProviderError::Authentication(message)) => {
                error!("API key rejected while trying {}: {}", model, message);
                return ModelBinding::Unconfigured {
                    reason: Unconfigured::InvalidApiKey(message),
                };
            }
            Err(ProviderError::ModelNotFound(message)) => {
                info!("Model {} is not available: {}", model, message);
            }
            Err(e) => {
                warn!("Model {} failed its smoke test, trying next: {}", model, e);
            }
        }

        tried.push(model.clone());
    }

    warn!("No generation model could be bound; answers will be apologies");
    ModelBinding::Unconfigured {
        reason: Unconfigured::Exhausted(tried),
    }
}
