//! Question answering pipeline for Spor.
//!
//! Coordinates everything from transcript fetch to the final answer: resolve (or build)
//! the source's index, retrieve context, format the conversation, assemble the prompt,
//! generate, and score confidence.

use crate::chunking::TextSplitter;
use crate::config::{Prompts, Settings};
use crate::embedding::{create_embedder, Embedder};
use crate::error::{FailureCategory, Result, SporError};
use crate::generation::{connect_generation, GenerationClient};
use crate::rag::{
    assemble_prompt, format_context, format_history, ConfidenceEstimator, ConversationTurn,
    Retriever,
};
use crate::transcript::{create_transcript_source, TranscriptSource};
use crate::vector_store::{IndexBuilder, IndexCache, ScoredChunk};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Answer to a single question.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// Answer text, or an apology when something went wrong.
    pub answer: String,
    /// Heuristic confidence in [0, 1]. Exactly 0.0 when the pipeline failed before generation.
    pub confidence: f64,
    /// Set when `answer` is an apology.
    pub failure: Option<FailureCategory>,
    /// Chunks the answer was grounded on, most similar first.
    pub sources: Vec<ScoredChunk>,
}

impl Answer {
    fn failed(err: &SporError) -> Self {
        let category = if err.is_source_unavailable() {
            FailureCategory::SourceUnavailable
        } else {
            FailureCategory::IndexBuild
        };

        Self {
            answer: category.describe(err),
            confidence: 0.0,
            failure: Some(category),
            sources: Vec::new(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// The main orchestrator for the Spor pipeline.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    transcripts: Arc<dyn TranscriptSource>,
    builder: IndexBuilder,
    retriever: Retriever,
    cache: IndexCache,
    generator: GenerationClient,
    confidence: ConfidenceEstimator,
}

impl Orchestrator {
    /// Create an orchestrator from settings.
    ///
    /// Only configuration problems are errors. An unusable generation setup leaves the
    /// orchestrator answering with apologies.
    pub async fn connect(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;
        let transcripts = create_transcript_source(&settings)?;
        let embedder = create_embedder(&settings.embedding)?;
        let generator = connect_generation(&settings.generation).await?;

        match generator.model() {
            Some(model) => info!("Answering with {} via {}", model, settings.generation.provider),
            None => warn!("Generation is not configured: {:?}", generator.binding()),
        }

        Self::with_components(settings, prompts, transcripts, embedder, generator)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        transcripts: Arc<dyn TranscriptSource>,
        embedder: Arc<dyn Embedder>,
        generator: GenerationClient,
    ) -> Result<Self> {
        let splitter =
            TextSplitter::try_new(settings.chunking.chunk_size, settings.chunking.chunk_overlap)?;
        let builder = IndexBuilder::new(embedder.clone(), splitter);
        let retriever = Retriever::new(embedder).with_top_k(settings.retrieval.top_k);
        let confidence = ConfidenceEstimator::from_settings(&settings.confidence);

        Ok(Self {
            settings,
            prompts,
            transcripts,
            builder,
            retriever,
            cache: IndexCache::new(),
            generator,
            confidence,
        })
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get the index cache.
    pub fn cache(&self) -> &IndexCache {
        &self.cache
    }

    /// Get the generation client.
    pub fn generator(&self) -> &GenerationClient {
        &self.generator
    }

    /// Answer a question about a source, grounded in its transcript.
    ///
    /// Never fails: errors become an apology answer.
    #[instrument(skip(self, question, history), fields(source_id = %source_id, turns = history.len()))]
    pub async fn answer_question(
        &self,
        source_id: &str,
        question: &str,
        history: &[ConversationTurn],
    ) -> Answer {
        let retrieved = match self.retrieve(source_id, question).await {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!("Could not prepare context for {}: {}", source_id, e);
                return Answer::failed(&e);
            }
        };

        let context = format_context(&retrieved);
        let conversation = format_history(history);
        let prompt = assemble_prompt(&self.prompts.rag.template, &context, &conversation, question);

        let generation = self
            .generator
            .generate(
                &prompt,
                self.settings.generation.temperature,
                self.settings.generation.max_tokens,
            )
            .await;

        let confidence = self
            .confidence
            .estimate(retrieved.len(), self.retriever.top_k());

        Answer {
            answer: generation.text,
            confidence,
            failure: generation.failure,
            sources: retrieved,
        }
    }

    /// Resolve the source's index and retrieve context for `question`.
    async fn retrieve(&self, source_id: &str, question: &str) -> Result<Vec<ScoredChunk>> {
        let transcripts = &self.transcripts;
        let builder = &self.builder;

        let index = self
            .cache
            .get_or_build(
                source_id,
                |id| async move {
                    transcripts.fetch(&id).await.map_err(|e| {
                        if e.is_source_unavailable() {
                            e
                        } else {
                            SporError::SourceUnavailable {
                                source_id: id.clone(),
                                reason: e.to_string(),
                            }
                        }
                    })
                },
                |id, text| async move { builder.build(&id, &text).await },
            )
            .await?;

        self.retriever.retrieve(index.as_ref(), question).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;
    use crate::generation::{
        GenerationProvider, GenerationRequest, ModelBinding, ProviderError, ProviderOutput,
        Unconfigured,
    };
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeTranscripts {
        transcripts: HashMap<String, String>,
        fetches: AtomicUsize,
    }

    impl FakeTranscripts {
        fn new(entries: &[(&str, &str)]) -> Self {
            Self {
                transcripts: entries
                    .iter()
                    .map(|(id, text)| (id.to_string(), text.to_string()))
                    .collect(),
                fetches: AtomicUsize::new(0),
            }
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TranscriptSource for FakeTranscripts {
        async fn fetch(&self, source_id: &str) -> Result<String> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.transcripts
                .get(source_id)
                .cloned()
                .ok_or_else(|| SporError::TranscriptsDisabled(source_id.to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingProvider {
        prompts: Mutex<Vec<String>>,
        fail_with: Option<ProviderError>,
    }

    #[async_trait]
    impl GenerationProvider for RecordingProvider {
        fn name(&self) -> &str {
            "recording"
        }

        async fn generate(
            &self,
            _model: &str,
            request: &GenerationRequest,
        ) -> std::result::Result<ProviderOutput, ProviderError> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            match &self.fail_with {
                Some(err) => Err(err.clone()),
                None => Ok(ProviderOutput::text("  The video explains ownership.  ")),
            }
        }
    }

    fn paragraph(topic: &str) -> String {
        format!("This part of the talk covers {} in some detail for the audience.", topic)
    }

    /// Three paragraphs of roughly 70 characters each, which split into three chunks.
    fn three_part_transcript() -> String {
        [paragraph("ownership"), paragraph("borrowing"), paragraph("lifetimes")].join("\n\n")
    }

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.chunking.chunk_size = 100;
        settings.chunking.chunk_overlap = 0;
        settings.retrieval.top_k = 4;
        settings
    }

    fn orchestrator(
        transcripts: Arc<FakeTranscripts>,
        generator: GenerationClient,
    ) -> Orchestrator {
        Orchestrator::with_components(
            settings(),
            Prompts::default(),
            transcripts,
            Arc::new(HashingEmbedder::new(64)),
            generator,
        )
        .unwrap()
    }

    fn bound(provider: Arc<RecordingProvider>) -> GenerationClient {
        GenerationClient::new(
            provider,
            ModelBinding::Bound {
                model: "test-model".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_answers_with_retrieval_confidence() {
        let transcript = three_part_transcript();
        let transcripts = Arc::new(FakeTranscripts::new(&[("abc123", &transcript)]));
        let provider = Arc::new(RecordingProvider::default());
        let orchestrator = orchestrator(transcripts, bound(provider.clone()));

        let answer = orchestrator
            .answer_question("abc123", "What is ownership?", &[])
            .await;

        assert_eq!(answer.answer, "The video explains ownership.");
        assert_eq!(answer.failure, None);
        assert_eq!(answer.sources.len(), 3);
        assert_eq!(answer.confidence, 0.9);

        let prompts = provider.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("What is ownership?"));
        assert!(prompts[0].contains("No previous conversation."));
        assert!(prompts[0].contains(&paragraph("borrowing")));
    }

    #[tokio::test]
    async fn test_second_question_hits_cache() {
        let transcript = three_part_transcript();
        let transcripts = Arc::new(FakeTranscripts::new(&[("abc123", &transcript)]));
        let provider = Arc::new(RecordingProvider::default());
        let orchestrator = orchestrator(transcripts.clone(), bound(provider));

        orchestrator.answer_question("abc123", "first?", &[]).await;
        let history = vec![
            ConversationTurn::user("first?"),
            ConversationTurn::bot("The video explains ownership."),
        ];
        orchestrator.answer_question("abc123", "second?", &history).await;

        assert_eq!(transcripts.fetches(), 1);
        assert!(orchestrator.cache().contains("abc123"));
        assert_eq!(orchestrator.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_questions_fetch_once() {
        let transcript = three_part_transcript();
        let transcripts = Arc::new(FakeTranscripts::new(&[("abc123", &transcript)]));
        let provider = Arc::new(RecordingProvider::default());
        let orchestrator = orchestrator(transcripts.clone(), bound(provider.clone()));

        let questions = (0..6).map(|i| {
            let orchestrator = &orchestrator;
            async move {
                orchestrator
                    .answer_question("abc123", &format!("question {}", i), &[])
                    .await
            }
        });
        let answers = futures::future::join_all(questions).await;

        assert!(answers.iter().all(|a| !a.is_failure()));
        assert_eq!(transcripts.fetches(), 1);
        assert_eq!(provider.prompts.lock().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_disabled_transcript_yields_zero_confidence() {
        let transcripts = Arc::new(FakeTranscripts::new(&[]));
        let provider = Arc::new(RecordingProvider::default());
        let orchestrator = orchestrator(transcripts, bound(provider.clone()));

        let answer = orchestrator
            .answer_question("disabled1", "Anything?", &[])
            .await;

        assert!(answer.answer.starts_with("Sorry, I encountered an error:"));
        assert!(answer
            .answer
            .starts_with(FailureCategory::SourceUnavailable.apology()));
        assert!(answer.answer.contains("disabled1"));
        assert_eq!(answer.confidence, 0.0);
        assert_eq!(answer.failure, Some(FailureCategory::SourceUnavailable));
        assert!(!orchestrator.cache().contains("disabled1"));
        assert!(provider.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_generation_keeps_confidence() {
        let transcript = three_part_transcript();
        let transcripts = Arc::new(FakeTranscripts::new(&[("abc123", &transcript)]));
        let orchestrator = orchestrator(
            transcripts,
            GenerationClient::disabled(Unconfigured::MissingApiKey),
        );

        let answer = orchestrator.answer_question("abc123", "Why?", &[]).await;

        assert_eq!(
            answer.answer,
            "Sorry, the language model is not configured properly. Please check your API key."
        );
        assert_eq!(answer.failure, Some(FailureCategory::GenerationUnconfigured));
        assert!(answer.confidence > 0.0);
    }

    #[tokio::test]
    async fn test_quota_failure_is_categorized() {
        let transcript = three_part_transcript();
        let transcripts = Arc::new(FakeTranscripts::new(&[("abc123", &transcript)]));
        let provider = Arc::new(RecordingProvider {
            fail_with: Some(ProviderError::QuotaExceeded("429".to_string())),
            ..Default::default()
        });
        let orchestrator = orchestrator(transcripts, bound(provider));

        let answer = orchestrator.answer_question("abc123", "Why?", &[]).await;

        assert_eq!(answer.failure, Some(FailureCategory::QuotaExceeded));
        assert_eq!(answer.answer, FailureCategory::QuotaExceeded.apology());
        assert_eq!(answer.confidence, 0.9);
    }

    #[tokio::test]
    async fn test_blank_transcript_answers_from_no_context() {
        let transcripts = Arc::new(FakeTranscripts::new(&[("quiet", "   ")]));
        let provider = Arc::new(RecordingProvider::default());
        let orchestrator = orchestrator(transcripts, bound(provider));

        let answer = orchestrator.answer_question("quiet", "Hello?", &[]).await;

        assert!(answer.sources.is_empty());
        assert_eq!(answer.failure, None);
        assert_eq!(answer.confidence, 0.6);
        assert!(orchestrator.cache().contains("quiet"));
    }
}
