//! Spor - Ask questions about a video
//!
//! Answers natural-language questions about a video using only its transcript as
//! grounding context, with a short rolling conversation history.
//!
//! The name "Spor" is the Norwegian word for "track" or "trace."
//!
//! # Overview
//!
//! For each question Spor:
//! - Fetches the video's transcript (once per process) and splits it into overlapping chunks
//! - Embeds the chunks into an in-memory vector index, cached per video
//! - Retrieves the chunks most similar to the question
//! - Asks a language model to answer from those chunks and the recent conversation
//! - Scores the answer with a simple retrieval-based confidence heuristic
//!
//! Failures never escape as errors: they come back as an apology answer tagged with
//! a [`error::FailureCategory`].
//!
//! # Architecture
//!
//! - `config` - Configuration management and prompt templates
//! - `transcript` - Transcript sources (YouTube captions, text files)
//! - `chunking` - Recursive character splitting
//! - `embedding` - Embedding generation
//! - `vector_store` - In-memory vector index, builder and per-source cache
//! - `rag` - Retrieval, conversation formatting, prompt assembly, confidence
//! - `generation` - Model binding and answer generation (Gemini, OpenAI)
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use spor::config::Settings;
//! use spor::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::connect(settings).await?;
//!
//!     let answer = orchestrator
//!         .answer_question("dQw4w9WgXcQ", "What is this video about?", &[])
//!         .await;
//!     println!("{} (confidence {:.2})", answer.answer, answer.confidence);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod transcript;
pub mod vector_store;

pub use error::{Result, SporError};
