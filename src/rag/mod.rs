//! RAG (Retrieval-Augmented Generation) building blocks.
//!
//! Retrieval over a source's index, conversation formatting, prompt assembly and
//! the confidence heuristic. [`crate::orchestrator::Orchestrator`] wires them together.

mod confidence;
mod history;
mod prompt;
mod retriever;

pub use confidence::ConfidenceEstimator;
pub use history::{format_history, ConversationTurn, HistoryEntry, HISTORY_WINDOW, NO_HISTORY};
pub use prompt::{assemble_prompt, format_context};
pub use retriever::{Retriever, DEFAULT_TOP_K};
