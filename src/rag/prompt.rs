//! Prompt assembly.

use crate::config::Prompts;
use crate::vector_store::ScoredChunk;
use std::collections::HashMap;

/// Join retrieved chunk texts in rank order, separated by blank lines.
pub fn format_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Fill the answer template with context, conversation and question.
pub fn assemble_prompt(template: &str, context: &str, conversation: &str, question: &str) -> String {
    let mut vars = HashMap::new();
    vars.insert("context", context);
    vars.insert("conversation_history", conversation);
    vars.insert("question", question);
    Prompts::render(template, &vars)
}
