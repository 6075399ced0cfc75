//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail on every question.

use crate::chunking::TextSplitter;
use crate::config::{Settings, TranscriptProvider};
use crate::error::{Result, SporError};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Answering from the terminal needs transcripts and embeddings right away.
    Ask,
    /// Serving needs valid settings and embeddings; transcript tools are checked per request.
    Serve,
}

/// Run pre-flight checks for the given operation.
///
/// A missing generation key is not an error here: answers degrade to an apology.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    TextSplitter::try_new(settings.chunking.chunk_size, settings.chunking.chunk_overlap)?;
    check_embedding_key(settings)?;

    match operation {
        Operation::Ask => {
            if settings.transcript.provider == TranscriptProvider::Youtube {
                check_tool("yt-dlp")?;
            }
        }
        Operation::Serve => {}
    }
    Ok(())
}

/// Check that the embedding provider has what it needs.
fn check_embedding_key(settings: &Settings) -> Result<()> {
    if settings.embedding.provider != "openai" {
        return Ok(());
    }

    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => Ok(()),
        _ => Err(SporError::Config(
            "OPENAI_API_KEY not set (needed for embeddings). Set it, or use embedding.provider = \"hashing\"".to_string(),
        )),
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(SporError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SporError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(SporError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
