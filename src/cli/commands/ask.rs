//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::transcript::parse_video_id;
use anyhow::Result;

/// Resolve a CLI video argument to the source ID used for caching.
///
/// The file provider takes IDs as given; YouTube URLs are reduced to their video ID.
pub(crate) fn resolve_source_id(video: &str) -> String {
    parse_video_id(video).unwrap_or_else(|| video.trim().to_string())
}

/// Run the ask command.
pub async fn run_ask(video: &str, question: &str, show_sources: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'spor doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let source_id = resolve_source_id(video);
    let orchestrator = Orchestrator::connect(settings).await?;

    let spinner = Output::spinner("Reading transcript and thinking...");
    let answer = orchestrator.answer_question(&source_id, question, &[]).await;
    spinner.finish_and_clear();

    Output::answer("Answer:", &answer);

    if show_sources && !answer.sources.is_empty() {
        Output::header("Sources");
        for (rank, chunk) in answer.sources.iter().enumerate() {
            Output::source(rank + 1, chunk);
        }
        println!();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_source_id() {
        assert_eq!(
            resolve_source_id("https://youtu.be/dQw4w9WgXcQ"),
            "dQw4w9WgXcQ"
        );
        assert_eq!(resolve_source_id(" lecture-01 "), "lecture-01");
    }
}
