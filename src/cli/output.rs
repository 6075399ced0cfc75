//! CLI output formatting utilities.

use crate::orchestrator::Answer;
use crate::vector_store::ScoredChunk;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print an answer with its confidence.
    pub fn answer(label: &str, answer: &Answer) {
        println!("\n{} {}", style(label).cyan().bold(), answer.answer);

        let confidence = format!("confidence {:.2}", answer.confidence);
        match answer.failure {
            Some(category) => println!(
                "{}\n",
                style(format!("   ({}, {})", confidence, category)).yellow().dim()
            ),
            None => println!("{}\n", style(format!("   ({})", confidence)).dim()),
        }
    }

    /// Print a retrieved transcript chunk.
    pub fn source(rank: usize, chunk: &ScoredChunk) {
        println!(
            "\n{} #{} (score: {:.2}, bytes {}..{})",
            style(">>").green(),
            rank,
            chunk.score,
            chunk.chunk.start,
            chunk.chunk.end
        );
        println!("   {}", content_preview(&chunk.chunk.text, 200));
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(template);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Truncate content to `max_chars` characters with an ellipsis.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let cut: String = content.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
