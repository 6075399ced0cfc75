//! Interactive chat command.

use super::ask::resolve_source_id;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::rag::{ConversationTurn, HISTORY_WINDOW};
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use tracing::debug;

/// Run the interactive chat command.
pub async fn run_chat(video: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'spor doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let source_id = resolve_source_id(video);
    let orchestrator = Orchestrator::connect(settings).await?;
    let mut session = ChatSession::default();

    println!("\n{}", style("Spor Chat").bold().cyan());
    println!("{}", style(format!("Video: {}", source_id)).dim());
    println!(
        "{}\n",
        style("Type your questions, or 'exit' to quit. Use 'clear' to reset conversation.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            session.clear();
            Output::info("Conversation history cleared.");
            continue;
        }

        let spinner = Output::spinner("Thinking...");
        let answer = orchestrator
            .answer_question(&source_id, input, session.history())
            .await;
        spinner.finish_and_clear();

        Output::answer("Spor:", &answer);
        session.record(input, &answer.answer);
    }

    Ok(())
}

/// Rolling conversation history for one chat.
#[derive(Debug, Default)]
struct ChatSession {
    turns: Vec<ConversationTurn>,
}

impl ChatSession {
    fn history(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Record a question and its answer, keeping only what the prompt can use.
    fn record(&mut self, question: &str, answer: &str) {
        self.turns.push(ConversationTurn::user(question));
        self.turns.push(ConversationTurn::bot(answer));

        let excess = self.turns.len().saturating_sub(HISTORY_WINDOW);
        if excess > 0 {
            self.turns.drain(..excess);
        }
        debug!("Chat history holds {} turns", self.turns.len());
    }

    fn clear(&mut self) {
        self.turns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_keeps_recent_turns() {
        let mut session = ChatSession::default();
        for i in 0..4 {
            session.record(&format!("q{}", i), &format!("a{}", i));
        }

        let history = session.history();
        assert_eq!(history.len(), HISTORY_WINDOW);
        assert_eq!(history.last().unwrap().text, "a3");
        assert_eq!(history[0].text, "a1");

        session.clear();
        assert!(session.history().is_empty());
    }
}
