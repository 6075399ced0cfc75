//! Conversation history formatting.

use serde::{Deserialize, Serialize};

/// Number of most recent turns included in a prompt.
pub const HISTORY_WINDOW: usize = 5;

/// Rendered in place of an empty history.
pub const NO_HISTORY: &str = "No previous conversation.";

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub sender: String,
    pub text: String,
}

impl ConversationTurn {
    pub fn new(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new("user", text)
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::new("bot", text)
    }
}

/// A history entry as sent by clients, where every field may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl From<HistoryEntry> for ConversationTurn {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            sender: entry
                .sender
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "User".to_string()),
            text: entry.text.unwrap_or_default(),
        }
    }
}

/// Render the newest [`HISTORY_WINDOW`] turns as `sender: text` lines, oldest first.
pub fn format_history(history: &[ConversationTurn]) -> String {
    if history.is_empty() {
        return NO_HISTORY.to_string();
    }

    let start = history.len().saturating_sub(HISTORY_WINDOW);
    history[start..]
        .iter()
        .map(|turn| format!("{}: {}", turn.sender, turn.text))
        .collect::<Vec<_>>()
        .join("\n")
}
