//! UI-agnostic conversation state
//!
//! The transcript kept here is what gets replayed to the generative-language
//! endpoint on every request, so insertion order is chronological order.

use serde::{Deserialize, Serialize};

/// One message in the conversation transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

/// Who authored a turn, serialized the way the endpoint expects it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        }
    }
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// Ordered log of completed turns.
///
/// Only grows until [`ConversationHistory::clear`]; the one exception is
/// [`ConversationHistory::pop_trailing_user`], used by the rollback history
/// policy to undo an optimistic append.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    turns: Vec<ChatTurn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Remove the last turn if it is a user turn with exactly `text`.
    pub fn pop_trailing_user(&mut self, text: &str) -> Option<ChatTurn> {
        match self.turns.last() {
            Some(turn) if turn.role == ChatRole::User && turn.text == text => self.turns.pop(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_serialize_lowercase() {
        let json = serde_json::to_string(&ChatTurn::model("hi")).unwrap();
        assert_eq!(json, r#"{"role":"model","text":"hi"}"#);
    }

    #[test]
    fn test_history_keeps_insertion_order() {
        let mut history = ConversationHistory::new();
        history.push(ChatTurn::user("one"));
        history.push(ChatTurn::model("two"));
        history.push(ChatTurn::user("three"));

        let texts: Vec<&str> = history.turns().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        assert_eq!(history.last(), Some(&ChatTurn::user("three")));
    }

    #[test]
    fn test_pop_trailing_user_only_matches_last_user_turn() {
        let mut history = ConversationHistory::new();
        history.push(ChatTurn::user("hello"));
        history.push(ChatTurn::model("hi"));

        assert!(history.pop_trailing_user("hello").is_none());
        assert_eq!(history.len(), 2);

        history.push(ChatTurn::user("again"));
        assert!(history.pop_trailing_user("other").is_none());
        assert_eq!(history.pop_trailing_user("again"), Some(ChatTurn::user("again")));
        assert_eq!(history.len(), 2);
    }
}
