//! UI-agnostic conversation state
//!
//! The message log shared by every front end (TUI, one-shot CLI). Turns are
//! append-only: nothing here lets a caller edit or remove a turn once it has
//! been written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who wrote a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Author {
    User,
    Assistant,
}

/// One message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub id: Uuid,
    pub text: String,
    pub author: Author,
    pub created_at: DateTime<Utc>,
}

impl ChatTurn {
    pub fn new(author: Author, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            author,
            created_at: Utc::now(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.author == Author::User
    }
}

/// Ordered, append-only log of chat turns
#[derive(Debug, Default, Clone)]
pub struct MessageStore {
    turns: Vec<ChatTurn>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a turn to the end of the log.
    ///
    /// The timestamp is clamped so the log never goes backwards in time, even
    /// if the wall clock does.
    pub fn append(&mut self, mut turn: ChatTurn) {
        if let Some(last) = self.turns.last() {
            if turn.created_at < last.created_at {
                turn.created_at = last.created_at;
            }
        }
        self.turns.push(turn);
    }

    /// Build a turn stamped with the current time and append it
    pub fn push(&mut self, author: Author, text: impl Into<String>) -> &ChatTurn {
        self.append(ChatTurn::new(author, text));
        // just pushed, so the log is non-empty
        &self.turns[self.turns.len() - 1]
    }

    pub fn all(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_append_keeps_insertion_order() {
        let mut store = MessageStore::new();
        store.push(Author::User, "first");
        store.push(Author::Assistant, "second");
        store.push(Author::User, "third");

        let texts: Vec<&str> = store.all().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_turn_ids_are_unique() {
        let mut store = MessageStore::new();
        let a = store.push(Author::User, "a").id;
        let b = store.push(Author::User, "a").id;
        assert_ne!(a, b);
    }

    #[test]
    fn test_timestamps_never_go_backwards() {
        let mut store = MessageStore::new();
        store.push(Author::User, "now");

        let mut stale = ChatTurn::new(Author::Assistant, "from the past");
        stale.created_at = Utc::now() - Duration::hours(1);
        store.append(stale);

        let turns = store.all();
        assert!(turns[1].created_at >= turns[0].created_at);
    }

    #[test]
    fn test_empty_store() {
        let store = MessageStore::new();
        assert!(store.is_empty());
        assert!(store.last().is_none());
        assert!(store.all().is_empty());
    }
}
