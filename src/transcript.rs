//! Append-only conversation transcript
//!
//! Turns are immutable once appended; no in-place edits, no reordering.
//! Clearing happens only through a session-level reset.

use crate::models::ConversationTurn;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Ordered log of conversation turns with provenance metadata
#[derive(Clone)]
pub struct TranscriptStore {
    turns: Arc<RwLock<Vec<ConversationTurn>>>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self {
            turns: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Append a turn; returns its position in the transcript
    pub async fn append(&self, turn: ConversationTurn) -> usize {
        let mut turns = self.turns.write().await;
        turns.push(turn);
        turns.len() - 1
    }

    /// Snapshot of the full transcript in append order
    pub async fn turns(&self) -> Vec<ConversationTurn> {
        self.turns.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.turns.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.turns.read().await.is_empty()
    }

    /// Drop the whole transcript. Reserved for session reset.
    pub async fn clear(&self) {
        self.turns.write().await.clear();
    }
}

impl Default for TranscriptStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Speaker;

    #[test]
    fn test_append_preserves_order() {
        tokio_test::block_on(async {
            let store = TranscriptStore::new();
            store.append(ConversationTurn::user("first")).await;
            store
                .append(ConversationTurn::assistant("second", None))
                .await;
            store.append(ConversationTurn::user("third")).await;

            let turns = store.turns().await;
            assert_eq!(turns.len(), 3);
            assert_eq!(turns[0].text, "first");
            assert_eq!(turns[0].speaker, Speaker::User);
            assert_eq!(turns[1].speaker, Speaker::Assistant);
            assert_eq!(turns[2].text, "third");
        });
    }

    #[test]
    fn test_count_is_monotonic_across_appends() {
        tokio_test::block_on(async {
            let store = TranscriptStore::new();
            let mut previous = store.len().await;
            for i in 0..5 {
                store
                    .append(ConversationTurn::user(format!("message {}", i)))
                    .await;
                let current = store.len().await;
                assert!(current > previous);
                previous = current;
            }
        });
    }
}
