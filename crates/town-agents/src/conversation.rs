//! Bounded conversation logs.
//!
//! Used both for the town-wide log and for each agent's private history.
//! Once full, the oldest utterance is evicted.

use std::collections::VecDeque;

use town_types::Conversation;

/// A first-in, first-out log of conversations with a fixed capacity.
#[derive(Debug, Clone)]
pub struct ConversationLog {
    capacity: usize,
    entries: VecDeque<Conversation>,
}

impl ConversationLog {
    /// Create an empty log holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity.min(64)),
        }
    }

    /// Append an utterance, evicting the oldest ones past capacity.
    pub fn push(&mut self, conversation: Conversation) {
        self.entries.push_back(conversation);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// The last `n` utterances, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Conversation> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    /// Number of utterances retained.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been said yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use town_types::{AgentId, Position};

    use super::*;

    fn line(message: &str) -> Conversation {
        Conversation {
            speaker: String::from("Alice"),
            speaker_id: AgentId::new(),
            listener: String::from("Bob"),
            listener_id: AgentId::new(),
            message: message.to_owned(),
            timestamp: Utc::now(),
            location: Position::new(0, 0),
        }
    }

    #[test]
    fn evicts_oldest_past_capacity() {
        let mut log = ConversationLog::new(3);
        for i in 0..5 {
            log.push(line(&format!("line {i}")));
        }
        assert_eq!(log.len(), 3);
        let messages: Vec<String> = log.recent(10).into_iter().map(|c| c.message).collect();
        assert_eq!(messages, vec!["line 2", "line 3", "line 4"]);
    }

    #[test]
    fn recent_returns_tail_in_order() {
        let mut log = ConversationLog::new(10);
        assert!(log.recent(2).is_empty());
        for i in 0..4 {
            log.push(line(&format!("line {i}")));
        }
        let messages: Vec<String> = log.recent(2).into_iter().map(|c| c.message).collect();
        assert_eq!(messages, vec!["line 2", "line 3"]);
    }
}
