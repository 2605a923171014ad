//! Short-term conversation history.
//!
//! A bounded FIFO of user/agent exchanges. Whole exchanges are evicted from
//! the front so the history always starts with a user turn.

use crate::protocol::{ChatMessage, Role};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Agent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTurn {
    pub speaker: Speaker,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct History {
    turns: VecDeque<HistoryTurn>,
    max_exchanges: usize,
}

impl History {
    #[must_use]
    pub fn new(max_exchanges: usize) -> Self {
        let max_exchanges = max_exchanges.max(1);
        Self {
            turns: VecDeque::with_capacity(max_exchanges * 2),
            max_exchanges,
        }
    }

    /// Append one exchange, evicting the oldest exchange when full.
    pub fn push_exchange(&mut self, user: &str, agent: &str) {
        while self.turns.len() >= self.max_exchanges * 2 {
            self.turns.pop_front();
            self.turns.pop_front();
        }
        self.turns.push_back(HistoryTurn {
            speaker: Speaker::User,
            text: user.to_owned(),
        });
        self.turns.push_back(HistoryTurn {
            speaker: Speaker::Agent,
            text: agent.to_owned(),
        });
    }

    /// Number of turns (two per exchange).
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryTurn> {
        self.turns.iter()
    }

    /// `{role, content}` messages for a Core request, oldest first.
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        self.turns
            .iter()
            .map(|turn| ChatMessage {
                role: match turn.speaker {
                    Speaker::User => Role::User,
                    Speaker::Agent => Role::Assistant,
                },
                content: turn.text.clone(),
            })
            .collect()
    }
}
