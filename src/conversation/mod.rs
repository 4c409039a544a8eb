//! Conversation types and the bounded conversation store
//!
//! The store owns the ordered log sent on every completion call. The system prompt is
//! kept apart from the turn window, so eviction can never reach it and it can never be
//! appended a second time.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Default number of retained non-system messages (10 exchanges)
pub const DEFAULT_MAX_MESSAGES: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Roles that may be appended after the system prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Assistant,
}

impl From<TurnRole> for Role {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::User => Role::User,
            TurnRole::Assistant => Role::Assistant,
        }
    }
}

/// How the store trims history once the cap is exceeded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Truncation {
    /// Drop the oldest messages, then any assistant turn left orphaned at the front,
    /// so the window always starts on a user turn.
    #[default]
    Exchanges,
    /// Keep exactly the most recent `max_messages` messages.
    Messages,
}

/// Ordered, bounded message log for a single conversation
#[derive(Debug, Clone)]
pub struct ConversationStore {
    system: Message,
    turns: VecDeque<Message>,
    max_messages: usize,
    truncation: Truncation,
}

impl ConversationStore {
    /// Create a store holding only the system prompt.
    ///
    /// An odd `max_messages` is rounded up so the window holds whole exchanges.
    pub fn new(system_prompt: impl Into<String>, max_messages: usize, truncation: Truncation) -> Self {
        let max_messages = max_messages + max_messages % 2;
        Self {
            system: Message::system(system_prompt),
            turns: VecDeque::with_capacity(max_messages + 1),
            max_messages,
            truncation,
        }
    }

    /// Drop every turn, keeping the system prompt
    pub fn reset(&mut self) {
        self.turns.clear();
    }

    /// Append a turn and trim the window back under the cap
    pub fn append(&mut self, role: TurnRole, content: impl Into<String>) {
        self.turns.push_back(Message {
            role: role.into(),
            content: content.into(),
        });
        self.trim();
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.append(TurnRole::User, content);
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.append(TurnRole::Assistant, content);
    }

    /// Owned copy of the full log, system prompt first
    pub fn snapshot(&self) -> Vec<Message> {
        let mut log = Vec::with_capacity(self.turns.len() + 1);
        log.push(self.system.clone());
        log.extend(self.turns.iter().cloned());
        log
    }

    /// The conversation without the system prompt
    pub fn history(&self) -> Vec<Message> {
        self.turns.iter().cloned().collect()
    }

    pub fn last(&self) -> Option<&Message> {
        self.turns.back()
    }

    /// Remove a trailing user turn that never received its reply
    pub fn discard_pending_user(&mut self) -> Option<Message> {
        if self.turns.back().is_some_and(|m| m.role == Role::User) {
            self.turns.pop_back()
        } else {
            None
        }
    }

    /// Number of non-system messages
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn system_prompt(&self) -> &str {
        &self.system.content
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    pub fn truncation(&self) -> Truncation {
        self.truncation
    }

    fn trim(&mut self) {
        if self.turns.len() <= self.max_messages {
            return;
        }

        let excess = self.turns.len() - self.max_messages;
        self.turns.drain(..excess);

        if self.truncation == Truncation::Exchanges {
            while self
                .turns
                .front()
                .is_some_and(|m| m.role == Role::Assistant)
            {
                self.turns.pop_front();
            }
        }

        tracing::trace!(
            retained = self.turns.len(),
            cap = self.max_messages,
            "trimmed conversation history"
        );
    }
}
