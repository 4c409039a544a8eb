//! Chat session controller
//!
//! A `ChatSession` owns one conversation and drives each exchange:
//! 1. Records the user's turn in the store
//! 2. Sends the store snapshot to the completion backend
//! 3. On success, records and returns the assistant's reply
//! 4. On failure, answers from the fallback table instead, using only the raw user text
//!
//! `submit` takes `&mut self`, so a session can never have two exchanges in flight.
//! The store itself lives in a [`SessionView`], which readers can hold onto and query while
//! an exchange is suspended on the remote call.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DisplayConfig;
use crate::conversation::{ConversationStore, Message};
use crate::providers::CompletionBackend;

use super::fallback::FallbackResponder;

/// Where an exchange currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Sending,
    Completed,
    Failed,
}

/// Which path produced a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplySource {
    Remote,
    Fallback,
}

/// Reply handed back to the UI
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    /// Markdown-flavoured assistant text
    pub message: String,

    pub source: ReplySource,

    /// How long the UI should show a typing indicator first
    #[serde(skip)]
    pub display_delay: Duration,
}

/// Errors from the chat session
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("A reply is already being generated for this session")]
    Busy,

    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),
}

struct Conversation {
    store: ConversationStore,
    state: SessionState,
    last_outcome: Option<SessionState>,
}

/// Shared read access to a session's store and state.
///
/// The lock is only held for in-memory updates, never across the remote call, so a read
/// during `Sending` already sees the user's turn.
#[derive(Clone)]
pub struct SessionView {
    inner: Arc<RwLock<Conversation>>,
}

impl SessionView {
    fn new(store: ConversationStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Conversation {
                store,
                state: SessionState::Idle,
                last_outcome: None,
            })),
        }
    }

    // Every update leaves the conversation consistent, so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, Conversation> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Conversation> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// `Sending` while a reply is outstanding, otherwise `Idle`
    pub fn state(&self) -> SessionState {
        self.read().state
    }

    /// Terminal state of the most recent exchange (`Completed` or `Failed`)
    pub fn last_outcome(&self) -> Option<SessionState> {
        self.read().last_outcome
    }

    /// Conversation without the system prompt
    pub fn history(&self) -> Vec<Message> {
        self.read().store.history()
    }

    /// Full log as it would be sent on the next call
    pub fn snapshot(&self) -> Vec<Message> {
        self.read().store.snapshot()
    }

    pub fn len(&self) -> usize {
        self.read().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().store.is_empty()
    }

    pub fn system_prompt(&self) -> String {
        self.read().store.system_prompt().to_string()
    }
}

/// One conversation with the assistant
pub struct ChatSession {
    view: SessionView,
    backend: Arc<dyn CompletionBackend>,
    fallback: Arc<FallbackResponder>,
    display: DisplayConfig,
}

impl ChatSession {
    /// Create a session over an initialised store
    pub fn new(
        store: ConversationStore,
        backend: Arc<dyn CompletionBackend>,
        fallback: Arc<FallbackResponder>,
    ) -> Self {
        Self {
            view: SessionView::new(store),
            backend,
            fallback,
            display: DisplayConfig::default(),
        }
    }

    /// Set the typing-delay parameters
    pub fn with_display(mut self, display: DisplayConfig) -> Self {
        self.display = display;
        self
    }

    /// Run one exchange and return the text to show
    pub async fn submit(&mut self, text: &str) -> Result<ChatReply, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let (exchange, log) = Exchange::begin(&self.view, text);

        let (message, source) = match self.backend.complete(&log).await {
            Ok(reply) => {
                exchange.commit(SessionState::Completed, &reply);
                (reply, ReplySource::Remote)
            }
            Err(err) => {
                tracing::warn!(error = %err, "completion unavailable, answering from fallback");
                let reply = self.fallback.respond(text);
                exchange.commit(SessionState::Failed, reply);
                (reply.to_string(), ReplySource::Fallback)
            }
        };

        tracing::debug!(
            ?source,
            bytes = message.len(),
            turns = self.view.len(),
            "exchange finished"
        );

        Ok(ChatReply {
            display_delay: self.display.typing_delay(&message),
            message,
            source,
        })
    }

    /// Forget the conversation, keeping the system prompt
    pub fn reset(&mut self) {
        let mut conversation = self.view.write();
        conversation.store.reset();
        conversation.last_outcome = None;
    }

    /// Current state. Through `&self` this always reads `Idle`, since `submit` holds
    /// `&mut self` for the whole exchange; use [`SessionView::state`] from another task to
    /// observe `Sending`, and [`ChatSession::last_outcome`] for how the last exchange ended.
    pub fn state(&self) -> SessionState {
        self.view.state()
    }

    pub fn last_outcome(&self) -> Option<SessionState> {
        self.view.last_outcome()
    }

    pub fn history(&self) -> Vec<Message> {
        self.view.history()
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.view.snapshot()
    }

    /// Handle for reading this session while an exchange is in flight
    pub fn view(&self) -> &SessionView {
        &self.view
    }
}

/// One exchange between the user's turn and the assistant's reply.
///
/// Dropping it without `commit`, which happens when the `submit` future is cancelled
/// mid-call, removes the unanswered user turn and puts the session back to `Idle`.
struct Exchange<'a> {
    view: &'a SessionView,
    committed: bool,
}

impl<'a> Exchange<'a> {
    /// Record the user turn and mark the session `Sending`; returns the log to send
    fn begin(view: &'a SessionView, text: &str) -> (Self, Vec<Message>) {
        let mut conversation = view.write();
        conversation.state = SessionState::Sending;
        conversation.store.push_user(text);
        let log = conversation.store.snapshot();
        drop(conversation);

        (
            Self {
                view,
                committed: false,
            },
            log,
        )
    }

    fn commit(mut self, outcome: SessionState, reply: &str) {
        let mut conversation = self.view.write();
        conversation.store.push_assistant(reply);
        conversation.last_outcome = Some(outcome);
        conversation.state = SessionState::Idle;
        self.committed = true;
    }
}

impl Drop for Exchange<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let mut conversation = self.view.write();
        if conversation.store.discard_pending_user().is_some() {
            tracing::warn!("exchange cancelled before the reply arrived; discarding it");
        }
        conversation.state = SessionState::Idle;
    }
}
