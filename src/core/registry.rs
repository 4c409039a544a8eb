//! Per-conversation session registry
//!
//! Each conversation id maps to its own `ChatSession`; sessions never share history.
//! A submission against a session that is still generating a reply is rejected rather
//! than queued. Sessions left idle longer than the configured timeout are evicted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::settings::HistoryConfig;
use crate::config::{Config, DisplayConfig, PromptTemplate};
use crate::conversation::{ConversationStore, Message};
use crate::providers::CompletionBackend;

use super::chat::{ChatError, ChatReply, ChatSession, SessionState, SessionView};
use super::fallback::FallbackResponder;

/// Everything needed to open a fresh session
#[derive(Clone)]
pub struct SessionFactory {
    template: Arc<PromptTemplate>,
    history: HistoryConfig,
    display: DisplayConfig,
    backend: Arc<dyn CompletionBackend>,
    fallback: Arc<FallbackResponder>,
}

impl SessionFactory {
    pub fn new(
        template: PromptTemplate,
        history: HistoryConfig,
        display: DisplayConfig,
        backend: Arc<dyn CompletionBackend>,
    ) -> Self {
        Self {
            template: Arc::new(template),
            history,
            display,
            backend,
            fallback: Arc::new(FallbackResponder::default()),
        }
    }

    /// Factory using the window and display settings from `config`
    pub fn from_config(
        config: &Config,
        template: PromptTemplate,
        backend: Arc<dyn CompletionBackend>,
    ) -> Self {
        Self::new(
            template,
            config.settings.history,
            config.settings.display,
            backend,
        )
    }

    pub fn open(&self) -> ChatSession {
        let store = ConversationStore::new(
            self.template.system_prompt.content.as_str(),
            self.history.max_messages,
            self.history.truncation,
        );
        ChatSession::new(store, self.backend.clone(), self.fallback.clone())
            .with_display(self.display)
    }

    pub fn greeting(&self) -> &str {
        &self.template.persona.greeting
    }

    pub fn is_remote(&self) -> bool {
        self.backend.is_remote()
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.history.idle_timeout()
    }
}

/// One live session.
///
/// `session` is the in-flight gate: `submit` and `reset` take it with `try_lock`. Reads go
/// through `view` and never wait on it.
struct SessionEntry {
    session: Mutex<ChatSession>,
    view: SessionView,
    /// Milliseconds since the registry's epoch
    last_active: AtomicU64,
}

/// Live sessions keyed by conversation id
pub struct SessionRegistry {
    factory: SessionFactory,
    sessions: RwLock<HashMap<Uuid, Arc<SessionEntry>>>,
    idle_timeout: Option<Duration>,
    epoch: Instant,
}

impl SessionRegistry {
    pub fn new(factory: SessionFactory) -> Self {
        Self {
            idle_timeout: factory.idle_timeout(),
            factory,
            sessions: RwLock::new(HashMap::new()),
            epoch: Instant::now(),
        }
    }

    /// Override the idle timeout from the history settings; `None` disables eviction
    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn factory(&self) -> &SessionFactory {
        &self.factory
    }

    /// Open a session and return its id with the greeting to display
    pub async fn create(&self) -> (Uuid, String) {
        self.evict_idle().await;

        let id = Uuid::new_v4();
        let session = self.factory.open();
        let entry = Arc::new(SessionEntry {
            view: session.view().clone(),
            session: Mutex::new(session),
            last_active: AtomicU64::new(self.now()),
        });
        self.sessions.write().await.insert(id, entry);

        tracing::info!(session = %id, "session opened");
        (id, self.factory.greeting().to_string())
    }

    async fn get(&self, id: Uuid) -> Result<Arc<SessionEntry>, ChatError> {
        let entry = self
            .sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(ChatError::SessionNotFound(id))?;
        self.touch(&entry);
        Ok(entry)
    }

    /// Run one exchange; fails with `Busy` while another is in flight
    pub async fn submit(&self, id: Uuid, text: &str) -> Result<ChatReply, ChatError> {
        let entry = self.get(id).await?;
        let mut session = entry.session.try_lock().map_err(|_| ChatError::Busy)?;
        let reply = session.submit(text).await;
        self.touch(&entry);
        reply
    }

    /// Conversation so far, including a user turn whose reply is still pending
    pub async fn history(&self, id: Uuid) -> Result<Vec<Message>, ChatError> {
        Ok(self.get(id).await?.view.history())
    }

    pub async fn state(&self, id: Uuid) -> Result<SessionState, ChatError> {
        Ok(self.get(id).await?.view.state())
    }

    pub async fn reset(&self, id: Uuid) -> Result<(), ChatError> {
        let entry = self.get(id).await?;
        let mut session = entry.session.try_lock().map_err(|_| ChatError::Busy)?;
        session.reset();
        Ok(())
    }

    /// End a session; returns whether it existed
    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            tracing::info!(session = %id, "session closed");
        }
        removed
    }

    /// Drop every session idle for longer than the timeout; returns how many went.
    ///
    /// A session with an exchange in flight is never evicted.
    pub async fn evict_idle(&self) -> usize {
        let Some(idle_timeout) = self.idle_timeout else {
            return 0;
        };
        let idle_ms = idle_timeout.as_millis() as u64;
        let now = self.now();

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let idle = now.saturating_sub(entry.last_active.load(Ordering::Relaxed)) >= idle_ms;
            let evict = idle && entry.session.try_lock().is_ok();
            if evict {
                tracing::debug!(session = %id, "evicting idle session");
            }
            !evict
        });

        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, remaining = sessions.len(), "evicted idle sessions");
        }
        evicted
    }

    /// Run `evict_idle` every `period` until the task is aborted
    pub fn spawn_idle_sweep(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                self.evict_idle().await;
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    fn now(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn touch(&self, entry: &SessionEntry) {
        entry.last_active.store(self.now(), Ordering::Relaxed);
    }
}
