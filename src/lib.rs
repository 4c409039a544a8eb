//! HealthPK AI - health guidance chat assistant
//!
//! Keeps a bounded multi-turn conversation with a remote chat-completions model under a
//! fixed safety-first system prompt, and answers from a local keyword triage table
//! whenever the model cannot be reached.

use std::sync::Arc;

pub mod config;
pub mod conversation;
pub mod core;
pub mod providers;
pub mod routes;

use crate::config::Config;
use crate::core::SessionRegistry;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionRegistry>,
}
