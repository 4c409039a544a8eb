//! Core assistant components
//!
//! Session orchestration, the offline fallback responder and the per-conversation
//! session registry.

mod chat;
pub mod fallback;
mod registry;

pub use chat::{ChatError, ChatReply, ChatSession, ReplySource, SessionState, SessionView};
pub use fallback::{FallbackResponder, FallbackRule, Topic};
pub use registry::{SessionFactory, SessionRegistry};
