use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::event::RecordedEvent;
use super::session::{Session, SessionMetadata};
use super::time::{iso8601, Millis};
use crate::config::SessionConfig;

pub const EVENT_TYPE: &str = "session_replay";
pub const EVENT_NAME: &str = "session_replay";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    SessionStart,
    EventsBatch,
    SessionEnd,
}

/// Outbound unit handed to the sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub event_type: String,
    pub event_name: String,
    pub session_id: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub payload: ReplayPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayPayload {
    pub session_id: String,
    pub events: Vec<RecordedEvent>,
    pub metadata: SessionMetadata,
    pub config: SessionConfig,
    pub record_kind: RecordKind,
}

/// Whoever the host currently knows the user to be.
pub trait Identity: Send {
    fn user_id(&self) -> Option<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl Identity for Anonymous {
    fn user_id(&self) -> Option<String> {
        None
    }
}

/// Identity the host can update while a session is running.
#[derive(Debug, Clone, Default)]
pub struct SharedIdentity {
    user: Arc<RwLock<Option<String>>>,
}

impl SharedIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identify(&self, user_id: impl Into<String>) {
        *self.user.write() = Some(user_id.into());
    }

    pub fn forget(&self) {
        *self.user.write() = None;
    }
}

impl Identity for SharedIdentity {
    fn user_id(&self) -> Option<String> {
        self.user.read().clone()
    }
}

/// Build an envelope from the session as it is at `now`. `events` is moved
/// in, so later buffer changes cannot reach an envelope already built.
pub fn build(
    session: &Session,
    config: &SessionConfig,
    identity: &dyn Identity,
    events: Vec<RecordedEvent>,
    record_kind: RecordKind,
    now: Millis,
) -> EventEnvelope {
    let session_id = session.id().to_string();
    EventEnvelope {
        event_type: EVENT_TYPE.to_string(),
        event_name: EVENT_NAME.to_string(),
        session_id: session_id.clone(),
        timestamp: iso8601(now),
        user_id: identity.user_id(),
        payload: ReplayPayload {
            session_id,
            events,
            metadata: session.metadata(now),
            config: config.clone(),
            record_kind,
        },
    }
}
