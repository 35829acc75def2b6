use serde::{Deserialize, Serialize};

use super::event::RecordedEvent;
use super::time::Millis;

/// Lifecycle states of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Built, nothing recorded yet.
    #[default]
    Idle,
    /// Recorder running, events admitted.
    Recording,
    /// Recorder still running, events ignored.
    Paused,
    /// Terminal. Nothing leaves this state.
    Stopped,
}

/// Requests that may move a session between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleRequest {
    Start,
    Pause,
    Resume,
    Stop,
}

/// The state machine that governs session transitions.
pub struct LifecycleGraph;

impl LifecycleGraph {
    /// Pure function: (Current State, Request) -> New State
    /// Returns None when the request is a no-op in the current state.
    pub fn transition(current: SessionState, request: LifecycleRequest) -> Option<SessionState> {
        use LifecycleRequest::*;
        use SessionState::*;

        match (current, request) {
            (Idle, Start) => Some(Recording),
            (Recording, Pause) => Some(Paused),
            (Paused, Resume) => Some(Recording),
            (Recording, Stop) | (Paused, Stop) => Some(Stopped),
            _ => None,
        }
    }
}

/// One recording lifetime. Only the pipeline mutates it.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    state: SessionState,
    start_time: Option<Millis>,
    end_time: Option<Millis>,
    event_count: usize,
    last_event_time: Option<Millis>,
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: SessionState::Idle,
            start_time: None,
            end_time: None,
            event_count: 0,
            last_event_time: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == SessionState::Recording
    }

    pub fn start_time(&self) -> Option<Millis> {
        self.start_time
    }

    pub fn event_count(&self) -> usize {
        self.event_count
    }

    /// Apply a request. Returns the new state, or None if it was ignored.
    pub(crate) fn apply(&mut self, request: LifecycleRequest, now: Millis) -> Option<SessionState> {
        let next = LifecycleGraph::transition(self.state, request)?;
        match request {
            LifecycleRequest::Start => {
                self.start_time = Some(now);
                self.end_time = None;
                self.event_count = 0;
                self.last_event_time = None;
            }
            LifecycleRequest::Stop => self.end_time = Some(now),
            LifecycleRequest::Pause | LifecycleRequest::Resume => {}
        }
        self.state = next;
        Some(next)
    }

    /// Undo a start whose recorder call failed.
    pub(crate) fn roll_back_start(&mut self) {
        self.state = SessionState::Idle;
        self.start_time = None;
    }

    pub(crate) fn record_event(&mut self, at: Millis) {
        self.event_count += 1;
        self.last_event_time = Some(at);
    }

    /// Metadata as of `now`. `end_time`/`duration` are present unless the
    /// session is currently recording.
    pub fn metadata(&self, now: Millis) -> SessionMetadata {
        let start_time = self.start_time.unwrap_or(now);
        let (end_time, duration) = if self.is_recording() {
            (None, None)
        } else {
            let end = self.end_time.unwrap_or(now).max(start_time);
            (Some(end), Some(end - start_time))
        };
        SessionMetadata {
            session_id: self.id.clone(),
            state: self.state,
            start_time,
            end_time,
            duration,
            event_count: self.event_count,
            last_event_time: self.last_event_time,
        }
    }

    pub fn snapshot(&self, pending: usize) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            state: self.state,
            start_time: self.start_time,
            end_time: self.end_time,
            event_count: self.event_count,
            last_event_time: self.last_event_time,
            pending_events: pending,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    pub session_id: String,
    pub state: SessionState,
    pub start_time: Millis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Millis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<Millis>,
    pub event_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_event_time: Option<Millis>,
}

/// Point-in-time view returned by `get_state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: String,
    pub state: SessionState,
    pub start_time: Option<Millis>,
    pub end_time: Option<Millis>,
    pub event_count: usize,
    pub last_event_time: Option<Millis>,
    pub pending_events: usize,
}

/// Full event history plus metadata, returned by `get_session_data`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionData {
    pub events: Vec<RecordedEvent>,
    pub metadata: SessionMetadata,
}
