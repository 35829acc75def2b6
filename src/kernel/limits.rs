use serde::Serialize;

use super::time::Millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitKind {
    EventCount,
    Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitDecision {
    Admit,
    Exceeded(LimitKind),
}

/// Event-count and elapsed-time ceilings, evaluated for every incoming
/// event before it is masked or buffered.
#[derive(Debug, Clone, Copy)]
pub struct LimitMonitor {
    max_events: usize,
    max_duration_ms: Millis,
}

impl LimitMonitor {
    pub fn new(max_events: usize, max_duration_ms: Millis) -> Self {
        Self {
            max_events,
            max_duration_ms,
        }
    }

    pub fn check(&self, event_count: usize, start_time: Millis, now: Millis) -> LimitDecision {
        if event_count >= self.max_events {
            LimitDecision::Exceeded(LimitKind::EventCount)
        } else if now.saturating_sub(start_time) > self.max_duration_ms {
            LimitDecision::Exceeded(LimitKind::Duration)
        } else {
            LimitDecision::Admit
        }
    }
}
