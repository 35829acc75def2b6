use super::event::RecordedEvent;

/// Event history for one session plus the not-yet-exported tail.
///
/// The pending batch is always the last `pending` entries of the log, so it
/// is tracked as a count rather than a second copy of the events.
#[derive(Debug, Default)]
pub struct EventBuffer {
    log: Vec<RecordedEvent>,
    pending: usize,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: RecordedEvent) {
        self.log.push(event);
        self.pending += 1;
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending
    }

    pub fn pending(&self) -> &[RecordedEvent] {
        &self.log[self.log.len() - self.pending..]
    }

    /// Copy out the pending batch and mark it exported. The log is untouched.
    pub fn take_pending(&mut self) -> Vec<RecordedEvent> {
        let batch = self.pending().to_vec();
        self.pending = 0;
        batch
    }

    pub fn snapshot(&self) -> Vec<RecordedEvent> {
        self.log.clone()
    }

    /// Start over for a new session.
    pub fn reset(&mut self) {
        self.log.clear();
        self.pending = 0;
    }
}
