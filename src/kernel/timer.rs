use super::time::Millis;

/// Single-shot, re-armable deadline. At most one instance is ever live:
/// arming replaces whatever was scheduled before.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TimerSlot {
    deadline: Option<Millis>,
}

impl TimerSlot {
    pub fn arm(&mut self, now: Millis, delay: Millis) {
        self.deadline = Some(now.saturating_add(delay));
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Millis> {
        self.deadline
    }

    /// Disarm and report true if the deadline has passed.
    pub fn fire_if_due(&mut self, now: Millis) -> bool {
        match self.deadline {
            Some(at) if at <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
