use super::time::Millis;
use super::timer::TimerSlot;

/// Outcome of one flush decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushDecision {
    /// Batch is full: export it now.
    FlushNow,
    /// Batch timer was just armed.
    Scheduled,
    /// Timer already pending, or nothing to export.
    Wait,
}

/// Decides when the pending batch is worth exporting and owns the batch
/// timer. At most one batch timer is outstanding.
#[derive(Debug)]
pub struct BatchScheduler {
    batch_size: usize,
    flush_delay_ms: Millis,
    timer: TimerSlot,
}

impl BatchScheduler {
    pub fn new(batch_size: usize, flush_delay_ms: Millis) -> Self {
        Self {
            batch_size: batch_size.max(1),
            flush_delay_ms,
            timer: TimerSlot::default(),
        }
    }

    pub fn decide(&mut self, pending: usize, now: Millis) -> FlushDecision {
        if pending == 0 {
            return FlushDecision::Wait;
        }
        if pending >= self.batch_size {
            self.timer.cancel();
            FlushDecision::FlushNow
        } else if !self.timer.is_armed() {
            self.timer.arm(now, self.flush_delay_ms);
            FlushDecision::Scheduled
        } else {
            FlushDecision::Wait
        }
    }

    /// True once when the batch timer has fired. A fired timer flushes
    /// whatever is pending, full or not.
    pub fn poll(&mut self, now: Millis) -> bool {
        self.timer.fire_if_due(now)
    }

    pub fn cancel(&mut self) {
        self.timer.cancel();
    }

    pub fn deadline(&self) -> Option<Millis> {
        self.timer.deadline()
    }
}
