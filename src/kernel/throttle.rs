use super::time::Millis;
use super::timer::TimerSlot;

/// Trailing-edge limiter on how often the flush decision runs.
///
/// Ingestion is never gated here; the pipeline buffers every admitted event
/// before it reaches the coalescer.
#[derive(Debug)]
pub struct ThrottleCoalescer {
    delay_ms: Millis,
    timer: TimerSlot,
    /// Timestamp of the trailing event of the current burst.
    marker: Option<Millis>,
}

impl ThrottleCoalescer {
    pub fn new(delay_ms: Millis) -> Self {
        Self {
            delay_ms,
            timer: TimerSlot::default(),
            marker: None,
        }
    }

    /// Push the decision out to `now + delay` and remember this event.
    pub fn on_event(&mut self, event_time: Millis, now: Millis) {
        self.timer.arm(now, self.delay_ms);
        self.marker = Some(event_time);
    }

    /// True once when the burst has gone quiet for a full window.
    pub fn poll(&mut self, now: Millis) -> bool {
        if self.timer.fire_if_due(now) {
            self.marker = None;
            true
        } else {
            false
        }
    }

    /// Cancel the timer and hand back a pending marker, if any.
    pub fn cancel(&mut self) -> Option<Millis> {
        self.timer.cancel();
        self.marker.take()
    }

    #[cfg(test)]
    fn marker(&self) -> Option<Millis> {
        self.marker
    }

    pub fn deadline(&self) -> Option<Millis> {
        self.timer.deadline()
    }
}
