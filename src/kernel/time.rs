use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, SecondsFormat, Utc};

/// Milliseconds on the pipeline clock.
pub type Millis = u64;

/// Time source for the pipeline.
///
/// Readings must never go backwards. They are aligned to the Unix epoch so
/// they can be shown as wall-clock timestamps.
pub trait Clock: Send {
    fn now_ms(&self) -> Millis;
}

/// Monotonic clock anchored to the wall clock at construction.
///
/// Built on the tokio instant so a paused runtime moves it too.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: tokio::time::Instant,
    origin_epoch_ms: Millis,
}

impl SystemClock {
    pub fn new() -> Self {
        let origin_epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as Millis)
            .unwrap_or(0);
        Self {
            origin: tokio::time::Instant::now(),
            origin_epoch_ms,
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> Millis {
        self.origin_epoch_ms + self.origin.elapsed().as_millis() as Millis
    }
}

/// Hand-driven clock. Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: Millis) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn advance(&self, ms: Millis) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    /// Jump forward to `ms`. Earlier readings are ignored, the clock never
    /// moves backwards.
    pub fn advance_to(&self, ms: Millis) {
        self.now.fetch_max(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.load(Ordering::SeqCst)
    }
}

/// ISO-8601 rendering of a clock reading, millisecond precision, `Z` suffix.
pub fn iso8601(ms: Millis) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms as i64)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}
