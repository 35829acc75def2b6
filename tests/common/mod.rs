#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};
use session_replay::kernel::envelope::Anonymous;
use session_replay::kernel::time::{Clock, ManualClock};
use session_replay::{
    EventEmitter, Identity, MemorySink, RecordOptions, Recorder, RecorderError, SessionConfig,
    SessionPipeline, StopHandle,
};

/// Recorder that hands its emitter to the test instead of watching a DOM.
#[derive(Clone, Default)]
pub struct ScriptedRecorder {
    emitter: Arc<Mutex<Option<EventEmitter>>>,
    options: Arc<Mutex<Option<RecordOptions>>>,
    starts: Arc<AtomicUsize>,
    stopped: Arc<AtomicBool>,
}

impl ScriptedRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit one well-formed event through the pipeline's callback.
    pub fn emit(&self, timestamp: u64) {
        self.emit_raw(json!({"type": 3, "data": {"source": 1, "x": timestamp}, "timestamp": timestamp}));
    }

    pub fn emit_raw(&self, raw: Value) {
        let emitter = self.emitter.lock().clone().expect("recorder was never started");
        assert!(emitter.emit(raw), "pipeline dropped the inbox");
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn options(&self) -> Option<RecordOptions> {
        self.options.lock().clone()
    }
}

impl Recorder for ScriptedRecorder {
    fn start(
        &mut self,
        options: &RecordOptions,
        emitter: EventEmitter,
    ) -> Result<StopHandle, RecorderError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        *self.emitter.lock() = Some(emitter);
        *self.options.lock() = Some(options.clone());
        let stopped = self.stopped.clone();
        Ok(StopHandle::new(move || stopped.store(true, Ordering::SeqCst)))
    }
}

pub struct Harness {
    pub pipeline: SessionPipeline,
    pub recorder: ScriptedRecorder,
    pub sink: MemorySink,
    pub clock: ManualClock,
}

pub const T0: u64 = 1_700_000_000_000;

pub fn harness(config: SessionConfig) -> Harness {
    harness_with(config, Anonymous)
}

pub fn harness_with(config: SessionConfig, identity: impl Identity + 'static) -> Harness {
    let recorder = ScriptedRecorder::new();
    let sink = MemorySink::new();
    let clock = ManualClock::new(T0);
    let pipeline = SessionPipeline::new(config, sink.clone())
        .expect("valid config")
        .with_recorder(recorder.clone())
        .with_clock(clock.clone())
        .with_identity(identity);
    Harness {
        pipeline,
        recorder,
        sink,
        clock,
    }
}

impl Harness {
    /// Emit one event and let the pipeline ingest it, `gap_ms` after the last.
    pub fn feed(&mut self, gap_ms: u64) {
        self.clock.advance(gap_ms);
        let now = self.clock.now_ms();
        self.recorder.emit(now);
        self.pipeline.drain_inbound();
    }

    /// Advance the clock and fire whatever timers came due.
    pub fn wait(&mut self, ms: u64) {
        self.clock.advance(ms);
        self.pipeline.poll_timers();
    }
}
