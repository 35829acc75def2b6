//! Session lifecycle controller.
//!
//! Owns the session, the event buffer and both timers, and drives every
//! stage in order: validate -> limit check -> mask -> buffer -> (throttle)
//! -> flush decision -> envelope -> sink. All of it runs on the caller's
//! thread; the only deferred work is the two timer slots, which the driver
//! fires through [`SessionPipeline::poll_timers`].

use std::borrow::Cow;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use super::buffer::EventBuffer;
use super::envelope::{self, Anonymous, Identity, RecordKind};
use super::event::RecordedEvent;
use super::limits::{LimitDecision, LimitMonitor};
use super::masking;
use super::scheduler::{BatchScheduler, FlushDecision};
use super::session::{
    LifecycleGraph, LifecycleRequest, Session, SessionData, SessionSnapshot, SessionState,
};
use super::telemetry::{Diagnostic, DiagnosticsRecorder, PipelineStats};
use super::throttle::ThrottleCoalescer;
use super::time::{Clock, Millis, SystemClock};
use crate::config::SessionConfig;
use crate::error::{PipelineError, SinkError};
use crate::recorder::{EventEmitter, RecordOptions, Recorder, StopHandle};
use crate::sink::Sink;

pub struct SessionPipeline {
    config: SessionConfig,
    session: Session,
    buffer: EventBuffer,
    limits: LimitMonitor,
    scheduler: BatchScheduler,
    throttle: Option<ThrottleCoalescer>,

    recorder: Option<Box<dyn Recorder>>,
    stop_handle: Option<StopHandle>,
    emitter: EventEmitter,
    inbox: mpsc::UnboundedReceiver<Value>,

    sink: Box<dyn Sink>,
    identity: Box<dyn Identity>,
    clock: Box<dyn Clock>,

    diagnostics: DiagnosticsRecorder,
    disabled: bool,
    masking_noted: bool,
}

impl SessionPipeline {
    /// Build a pipeline with no recorder, anonymous identity and the system
    /// clock. Attach the rest with the `with_*` methods.
    pub fn new(config: SessionConfig, sink: impl Sink + 'static) -> Result<Self, PipelineError> {
        config.validate()?;
        let (emitter, inbox) = EventEmitter::channel();
        let throttle = config
            .throttle_enabled
            .then(|| ThrottleCoalescer::new(config.throttle_delay_ms));

        Ok(Self {
            limits: LimitMonitor::new(config.max_events, config.max_duration_ms),
            scheduler: BatchScheduler::new(config.batch_size, config.batch_flush_delay_ms),
            throttle,
            config,
            session: Session::new(),
            buffer: EventBuffer::new(),
            recorder: None,
            stop_handle: None,
            emitter,
            inbox,
            sink: Box::new(sink),
            identity: Box::new(Anonymous),
            clock: Box::new(SystemClock::new()),
            diagnostics: DiagnosticsRecorder::new(),
            disabled: false,
            masking_noted: false,
        })
    }

    pub fn with_recorder(mut self, recorder: impl Recorder + 'static) -> Self {
        self.recorder = Some(Box::new(recorder));
        self
    }

    pub fn with_identity(mut self, identity: impl Identity + 'static) -> Self {
        self.identity = Box::new(identity);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn session_id(&self) -> &str {
        self.session.id()
    }

    /// Handle for hosts that feed events without going through a recorder.
    pub fn emitter(&self) -> EventEmitter {
        self.emitter.clone()
    }

    pub fn now_ms(&self) -> Millis {
        self.clock.now_ms()
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Start recording. A no-op unless the session is Idle.
    ///
    /// If the recorder is missing or fails, the session stays Idle and the
    /// pipeline refuses every later start.
    pub fn start(&mut self) -> Result<(), PipelineError> {
        if self.disabled {
            warn!(session_id = %self.session.id(), "start refused, pipeline is disabled");
            return Err(PipelineError::Disabled);
        }
        if LifecycleGraph::transition(self.session.state(), LifecycleRequest::Start).is_none() {
            self.skip(LifecycleRequest::Start);
            return Ok(());
        }
        let Some(recorder) = self.recorder.as_mut() else {
            self.disable("no recorder attached".to_string());
            return Err(PipelineError::RecorderUnavailable);
        };

        let now = self.clock.now_ms();
        self.buffer.reset();
        self.session.apply(LifecycleRequest::Start, now);

        let options = RecordOptions::from(&self.config);
        match recorder.start(&options, self.emitter.clone()) {
            Ok(handle) => self.stop_handle = Some(handle),
            Err(e) => {
                self.session.roll_back_start();
                self.disable(e.to_string());
                return Err(PipelineError::RecorderFailed(e));
            }
        }

        info!(session_id = %self.session.id(), start_time = now, "session recording started");
        self.export(Vec::new(), RecordKind::SessionStart, now);
        Ok(())
    }

    pub fn pause(&mut self) {
        // Events emitted before the pause was requested still count.
        self.drain_inbound();
        let now = self.clock.now_ms();
        match self.session.apply(LifecycleRequest::Pause, now) {
            Some(_) => info!(session_id = %self.session.id(), "session paused"),
            None => self.skip(LifecycleRequest::Pause),
        }
    }

    pub fn resume(&mut self) {
        let now = self.clock.now_ms();
        match self.session.apply(LifecycleRequest::Resume, now) {
            Some(_) => info!(session_id = %self.session.id(), "session resumed"),
            None => self.skip(LifecycleRequest::Resume),
        }
    }

    /// Stop recording, export what is pending and the full session.
    pub fn stop(&mut self) {
        if LifecycleGraph::transition(self.session.state(), LifecycleRequest::Stop).is_none() {
            self.skip(LifecycleRequest::Stop);
            return;
        }
        // Events the recorder already emitted belong to this session.
        self.drain_inbound();
        if self.session.state() == SessionState::Stopped {
            // A limit ended the session while draining.
            return;
        }
        let now = self.clock.now_ms();
        self.end_session(now);
    }

    fn end_session(&mut self, now: Millis) {
        if self.session.apply(LifecycleRequest::Stop, now).is_none() {
            return;
        }
        if let Some(handle) = self.stop_handle.take() {
            handle.stop();
        }

        self.scheduler.cancel();
        if let Some(marker) = self.throttle.as_mut().and_then(|t| t.cancel()) {
            // The marked event is already buffered; the final flush covers it.
            debug!(marker, "folding pending throttle marker into final flush");
        }

        self.flush(now);
        let history = self.buffer.snapshot();
        let count = history.len();
        self.export(history, RecordKind::SessionEnd, now);

        info!(
            session_id = %self.session.id(),
            events = count,
            "session recording stopped"
        );
    }

    // ========================================================================
    // INGESTION
    // ========================================================================

    /// Ingest every raw event queued by the recorder, in arrival order.
    pub fn drain_inbound(&mut self) -> usize {
        let mut drained = 0;
        while let Ok(raw) = self.inbox.try_recv() {
            self.ingest(raw);
            drained += 1;
        }
        drained
    }

    pub(crate) async fn next_inbound(&mut self) -> Option<Value> {
        self.inbox.recv().await
    }

    /// Validate one raw recorder payload and admit it.
    pub fn ingest(&mut self, raw: Value) {
        match RecordedEvent::from_raw(raw) {
            Ok(event) => self.admit(event),
            Err(e) => {
                warn!(session_id = %self.session.id(), error = %e, "dropping malformed event");
                self.diagnostics.record(Diagnostic::MalformedEvent {
                    reason: e.to_string(),
                });
            }
        }
    }

    /// Admit an already-validated event.
    pub fn admit(&mut self, event: RecordedEvent) {
        if !self.session.is_recording() {
            trace!(state = ?self.session.state(), kind = event.kind, "event ignored, not recording");
            self.diagnostics.record(Diagnostic::InactiveEvent {
                state: self.session.state(),
            });
            return;
        }

        let now = self.clock.now_ms();
        let start_time = self.session.start_time().unwrap_or(now);
        if let LimitDecision::Exceeded(limit) =
            self.limits.check(self.session.event_count(), start_time, now)
        {
            warn!(
                session_id = %self.session.id(),
                ?limit,
                events = self.session.event_count(),
                "session limit reached, stopping"
            );
            self.diagnostics.record(Diagnostic::LimitExceeded {
                limit,
                event_count: self.session.event_count(),
            });
            self.end_session(now);
            return;
        }

        let event = self.apply_masking(event);
        let event_time = event.timestamp;
        self.buffer.push(event);
        self.session.record_event(event_time);

        if !self.config.batching {
            self.flush(now);
            return;
        }
        match self.throttle.as_mut() {
            Some(throttle) => throttle.on_event(event_time, now),
            None => self.run_flush_decision(now),
        }
    }

    fn apply_masking(&mut self, event: RecordedEvent) -> RecordedEvent {
        let masking = &self.config.masking;
        if !self.masking_noted && (masking.is_active() || masking.has_selectors()) {
            debug!(
                session_id = %self.session.id(),
                "content masking is not implemented yet, events pass through unredacted"
            );
            self.diagnostics.record(Diagnostic::MaskingNoop);
            self.masking_noted = true;
        }
        let masked = match masking::mask(&event, masking) {
            Cow::Owned(copy) => Some(copy),
            Cow::Borrowed(_) => None,
        };
        masked.unwrap_or(event)
    }

    // ========================================================================
    // TIMERS & FLUSH
    // ========================================================================

    /// Earliest pending timer deadline, if any.
    pub fn next_deadline(&self) -> Option<Millis> {
        let throttle = self.throttle.as_ref().and_then(|t| t.deadline());
        match (self.scheduler.deadline(), throttle) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Fire whichever timers are due at the current clock reading.
    pub fn poll_timers(&mut self) {
        let now = self.clock.now_ms();

        let throttle_fired = self.throttle.as_mut().map_or(false, |t| t.poll(now));
        if throttle_fired {
            self.run_flush_decision(now);
        }

        if self.scheduler.poll(now) {
            debug!(
                session_id = %self.session.id(),
                pending = self.buffer.pending_len(),
                "batch timer fired"
            );
            self.flush(now);
        }
    }

    fn run_flush_decision(&mut self, now: Millis) {
        self.diagnostics.record(Diagnostic::FlushDecision);
        match self.scheduler.decide(self.buffer.pending_len(), now) {
            FlushDecision::FlushNow => self.flush(now),
            FlushDecision::Scheduled => trace!(
                deadline = ?self.scheduler.deadline(),
                "batch timer armed"
            ),
            FlushDecision::Wait => {}
        }
    }

    fn flush(&mut self, now: Millis) {
        if self.buffer.pending_len() == 0 {
            return;
        }
        let batch = self.buffer.take_pending();
        self.export(batch, RecordKind::EventsBatch, now);
    }

    /// Hand one envelope to the sink. Failures are logged, never returned;
    /// the batch counts as attempted either way.
    fn export(&mut self, events: Vec<RecordedEvent>, record_kind: RecordKind, now: Millis) {
        let count = events.len();
        let envelope = envelope::build(
            &self.session,
            &self.config,
            self.identity.as_ref(),
            events,
            record_kind,
            now,
        );

        let sink = &self.sink;
        let outcome = catch_unwind(AssertUnwindSafe(|| sink.send(envelope)))
            .unwrap_or_else(|_| Err(SinkError::Panicked));

        match outcome {
            Ok(()) => {
                debug!(
                    session_id = %self.session.id(),
                    ?record_kind,
                    events = count,
                    "envelope exported"
                );
                self.diagnostics.record(Diagnostic::Exported {
                    record_kind,
                    events: count,
                });
            }
            Err(e) => {
                warn!(
                    session_id = %self.session.id(),
                    ?record_kind,
                    events = count,
                    error = %e,
                    "envelope export failed"
                );
                self.diagnostics.record(Diagnostic::ExportFailed {
                    record_kind,
                    events: count,
                    reason: e.to_string(),
                });
            }
        }
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn get_state(&self) -> SessionSnapshot {
        self.session.snapshot(self.buffer.pending_len())
    }

    /// Full history plus fresh metadata, or None for an untouched session.
    pub fn get_session_data(&self) -> Option<SessionData> {
        if self.session.state() == SessionState::Idle && self.buffer.is_empty() {
            return None;
        }
        Some(SessionData {
            events: self.buffer.snapshot(),
            metadata: self.session.metadata(self.clock.now_ms()),
        })
    }

    pub fn stats(&self) -> PipelineStats {
        self.diagnostics.stats()
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.recent()
    }

    // ========================================================================
    // INTERNAL
    // ========================================================================

    fn skip(&mut self, request: LifecycleRequest) {
        let state = self.session.state();
        debug!(session_id = %self.session.id(), ?request, ?state, "lifecycle operation skipped");
        self.diagnostics
            .record(Diagnostic::OperationSkipped { request, state });
    }

    fn disable(&mut self, reason: String) {
        error!(session_id = %self.session.id(), %reason, "session replay setup failed, disabling");
        self.disabled = true;
        self.diagnostics.record(Diagnostic::SetupFailed { reason });
    }
}

impl std::fmt::Debug for SessionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPipeline")
            .field("session", &self.session)
            .field("pending", &self.buffer.pending_len())
            .field("disabled", &self.disabled)
            .finish_non_exhaustive()
    }
}
