mod common;

use common::{harness, harness_with, T0};
use session_replay::kernel::limits::LimitKind;
use session_replay::kernel::telemetry::Diagnostic;
use session_replay::{RecordKind, SessionConfig, SessionState, SharedIdentity};

fn stamps(envelope: &session_replay::EventEnvelope) -> Vec<u64> {
    envelope.payload.events.iter().map(|e| e.timestamp).collect()
}

#[test]
fn test_full_batch_exports_once_in_order() {
    let mut h = harness(SessionConfig {
        batch_size: 3,
        ..Default::default()
    });
    h.pipeline.start().unwrap();

    h.feed(1);
    h.feed(1);
    assert!(h.sink.of_kind(RecordKind::EventsBatch).is_empty());
    h.feed(1);

    let batches = h.sink.of_kind(RecordKind::EventsBatch);
    assert_eq!(batches.len(), 1);
    assert_eq!(stamps(&batches[0]), vec![T0 + 1, T0 + 2, T0 + 3]);
    assert_eq!(h.pipeline.get_state().pending_events, 0);
    assert_eq!(h.pipeline.next_deadline(), None, "Full batch cancels the timer");
}

#[test]
fn test_partial_batch_flushes_after_delay() {
    let mut h = harness(SessionConfig::default());
    h.pipeline.start().unwrap();
    h.feed(0);

    h.wait(999);
    assert!(h.sink.of_kind(RecordKind::EventsBatch).is_empty());

    h.wait(1);
    let batches = h.sink.of_kind(RecordKind::EventsBatch);
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].payload.events.len(), 1);

    // Exactly once
    h.wait(10_000);
    assert_eq!(h.sink.of_kind(RecordKind::EventsBatch).len(), 1);
}

#[test]
fn test_one_batch_timer_outstanding() {
    let mut h = harness(SessionConfig::default());
    h.pipeline.start().unwrap();

    h.feed(0);
    let first = h.pipeline.next_deadline();
    h.feed(400);
    h.feed(400);
    assert_eq!(h.pipeline.next_deadline(), first, "Later events must not re-arm");

    h.wait(200);
    let batches = h.sink.of_kind(RecordKind::EventsBatch);
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].payload.events.len(), 3);
}

#[test]
fn test_empty_timer_flush_is_suppressed() {
    let mut h = harness(SessionConfig {
        batch_size: 2,
        ..Default::default()
    });
    h.pipeline.start().unwrap();
    h.feed(0);
    h.feed(0);
    h.wait(5_000);

    assert_eq!(h.sink.of_kind(RecordKind::EventsBatch).len(), 1);
    assert!(h
        .sink
        .envelopes()
        .iter()
        .filter(|e| e.payload.record_kind == RecordKind::EventsBatch)
        .all(|e| !e.payload.events.is_empty()));
}

#[test]
fn test_event_limit_stops_session() {
    let mut h = harness(SessionConfig {
        max_events: 5,
        ..Default::default()
    });
    h.pipeline.start().unwrap();

    for _ in 0..6 {
        h.feed(1);
    }

    let state = h.pipeline.get_state();
    assert_eq!(state.state, SessionState::Stopped);
    assert_eq!(state.event_count, 5);
    assert_eq!(h.pipeline.get_session_data().unwrap().events.len(), 5);
    assert!(h.recorder.is_stopped());

    let batches = h.sink.of_kind(RecordKind::EventsBatch);
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].payload.events.len(), 5);
    let ends = h.sink.of_kind(RecordKind::SessionEnd);
    assert_eq!(ends.len(), 1);
    assert_eq!(ends[0].payload.events.len(), 5);

    assert!(h.pipeline.diagnostics().any(|d| matches!(
        d,
        Diagnostic::LimitExceeded {
            limit: LimitKind::EventCount,
            event_count: 5
        }
    )));
}

#[test]
fn test_events_after_limit_stop_are_ignored() {
    let mut h = harness(SessionConfig {
        max_events: 2,
        ..Default::default()
    });
    h.pipeline.start().unwrap();
    for _ in 0..5 {
        h.feed(1);
    }

    assert_eq!(h.pipeline.get_state().event_count, 2);
    assert_eq!(h.sink.of_kind(RecordKind::SessionEnd).len(), 1);
    assert_eq!(h.pipeline.stats().limit_stops, 1);
    assert_eq!(h.pipeline.stats().inactive_dropped, 2);
}

#[test]
fn test_duration_limit_stops_session() {
    let mut h = harness(SessionConfig {
        max_duration_ms: 1_000,
        ..Default::default()
    });
    h.pipeline.start().unwrap();
    h.feed(1_000);
    assert_eq!(h.pipeline.get_state().state, SessionState::Recording);

    h.feed(1);
    let state = h.pipeline.get_state();
    assert_eq!(state.state, SessionState::Stopped);
    assert_eq!(state.event_count, 1);

    let metadata = h.pipeline.get_session_data().unwrap().metadata;
    assert_eq!(metadata.end_time, Some(T0 + 1_001));
}

#[test]
fn test_throttle_coalesces_flush_decisions() {
    let mut h = harness(SessionConfig {
        throttle_enabled: true,
        throttle_delay_ms: 50,
        batch_size: 100,
        ..Default::default()
    });
    h.pipeline.start().unwrap();

    for _ in 0..10 {
        h.feed(1);
        h.pipeline.poll_timers();
    }
    assert_eq!(h.pipeline.get_state().event_count, 10);
    assert_eq!(h.pipeline.stats().flush_decisions, 0);

    h.wait(50);
    assert_eq!(h.pipeline.stats().flush_decisions, 1);
    assert_eq!(h.pipeline.get_state().pending_events, 10);

    h.wait(1_000);
    let batches = h.sink.of_kind(RecordKind::EventsBatch);
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].payload.events.len(), 10);
}

#[test]
fn test_throttle_still_flushes_full_batch() {
    let mut h = harness(SessionConfig {
        throttle_enabled: true,
        throttle_delay_ms: 50,
        batch_size: 3,
        ..Default::default()
    });
    h.pipeline.start().unwrap();
    for _ in 0..4 {
        h.feed(10);
    }
    assert!(h.sink.of_kind(RecordKind::EventsBatch).is_empty());

    h.wait(50);
    let batches = h.sink.of_kind(RecordKind::EventsBatch);
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].payload.events.len(), 4);
}

#[test]
fn test_stop_during_throttle_window_exports_everything() {
    let mut h = harness(SessionConfig {
        throttle_enabled: true,
        throttle_delay_ms: 50,
        ..Default::default()
    });
    h.pipeline.start().unwrap();
    h.feed(1);
    h.feed(1);

    h.pipeline.stop();

    let batches = h.sink.of_kind(RecordKind::EventsBatch);
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].payload.events.len(), 2);
}

#[test]
fn test_unbatched_mode_sends_each_event() {
    let mut h = harness(SessionConfig {
        batching: false,
        ..Default::default()
    });
    h.pipeline.start().unwrap();
    for _ in 0..3 {
        h.feed(5);
    }

    let batches = h.sink.of_kind(RecordKind::EventsBatch);
    assert_eq!(batches.len(), 3);
    assert!(batches.iter().all(|b| b.payload.events.len() == 1));
    assert_eq!(h.pipeline.next_deadline(), None);
}

#[test]
fn test_envelopes_carry_identity_and_config() {
    let identity = SharedIdentity::new();
    let mut h = harness_with(
        SessionConfig {
            batch_size: 1,
            ..Default::default()
        },
        identity.clone(),
    );

    h.pipeline.start().unwrap();
    identity.identify("user-42");
    h.feed(1);

    let envelopes = h.sink.envelopes();
    assert_eq!(envelopes[0].user_id, None);
    let batch = &envelopes[1];
    assert_eq!(batch.user_id.as_deref(), Some("user-42"));
    assert_eq!(batch.event_type, "session_replay");
    assert_eq!(batch.payload.config.batch_size, 1);
    assert_eq!(batch.payload.session_id, h.pipeline.session_id());
}
