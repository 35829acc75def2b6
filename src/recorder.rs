//! Contract with the external DOM recorder.
//!
//! The recorder is handed an [`EventEmitter`] when recording starts and
//! pushes raw payloads through it. Nothing is registered globally: the
//! emitter is owned by the pipeline and cloned into the recorder.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::config::SessionConfig;
use crate::error::RecorderError;

/// Options forwarded to the recorder at start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOptions {
    pub mask_all_inputs: bool,
    pub mask_text_inputs: bool,
    pub mask_text_selector: Option<String>,
    pub mask_input_selector: Option<String>,
}

impl From<&SessionConfig> for RecordOptions {
    fn from(config: &SessionConfig) -> Self {
        Self {
            mask_all_inputs: config.masking.mask_all_inputs,
            mask_text_inputs: config.masking.mask_text_inputs,
            mask_text_selector: config.masking.mask_text_selector.clone(),
            mask_input_selector: config.masking.mask_input_selector.clone(),
        }
    }
}

/// Callback handle the recorder emits raw events through.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: mpsc::UnboundedSender<Value>,
}

impl EventEmitter {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Returns false once the pipeline is gone.
    pub fn emit(&self, raw: Value) -> bool {
        self.tx.send(raw).is_ok()
    }
}

/// Halts a running recorder. Consumed on use.
pub struct StopHandle {
    stop: Box<dyn FnOnce() + Send>,
}

impl StopHandle {
    pub fn new(stop: impl FnOnce() + Send + 'static) -> Self {
        Self {
            stop: Box::new(stop),
        }
    }

    /// Handle for recorders that need no teardown.
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    pub fn stop(self) {
        (self.stop)()
    }
}

impl std::fmt::Debug for StopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopHandle").finish_non_exhaustive()
    }
}

/// The DOM recorder collaborator.
pub trait Recorder: Send {
    fn start(
        &mut self,
        options: &RecordOptions,
        emitter: EventEmitter,
    ) -> Result<StopHandle, RecorderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_emitter_delivers_in_order() {
        let (emitter, mut rx) = EventEmitter::channel();
        assert!(emitter.emit(json!({"kind": 1})));
        assert!(emitter.clone().emit(json!({"kind": 2})));
        assert_eq!(rx.try_recv().unwrap()["kind"], 1);
        assert_eq!(rx.try_recv().unwrap()["kind"], 2);
    }

    #[test]
    fn test_emitter_reports_closed_pipeline() {
        let (emitter, rx) = EventEmitter::channel();
        drop(rx);
        assert!(!emitter.emit(json!({})));
    }

    #[test]
    fn test_stop_handle_runs_once() {
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = stopped.clone();
        let handle = StopHandle::new(move || flag.store(true, Ordering::SeqCst));
        handle.stop();
        assert!(stopped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_options_follow_config() {
        let config = SessionConfig::from_json_str(
            r#"{"maskAllInputs": true, "maskInputSelector": "input.card"}"#,
        )
        .unwrap();
        let options = RecordOptions::from(&config);
        assert!(options.mask_all_inputs);
        assert_eq!(options.mask_input_selector.as_deref(), Some("input.card"));
    }
}
