//! Destinations for outbound envelopes.
//!
//! Sinks are fire-and-forget from the pipeline's point of view. Any error
//! they return is logged by the pipeline and otherwise ignored.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::SinkError;
use crate::kernel::envelope::{EventEnvelope, RecordKind};

pub trait Sink: Send {
    fn send(&self, envelope: EventEnvelope) -> Result<(), SinkError>;
}

/// Keeps every envelope in memory. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    envelopes: Arc<Mutex<Vec<EventEnvelope>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn envelopes(&self) -> Vec<EventEnvelope> {
        self.envelopes.lock().clone()
    }

    pub fn of_kind(&self, kind: RecordKind) -> Vec<EventEnvelope> {
        self.envelopes
            .lock()
            .iter()
            .filter(|e| e.payload.record_kind == kind)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.envelopes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.envelopes.lock().is_empty()
    }

    pub fn clear(&self) {
        self.envelopes.lock().clear();
    }
}

impl Sink for MemorySink {
    fn send(&self, envelope: EventEnvelope) -> Result<(), SinkError> {
        self.envelopes.lock().push(envelope);
        Ok(())
    }
}

/// Writes one JSON object per line and flushes after each envelope.
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> Sink for JsonLinesSink<W> {
    fn send(&self, envelope: EventEnvelope) -> Result<(), SinkError> {
        let line = serde_json::to_vec(&envelope)?;
        let mut writer = self.writer.lock();
        writer.write_all(&line)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// Forwards envelopes to an async consumer, e.g. an uploader task.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<EventEnvelope>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<EventEnvelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Sink for ChannelSink {
    fn send(&self, envelope: EventEnvelope) -> Result<(), SinkError> {
        self.tx.send(envelope).map_err(|_| SinkError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::kernel::envelope::{self, Anonymous};
    use crate::kernel::session::Session;

    fn envelope(kind: RecordKind) -> EventEnvelope {
        envelope::build(
            &Session::with_id("s"),
            &SessionConfig::default(),
            &Anonymous,
            Vec::new(),
            kind,
            0,
        )
    }

    #[test]
    fn test_memory_sink_shares_storage() {
        let sink = MemorySink::new();
        let view = sink.clone();
        sink.send(envelope(RecordKind::SessionStart)).unwrap();
        sink.send(envelope(RecordKind::EventsBatch)).unwrap();
        assert_eq!(view.len(), 2);
        assert_eq!(view.of_kind(RecordKind::EventsBatch).len(), 1);
    }

    #[test]
    fn test_json_lines_format() {
        let sink = JsonLinesSink::new(Vec::new());
        for _ in 0..3 {
            sink.send(envelope(RecordKind::EventsBatch)).unwrap();
        }

        let content = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        for line in lines {
            let parsed: EventEnvelope = serde_json::from_str(line).unwrap();
            assert_eq!(parsed.session_id, "s");
        }
    }

    #[test]
    fn test_channel_sink_closed() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        assert!(matches!(
            sink.send(envelope(RecordKind::SessionEnd)),
            Err(SinkError::Closed)
        ));
    }
}
