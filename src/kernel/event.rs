use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::time::Millis;
use crate::error::EventError;

/// One interaction event produced by the recorder.
///
/// `data` is opaque to the pipeline. Once an event has been through the
/// masking stage it is never mutated again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub kind: u32,
    #[serde(default)]
    pub data: Value,
    pub timestamp: Millis,
}

/// Wire shape accepted from the recorder. `type` is accepted as an alias
/// for `kind` since most DOM recorders emit that key.
#[derive(Deserialize)]
struct WireEvent {
    #[serde(alias = "type")]
    kind: Option<u32>,
    #[serde(default)]
    data: Value,
    timestamp: Option<Millis>,
}

impl RecordedEvent {
    pub fn new(kind: u32, data: Value, timestamp: Millis) -> Self {
        Self {
            kind,
            data,
            timestamp,
        }
    }

    /// Validate a raw recorder payload once, at the pipeline boundary.
    pub fn from_raw(raw: Value) -> Result<Self, EventError> {
        if !raw.is_object() {
            return Err(EventError::NotAnObject);
        }
        let wire: WireEvent = serde_json::from_value(raw)?;
        let kind = wire.kind.ok_or(EventError::MissingField("kind"))?;
        let timestamp = wire.timestamp.ok_or(EventError::MissingField("timestamp"))?;
        Ok(Self {
            kind,
            data: wire.data,
            timestamp,
        })
    }
}
