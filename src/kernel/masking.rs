//! Optional transformation applied to each event before it is buffered.
//!
//! Content redaction needs DOM knowledge the pipeline does not have, so an
//! active masking config currently yields an independent copy of the event
//! and nothing more. Selector rules are accepted and ignored.

use std::borrow::Cow;

use super::event::RecordedEvent;
use crate::config::MaskingConfig;

/// Returns the event untouched when masking is off, otherwise an owned
/// structural copy that shares nothing with the input.
pub fn mask<'a>(event: &'a RecordedEvent, config: &MaskingConfig) -> Cow<'a, RecordedEvent> {
    if !config.is_active() {
        return Cow::Borrowed(event);
    }
    // serde_json::Value is an owned tree, so clone is a full deep copy.
    Cow::Owned(RecordedEvent {
        kind: event.kind,
        data: event.data.clone(),
        timestamp: event.timestamp,
    })
}
