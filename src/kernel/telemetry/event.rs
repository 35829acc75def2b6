use serde::Serialize;

use crate::kernel::envelope::RecordKind;
use crate::kernel::limits::LimitKind;
use crate::kernel::session::{LifecycleRequest, SessionState};

// Allowed: kinds, counts, reasons
// Forbidden: event data

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "diagnostic", rename_all = "snake_case")]
pub enum Diagnostic {
    SetupFailed {
        reason: String,
    },

    OperationSkipped {
        request: LifecycleRequest,
        state: SessionState,
    },

    MalformedEvent {
        reason: String,
    },

    /// Event arrived while the session was not recording.
    InactiveEvent {
        state: SessionState,
    },

    LimitExceeded {
        limit: LimitKind,
        event_count: usize,
    },

    MaskingNoop,

    FlushDecision,

    Exported {
        record_kind: RecordKind,
        events: usize,
    },

    ExportFailed {
        record_kind: RecordKind,
        events: usize,
        reason: String,
    },
}
