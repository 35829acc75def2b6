use serde::Serialize;

use super::event::Diagnostic;
use crate::kernel::envelope::RecordKind;

/// Running counters for one pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub envelopes_sent: u64,
    pub batches_flushed: u64,
    pub events_exported: u64,
    pub export_failures: u64,
    pub flush_decisions: u64,
    pub malformed_dropped: u64,
    pub inactive_dropped: u64,
    pub limit_stops: u64,
    pub skipped_operations: u64,
    pub setup_failures: u64,
}

impl PipelineStats {
    /// Fold one diagnostic into the counters.
    pub fn observe(&mut self, diagnostic: &Diagnostic) {
        match diagnostic {
            Diagnostic::SetupFailed { .. } => self.setup_failures += 1,
            Diagnostic::OperationSkipped { .. } => self.skipped_operations += 1,
            Diagnostic::MalformedEvent { .. } => self.malformed_dropped += 1,
            Diagnostic::InactiveEvent { .. } => self.inactive_dropped += 1,
            Diagnostic::LimitExceeded { .. } => self.limit_stops += 1,
            Diagnostic::FlushDecision => self.flush_decisions += 1,
            Diagnostic::Exported {
                record_kind,
                events,
            } => {
                self.envelopes_sent += 1;
                if *record_kind == RecordKind::EventsBatch {
                    self.batches_flushed += 1;
                    self.events_exported += *events as u64;
                }
            }
            Diagnostic::ExportFailed { .. } => self.export_failures += 1,
            Diagnostic::MaskingNoop => {}
        }
    }
}
