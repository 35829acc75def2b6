use std::collections::VecDeque;

use super::event::Diagnostic;
use super::metrics::PipelineStats;

const MAX_DIAGNOSTICS: usize = 1_000;

/// Bounded ring of recent diagnostics plus lifetime counters.
#[derive(Debug)]
pub struct DiagnosticsRecorder {
    buffer: VecDeque<Diagnostic>,
    stats: PipelineStats,
}

impl DiagnosticsRecorder {
    pub fn new() -> Self {
        Self {
            buffer: VecDeque::with_capacity(64),
            stats: PipelineStats::default(),
        }
    }

    pub fn record(&mut self, diagnostic: Diagnostic) {
        self.stats.observe(&diagnostic);
        if self.buffer.len() >= MAX_DIAGNOSTICS {
            self.buffer.pop_front();
        }
        self.buffer.push_back(diagnostic);
    }

    /// Counters cover every diagnostic ever recorded, not just the ring.
    pub fn stats(&self) -> PipelineStats {
        self.stats.clone()
    }

    pub fn recent(&self) -> impl Iterator<Item = &Diagnostic> {
        self.buffer.iter()
    }
}

impl Default for DiagnosticsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
