//! Pipeline self-diagnostics.
//!
//! # INVARIANT
//! Diagnostics are a side-effect layer. The pipeline writes them and never
//! reads them back when deciding what to buffer or export.
//!
//! # PRIVACY
//! Diagnostics never carry event payloads, only counts, kinds and reasons.

pub mod event;
pub mod metrics;
pub mod recorder;

pub use event::Diagnostic;
pub use metrics::PipelineStats;
pub use recorder::DiagnosticsRecorder;
