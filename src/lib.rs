pub mod config;
pub mod error;
pub mod kernel;
pub mod recorder;
pub mod sink;

// Re-export the pieces a host needs to wire up a session
pub use config::{MaskingConfig, SessionConfig};
pub use error::{PipelineError, RecorderError, SinkError};
pub use kernel::envelope::{EventEnvelope, Identity, RecordKind, SharedIdentity};
pub use kernel::event::RecordedEvent;
pub use kernel::pipeline::SessionPipeline;
pub use kernel::reactor::{Reactor, ReactorHandle};
pub use kernel::session::{SessionData, SessionSnapshot, SessionState};
pub use recorder::{EventEmitter, RecordOptions, Recorder, StopHandle};
pub use sink::{ChannelSink, JsonLinesSink, MemorySink, Sink};
