//! Buffering and export engine for recording sessions.

pub mod buffer;
pub mod envelope;
pub mod event;
pub mod limits;
pub mod masking;
pub mod pipeline;
pub mod reactor;
pub mod scheduler;
pub mod session;
pub mod telemetry;
pub mod throttle;
pub mod time;
pub mod timer;
