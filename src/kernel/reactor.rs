use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::pipeline::SessionPipeline;
use super::session::{SessionData, SessionSnapshot};
use super::telemetry::PipelineStats;
use crate::error::PipelineError;

const COMMAND_QUEUE: usize = 64;

/// Public operations, delivered to the reactor task.
#[derive(Debug)]
enum Command {
    Start(oneshot::Sender<Result<(), PipelineError>>),
    Pause,
    Resume,
    Stop,
    State(oneshot::Sender<SessionSnapshot>),
    SessionData(oneshot::Sender<Option<SessionData>>),
    Stats(oneshot::Sender<PipelineStats>),
}

/// Async driver: owns one pipeline on one task, so every mutation is
/// serialized without locks.
pub struct Reactor {
    pipeline: SessionPipeline,
    commands: mpsc::Receiver<Command>,
    shutdown: CancellationToken,
}

/// Cloneable front door to a running reactor.
#[derive(Debug, Clone)]
pub struct ReactorHandle {
    tx: mpsc::Sender<Command>,
    shutdown: CancellationToken,
}

impl Reactor {
    /// Spawn the driver loop on the current runtime.
    pub fn spawn(pipeline: SessionPipeline) -> (ReactorHandle, JoinHandle<SessionPipeline>) {
        let (tx, commands) = mpsc::channel(COMMAND_QUEUE);
        let shutdown = CancellationToken::new();
        let reactor = Reactor {
            pipeline,
            commands,
            shutdown: shutdown.clone(),
        };
        let task = tokio::spawn(reactor.run());
        (ReactorHandle { tx, shutdown }, task)
    }

    /// Driver loop. Returns the pipeline once shut down, stopping any
    /// active session first.
    pub async fn run(mut self) -> SessionPipeline {
        info!(session_id = %self.pipeline.session_id(), "session replay reactor started");

        loop {
            let sleep_for = self
                .pipeline
                .next_deadline()
                .map(|at| Duration::from_millis(at.saturating_sub(self.now_ms())));

            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => break,

                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => {
                        // Commands and reads see every event emitted before them.
                        self.pipeline.drain_inbound();
                        self.handle(cmd);
                    }
                    None => break,
                },

                _ = sleep_or_park(sleep_for) => {
                    self.pipeline.drain_inbound();
                    self.pipeline.poll_timers();
                }

                raw = self.pipeline.next_inbound() => {
                    if let Some(raw) = raw {
                        self.pipeline.ingest(raw);
                    }
                }
            }
        }

        self.pipeline.stop();
        info!(session_id = %self.pipeline.session_id(), "session replay reactor shut down");
        self.pipeline
    }

    fn handle(&mut self, cmd: Command) {
        debug!(?cmd, "reactor command");
        match cmd {
            Command::Start(reply) => {
                let _ = reply.send(self.pipeline.start());
            }
            Command::Pause => self.pipeline.pause(),
            Command::Resume => self.pipeline.resume(),
            Command::Stop => self.pipeline.stop(),
            Command::State(reply) => {
                let _ = reply.send(self.pipeline.get_state());
            }
            Command::SessionData(reply) => {
                let _ = reply.send(self.pipeline.get_session_data());
            }
            Command::Stats(reply) => {
                let _ = reply.send(self.pipeline.stats());
            }
        }
    }

    fn now_ms(&self) -> u64 {
        self.pipeline.now_ms()
    }
}

async fn sleep_or_park(delay: Option<Duration>) {
    match delay {
        Some(delay) => tokio::time::sleep(delay).await,
        None => std::future::pending().await,
    }
}

impl ReactorHandle {
    pub async fn start(&self) -> Result<(), PipelineError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Start(reply)).await?;
        rx.await.map_err(|_| PipelineError::ReactorGone)?
    }

    pub async fn pause(&self) -> Result<(), PipelineError> {
        self.send(Command::Pause).await
    }

    pub async fn resume(&self) -> Result<(), PipelineError> {
        self.send(Command::Resume).await
    }

    pub async fn stop(&self) -> Result<(), PipelineError> {
        self.send(Command::Stop).await
    }

    pub async fn state(&self) -> Result<SessionSnapshot, PipelineError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::State(reply)).await?;
        rx.await.map_err(|_| PipelineError::ReactorGone)
    }

    pub async fn session_data(&self) -> Result<Option<SessionData>, PipelineError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SessionData(reply)).await?;
        rx.await.map_err(|_| PipelineError::ReactorGone)
    }

    pub async fn stats(&self) -> Result<PipelineStats, PipelineError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Stats(reply)).await?;
        rx.await.map_err(|_| PipelineError::ReactorGone)
    }

    /// Ask the reactor to stop the session and exit.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    async fn send(&self, cmd: Command) -> Result<(), PipelineError> {
        self.tx.send(cmd).await.map_err(|_| PipelineError::ReactorGone)
    }
}
