use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use session_replay::{
    EventEmitter, JsonLinesSink, Reactor, RecordOptions, Recorder, RecorderError,
    SessionConfig, SessionPipeline, SharedIdentity, StopHandle,
};

const EVENT_INTERVAL_MS: u64 = 25;

/// Stand-in for a DOM recorder: one full snapshot, then a stream of
/// pointer moves until stopped.
struct SyntheticRecorder;

impl Recorder for SyntheticRecorder {
    fn start(
        &mut self,
        options: &RecordOptions,
        emitter: EventEmitter,
    ) -> Result<StopHandle, RecorderError> {
        tracing::info!(?options, "synthetic recorder starting");
        let token = CancellationToken::new();
        let stopped = token.clone();

        tokio::spawn(async move {
            emitter.emit(json!({
                "type": 2,
                "data": {"node": {"type": 0, "childNodes": []}},
                "timestamp": epoch_ms(),
            }));

            let mut cadence = tokio::time::interval(Duration::from_millis(EVENT_INTERVAL_MS));
            let mut x = 0u32;
            loop {
                tokio::select! {
                    _ = stopped.cancelled() => break,
                    _ = cadence.tick() => {
                        x = (x + 7) % 1280;
                        let delivered = emitter.emit(json!({
                            "type": 3,
                            "data": {"source": 1, "positions": [{"x": x, "y": 300, "id": 1}]},
                            "timestamp": epoch_ms(),
                        }));
                        if !delivered {
                            break;
                        }
                    }
                }
            }
        });

        Ok(StopHandle::new(move || token.cancel()))
    }
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Setup Logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    // 2. Config: optional JSON file, then REPLAY_* overrides
    let config = match std::env::args().nth(1) {
        Some(path) => SessionConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => SessionConfig::default(),
    }
    .with_env_overrides()
    .context("applying environment overrides")?;

    let run_for = std::env::var("REPLAY_DEMO_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5u64);

    // 3. Pipeline + driver
    let identity = SharedIdentity::new();
    if let Ok(user) = std::env::var("REPLAY_USER_ID") {
        identity.identify(user);
    }

    let pipeline = SessionPipeline::new(config, JsonLinesSink::new(std::io::stdout()))?
        .with_recorder(SyntheticRecorder)
        .with_identity(identity);
    let (handle, task) = Reactor::spawn(pipeline);

    handle.start().await.context("session replay failed to start")?;
    tracing::info!("Recording for {}s. Press Ctrl+C to stop early.", run_for);

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(run_for)) => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
    }

    handle.stop().await?;
    let stats = handle.stats().await?;
    tracing::info!(?stats, "session finished");

    handle.shutdown();
    task.await.context("reactor task panicked")?;
    Ok(())
}
