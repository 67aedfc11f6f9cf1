//! Print live samples from a running rFactor 2 / Le Mans Ultimate session.
//!
//! ```text
//! cargo run --example capture -- [config.yaml] [seconds]
//! ```
//!
//! Waits for the simulator, then prints one line per new frame until the
//! session ends or the duration elapses. Set `RUST_LOG=rf2_capture=debug` for
//! connection details.

use anyhow::{Context, Result};
use futures::StreamExt;
use rf2_capture::{ReaderConfig, Rf2Connection};
use std::time::Duration;
use tracing::{info, warn};

const RETRY_START: Duration = Duration::from_millis(500);
const RETRY_MAX: Duration = Duration::from_secs(5);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rf2_capture=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = match args.get(1) {
        Some(path) => ReaderConfig::from_path(path)
            .with_context(|| format!("loading configuration from {path}"))?,
        None => ReaderConfig::default(),
    };
    let duration = match args.get(2) {
        Some(secs) => Duration::from_secs(secs.parse().context("duration must be whole seconds")?),
        None => Duration::from_secs(60),
    };

    let mut connection = Rf2Connection::new(config);
    let mut backoff = RETRY_START;
    loop {
        match connection.connect() {
            Ok(()) => break,
            Err(e) if e.is_retryable() => {
                warn!(error = %e, retry_in = ?backoff, "Simulator not ready");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(RETRY_MAX);
            }
            Err(e) => {
                for hint in e.recovery_suggestions() {
                    warn!("{hint}");
                }
                return Err(e).context("connecting to the shared memory plugin");
            }
        }
    }

    if let Some(session) = connection.session()? {
        info!(track = %session.track_name, session = %session.session, "Capturing");
    }

    let mut samples = connection.samples();
    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);

    let mut count = 0u64;
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            next = samples.next() => match next {
                Some(Ok(point)) => {
                    count += 1;
                    println!(
                        "{:>9} ms  {:>7.1} m  S{}  {:>6.1} km/h  gear {:>2}  {:>5} rpm  thr {:.2}  brk {:.2}",
                        point.timestamp_ms,
                        point.distance_m,
                        point.sector,
                        point.speed_kmh,
                        point.gear,
                        point.rpm,
                        point.throttle,
                        point.brake,
                    );
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Capture stopped");
                    break;
                }
                None => {
                    info!("Session ended");
                    break;
                }
            },
        }
    }

    info!(samples = count, "Done");
    Ok(())
}
