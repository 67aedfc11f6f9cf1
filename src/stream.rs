//! Interval-driven sample stream

use futures::{Stream, ready};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior, interval};
use tracing::trace;

use crate::Result;
use crate::connection::Rf2Connection;
use crate::region::RegionOpener;
use crate::sample::CanonicalDataPoint;

pin_project! {
    /// Polls a connection on every interval tick and yields fresh samples.
    ///
    /// Ticks without new data are skipped. The stream ends once the connection
    /// is no longer connected; a region fault is yielded as an error first.
    /// No task is spawned, the consumer's own polling drives the cadence.
    pub struct SampleStream<O: RegionOpener> {
        connection: Rf2Connection<O>,
        interval: Interval,
    }
}

impl<O: RegionOpener> SampleStream<O> {
    /// Must be called from within a Tokio runtime.
    pub fn new(connection: Rf2Connection<O>, period: Duration) -> Self {
        let mut interval = interval(period);
        // Delay rather than burst after a slow consumer
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { connection, interval }
    }

    pub fn connection(&self) -> &Rf2Connection<O> {
        &self.connection
    }

    /// Recover the connection, e.g. to reconnect after the stream ended.
    pub fn into_inner(self) -> Rf2Connection<O> {
        self.connection
    }
}

impl<O: RegionOpener> Stream for SampleStream<O> {
    type Item = Result<CanonicalDataPoint>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        loop {
            if !this.connection.is_connected() {
                trace!(state = %this.connection.state(), "Sample stream finished");
                return Poll::Ready(None);
            }

            ready!(this.interval.poll_tick(cx));

            match this.connection.poll() {
                Ok(Some(point)) => return Poll::Ready(Some(Ok(point))),
                Ok(None) => continue,
                Err(e) => return Poll::Ready(Some(Err(e))),
            }
        }
    }
}

impl<O: RegionOpener> Rf2Connection<O> {
    /// Turn the connection into a [`SampleStream`] ticking at the configured
    /// `poll_interval_ms`. Must be called from within a Tokio runtime.
    pub fn samples(self) -> SampleStream<O> {
        let period = self.config().poll_interval();
        SampleStream::new(self, period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TelemetryError;
    use crate::config::ReaderConfig;
    use crate::connection::ConnectionState;
    use crate::region::MemoryRegistry;
    use crate::test_utils::SimulatorFixture;
    use futures::StreamExt;

    fn connected(fixture: &SimulatorFixture) -> Rf2Connection<MemoryRegistry> {
        let mut connection =
            Rf2Connection::with_opener(fixture.registry.clone(), ReaderConfig::default());
        connection.connect().unwrap();
        connection
    }

    #[tokio::test(start_paused = true)]
    async fn yields_only_fresh_samples() {
        let fixture = SimulatorFixture::default();
        let mut samples = connected(&fixture).samples();

        let first = samples.next().await.unwrap().unwrap();
        assert_eq!(first.timestamp_ms, 12345);

        let idle = tokio::time::timeout(Duration::from_millis(50), samples.next()).await;
        assert!(idle.is_err(), "unchanged regions must not produce samples");

        fixture.tick_telemetry(100.5);
        assert!(samples.next().await.unwrap().is_ok());
        assert!(samples.connection().is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn disconnected_connections_end_immediately() {
        let fixture = SimulatorFixture::default();
        let connection =
            Rf2Connection::with_opener(fixture.registry.clone(), ReaderConfig::default());
        let mut samples = connection.samples();
        assert!(samples.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn region_faults_end_the_stream() {
        let fixture = SimulatorFixture::default();
        let mut samples = connected(&fixture).samples();
        assert!(samples.next().await.unwrap().is_ok());

        fixture.scoring.write(&[0u8; 16]);
        let err = samples.next().await.unwrap().unwrap_err();
        assert!(matches!(err, TelemetryError::StructSizeMismatch { .. }));
        assert!(samples.next().await.is_none());

        let mut connection = samples.into_inner();
        assert_eq!(connection.state(), ConnectionState::Error);
        connection.disconnect();
        assert_eq!(connection.state(), ConnectionState::Disconnected);
    }
}
