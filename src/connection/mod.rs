//! Connection lifecycle and polling
//!
//! [`Rf2Connection`] owns both region handles and drives the state machine:
//!
//! ```text
//! Disconnected --connect()--> Connecting --ok--> Connected
//!      ^                          |                  |
//!      |                          +--retryable err---+
//!      +-------disconnect()------ Error <--layout/region fault
//! ```
//!
//! Polling is pull-based and synchronous. Nothing runs in the background; the
//! caller picks the cadence and retries `connect()` on its own schedule.
//!
//! ```rust,no_run
//! use rf2_capture::{ReaderConfig, Rf2Connection};
//!
//! # fn main() -> rf2_capture::Result<()> {
//! let mut connection = Rf2Connection::new(ReaderConfig::default());
//! connection.connect()?;
//! while connection.is_connected() {
//!     if let Some(point) = connection.poll()? {
//!         println!("{:.1} km/h in gear {}", point.speed_kmh, point.gear);
//!     }
//!     std::thread::sleep(std::time::Duration::from_millis(10));
//! }
//! # Ok(())
//! # }
//! ```

mod change;
mod player;

pub use change::ChangeDetector;
pub use player::PlayerSlot;

use serde::Serialize;
use tracing::{Span, debug, error, info, info_span, trace, warn};

use crate::config::ReaderConfig;
use crate::layout;
use crate::normalize::normalize;
use crate::region::{PlatformOpener, RegionOpener, SharedRegion};
use crate::sample::CanonicalDataPoint;
use crate::schema::{
    SCORING_SCHEMA, SCORING_SIZE, ScoringRecord, TELEMETRY_SCHEMA, TELEMETRY_SIZE, TelemetryRecord,
    VehicleScoring,
};
use crate::session::SessionSnapshot;
use crate::types::FromValue;
use crate::{Result, TelemetryError};

/// Lifecycle state of a [`Rf2Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// A region or layout fault occurred; `disconnect()` or `connect()` recovers
    Error,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
        };
        f.write_str(name)
    }
}

struct Regions<R> {
    telemetry: R,
    scoring: R,
}

impl<R: SharedRegion> Regions<R> {
    fn close(&mut self) {
        self.telemetry.close();
        self.scoring.close();
    }
}

/// Connection to the plugin's telemetry and scoring regions.
pub struct Rf2Connection<O: RegionOpener = PlatformOpener> {
    opener: O,
    config: ReaderConfig,
    span: Span,
    state: ConnectionState,
    regions: Option<Regions<O::Region>>,
    player_id: Option<i32>,
    slot: PlayerSlot,
    changes: ChangeDetector,
}

impl Rf2Connection<PlatformOpener> {
    /// Connection using the native region backend.
    pub fn new(config: ReaderConfig) -> Self {
        let opener = PlatformOpener::from(&config);
        Self::with_opener(opener, config)
    }
}

impl<O: RegionOpener> Rf2Connection<O> {
    /// Connection reading regions through `opener`.
    pub fn with_opener(opener: O, config: ReaderConfig) -> Self {
        Self {
            opener,
            config,
            span: info_span!("rf2_connection"),
            state: ConnectionState::Disconnected,
            regions: None,
            player_id: None,
            slot: PlayerSlot::default(),
            changes: ChangeDetector::default(),
        }
    }

    /// Log every operation of this connection inside `span`.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Player identifier resolved by the last successful `connect()`.
    pub fn player_id(&self) -> Option<i32> {
        self.player_id
    }

    /// Scoring slot that matched the player on the last poll.
    pub fn player_slot(&self) -> Option<usize> {
        self.slot.cached()
    }

    /// Open both regions, validate the session and resolve the player.
    ///
    /// Retryable failures leave the connection `Disconnected`; anything else,
    /// such as a layout mismatch, leaves it in `Error`. Calling this while
    /// connected is a no-op.
    pub fn connect(&mut self) -> Result<()> {
        let span = self.span.clone();
        let _enter = span.enter();

        match self.state {
            ConnectionState::Connected => {
                warn!("connect() called while already connected");
                return Ok(());
            }
            ConnectionState::Error => {
                debug!("Recovering from error state before connecting");
                self.reset();
            }
            ConnectionState::Disconnected | ConnectionState::Connecting => {}
        }

        self.state = ConnectionState::Connecting;
        debug!(
            telemetry = %self.config.telemetry_region,
            scoring = %self.config.scoring_region,
            "Connecting to plugin regions"
        );

        match self.establish() {
            Ok((regions, player_id, slot, session)) => {
                self.regions = Some(regions);
                self.player_id = Some(player_id);
                self.slot = PlayerSlot::new(Some(slot));
                self.changes.reset();
                self.state = ConnectionState::Connected;
                info!(
                    player_id,
                    slot,
                    track = %session.track_name,
                    session = %session.session,
                    phase = ?session.phase,
                    vehicles = session.vehicle_count,
                    "Connected"
                );
                Ok(())
            }
            Err(e) => {
                self.state = if e.is_retryable() {
                    ConnectionState::Disconnected
                } else {
                    ConnectionState::Error
                };
                if e.is_retryable() {
                    debug!(error = %e, state = %self.state, "Connect failed");
                } else {
                    error!(error = %e, state = %self.state, "Connect failed");
                }
                Err(e)
            }
        }
    }

    fn establish(&self) -> Result<(Regions<O::Region>, i32, usize, SessionSnapshot)> {
        let telemetry = self.opener.open(&self.config.telemetry_region, TELEMETRY_SIZE)?;
        let scoring = self.opener.open(&self.config.scoring_region, SCORING_SIZE)?;
        let regions = Regions { telemetry, scoring };

        let scoring = ScoringRecord::decode(&regions.scoring.snapshot()?)?;
        let vehicles = scoring.num_vehicles()?;
        if vehicles <= 0 {
            return Err(TelemetryError::invalid_session("no vehicles in session"));
        }
        let telemetry = TelemetryRecord::decode(&regions.telemetry.snapshot()?)?;
        let (player_id, slot) = player::resolve_player(&scoring, telemetry.id()?)?;

        let player = scoring.vehicle(slot)?;
        let phase = player.individual_phase_raw()?;
        if self.config.is_inactive_phase(phase) {
            return Err(TelemetryError::invalid_session(format!(
                "player phase {phase} is not an active session"
            )));
        }

        let session = SessionSnapshot::from_scoring(&scoring, Some(&player))?;
        Ok((regions, player_id, slot, session))
    }

    /// Close both regions and forget all cached state. Always succeeds.
    pub fn disconnect(&mut self) {
        let span = self.span.clone();
        let _enter = span.enter();

        let was = self.state;
        self.reset();
        if was != ConnectionState::Disconnected {
            info!(from = %was, "Disconnected");
        }
    }

    fn reset(&mut self) {
        if let Some(mut regions) = self.regions.take() {
            regions.close();
        }
        self.player_id = None;
        self.slot.clear();
        self.changes.reset();
        self.state = ConnectionState::Disconnected;
    }

    /// Produce a sample when either region has new data.
    ///
    /// Returns `Ok(None)` when not connected, when nothing changed since the
    /// last sample, when the player is no longer in the active entry list, or
    /// when the sample is malformed. Region and layout faults close both
    /// regions, move the connection to `Error` and are returned.
    pub fn poll(&mut self) -> Result<Option<CanonicalDataPoint>> {
        let span = self.span.clone();
        let _enter = span.enter();

        if self.state != ConnectionState::Connected {
            trace!(state = %self.state, "Poll while not connected");
            return Ok(None);
        }

        let outcome = self.poll_connected();
        self.settle(outcome)
    }

    /// Apply the poll error policy.
    ///
    /// Sample faults drop the sample and keep the connection. Records decoded
    /// from a full-size region always carry every field, so these only arise
    /// from hand-built records. Anything else closes both regions and moves
    /// to `Error`.
    fn settle(
        &mut self,
        outcome: Result<Option<CanonicalDataPoint>>,
    ) -> Result<Option<CanonicalDataPoint>> {
        match outcome {
            Ok(point) => Ok(point),
            Err(e) if e.is_sample_fault() => {
                warn!(error = %e, "Dropping malformed sample");
                Ok(None)
            }
            Err(e) => {
                error!(error = %e, "Poll failed, closing regions");
                self.reset();
                self.state = ConnectionState::Error;
                Err(e)
            }
        }
    }

    fn poll_connected(&mut self) -> Result<Option<CanonicalDataPoint>> {
        let regions = self
            .regions
            .as_ref()
            .ok_or_else(|| TelemetryError::RegionClosed { name: self.config.telemetry_region.clone() })?;
        let telemetry_bytes = regions.telemetry.snapshot()?;
        let scoring_bytes = regions.scoring.snapshot()?;

        let telemetry_et = f64::from_value(&layout::decode_field(
            &telemetry_bytes,
            &TELEMETRY_SCHEMA,
            "mElapsedTime",
        )?)?;
        let scoring_et =
            f64::from_value(&layout::decode_field(&scoring_bytes, &SCORING_SCHEMA, "mCurrentET")?)?;

        if !self.changes.observe(telemetry_et, scoring_et) {
            trace!(telemetry_et, scoring_et, "No new data");
            return Ok(None);
        }

        let Some(player_id) = self.player_id else {
            return Ok(None);
        };

        let Some((slot, entry)) = self.slot.locate(&scoring_bytes, player_id)? else {
            debug!(player_id, "Player not in the active entry list");
            return Ok(None);
        };

        let telemetry = TelemetryRecord::decode(&telemetry_bytes)?;
        let vehicle = VehicleScoring::from_record(slot, &entry);
        let point = normalize(&telemetry, &vehicle)?;
        trace!(timestamp_ms = point.timestamp_ms, slot, "Sample");
        Ok(Some(point))
    }

    /// Current session summary, `None` while not connected.
    pub fn session(&mut self) -> Result<Option<SessionSnapshot>> {
        let span = self.span.clone();
        let _enter = span.enter();

        if self.state != ConnectionState::Connected {
            return Ok(None);
        }
        let Some(regions) = self.regions.as_ref() else {
            return Ok(None);
        };

        let bytes = regions.scoring.snapshot()?;
        let scoring = ScoringRecord::decode(&bytes)?;
        let entry = match self.player_id {
            Some(id) => self.slot.locate(&bytes, id)?,
            None => None,
        };
        let player = entry.as_ref().map(|(slot, record)| VehicleScoring::from_record(*slot, record));
        SessionSnapshot::from_scoring(&scoring, player.as_ref()).map(Some)
    }
}

impl<O: RegionOpener> std::fmt::Debug for Rf2Connection<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rf2Connection")
            .field("state", &self.state)
            .field("player_id", &self.player_id)
            .field("player_slot", &self.slot.cached())
            .field("telemetry_region", &self.config.telemetry_region)
            .field("scoring_region", &self.config.scoring_region)
            .finish()
    }
}
