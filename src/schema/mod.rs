//! rFactor 2 shared memory plugin layouts
//!
//! The plugin publishes two fixed-size regions, both compiled with
//! `#pragma pack(4)`:
//!
//! - `$rFactor2SMMP_Telemetry$` carries the physics state of the local
//!   player's vehicle ([`TelemetryRecord`])
//! - `$rFactor2SMMP_Scoring$` carries session state plus one
//!   [`VehicleScoring`] entry per car on track ([`ScoringRecord`])
//!
//! The schema tables in [`telemetry`] and [`scoring`] mirror the plugin headers
//! field for field. Offsets and widths are a compatibility contract with the
//! plugin; the size constants below are asserted by the tests.

pub mod scoring;
pub mod telemetry;

use serde::{Deserialize, Serialize};

pub use scoring::{SCORING_SCHEMA, ScoringRecord, VEHICLE_SCORING_SCHEMA, VehicleScoring};
pub use telemetry::{TELEMETRY_SCHEMA, TelemetryRecord, VEC3_SCHEMA, WHEEL_SCHEMA, Vec3, WheelState};

/// Name of the single-vehicle telemetry region.
pub const TELEMETRY_REGION_NAME: &str = "$rFactor2SMMP_Telemetry$";
/// Name of the session and multi-vehicle scoring region.
pub const SCORING_REGION_NAME: &str = "$rFactor2SMMP_Scoring$";

/// Capacity of the scoring vehicle array.
pub const MAX_MAPPED_VEHICLES: usize = 128;
/// Upper bound on distinct vehicle identifiers issued by the plugin.
pub const MAX_MAPPED_IDS: usize = 512;

/// Structure packing used by every plugin structure.
pub const PLUGIN_PACK: usize = 4;

pub const VEC3_SIZE: usize = 24;
pub const WHEEL_SIZE: usize = 260;
pub const TELEMETRY_SIZE: usize = 1888;
pub const VEHICLE_SCORING_SIZE: usize = 608;
pub const SCORING_SIZE: usize = 86116;

/// Game phase as reported per scoring entry in `mIndividualPhase`.
///
/// Values above 9 (local yellow, blue flag) have no variant and map to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum GamePhase {
    Garage,
    WarmUp,
    GridWalk,
    Formation,
    Countdown,
    GreenFlag,
    FullCourseYellow,
    SessionStopped,
    SessionOver,
    PausedOrHeartbeat,
}

impl GamePhase {
    /// Map the raw plugin value, `None` for values this crate does not know.
    pub fn from_raw(raw: u8) -> Option<Self> {
        let phase = match raw {
            0 => GamePhase::Garage,
            1 => GamePhase::WarmUp,
            2 => GamePhase::GridWalk,
            3 => GamePhase::Formation,
            4 => GamePhase::Countdown,
            5 => GamePhase::GreenFlag,
            6 => GamePhase::FullCourseYellow,
            7 => GamePhase::SessionStopped,
            8 => GamePhase::SessionOver,
            9 => GamePhase::PausedOrHeartbeat,
            _ => return None,
        };
        Some(phase)
    }

    pub fn as_raw(self) -> u8 {
        self as u8
    }
}

/// Session type decoded from `mSession`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum SessionKind {
    TestDay,
    /// Practice session 1-4
    Practice(u8),
    /// Qualifying session 1-4
    Qualifying(u8),
    Warmup,
    /// Race session 1-4
    Race(u8),
    Unknown(i32),
}

impl SessionKind {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => SessionKind::TestDay,
            1..=4 => SessionKind::Practice(raw as u8),
            5..=8 => SessionKind::Qualifying((raw - 4) as u8),
            9 => SessionKind::Warmup,
            10..=13 => SessionKind::Race((raw - 9) as u8),
            other => SessionKind::Unknown(other),
        }
    }

    pub fn is_race(&self) -> bool {
        matches!(self, SessionKind::Race(_))
    }
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionKind::TestDay => write!(f, "Test Day"),
            SessionKind::Practice(n) => write!(f, "Practice {n}"),
            SessionKind::Qualifying(n) => write!(f, "Qualifying {n}"),
            SessionKind::Warmup => write!(f, "Warmup"),
            SessionKind::Race(n) => write!(f, "Race {n}"),
            SessionKind::Unknown(raw) => write!(f, "Unknown ({raw})"),
        }
    }
}

/// Pit lane state of a scoring entry (`mPitState`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum PitState {
    None,
    Request,
    Entering,
    Stopped,
    Exiting,
}

impl PitState {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(PitState::None),
            1 => Some(PitState::Request),
            2 => Some(PitState::Entering),
            3 => Some(PitState::Stopped),
            4 => Some(PitState::Exiting),
            _ => None,
        }
    }
}
