//! `rF2Scoring` layout and typed views

use std::sync::{Arc, LazyLock};

use super::telemetry::{VEC3_SCHEMA, Vec3};
use super::{GamePhase, MAX_MAPPED_VEHICLES, PLUGIN_PACK, PitState, SessionKind};
use crate::layout;
use crate::types::PrimitiveType::{Float64, Int8, Int16, Int32, UInt8};
use crate::types::{Record, StructSchema, Value};
use crate::{Result, TelemetryError};

/// `rF2VehicleScoring`: one entry of the scoring vehicle array.
pub static VEHICLE_SCORING_SCHEMA: LazyLock<Arc<StructSchema>> = LazyLock::new(|| {
    StructSchema::builder("rF2VehicleScoring", PLUGIN_PACK)
        .scalar("mID", Int32)
        .text("mDriverName", 32)
        .text("mVehicleName", 64)
        .scalar("mTotalLaps", Int16)
        .scalar("mSector", Int8)
        .scalar("mFinishStatus", Int8)
        .scalar("mLapDist", Float64)
        .scalar("mPathLateral", Float64)
        .scalar("mRelevantTrackEdge", Float64)
        .scalar("mBestSector1", Float64)
        .scalar("mBestSector2", Float64)
        .scalar("mBestLapTime", Float64)
        .scalar("mLastSector1", Float64)
        .scalar("mLastSector2", Float64)
        .scalar("mLastLapTime", Float64)
        .scalar("mCurSector1", Float64)
        .scalar("mCurSector2", Float64)
        .scalar("mNumPitstops", Int16)
        .scalar("mNumPenalties", Int16)
        .scalar("mIsPlayer", Int8)
        .scalar("mControl", Int8)
        .scalar("mInPits", Int8)
        .scalar("mPlace", UInt8)
        .text("mVehicleClass", 32)
        .scalar("mTimeBehindNext", Float64)
        .scalar("mLapsBehindNext", Int32)
        .scalar("mTimeBehindLeader", Float64)
        .scalar("mLapsBehindLeader", Int32)
        .scalar("mLapStartET", Float64)
        .nested("mPos", &VEC3_SCHEMA)
        .scalar("mHeadlights", UInt8)
        .scalar("mPitState", UInt8)
        .scalar("mServerScored", UInt8)
        .scalar("mIndividualPhase", UInt8)
        .scalar("mQualification", Int32)
        .scalar("mTimeIntoLap", Float64)
        .scalar("mEstimatedLapTime", Float64)
        .scalar("mPitLapDist", Float64)
        .scalar("mBestLapSector1", Float64)
        .scalar("mBestLapSector2", Float64)
        .scalar("mBestLapSector3", Float64)
        .text("mPlayerName", 32)
        .bytes("mExpansion", 232)
        .build()
        .expect("rF2VehicleScoring layout is valid")
});

/// `rF2Scoring`: session header followed by the vehicle array.
///
/// The vehicle array starts directly after `mNumVehicles`. There is no
/// session-wide phase field; each entry carries its own `mIndividualPhase`.
pub static SCORING_SCHEMA: LazyLock<Arc<StructSchema>> = LazyLock::new(|| {
    StructSchema::builder("rF2Scoring", PLUGIN_PACK)
        .text("mTrackName", 64)
        .scalar("mSession", Int32)
        .scalar("mCurrentET", Float64)
        .scalar("mEndET", Float64)
        .scalar("mMaxLaps", Int32)
        .scalar("mLapDist", Float64)
        .text("mResultsStream", 8192)
        .scalar("mNumVehicles", Int32)
        .nested_array("mVehicles", &VEHICLE_SCORING_SCHEMA, MAX_MAPPED_VEHICLES)
        .build()
        .expect("rF2Scoring layout is valid")
});

/// Decoded scoring region.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringRecord {
    record: Record,
}

impl ScoringRecord {
    /// Decode a full scoring snapshot.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        layout::decode(bytes, &SCORING_SCHEMA).map(Self::from_record)
    }

    pub fn from_record(record: Record) -> Self {
        Self { record }
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn track_name(&self) -> Result<String> {
        self.record.get("mTrackName")
    }

    pub fn session(&self) -> Result<SessionKind> {
        self.record.get::<i32>("mSession").map(SessionKind::from_raw)
    }

    /// Current session time, seconds.
    pub fn current_et(&self) -> Result<f64> {
        self.record.get("mCurrentET")
    }

    pub fn end_et(&self) -> Result<f64> {
        self.record.get("mEndET")
    }

    pub fn max_laps(&self) -> Result<i32> {
        self.record.get("mMaxLaps")
    }

    /// Track length, meters.
    pub fn track_length(&self) -> Result<f64> {
        self.record.get("mLapDist")
    }

    /// Vehicle count as reported by the plugin, unclamped.
    pub fn num_vehicles(&self) -> Result<i32> {
        self.record.get("mNumVehicles")
    }

    /// Number of leading array entries that hold live vehicles.
    pub fn active_vehicle_count(&self) -> Result<usize> {
        let raw = self.num_vehicles()?;
        Ok(usize::try_from(raw).unwrap_or(0).min(MAX_MAPPED_VEHICLES))
    }

    /// Entry at `index` of the vehicle array.
    ///
    /// Indices at or beyond [`MAX_MAPPED_VEHICLES`] are rejected.
    pub fn vehicle(&self, index: usize) -> Result<VehicleScoring<'_>> {
        let missing = || TelemetryError::missing_field(format!("mVehicles[{index}]"));
        if index >= MAX_MAPPED_VEHICLES {
            return Err(missing());
        }

        let entries = self.record.array("mVehicles")?;
        let record = entries.get(index).and_then(Value::as_record).ok_or_else(missing)?;
        Ok(VehicleScoring { index, record })
    }

    /// Active entries, in array order.
    pub fn active_vehicles(&self) -> Result<impl Iterator<Item = VehicleScoring<'_>>> {
        let count = self.active_vehicle_count()?;
        let entries = self.record.array("mVehicles")?;
        Ok(entries
            .iter()
            .take(count)
            .enumerate()
            .filter_map(|(index, value)| value.as_record().map(|record| VehicleScoring { index, record })))
    }
}

/// Borrowed view over one scoring vehicle entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleScoring<'a> {
    index: usize,
    record: &'a Record,
}

impl<'a> VehicleScoring<'a> {
    pub fn from_record(index: usize, record: &'a Record) -> Self {
        Self { index, record }
    }

    /// Slot index within the scoring array.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn record(&self) -> &'a Record {
        self.record
    }

    pub fn id(&self) -> Result<i32> {
        self.record.get("mID")
    }

    pub fn driver_name(&self) -> Result<String> {
        self.record.get("mDriverName")
    }

    pub fn vehicle_name(&self) -> Result<String> {
        self.record.get("mVehicleName")
    }

    pub fn vehicle_class(&self) -> Result<String> {
        self.record.get("mVehicleClass")
    }

    pub fn total_laps(&self) -> Result<i16> {
        self.record.get("mTotalLaps")
    }

    /// Raw sector index: 0 is sector 3, 1 and 2 are sectors 1 and 2.
    pub fn sector(&self) -> Result<i8> {
        self.record.get("mSector")
    }

    /// Distance around the current lap, meters.
    pub fn lap_dist(&self) -> Result<f64> {
        self.record.get("mLapDist")
    }

    pub fn best_lap_time(&self) -> Result<f64> {
        self.record.get("mBestLapTime")
    }

    pub fn last_lap_time(&self) -> Result<f64> {
        self.record.get("mLastLapTime")
    }

    pub fn time_into_lap(&self) -> Result<f64> {
        self.record.get("mTimeIntoLap")
    }

    pub fn estimated_lap_time(&self) -> Result<f64> {
        self.record.get("mEstimatedLapTime")
    }

    pub fn lap_start_et(&self) -> Result<f64> {
        self.record.get("mLapStartET")
    }

    pub fn place(&self) -> Result<u8> {
        self.record.get("mPlace")
    }

    pub fn is_player(&self) -> Result<bool> {
        self.record.get("mIsPlayer")
    }

    pub fn in_pits(&self) -> Result<bool> {
        self.record.get("mInPits")
    }

    pub fn num_pitstops(&self) -> Result<i16> {
        self.record.get("mNumPitstops")
    }

    /// Raw `mIndividualPhase`: the game phase as seen by this entry.
    pub fn individual_phase_raw(&self) -> Result<u8> {
        self.record.get("mIndividualPhase")
    }

    /// Known phase of this entry, `None` for values outside [`GamePhase`].
    pub fn individual_phase(&self) -> Result<Option<GamePhase>> {
        self.individual_phase_raw().map(GamePhase::from_raw)
    }

    pub fn pit_state(&self) -> Result<Option<PitState>> {
        self.record.get::<u8>("mPitState").map(PitState::from_raw)
    }

    pub fn position(&self) -> Result<Vec3> {
        self.record.get("mPos")
    }
}
