//! Locating the player's entry in the scoring vehicle array

use tracing::{debug, trace};

use crate::layout;
use crate::schema::{MAX_MAPPED_VEHICLES, SCORING_SCHEMA, ScoringRecord};
use crate::types::{FromValue, Record, Value};
use crate::{Result, TelemetryError};

/// Resolve the player identifier and slot at connect time.
///
/// A positive telemetry identifier must appear among the active entries. A
/// non-positive one means the plugin has not populated it yet; the entry flagged
/// `mIsPlayer` supplies the identifier instead.
pub(crate) fn resolve_player(scoring: &ScoringRecord, telemetry_id: i32) -> Result<(i32, usize)> {
    let unresolved = || TelemetryError::PlayerSlotUnresolved { player_id: telemetry_id };

    if telemetry_id > 0 {
        for vehicle in scoring.active_vehicles()? {
            if vehicle.id()? == telemetry_id {
                return Ok((telemetry_id, vehicle.index()));
            }
        }
        return Err(unresolved());
    }

    debug!(telemetry_id, "Telemetry id not populated, scanning for the player flag");
    for vehicle in scoring.active_vehicles()? {
        if vehicle.is_player()? {
            return Ok((vehicle.id()?, vehicle.index()));
        }
    }
    Err(unresolved())
}

/// Cached slot index with a linear-scan fallback.
///
/// The player's slot is stable for most of a session, so each poll first
/// checks the slot that matched last time. Lookups work on the raw scoring
/// snapshot: only `mNumVehicles` and per-entry `mID` values are read until a
/// match is found, and only the matching entry is decoded.
#[derive(Debug, Clone, Default)]
pub struct PlayerSlot {
    cached: Option<usize>,
    rescans: u64,
    id_reads: u64,
}

impl PlayerSlot {
    pub fn new(slot: Option<usize>) -> Self {
        Self { cached: slot, ..Self::default() }
    }

    pub fn cached(&self) -> Option<usize> {
        self.cached
    }

    /// Number of full scans performed since construction.
    pub fn rescans(&self) -> u64 {
        self.rescans
    }

    /// Number of entry identifiers read since construction.
    pub fn id_reads(&self) -> u64 {
        self.id_reads
    }

    pub fn clear(&mut self) {
        self.cached = None;
    }

    /// Slot and decoded entry carrying `player_id` among the active entries of
    /// a raw scoring snapshot, if any.
    pub fn locate(&mut self, scoring: &[u8], player_id: i32) -> Result<Option<(usize, Record)>> {
        let active = active_count(scoring)?;

        if let Some(slot) = self.cached.filter(|&slot| slot < active) {
            if self.entry_id(scoring, slot)? == player_id {
                return entry(scoring, slot).map(|record| Some((slot, record)));
            }
        }

        self.rescans += 1;
        for slot in 0..active {
            if self.entry_id(scoring, slot)? == player_id {
                trace!(slot, previous = ?self.cached, "Player slot moved");
                self.cached = Some(slot);
                return entry(scoring, slot).map(|record| Some((slot, record)));
            }
        }

        self.cached = None;
        Ok(None)
    }

    fn entry_id(&mut self, scoring: &[u8], slot: usize) -> Result<i32> {
        self.id_reads += 1;
        let path = format!("mVehicles[{slot}].mID");
        i32::from_value(&layout::decode_field(scoring, &SCORING_SCHEMA, &path)?)
    }
}

fn active_count(scoring: &[u8]) -> Result<usize> {
    let raw = i32::from_value(&layout::decode_field(scoring, &SCORING_SCHEMA, "mNumVehicles")?)?;
    Ok(usize::try_from(raw).unwrap_or(0).min(MAX_MAPPED_VEHICLES))
}

fn entry(scoring: &[u8], slot: usize) -> Result<Record> {
    let path = format!("mVehicles[{slot}]");
    match layout::decode_field(scoring, &SCORING_SCHEMA, &path)? {
        Value::Struct(record) => Ok(record),
        other => Err(TelemetryError::TypeConversion {
            details: format!("Expected Struct for '{path}', got {}", other.kind_name()),
        }),
    }
}
