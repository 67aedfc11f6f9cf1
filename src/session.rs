//! Session-level summary of the scoring region

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::schema::{GamePhase, ScoringRecord, SessionKind, VehicleScoring};

/// Session state at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct SessionSnapshot {
    pub track_name: String,
    pub session: SessionKind,
    /// The player's `mIndividualPhase`; `None` without a player entry or for
    /// values outside the known set
    pub phase: Option<GamePhase>,
    pub current_et: f64,
    pub end_et: f64,
    pub max_laps: i32,
    /// Track length, meters
    pub track_length: f64,
    pub vehicle_count: usize,
    pub player: Option<PlayerStanding>,
}

/// The player's entry in the scoring array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct PlayerStanding {
    pub slot: usize,
    pub id: i32,
    pub driver_name: String,
    pub vehicle_name: String,
    pub vehicle_class: String,
    pub place: u8,
    pub total_laps: i16,
    /// Seconds, non-positive until a lap is set
    pub best_lap_time: f64,
    pub last_lap_time: f64,
    pub in_pits: bool,
}

impl SessionSnapshot {
    pub fn from_scoring(scoring: &ScoringRecord, player: Option<&VehicleScoring<'_>>) -> Result<Self> {
        Ok(SessionSnapshot {
            track_name: scoring.track_name()?,
            session: scoring.session()?,
            phase: player.map(|p| p.individual_phase()).transpose()?.flatten(),
            current_et: scoring.current_et()?,
            end_et: scoring.end_et()?,
            max_laps: scoring.max_laps()?,
            track_length: scoring.track_length()?,
            vehicle_count: scoring.active_vehicle_count()?,
            player: player.map(PlayerStanding::from_vehicle).transpose()?,
        })
    }
}

impl PlayerStanding {
    pub fn from_vehicle(vehicle: &VehicleScoring<'_>) -> Result<Self> {
        Ok(PlayerStanding {
            slot: vehicle.index(),
            id: vehicle.id()?,
            driver_name: vehicle.driver_name()?,
            vehicle_name: vehicle.vehicle_name()?,
            vehicle_class: vehicle.vehicle_class()?,
            place: vehicle.place()?,
            total_laps: vehicle.total_laps()?,
            best_lap_time: vehicle.best_lap_time()?,
            last_lap_time: vehicle.last_lap_time()?,
            in_pits: vehicle.in_pits()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScoringFixture;

    #[test]
    fn summarises_session_and_player() {
        let scoring = ScoringRecord::decode(&ScoringFixture::with_player_at(1, 3, 42).encode()).unwrap();
        let player = scoring.vehicle(1).unwrap();
        let snapshot = SessionSnapshot::from_scoring(&scoring, Some(&player)).unwrap();

        assert_eq!(snapshot.track_name, "Circuit de la Sarthe");
        assert_eq!(snapshot.session, SessionKind::Race(1));
        assert_eq!(snapshot.phase, Some(GamePhase::GreenFlag));
        assert_eq!(snapshot.vehicle_count, 3);
        assert_eq!(snapshot.track_length, 13626.0);

        let standing = snapshot.player.unwrap();
        assert_eq!(standing.slot, 1);
        assert_eq!(standing.id, 42);
        assert_eq!(standing.driver_name, "Driver 42");
        assert_eq!(standing.vehicle_class, "Hypercar");
        assert!(!standing.in_pits);
    }

    #[test]
    fn player_is_optional() {
        let scoring = ScoringRecord::decode(&ScoringFixture::default().encode()).unwrap();
        let snapshot = SessionSnapshot::from_scoring(&scoring, None).unwrap();
        assert!(snapshot.player.is_none());
        assert_eq!(snapshot.phase, None);
    }
}
