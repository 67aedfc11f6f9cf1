//! Simulator-agnostic telemetry sample

use serde::{Deserialize, Serialize};

/// One normalized telemetry sample.
///
/// Units: milliseconds for times, meters for distance and position, km/h for
/// speed, kPa for tyre pressure, Kelvin for tyre temperature. Pedal inputs are
/// 0.0 to 1.0 and steering is -1.0 (left) to 1.0 (right).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct CanonicalDataPoint {
    pub timestamp_ms: i64,
    pub distance_m: f64,
    pub lap_time_ms: i64,
    pub sector: i32,
    pub pos_x: f64,
    pub pos_y: f64,
    pub pos_z: f64,
    pub speed_kmh: f64,
    pub rpm: i32,
    /// Negative is reverse, zero is neutral
    pub gear: i32,
    pub steer_angle: f64,
    pub throttle: f64,
    pub brake: f64,
    pub clutch: f64,
    pub tyre_temp_fl: f64,
    pub tyre_temp_fr: f64,
    pub tyre_temp_rl: f64,
    pub tyre_temp_rr: f64,
    pub tyre_press_fl: f64,
    pub tyre_press_fr: f64,
    pub tyre_press_rl: f64,
    pub tyre_press_rr: f64,
}

impl CanonicalDataPoint {
    /// Tyre temperatures, front-left first.
    pub fn tyre_temps(&self) -> [f64; 4] {
        [self.tyre_temp_fl, self.tyre_temp_fr, self.tyre_temp_rl, self.tyre_temp_rr]
    }

    /// Tyre pressures, front-left first.
    pub fn tyre_pressures(&self) -> [f64; 4] {
        [self.tyre_press_fl, self.tyre_press_fr, self.tyre_press_rl, self.tyre_press_rr]
    }

    pub fn position(&self) -> [f64; 3] {
        [self.pos_x, self.pos_y, self.pos_z]
    }
}
