//! Conversion of plugin records into [`CanonicalDataPoint`]s

use crate::Result;
use crate::sample::CanonicalDataPoint;
use crate::schema::{TelemetryRecord, Vec3, VehicleScoring};

/// Meters per second to kilometers per hour.
pub const MPS_TO_KPH: f64 = 3.6;

/// Build a canonical sample from the player's telemetry and scoring entry.
///
/// Fails with [`TelemetryError::MissingField`](crate::TelemetryError::MissingField)
/// when either record lacks a required field.
pub fn normalize(
    telemetry: &TelemetryRecord,
    scoring: &VehicleScoring<'_>,
) -> Result<CanonicalDataPoint> {
    let position = telemetry.position()?;
    let [fl, fr, rl, rr] = telemetry.wheels()?;

    Ok(CanonicalDataPoint {
        timestamp_ms: seconds_to_millis(telemetry.lap_start_et()?),
        distance_m: scoring.lap_dist()?,
        lap_time_ms: seconds_to_millis(scoring.time_into_lap()?),
        sector: scoring.sector()?.into(),
        pos_x: position.x,
        pos_y: position.y,
        pos_z: position.z,
        speed_kmh: speed_kmh(telemetry.local_velocity()?),
        rpm: round_rpm(telemetry.engine_rpm()?),
        gear: telemetry.gear()?,
        steer_angle: telemetry.unfiltered_steering()?,
        throttle: telemetry.unfiltered_throttle()?,
        brake: telemetry.unfiltered_brake()?,
        clutch: telemetry.unfiltered_clutch()?,
        tyre_temp_fl: fl.temperature[0],
        tyre_temp_fr: fr.temperature[0],
        tyre_temp_rl: rl.temperature[0],
        tyre_temp_rr: rr.temperature[0],
        tyre_press_fl: fl.pressure,
        tyre_press_fr: fr.pressure,
        tyre_press_rl: rl.pressure,
        tyre_press_rr: rr.pressure,
    })
}

/// Scalar speed in km/h from a velocity vector in m/s.
pub fn speed_kmh(velocity: Vec3) -> f64 {
    velocity.magnitude() * MPS_TO_KPH
}

/// Seconds to whole milliseconds, rounded to nearest.
pub fn seconds_to_millis(seconds: f64) -> i64 {
    (seconds * 1000.0).round() as i64
}

fn round_rpm(rpm: f64) -> i32 {
    rpm.round() as i32
}
