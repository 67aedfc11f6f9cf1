//! Fixture builders for plugin-exact region buffers
//!
//! Used by unit tests, the integration tests and the benchmarks to stand in
//! for the simulator plugin without a running game.

#![cfg(any(test, feature = "benchmark"))]

use crate::layout::write_field;
use crate::region::{MemoryRegistry, RegionWriter};
use crate::schema::{
    GamePhase, MAX_MAPPED_VEHICLES, SCORING_REGION_NAME, SCORING_SCHEMA, TELEMETRY_REGION_NAME,
    TELEMETRY_SCHEMA, Vec3,
};
use crate::types::{StructSchema, Value};

fn put(buf: &mut [u8], schema: &StructSchema, path: &str, value: Value) {
    write_field(buf, schema, path, &value)
        .unwrap_or_else(|e| panic!("fixture field {path} could not be written: {e}"));
}

/// Contents of the telemetry region.
#[derive(Debug, Clone)]
pub struct TelemetryFixture {
    pub id: i32,
    pub elapsed_time: f64,
    pub lap_start_et: f64,
    pub lap_number: i32,
    pub vehicle_name: String,
    pub track_name: String,
    pub position: Vec3,
    pub local_velocity: Vec3,
    pub gear: i32,
    pub engine_rpm: f64,
    pub throttle: f64,
    pub brake: f64,
    pub steering: f64,
    pub clutch: f64,
    /// Tyre pressure per corner, front-left first
    pub tyre_pressure: [f64; 4],
    /// Tread temperatures per corner, front-left first
    pub tyre_temperature: [[f64; 3]; 4],
}

impl Default for TelemetryFixture {
    fn default() -> Self {
        Self {
            id: 42,
            elapsed_time: 100.0,
            lap_start_et: 12.345,
            lap_number: 3,
            vehicle_name: "Oreca 07 #22".to_string(),
            track_name: "Circuit de la Sarthe".to_string(),
            position: Vec3::new(120.5, 2.25, -845.0),
            local_velocity: Vec3::new(0.0, 0.0, -50.0),
            gear: 4,
            engine_rpm: 7250.4,
            throttle: 0.85,
            brake: 0.0,
            steering: -0.12,
            clutch: 0.0,
            tyre_pressure: [165.0, 166.0, 158.5, 159.0],
            tyre_temperature: [
                [355.0, 356.0, 357.0],
                [358.0, 359.0, 360.0],
                [345.0, 346.0, 347.0],
                [348.0, 349.0, 350.0],
            ],
        }
    }
}

impl TelemetryFixture {
    pub fn encode(&self) -> Vec<u8> {
        let schema = &*TELEMETRY_SCHEMA;
        let mut buf = vec![0u8; schema.size()];
        put(&mut buf, schema, "mID", Value::Int32(self.id));
        put(&mut buf, schema, "mDeltaTime", Value::Float64(0.01));
        put(&mut buf, schema, "mElapsedTime", Value::Float64(self.elapsed_time));
        put(&mut buf, schema, "mLapNumber", Value::Int32(self.lap_number));
        put(&mut buf, schema, "mLapStartET", Value::Float64(self.lap_start_et));
        put(&mut buf, schema, "mVehicleName", Value::Text(self.vehicle_name.clone()));
        put(&mut buf, schema, "mTrackName", Value::Text(self.track_name.clone()));
        put(&mut buf, schema, "mPos", self.position.to_value());
        put(&mut buf, schema, "mLocalVel", self.local_velocity.to_value());
        put(&mut buf, schema, "mGear", Value::Int32(self.gear));
        put(&mut buf, schema, "mEngineRPM", Value::Float64(self.engine_rpm));
        put(&mut buf, schema, "mUnfilteredThrottle", Value::Float64(self.throttle));
        put(&mut buf, schema, "mUnfilteredBrake", Value::Float64(self.brake));
        put(&mut buf, schema, "mUnfilteredSteering", Value::Float64(self.steering));
        put(&mut buf, schema, "mUnfilteredClutch", Value::Float64(self.clutch));

        for (i, (pressure, temps)) in
            self.tyre_pressure.iter().zip(&self.tyre_temperature).enumerate()
        {
            put(&mut buf, schema, &format!("mWheels[{i}].mPressure"), Value::Float64(*pressure));
            let temps = Value::Array(temps.iter().copied().map(Value::Float64).collect());
            put(&mut buf, schema, &format!("mWheels[{i}].mTemperature"), temps);
        }

        buf
    }
}

/// One scoring vehicle entry.
#[derive(Debug, Clone)]
pub struct VehicleFixture {
    pub id: i32,
    pub driver_name: String,
    pub vehicle_name: String,
    pub vehicle_class: String,
    pub is_player: bool,
    pub place: u8,
    pub total_laps: i16,
    pub sector: i8,
    pub lap_dist: f64,
    pub time_into_lap: f64,
    pub best_lap_time: f64,
    pub last_lap_time: f64,
    pub in_pits: bool,
}

impl VehicleFixture {
    pub fn new(id: i32) -> Self {
        Self {
            id,
            driver_name: format!("Driver {id}"),
            vehicle_name: format!("Car #{id}"),
            vehicle_class: "Hypercar".to_string(),
            is_player: false,
            place: 1,
            total_laps: 2,
            sector: 1,
            lap_dist: 1523.75,
            time_into_lap: 31.25,
            best_lap_time: 210.5,
            last_lap_time: 212.25,
            in_pits: false,
        }
    }

    pub fn player(id: i32) -> Self {
        Self { is_player: true, ..Self::new(id) }
    }

    fn write(&self, buf: &mut [u8], slot: usize, phase: u8) {
        let schema = &*SCORING_SCHEMA;
        let path = |field: &str| format!("mVehicles[{slot}].{field}");
        put(buf, schema, &path("mID"), Value::Int32(self.id));
        put(buf, schema, &path("mDriverName"), Value::Text(self.driver_name.clone()));
        put(buf, schema, &path("mVehicleName"), Value::Text(self.vehicle_name.clone()));
        put(buf, schema, &path("mVehicleClass"), Value::Text(self.vehicle_class.clone()));
        put(buf, schema, &path("mIsPlayer"), Value::Int8(self.is_player.into()));
        put(buf, schema, &path("mPlace"), Value::UInt8(self.place));
        put(buf, schema, &path("mTotalLaps"), Value::Int16(self.total_laps));
        put(buf, schema, &path("mSector"), Value::Int8(self.sector));
        put(buf, schema, &path("mLapDist"), Value::Float64(self.lap_dist));
        put(buf, schema, &path("mTimeIntoLap"), Value::Float64(self.time_into_lap));
        put(buf, schema, &path("mBestLapTime"), Value::Float64(self.best_lap_time));
        put(buf, schema, &path("mLastLapTime"), Value::Float64(self.last_lap_time));
        put(buf, schema, &path("mInPits"), Value::Int8(self.in_pits.into()));
        put(buf, schema, &path("mIndividualPhase"), Value::UInt8(phase));
    }
}

/// Contents of the scoring region.
#[derive(Debug, Clone)]
pub struct ScoringFixture {
    pub track_name: String,
    pub session: i32,
    pub current_et: f64,
    pub end_et: f64,
    pub max_laps: i32,
    pub track_length: f64,
    /// Written as-is, so it may disagree with `vehicles`
    pub num_vehicles: i32,
    /// Written to every entry's `mIndividualPhase`
    pub game_phase: u8,
    /// Entries keyed by array slot
    pub vehicles: Vec<(usize, VehicleFixture)>,
}

impl Default for ScoringFixture {
    fn default() -> Self {
        Self::with_player_at(0, 1, 42)
    }
}

impl ScoringFixture {
    /// `count` active vehicles with ids 1000+slot, except `player_slot` which
    /// carries `player_id`.
    pub fn with_player_at(player_slot: usize, count: usize, player_id: i32) -> Self {
        assert!(player_slot < count && count <= MAX_MAPPED_VEHICLES);
        let vehicles = (0..count)
            .map(|slot| {
                let entry = if slot == player_slot {
                    VehicleFixture::player(player_id)
                } else {
                    VehicleFixture::new(1000 + slot as i32)
                };
                (slot, entry)
            })
            .collect();

        Self {
            track_name: "Circuit de la Sarthe".to_string(),
            session: 10,
            current_et: 100.0,
            end_et: 86400.0,
            max_laps: 400,
            track_length: 13626.0,
            num_vehicles: count as i32,
            game_phase: GamePhase::GreenFlag.as_raw(),
            vehicles,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let schema = &*SCORING_SCHEMA;
        let mut buf = vec![0u8; schema.size()];
        put(&mut buf, schema, "mTrackName", Value::Text(self.track_name.clone()));
        put(&mut buf, schema, "mSession", Value::Int32(self.session));
        put(&mut buf, schema, "mCurrentET", Value::Float64(self.current_et));
        put(&mut buf, schema, "mEndET", Value::Float64(self.end_et));
        put(&mut buf, schema, "mMaxLaps", Value::Int32(self.max_laps));
        put(&mut buf, schema, "mLapDist", Value::Float64(self.track_length));
        put(&mut buf, schema, "mNumVehicles", Value::Int32(self.num_vehicles));
        for (slot, vehicle) in &self.vehicles {
            vehicle.write(&mut buf, *slot, self.game_phase);
        }
        buf
    }
}

/// Both plugin regions published into an in-memory registry.
#[derive(Debug, Clone)]
pub struct SimulatorFixture {
    pub registry: MemoryRegistry,
    pub telemetry: RegionWriter,
    pub scoring: RegionWriter,
}

impl SimulatorFixture {
    pub fn new(telemetry: &TelemetryFixture, scoring: &ScoringFixture) -> Self {
        let registry = MemoryRegistry::new();
        let telemetry = registry.publish(TELEMETRY_REGION_NAME, telemetry.encode());
        let scoring = registry.publish(SCORING_REGION_NAME, scoring.encode());
        Self { registry, telemetry, scoring }
    }

    /// Advance the telemetry clock, as a physics update would.
    pub fn tick_telemetry(&self, elapsed_time: f64) {
        self.telemetry
            .write_field(&TELEMETRY_SCHEMA, "mElapsedTime", &Value::Float64(elapsed_time))
            .expect("mElapsedTime is writable");
    }

    /// Advance the scoring clock, as a scoring update would.
    pub fn tick_scoring(&self, current_et: f64) {
        self.scoring
            .write_field(&SCORING_SCHEMA, "mCurrentET", &Value::Float64(current_et))
            .expect("mCurrentET is writable");
    }

    pub fn set_telemetry(&self, path: &str, value: Value) {
        self.telemetry
            .write_field(&TELEMETRY_SCHEMA, path, &value)
            .unwrap_or_else(|e| panic!("telemetry field {path}: {e}"));
    }

    pub fn set_scoring(&self, path: &str, value: Value) {
        self.scoring
            .write_field(&SCORING_SCHEMA, path, &value)
            .unwrap_or_else(|e| panic!("scoring field {path}: {e}"));
    }
}

impl Default for SimulatorFixture {
    fn default() -> Self {
        Self::new(&TelemetryFixture::default(), &ScoringFixture::default())
    }
}
