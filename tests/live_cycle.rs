//! End-to-end capture cycle through the public API
//!
//! Builds plugin-exact regions with the encoder, publishes them in memory and
//! drives a connection through connect, poll, session loss and reconnect.

use futures::StreamExt;
use rf2_capture::layout::write_field;
use rf2_capture::region::RegionWriter;
use rf2_capture::schema::{
    SCORING_REGION_NAME, SCORING_SCHEMA, TELEMETRY_REGION_NAME, TELEMETRY_SCHEMA, Vec3,
};
use rf2_capture::{
    ConnectionState, GamePhase, MemoryRegistry, ReaderConfig, Rf2Connection, TelemetryError, Value,
};
use std::time::Duration;

struct Sim {
    registry: MemoryRegistry,
    telemetry: RegionWriter,
    scoring: RegionWriter,
}

impl Sim {
    fn start(player_id: i32, player_slot: usize, vehicles: usize) -> Self {
        let mut telemetry = vec![0u8; TELEMETRY_SCHEMA.size()];
        let t = |buf: &mut Vec<u8>, path: &str, value: Value| {
            write_field(buf, &TELEMETRY_SCHEMA, path, &value).unwrap()
        };
        t(&mut telemetry, "mID", Value::Int32(player_id));
        t(&mut telemetry, "mElapsedTime", Value::Float64(1.0));
        t(&mut telemetry, "mLapStartET", Value::Float64(12.345));
        t(&mut telemetry, "mLocalVel", Vec3::new(10.0, 0.0, 0.0).to_value());
        t(&mut telemetry, "mGear", Value::Int32(3));
        t(&mut telemetry, "mEngineRPM", Value::Float64(6500.0));
        t(&mut telemetry, "mUnfilteredThrottle", Value::Float64(1.0));
        t(&mut telemetry, "mWheels[0].mTemperature[0]", Value::Float64(360.0));
        t(&mut telemetry, "mWheels[2].mPressure", Value::Float64(150.0));

        let mut scoring = vec![0u8; SCORING_SCHEMA.size()];
        let s = |buf: &mut Vec<u8>, path: &str, value: Value| {
            write_field(buf, &SCORING_SCHEMA, path, &value).unwrap()
        };
        s(&mut scoring, "mTrackName", Value::Text("Monza".into()));
        s(&mut scoring, "mCurrentET", Value::Float64(1.0));
        s(&mut scoring, "mNumVehicles", Value::Int32(vehicles as i32));
        for slot in 0..vehicles {
            let id = if slot == player_slot { player_id } else { 500 + slot as i32 };
            s(&mut scoring, &format!("mVehicles[{slot}].mID"), Value::Int32(id));
            s(&mut scoring, &format!("mVehicles[{slot}].mLapDist"), Value::Float64(slot as f64));
            s(
                &mut scoring,
                &format!("mVehicles[{slot}].mIndividualPhase"),
                Value::UInt8(GamePhase::GreenFlag.as_raw()),
            );
        }
        s(&mut scoring, &format!("mVehicles[{player_slot}].mIsPlayer"), Value::Int8(1));

        let registry = MemoryRegistry::new();
        let telemetry = registry.publish(TELEMETRY_REGION_NAME, telemetry);
        let scoring = registry.publish(SCORING_REGION_NAME, scoring);
        Self { registry, telemetry, scoring }
    }

    fn connection(&self) -> Rf2Connection<MemoryRegistry> {
        Rf2Connection::with_opener(self.registry.clone(), ReaderConfig::default())
    }

    fn advance(&self, et: f64) {
        self.telemetry.write_field(&TELEMETRY_SCHEMA, "mElapsedTime", &Value::Float64(et)).unwrap();
        self.scoring.write_field(&SCORING_SCHEMA, "mCurrentET", &Value::Float64(et)).unwrap();
    }
}

#[test]
fn connect_poll_and_reconnect() {
    let sim = Sim::start(42, 3, 10);
    let mut connection = sim.connection();

    connection.connect().unwrap();
    let point = connection.poll().unwrap().unwrap();
    assert_eq!(point.timestamp_ms, 12345);
    assert_eq!(point.speed_kmh, 36.0);
    assert_eq!(point.gear, 3);
    assert_eq!(point.rpm, 6500);
    assert_eq!(point.throttle, 1.0);
    assert_eq!(point.distance_m, 3.0);
    assert_eq!(point.tyre_temp_fl, 360.0);
    assert_eq!(point.tyre_press_rl, 150.0);
    assert!(connection.poll().unwrap().is_none());

    // The simulator quits: the open handles keep their last contents, so the
    // connection simply sees no new data.
    sim.registry.withdraw(TELEMETRY_REGION_NAME);
    sim.registry.withdraw(SCORING_REGION_NAME);
    assert!(connection.poll().unwrap().is_none());

    connection.disconnect();
    assert!(matches!(connection.connect(), Err(TelemetryError::RegionNotFound { .. })));
    assert_eq!(connection.state(), ConnectionState::Disconnected);

    let restarted = Sim::start(42, 0, 1);
    let mut connection = restarted.connection();
    connection.connect().unwrap();
    assert_eq!(connection.player_slot(), Some(0));
    assert!(connection.poll().unwrap().is_some());
}

#[test]
fn session_summary_is_available_while_connected() {
    let sim = Sim::start(7, 1, 2);
    let mut connection = sim.connection();
    assert!(connection.session().unwrap().is_none());

    connection.connect().unwrap();
    let session = connection.session().unwrap().unwrap();
    assert_eq!(session.track_name, "Monza");
    assert_eq!(session.vehicle_count, 2);
    assert_eq!(session.player.map(|p| p.id), Some(7));
}

#[tokio::test(start_paused = true)]
async fn stream_yields_each_new_frame_once() {
    let sim = Sim::start(42, 0, 4);
    let mut connection = sim.connection();
    connection.connect().unwrap();
    let mut samples = connection.samples();

    let mut seen = Vec::new();
    for step in 1..=3 {
        let point = samples.next().await.unwrap().unwrap();
        seen.push(point.timestamp_ms);
        sim.advance(1.0 + f64::from(step));
    }
    assert_eq!(seen.len(), 3);

    let idle = tokio::time::timeout(Duration::from_millis(30), async {
        // Consume the frame written by the last advance, then expect silence.
        samples.next().await;
        samples.next().await
    })
    .await;
    assert!(idle.is_err());
}
