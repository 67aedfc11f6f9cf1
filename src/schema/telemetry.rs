//! `rF2Telemetry` layout and typed view

use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};

use super::PLUGIN_PACK;
use crate::layout;
use crate::types::PrimitiveType::{Float32, Float64, Int32, UInt8};
use crate::types::{FromValue, Record, StructSchema, Value};
use crate::{Result, TelemetryError};

/// `rF2Vec3`: three doubles.
pub static VEC3_SCHEMA: LazyLock<Arc<StructSchema>> = LazyLock::new(|| {
    StructSchema::builder("rF2Vec3", PLUGIN_PACK)
        .scalar("x", Float64)
        .scalar("y", Float64)
        .scalar("z", Float64)
        .build()
        .expect("rF2Vec3 layout is valid")
});

/// `rF2Wheel`: per-corner suspension and tyre state.
pub static WHEEL_SCHEMA: LazyLock<Arc<StructSchema>> = LazyLock::new(|| {
    StructSchema::builder("rF2Wheel", PLUGIN_PACK)
        .scalar("mSuspensionDeflection", Float64)
        .scalar("mRideHeight", Float64)
        .scalar("mSuspForce", Float64)
        .scalar("mBrakeTemp", Float64)
        .scalar("mBrakePressure", Float64)
        .scalar("mRotation", Float64)
        .scalar("mLateralPatchVel", Float64)
        .scalar("mLongitudinalPatchVel", Float64)
        .scalar("mLateralGroundVel", Float64)
        .scalar("mLongitudinalGroundVel", Float64)
        .scalar("mCamber", Float64)
        .scalar("mLateralForce", Float64)
        .scalar("mLongitudinalForce", Float64)
        .scalar("mTireLoad", Float64)
        .scalar("mGripFract", Float64)
        .scalar("mPressure", Float64)
        .array("mTemperature", Float64, 3)
        .scalar("mWear", Float64)
        .text("mTerrainName", 16)
        .scalar("mSurfaceType", UInt8)
        .scalar("mFlat", UInt8)
        .scalar("mDetached", UInt8)
        .scalar("mStaticUndeflectedRadius", UInt8)
        .scalar("mVerticalTireDeflection", Float64)
        .scalar("mWheelYLocation", Float64)
        .scalar("mToe", Float64)
        .scalar("mTireCarcassTemperature", Float64)
        .array("mTireInnerLayerTemperature", Float64, 3)
        .bytes("mExpansion", 24)
        .build()
        .expect("rF2Wheel layout is valid")
});

/// `rF2VehicleTelemetry`: the physics state of the player's vehicle.
pub static TELEMETRY_SCHEMA: LazyLock<Arc<StructSchema>> = LazyLock::new(|| {
    let vec3 = &*VEC3_SCHEMA;
    StructSchema::builder("rF2VehicleTelemetry", PLUGIN_PACK)
        // Time
        .scalar("mID", Int32)
        .scalar("mDeltaTime", Float64)
        .scalar("mElapsedTime", Float64)
        .scalar("mLapNumber", Int32)
        .scalar("mLapStartET", Float64)
        .text("mVehicleName", 64)
        .text("mTrackName", 64)
        // Position and derivatives
        .nested("mPos", vec3)
        .nested("mLocalVel", vec3)
        .nested("mLocalAccel", vec3)
        // Orientation and derivatives
        .nested_array("mOri", vec3, 3)
        .nested("mLocalRot", vec3)
        .nested("mLocalRotAccel", vec3)
        // Vehicle status
        .scalar("mGear", Int32)
        .scalar("mEngineRPM", Float64)
        .scalar("mEngineWaterTemp", Float64)
        .scalar("mEngineOilTemp", Float64)
        .scalar("mClutchRPM", Float64)
        // Driver input
        .scalar("mUnfilteredThrottle", Float64)
        .scalar("mUnfilteredBrake", Float64)
        .scalar("mUnfilteredSteering", Float64)
        .scalar("mUnfilteredClutch", Float64)
        // Filtered input
        .scalar("mFilteredThrottle", Float64)
        .scalar("mFilteredBrake", Float64)
        .scalar("mFilteredSteering", Float64)
        .scalar("mFilteredClutch", Float64)
        // Misc
        .scalar("mSteeringShaftTorque", Float64)
        .scalar("mFront3rdDeflection", Float64)
        .scalar("mRear3rdDeflection", Float64)
        // Aerodynamics
        .scalar("mFrontWingHeight", Float64)
        .scalar("mFrontRideHeight", Float64)
        .scalar("mRearRideHeight", Float64)
        .scalar("mDrag", Float64)
        .scalar("mFrontDownforce", Float64)
        .scalar("mRearDownforce", Float64)
        // State and damage
        .scalar("mFuel", Float64)
        .scalar("mEngineMaxRPM", Float64)
        .scalar("mScheduledStops", UInt8)
        .scalar("mOverheating", UInt8)
        .scalar("mDetached", UInt8)
        .scalar("mHeadlights", UInt8)
        .bytes("mDentSeverity", 8)
        .scalar("mLastImpactET", Float64)
        .scalar("mLastImpactMagnitude", Float64)
        .nested("mLastImpactPos", vec3)
        // Expanded
        .scalar("mEngineTorque", Float64)
        .scalar("mCurrentSector", Int32)
        .scalar("mSpeedLimiter", UInt8)
        .scalar("mMaxGears", UInt8)
        .scalar("mFrontTireCompoundIndex", UInt8)
        .scalar("mRearTireCompoundIndex", UInt8)
        .scalar("mFuelCapacity", Float64)
        .scalar("mFrontFlapActivated", UInt8)
        .scalar("mRearFlapActivated", UInt8)
        .scalar("mRearFlapLegalStatus", UInt8)
        .scalar("mIgnitionStarter", UInt8)
        .text("mFrontTireCompoundName", 18)
        .text("mRearTireCompoundName", 18)
        .scalar("mSpeedLimiterAvailable", UInt8)
        .scalar("mAntiStallActivated", UInt8)
        .bytes("mUnused", 2)
        .scalar("mVisualSteeringWheelRange", Float32)
        .scalar("mRearBrakeBias", Float64)
        .scalar("mTurboBoostPressure", Float64)
        .array("mPhysicsToGraphicsOffset", Float32, 3)
        .scalar("mPhysicalSteeringWheelRange", Float32)
        .bytes("mExpansion", 152)
        .nested_array("mWheels", &WHEEL_SCHEMA, 4)
        .build()
        .expect("rF2VehicleTelemetry layout is valid")
});

/// Plain 3D vector in the simulator's world or local frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean length.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Record form used by the encoder.
    pub fn to_value(&self) -> Value {
        let mut record = Record::with_capacity(3);
        record.insert("x", Value::Float64(self.x));
        record.insert("y", Value::Float64(self.y));
        record.insert("z", Value::Float64(self.z));
        Value::Struct(record)
    }
}

impl FromValue for Vec3 {
    fn from_value(value: &Value) -> Result<Self> {
        let record = value.as_record().ok_or_else(|| TelemetryError::TypeConversion {
            details: format!("Expected Struct for rF2Vec3, got {}", value.kind_name()),
        })?;
        Ok(Vec3 { x: record.get("x")?, y: record.get("y")?, z: record.get("z")? })
    }
}

/// Wheel corners in plugin array order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    FrontLeft = 0,
    FrontRight = 1,
    RearLeft = 2,
    RearRight = 3,
}

impl Corner {
    pub const ALL: [Corner; 4] =
        [Corner::FrontLeft, Corner::FrontRight, Corner::RearLeft, Corner::RearRight];
}

/// Extracted per-corner state.
#[derive(Debug, Clone, PartialEq)]
pub struct WheelState {
    pub suspension_deflection: f64,
    pub ride_height: f64,
    pub brake_temp: f64,
    pub rotation: f64,
    pub camber: f64,
    pub tire_load: f64,
    pub grip_fract: f64,
    /// Tyre pressure, kPa
    pub pressure: f64,
    /// Left, center and right tread temperature, Kelvin
    pub temperature: [f64; 3],
    pub wear: f64,
    pub terrain_name: String,
    pub flat: bool,
    pub detached: bool,
    pub carcass_temperature: f64,
}

impl FromValue for WheelState {
    fn from_value(value: &Value) -> Result<Self> {
        let wheel = value.as_record().ok_or_else(|| TelemetryError::TypeConversion {
            details: format!("Expected Struct for rF2Wheel, got {}", value.kind_name()),
        })?;

        let temps: Vec<f64> = wheel.get("mTemperature")?;
        let temperature: [f64; 3] = temps.try_into().map_err(|v: Vec<f64>| {
            TelemetryError::TypeConversion {
                details: format!("Expected 3 tread temperatures, got {}", v.len()),
            }
        })?;

        Ok(WheelState {
            suspension_deflection: wheel.get("mSuspensionDeflection")?,
            ride_height: wheel.get("mRideHeight")?,
            brake_temp: wheel.get("mBrakeTemp")?,
            rotation: wheel.get("mRotation")?,
            camber: wheel.get("mCamber")?,
            tire_load: wheel.get("mTireLoad")?,
            grip_fract: wheel.get("mGripFract")?,
            pressure: wheel.get("mPressure")?,
            temperature,
            wear: wheel.get("mWear")?,
            terrain_name: wheel.get("mTerrainName")?,
            flat: wheel.get("mFlat")?,
            detached: wheel.get("mDetached")?,
            carcass_temperature: wheel.get("mTireCarcassTemperature")?,
        })
    }
}

/// Decoded telemetry region.
///
/// Accessors fail with [`TelemetryError::MissingField`] when the underlying
/// record lacks the field, which only happens for records built by hand.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRecord {
    record: Record,
}

impl TelemetryRecord {
    /// Decode a full telemetry snapshot.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        layout::decode(bytes, &TELEMETRY_SCHEMA).map(Self::from_record)
    }

    pub fn from_record(record: Record) -> Self {
        Self { record }
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn into_record(self) -> Record {
        self.record
    }

    /// Slot identifier; non-positive until the plugin has populated it.
    pub fn id(&self) -> Result<i32> {
        self.record.get("mID")
    }

    pub fn delta_time(&self) -> Result<f64> {
        self.record.get("mDeltaTime")
    }

    /// Game session time, seconds. Advances with every physics update.
    pub fn elapsed_time(&self) -> Result<f64> {
        self.record.get("mElapsedTime")
    }

    pub fn lap_number(&self) -> Result<i32> {
        self.record.get("mLapNumber")
    }

    /// Session time at which the current lap started, seconds.
    pub fn lap_start_et(&self) -> Result<f64> {
        self.record.get("mLapStartET")
    }

    pub fn vehicle_name(&self) -> Result<String> {
        self.record.get("mVehicleName")
    }

    pub fn track_name(&self) -> Result<String> {
        self.record.get("mTrackName")
    }

    /// World position, meters.
    pub fn position(&self) -> Result<Vec3> {
        self.record.get("mPos")
    }

    /// Velocity in the vehicle's local frame, m/s.
    pub fn local_velocity(&self) -> Result<Vec3> {
        self.record.get("mLocalVel")
    }

    pub fn local_acceleration(&self) -> Result<Vec3> {
        self.record.get("mLocalAccel")
    }

    /// Rows of the world orientation matrix.
    pub fn orientation(&self) -> Result<[Vec3; 3]> {
        let rows: Vec<Vec3> = self.record.get("mOri")?;
        rows.try_into().map_err(|rows: Vec<Vec3>| TelemetryError::TypeConversion {
            details: format!("Expected 3 orientation rows, got {}", rows.len()),
        })
    }

    /// Gear: negative is reverse, zero is neutral.
    pub fn gear(&self) -> Result<i32> {
        self.record.get("mGear")
    }

    pub fn engine_rpm(&self) -> Result<f64> {
        self.record.get("mEngineRPM")
    }

    pub fn engine_max_rpm(&self) -> Result<f64> {
        self.record.get("mEngineMaxRPM")
    }

    pub fn engine_water_temp(&self) -> Result<f64> {
        self.record.get("mEngineWaterTemp")
    }

    pub fn engine_oil_temp(&self) -> Result<f64> {
        self.record.get("mEngineOilTemp")
    }

    pub fn unfiltered_throttle(&self) -> Result<f64> {
        self.record.get("mUnfilteredThrottle")
    }

    pub fn unfiltered_brake(&self) -> Result<f64> {
        self.record.get("mUnfilteredBrake")
    }

    /// Raw steering input, -1.0 (left) to 1.0 (right).
    pub fn unfiltered_steering(&self) -> Result<f64> {
        self.record.get("mUnfilteredSteering")
    }

    pub fn unfiltered_clutch(&self) -> Result<f64> {
        self.record.get("mUnfilteredClutch")
    }

    pub fn filtered_throttle(&self) -> Result<f64> {
        self.record.get("mFilteredThrottle")
    }

    pub fn filtered_brake(&self) -> Result<f64> {
        self.record.get("mFilteredBrake")
    }

    pub fn filtered_steering(&self) -> Result<f64> {
        self.record.get("mFilteredSteering")
    }

    pub fn filtered_clutch(&self) -> Result<f64> {
        self.record.get("mFilteredClutch")
    }

    pub fn fuel(&self) -> Result<f64> {
        self.record.get("mFuel")
    }

    pub fn current_sector(&self) -> Result<i32> {
        self.record.get("mCurrentSector")
    }

    pub fn wheel(&self, corner: Corner) -> Result<WheelState> {
        let path = format!("mWheels[{}]", corner as usize);
        self.record.get_path(&path)
    }

    /// All four wheels, front-left first.
    pub fn wheels(&self) -> Result<[WheelState; 4]> {
        let [fl, fr, rl, rr] = Corner::ALL;
        Ok([self.wheel(fl)?, self.wheel(fr)?, self.wheel(rl)?, self.wheel(rr)?])
    }
}
