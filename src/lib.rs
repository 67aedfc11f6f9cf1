//! Live telemetry capture from rFactor 2 and Le Mans Ultimate shared memory.
//!
//! The simulator's shared memory plugin publishes two fixed-layout regions: one
//! with the physics state of the local player's car and one with session and
//! per-vehicle scoring. This crate maps them read-only, decodes them against
//! the plugin's exact binary layout, finds the player's scoring entry and turns
//! each new frame into a simulator-agnostic [`CanonicalDataPoint`].
//!
//! # Features
//!
//! - **Schema-driven decoding**: declarative `#pragma pack(4)` tables, no
//!   `unsafe` struct casts
//! - **Pull-based polling**: `poll()` returns a sample only when the writer's
//!   clocks moved
//! - **Pluggable regions**: native Windows mappings, `/dev/shm` bridges on Unix,
//!   and in-memory regions for tests and replay
//! - **Async streams**: an interval-driven [`SampleStream`] for Tokio consumers
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use rf2_capture::{ReaderConfig, Rf2Connection};
//!
//! # fn main() -> rf2_capture::Result<()> {
//! let mut connection = Rf2Connection::new(ReaderConfig::default());
//! loop {
//!     match connection.connect() {
//!         Ok(()) => break,
//!         Err(e) if e.is_retryable() => std::thread::sleep(std::time::Duration::from_secs(1)),
//!         Err(e) => return Err(e),
//!     }
//! }
//!
//! while connection.is_connected() {
//!     if let Some(point) = connection.poll()? {
//!         println!("{} ms: {:.1} km/h", point.timestamp_ms, point.speed_kmh);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

// Core types and error handling
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Layout and decoding
pub mod layout;
pub mod schema;

// Regions and lifecycle
pub mod config;
pub mod connection;
pub mod region;

// Output
pub mod normalize;
pub mod sample;
pub mod session;
pub mod stream;

// Core exports
pub use error::*;
pub use types::{FromValue, PrimitiveType, Record, StructSchema, Value};

// Main API exports
pub use config::ReaderConfig;
pub use connection::{ConnectionState, Rf2Connection};
pub use normalize::normalize;
pub use region::{MemoryRegistry, PlatformOpener, RegionOpener, SharedRegion};
pub use sample::CanonicalDataPoint;
pub use schema::{GamePhase, ScoringRecord, SessionKind, TelemetryRecord, VehicleScoring};
pub use session::{PlayerStanding, SessionSnapshot};
pub use stream::SampleStream;
