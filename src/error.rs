//! Error types for shared-memory telemetry capture.
//!
//! Every failure in this crate is recoverable at the process level. Errors fall
//! into three groups:
//!
//! - **Connection errors**: the simulator is absent, not in a session, or the
//!   player's vehicle cannot be found ([`TelemetryError::RegionNotFound`],
//!   [`TelemetryError::InvalidSession`], [`TelemetryError::PlayerSlotUnresolved`]).
//!   The caller retries `connect()` later.
//! - **Layout errors**: the mapped buffer does not match the compiled-in plugin
//!   layout ([`TelemetryError::StructSizeMismatch`]). This is a version mismatch
//!   between the plugin and this crate and is not retried automatically.
//! - **Sample errors**: a single decoded record lacks a field the normalizer needs
//!   ([`TelemetryError::MissingField`]). The sample is dropped and polling continues.
//!
//! ```rust
//! use rf2_capture::TelemetryError;
//!
//! let error = TelemetryError::region_not_found("$rFactor2SMMP_Scoring$");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

#[cfg(windows)]
use windows_core as core;

/// Result type alias for telemetry operations.
pub type Result<T, E = TelemetryError> = std::result::Result<T, E>;

/// Main error type for telemetry operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TelemetryError {
    #[error("Shared memory region '{name}' not found")]
    RegionNotFound {
        name: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Shared memory region '{name}' is closed")]
    RegionClosed { name: String },

    #[error("No active session: {reason}")]
    InvalidSession { reason: String },

    #[error("Buffer size mismatch for {schema}: expected {expected} bytes, found {actual}")]
    StructSizeMismatch { schema: String, expected: usize, actual: usize },

    #[error("Player vehicle (id {player_id}) not found in scoring entries")]
    PlayerSlotUnresolved { player_id: i32 },

    #[error("Field '{field}' missing from decoded record")]
    MissingField { field: String },

    #[error("Type conversion error: {details}")]
    TypeConversion { details: String },

    #[error("Memory access out of bounds at offset {offset:#x}")]
    Memory { offset: usize },

    #[error("Schema definition invalid: {reason}")]
    Schema { reason: String },

    #[error("Configuration error: {details}")]
    Config { details: String },

    #[error("File error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{feature} is only available on {required_platform}")]
    UnsupportedPlatform { feature: String, required_platform: String },

    #[error("Windows API error: {operation}")]
    #[cfg(windows)]
    WindowsApi {
        operation: String,
        #[source]
        source: core::Error,
    },
}

impl TelemetryError {
    /// Returns whether a later `connect()` may succeed without intervention.
    pub fn is_retryable(&self) -> bool {
        match self {
            TelemetryError::RegionNotFound { .. } => true,
            TelemetryError::RegionClosed { .. } => true,
            TelemetryError::InvalidSession { .. } => true,
            TelemetryError::PlayerSlotUnresolved { .. } => true,
            TelemetryError::StructSizeMismatch { .. } => false,
            TelemetryError::MissingField { .. } => false,
            TelemetryError::TypeConversion { .. } => false,
            TelemetryError::Memory { .. } => false,
            TelemetryError::Schema { .. } => false,
            TelemetryError::Config { .. } => false,
            TelemetryError::File { .. } => false,
            TelemetryError::UnsupportedPlatform { .. } => false,
            #[cfg(windows)]
            TelemetryError::WindowsApi { .. } => false,
        }
    }

    /// Returns true when the error only invalidates a single sample.
    ///
    /// The poll loop logs these and yields no sample instead of failing.
    pub fn is_sample_fault(&self) -> bool {
        matches!(self, TelemetryError::MissingField { .. } | TelemetryError::TypeConversion { .. })
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TelemetryError::RegionNotFound { .. } | TelemetryError::RegionClosed { .. } => vec![
                "Ensure the simulator is running",
                "Check that the rFactor 2 shared memory plugin is enabled",
                "Retry the connection after a short delay",
            ],
            TelemetryError::InvalidSession { .. } => vec![
                "Load into a session and leave the garage",
                "Retry the connection once the session is running",
            ],
            TelemetryError::PlayerSlotUnresolved { .. } => vec![
                "Make sure you are driving (not spectating)",
                "Retry the connection after the car is on track",
            ],
            TelemetryError::StructSizeMismatch { .. } => vec![
                "Check the shared memory plugin version",
                "Update this library to a layout-compatible version",
            ],
            TelemetryError::MissingField { .. } => vec![
                "Verify the record schema contains the field",
                "Check for plugin layout changes",
            ],
            TelemetryError::TypeConversion { .. } => vec![
                "Check data type compatibility",
                "Verify expected vs actual data types",
            ],
            TelemetryError::Memory { .. } => vec![
                "Check the schema offsets against the buffer size",
                "Verify the region is still mapped",
            ],
            TelemetryError::Schema { .. } => vec![
                "Check field offsets and repeat counts",
                "Verify nested schema sizes",
            ],
            TelemetryError::Config { .. } => vec![
                "Check the configuration file syntax",
                "Compare field names with the documented defaults",
            ],
            TelemetryError::File { .. } => vec![
                "Check file exists and is readable",
                "Check file permissions",
            ],
            TelemetryError::UnsupportedPlatform { .. } => vec![
                "Use an in-memory region for cross-platform testing",
                "Check documentation for platform requirements",
            ],
            #[cfg(windows)]
            TelemetryError::WindowsApi { .. } => vec![
                "Check the shared memory plugin version",
                "Check Windows API permissions",
                "Verify system resources availability",
            ],
        }
    }

    /// Helper constructor for a missing region.
    pub fn region_not_found(name: impl Into<String>) -> Self {
        TelemetryError::RegionNotFound { name: name.into(), source: None }
    }

    /// Helper constructor for a missing region with the OS error attached.
    pub fn region_not_found_with_source(
        name: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        TelemetryError::RegionNotFound { name: name.into(), source: Some(source) }
    }

    /// Helper constructor for inactive sessions.
    pub fn invalid_session(reason: impl Into<String>) -> Self {
        TelemetryError::InvalidSession { reason: reason.into() }
    }

    /// Helper constructor for absent record fields.
    pub fn missing_field(field: impl Into<String>) -> Self {
        TelemetryError::MissingField { field: field.into() }
    }

    /// Helper constructor for schema definition errors.
    pub fn schema_error(reason: impl Into<String>) -> Self {
        TelemetryError::Schema { reason: reason.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(details: impl Into<String>) -> Self {
        TelemetryError::Config { details: details.into() }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        TelemetryError::File { path, source }
    }

    /// Helper constructor for Windows API errors.
    #[cfg(windows)]
    pub fn windows_api_error(operation: impl Into<String>, source: core::Error) -> Self {
        TelemetryError::WindowsApi { operation: operation.into(), source }
    }

    /// Helper constructor for unsupported platform errors.
    pub fn unsupported_platform(
        feature: impl Into<String>,
        required_platform: impl Into<String>,
    ) -> Self {
        TelemetryError::UnsupportedPlatform {
            feature: feature.into(),
            required_platform: required_platform.into(),
        }
    }
}

impl From<serde_yaml_ng::Error> for TelemetryError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        TelemetryError::Config { details: err.to_string() }
    }
}

#[cfg(windows)]
impl From<core::Error> for TelemetryError {
    fn from(err: core::Error) -> Self {
        TelemetryError::WindowsApi {
            operation: "Unknown Windows operation".to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn error_messages_carry_their_context(
            name in "[A-Za-z$_]{1,40}",
            field in "\\w+",
            expected in 1usize..100_000,
            actual in 0usize..100_000,
            player_id in any::<i32>(),
        ) {
            let region = TelemetryError::region_not_found(name.clone());
            prop_assert!(region.to_string().contains(&name));

            let missing = TelemetryError::missing_field(field.clone());
            prop_assert!(missing.to_string().contains(&field));

            let mismatch = TelemetryError::StructSizeMismatch {
                schema: "rF2ScoringInfo".to_string(),
                expected,
                actual,
            };
            let msg = mismatch.to_string();
            prop_assert!(msg.contains(&expected.to_string()));
            prop_assert!(msg.contains(&actual.to_string()));

            let unresolved = TelemetryError::PlayerSlotUnresolved { player_id };
            prop_assert!(unresolved.to_string().contains(&player_id.to_string()));
        }

        #[test]
        fn os_error_source_is_preserved(message in ".*") {
            let io = std::io::Error::new(std::io::ErrorKind::NotFound, message.clone());
            let error = TelemetryError::region_not_found_with_source("region", Box::new(io));

            let source = std::error::Error::source(&error);
            prop_assert!(source.is_some());
            prop_assert_eq!(source.map(|s| s.to_string()), Some(message));
        }
    }

    #[test]
    fn connection_level_errors_are_retryable() {
        assert!(TelemetryError::region_not_found("x").is_retryable());
        assert!(TelemetryError::invalid_session("garage").is_retryable());
        assert!(TelemetryError::PlayerSlotUnresolved { player_id: -1 }.is_retryable());

        let mismatch =
            TelemetryError::StructSizeMismatch { schema: "x".into(), expected: 8, actual: 4 };
        assert!(!mismatch.is_retryable());
    }

    #[cfg(windows)]
    #[test]
    fn mapping_failures_are_not_retried() {
        let error = TelemetryError::windows_api_error("MapViewOfFile", core::Error::from_thread());
        assert!(!error.is_retryable());
    }

    #[test]
    fn only_field_errors_are_sample_faults() {
        assert!(TelemetryError::missing_field("mPos").is_sample_fault());
        assert!(TelemetryError::TypeConversion { details: "x".into() }.is_sample_fault());
        assert!(!TelemetryError::region_not_found("x").is_sample_fault());
        assert!(!TelemetryError::invalid_session("x").is_sample_fault());
    }

    #[test]
    fn every_variant_has_suggestions() {
        let errors = vec![
            TelemetryError::region_not_found("x"),
            TelemetryError::RegionClosed { name: "x".into() },
            TelemetryError::invalid_session("x"),
            TelemetryError::PlayerSlotUnresolved { player_id: 3 },
            TelemetryError::StructSizeMismatch { schema: "x".into(), expected: 1, actual: 2 },
            TelemetryError::missing_field("x"),
            TelemetryError::Memory { offset: 0x10 },
            TelemetryError::schema_error("x"),
            TelemetryError::config_error("x"),
            TelemetryError::unsupported_platform("Mapping", "Windows"),
        ];

        for error in errors {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty(), "no suggestions for {error:?}");
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<TelemetryError>();
    }

    #[test]
    fn yaml_errors_convert_to_config() {
        let err = serde_yaml_ng::from_str::<u32>("not: [a number").unwrap_err();
        let converted: TelemetryError = err.into();
        assert!(matches!(converted, TelemetryError::Config { .. }));
    }
}
