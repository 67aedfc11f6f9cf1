//! Reader configuration
//!
//! All fields have defaults matching the stock plugin, so an empty YAML
//! document is a valid configuration:
//!
//! ```rust
//! use rf2_capture::ReaderConfig;
//!
//! let config = ReaderConfig::from_yaml_str("poll_interval_ms: 20\n").unwrap();
//! assert_eq!(config.poll_interval_ms, 20);
//! assert_eq!(config.scoring_region, "$rFactor2SMMP_Scoring$");
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::schema::{GamePhase, SCORING_REGION_NAME, TELEMETRY_REGION_NAME};
use crate::{Result, TelemetryError};

/// Directory searched for exported region files on Unix.
pub const DEFAULT_SHM_ROOT: &str = "/dev/shm";

/// Default cadence of [`SampleStream`](crate::SampleStream).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Name of the telemetry region
    pub telemetry_region: String,
    /// Name of the scoring region
    pub scoring_region: String,
    /// Directory holding region files on Unix hosts
    pub shm_root: PathBuf,
    /// Stream poll cadence, milliseconds
    pub poll_interval_ms: u64,
    /// Phases in which the session counts as inactive
    pub inactive_phases: Vec<GamePhase>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            telemetry_region: TELEMETRY_REGION_NAME.to_string(),
            scoring_region: SCORING_REGION_NAME.to_string(),
            shm_root: PathBuf::from(DEFAULT_SHM_ROOT),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            inactive_phases: vec![GamePhase::Garage],
        }
    }
}

impl ReaderConfig {
    /// Parse and validate YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: ReaderConfig = if yaml.trim().is_empty() {
            ReaderConfig::default()
        } else {
            serde_yaml_ng::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| TelemetryError::file_error(path.to_path_buf(), e))?;
        Self::from_yaml_str(&yaml)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.telemetry_region.trim().is_empty() {
            return Err(TelemetryError::config_error("telemetry_region must not be empty"));
        }
        if self.scoring_region.trim().is_empty() {
            return Err(TelemetryError::config_error("scoring_region must not be empty"));
        }
        if self.telemetry_region == self.scoring_region {
            return Err(TelemetryError::config_error(
                "telemetry_region and scoring_region must differ",
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(TelemetryError::config_error("poll_interval_ms must be greater than 0"));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Whether a raw `mIndividualPhase` value means no session is running.
    ///
    /// Values outside the known enumeration count as active.
    pub fn is_inactive_phase(&self, raw: u8) -> bool {
        GamePhase::from_raw(raw).is_some_and(|phase| self.inactive_phases.contains(&phase))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_documents_use_defaults() {
        assert_eq!(ReaderConfig::from_yaml_str("").unwrap(), ReaderConfig::default());
        assert_eq!(ReaderConfig::from_yaml_str("{}").unwrap(), ReaderConfig::default());
    }

    #[test]
    fn partial_documents_override_named_fields() {
        let yaml = "shm_root: /tmp/rf2\ninactive_phases: [Garage, SessionOver]\n";
        let config = ReaderConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.shm_root, PathBuf::from("/tmp/rf2"));
        assert_eq!(config.inactive_phases, vec![GamePhase::Garage, GamePhase::SessionOver]);
        assert_eq!(config.telemetry_region, TELEMETRY_REGION_NAME);
        assert!(config.is_inactive_phase(8));
        assert!(!config.is_inactive_phase(5));
    }

    #[test]
    fn unknown_phases_are_active() {
        let config = ReaderConfig::default();
        assert!(config.is_inactive_phase(0));
        assert!(!config.is_inactive_phase(42));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            ReaderConfig::from_yaml_str("poll_interval_ms: 0"),
            Err(TelemetryError::Config { .. })
        ));
        assert!(matches!(
            ReaderConfig::from_yaml_str("scoring_region: ''"),
            Err(TelemetryError::Config { .. })
        ));
        assert!(matches!(
            ReaderConfig::from_yaml_str("poll_interval_ms: [not, a, number]"),
            Err(TelemetryError::Config { .. })
        ));
        assert!(matches!(
            ReaderConfig::from_yaml_str("inactive_phases: [Lunch]"),
            Err(TelemetryError::Config { .. })
        ));
    }

    #[test]
    fn yaml_round_trip() {
        let config = ReaderConfig { poll_interval_ms: 25, ..ReaderConfig::default() };
        let yaml = config.to_yaml_string().unwrap();
        assert_eq!(ReaderConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn unreadable_files_are_file_errors() {
        let result = ReaderConfig::from_path("/nonexistent/rf2-capture.yaml");
        assert!(matches!(result, Err(TelemetryError::File { .. })));
    }
}
