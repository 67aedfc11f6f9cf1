//! New-data detection across polls

/// Remembers the last observed writer clocks.
///
/// The plugin exposes no sequence counter, so the telemetry `mElapsedTime` and
/// scoring `mCurrentET` clocks stand in for one. A poll carries new data when
/// either clock differs from the previous accepted poll. Comparison is on the
/// exact bit pattern, so a NaN written twice still counts as unchanged.
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    telemetry_et: Option<f64>,
    scoring_et: Option<f64>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current clocks, returning whether either moved.
    ///
    /// The first observation after construction or [`reset`](Self::reset)
    /// always counts as new.
    pub fn observe(&mut self, telemetry_et: f64, scoring_et: f64) -> bool {
        let changed =
            !same(self.telemetry_et, telemetry_et) || !same(self.scoring_et, scoring_et);
        if changed {
            self.telemetry_et = Some(telemetry_et);
            self.scoring_et = Some(scoring_et);
        }
        changed
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Clocks of the last accepted poll.
    pub fn last_seen(&self) -> Option<(f64, f64)> {
        self.telemetry_et.zip(self.scoring_et)
    }
}

fn same(previous: Option<f64>, current: f64) -> bool {
    previous.is_some_and(|p| p.to_bits() == current.to_bits())
}
