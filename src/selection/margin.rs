//! Switch-hysteresis margin.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How much faster a challenger must be before the held best is replaced.
///
/// In TOML: `switch_margin = { relative = 0.1 }` or `switch_margin = { absolute_ms = 20 }`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchMargin {
    /// Fraction of the incumbent's RTT.
    Relative(f64),
    /// Fixed number of milliseconds.
    AbsoluteMs(u64),
}

impl SwitchMargin {
    /// True when `challenger` beats `incumbent` by strictly more than the margin.
    pub fn exceeded_by(&self, incumbent: Duration, challenger: Duration) -> bool {
        if challenger >= incumbent {
            return false;
        }
        let gain = incumbent - challenger;
        match *self {
            SwitchMargin::Relative(ratio) => gain.as_secs_f64() > incumbent.as_secs_f64() * ratio,
            SwitchMargin::AbsoluteMs(ms) => gain > Duration::from_millis(ms),
        }
    }
}
