//! Player configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Slowest rate the controller will ever apply.
pub const MIN_RATE: f64 = 0.25;
/// Fastest rate the controller will ever apply.
pub const MAX_RATE: f64 = 2.0;

/// Tunables for the controller and the engine loop.
///
/// Every field has a default, so a partial TOML table is enough to override a
/// single value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Loop-enforcement cadence in milliseconds. Overshoot past B is bounded by
    /// roughly `cadence * playback_rate`.
    pub loop_check_interval_ms: u64,
    /// How often the engine thread polls the backend for ticks, in milliseconds.
    pub tick_interval_ms: u64,
    pub min_rate: f64,
    pub max_rate: f64,
    pub default_rate: f64,
    pub default_volume: f64,
    /// Seconds moved by a single seek-forward/back step.
    pub seek_step: f64,
    /// Playback rate change per nudge.
    pub rate_step: f64,
    /// Ask the backend to keep pitch constant when the rate changes.
    pub preserve_pitch: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            loop_check_interval_ms: 100,
            tick_interval_ms: 50,
            min_rate: MIN_RATE,
            max_rate: MAX_RATE,
            default_rate: 1.0,
            default_volume: 1.0,
            seek_step: 5.0,
            rate_step: 0.05,
            preserve_pitch: true,
        }
    }
}

impl PlayerConfig {
    pub fn loop_check_interval(&self) -> Duration {
        Duration::from_millis(self.loop_check_interval_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Repair values that would break the controller's invariants.
    pub fn validated(mut self) -> Self {
        let defaults = PlayerConfig::default();

        if self.loop_check_interval_ms == 0 {
            log::warn!("loop_check_interval_ms must be positive, using default");
            self.loop_check_interval_ms = defaults.loop_check_interval_ms;
        }
        if self.tick_interval_ms == 0 {
            log::warn!("tick_interval_ms must be positive, using default");
            self.tick_interval_ms = defaults.tick_interval_ms;
        }
        // A configured range may narrow the rate domain, never widen it
        if !self.min_rate.is_finite() {
            self.min_rate = defaults.min_rate;
        }
        if !self.max_rate.is_finite() {
            self.max_rate = defaults.max_rate;
        }
        if self.min_rate < MIN_RATE || self.max_rate > MAX_RATE {
            log::warn!(
                "rate range [{}, {}] exceeds [{}, {}], narrowing",
                self.min_rate,
                self.max_rate,
                MIN_RATE,
                MAX_RATE
            );
            self.min_rate = self.min_rate.clamp(MIN_RATE, MAX_RATE);
            self.max_rate = self.max_rate.clamp(MIN_RATE, MAX_RATE);
        }
        if self.max_rate < self.min_rate {
            log::warn!(
                "invalid rate range [{}, {}], using defaults",
                self.min_rate,
                self.max_rate
            );
            self.min_rate = defaults.min_rate;
            self.max_rate = defaults.max_rate;
        }
        self.default_rate = clamp_or(self.default_rate, self.min_rate, self.max_rate, 1.0);
        self.default_volume = clamp_or(self.default_volume, 0.0, 1.0, 1.0);
        if !(self.seek_step.is_finite() && self.seek_step > 0.0) {
            self.seek_step = defaults.seek_step;
        }
        if !(self.rate_step.is_finite() && self.rate_step > 0.0) {
            self.rate_step = defaults.rate_step;
        }
        self
    }

    /// Clamp a requested playback rate into the configured domain.
    pub fn clamp_rate(&self, rate: f64) -> f64 {
        clamp_or(rate, self.min_rate, self.max_rate, self.default_rate)
    }
}

/// Clamp `value` into `[min, max]`, substituting `fallback` for NaN.
pub(crate) fn clamp_or(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_nan() {
        fallback.clamp(min, max)
    } else {
        value.clamp(min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_is_clamped_to_domain() {
        let cfg = PlayerConfig::default();
        assert_eq!(cfg.clamp_rate(5.0), 2.0);
        assert_eq!(cfg.clamp_rate(0.1), 0.25);
        assert_eq!(cfg.clamp_rate(1.5), 1.5);
        assert_eq!(cfg.clamp_rate(f64::NAN), 1.0);
    }

    #[test]
    fn validated_repairs_inverted_range_and_zero_cadence() {
        let cfg = PlayerConfig {
            min_rate: 3.0,
            max_rate: 1.0,
            loop_check_interval_ms: 0,
            default_volume: 4.0,
            ..PlayerConfig::default()
        }
        .validated();

        assert_eq!(cfg.min_rate, 0.25);
        assert_eq!(cfg.max_rate, 2.0);
        assert_eq!(cfg.loop_check_interval(), Duration::from_millis(100));
        assert_eq!(cfg.default_volume, 1.0);
    }

    #[test]
    fn validated_never_widens_rate_domain() {
        let cfg = PlayerConfig {
            min_rate: 0.01,
            max_rate: 8.0,
            default_rate: 4.0,
            ..PlayerConfig::default()
        }
        .validated();

        assert_eq!((cfg.min_rate, cfg.max_rate), (MIN_RATE, MAX_RATE));
        assert_eq!(cfg.default_rate, 2.0);
        assert_eq!(cfg.clamp_rate(5.0), 2.0);
        assert_eq!(cfg.clamp_rate(0.1), 0.25);
    }

    #[test]
    fn validated_keeps_narrower_rate_range() {
        let cfg = PlayerConfig {
            min_rate: 0.5,
            max_rate: 1.5,
            ..PlayerConfig::default()
        }
        .validated();

        assert_eq!(cfg.clamp_rate(0.3), 0.5);
        assert_eq!(cfg.clamp_rate(1.8), 1.5);
    }
}
