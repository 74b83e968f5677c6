// Power scaling - maps the normalized UI control to the blast multiplier.
//
// The factor is sampled once per launch and stored on the bomb; every
// blast-derived magnitude (radius, force, effect sizes, smoke parameters,
// shake, flash, volume) is a base constant times that factor. Shake, flash
// and volume are additionally capped so extreme settings stay watchable.
use bevy::prelude::*;

use crate::config::SimConfig;
use crate::constants::*;

/// Normalized [0, 1] control value from the input surface.
#[derive(Resource)]
pub struct PowerSetting {
    pub normalized: f32,
}

impl Default for PowerSetting {
    fn default() -> Self {
        // Defaults to a factor of 1.0 with the standard 0.2..2.2 range.
        Self { normalized: 0.4 }
    }
}

impl PowerSetting {
    /// Linear map of the control value into the configured factor range.
    pub fn factor(&self, config: &SimConfig) -> f32 {
        let t = self.normalized.clamp(0.0, 1.0);
        config.power_min + t * (config.power_max - config.power_min)
    }

    pub fn adjust(&mut self, delta: f32) {
        self.normalized = (self.normalized + delta).clamp(0.0, 1.0);
    }
}

/// Camera shake multiplier, capped at 1.5x.
#[inline]
pub fn shake_scale(power_factor: f32) -> f32 {
    power_factor.min(SHAKE_POWER_CAP)
}

/// Screen flash multiplier, capped at 2.0x.
#[inline]
pub fn flash_scale(power_factor: f32) -> f32 {
    power_factor.min(FLASH_POWER_CAP)
}

/// Audio volume multiplier, capped at 1.5x.
#[inline]
pub fn volume_scale(power_factor: f32) -> f32 {
    power_factor.min(VOLUME_POWER_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factor_spans_configured_range() {
        let config = SimConfig::default();
        let mut power = PowerSetting { normalized: 0.0 };
        assert!((power.factor(&config) - POWER_FACTOR_MIN).abs() < 1e-6);
        power.normalized = 1.0;
        assert!((power.factor(&config) - POWER_FACTOR_MAX).abs() < 1e-6);
    }

    #[test]
    fn factor_is_strictly_monotonic_in_the_control_value() {
        let config = SimConfig::default();
        let mut last = f32::MIN;
        for i in 0..=20 {
            let power = PowerSetting {
                normalized: i as f32 / 20.0,
            };
            let factor = power.factor(&config);
            assert!(factor > last, "factor must increase with the control");
            last = factor;
        }
    }

    #[test]
    fn out_of_range_control_values_are_clamped() {
        let config = SimConfig::default();
        let low = PowerSetting { normalized: -2.0 };
        let high = PowerSetting { normalized: 7.0 };
        assert_eq!(low.factor(&config), POWER_FACTOR_MIN);
        assert_eq!(high.factor(&config), POWER_FACTOR_MAX);
    }

    #[test]
    fn adjust_saturates_at_the_control_bounds() {
        let mut power = PowerSetting { normalized: 0.95 };
        power.adjust(0.5);
        assert_eq!(power.normalized, 1.0);
        power.adjust(-3.0);
        assert_eq!(power.normalized, 0.0);
    }

    #[test]
    fn intensity_caps_only_bite_above_their_threshold() {
        assert_eq!(shake_scale(1.0), 1.0);
        assert_eq!(shake_scale(2.2), 1.5);
        assert_eq!(flash_scale(2.2), 2.0);
        assert_eq!(volume_scale(2.2), 1.5);
        assert_eq!(volume_scale(0.2), 0.2);
    }
}
