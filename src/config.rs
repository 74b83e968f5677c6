//! Runtime-tunable simulation configuration.
//!
//! [`SimConfig`] is a Bevy `Resource` mirroring the gameplay-relevant values
//! from `src/constants.rs`. At startup it is loaded from `assets/sim.toml`
//! when that file exists; missing keys fall back to the compiled defaults, so
//! a minimal TOML can override just the values you care about. An unreadable
//! or unparsable file logs a warning and falls back entirely — configuration
//! is optional, never fatal.

use bevy::prelude::*;
use serde::Deserialize;

use crate::constants::*;
use crate::error::SimError;

pub const CONFIG_PATH: &str = "assets/sim.toml";

#[derive(Resource, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // ── City ────────────────────────────────────────────────────────────────
    pub city_size: f32,
    pub building_max_height: f32,
    pub building_spacing: f32,
    pub road_width: f32,

    // ── Blast ───────────────────────────────────────────────────────────────
    pub blast_radius: f32,
    pub blast_force: f32,

    // ── Bomb ────────────────────────────────────────────────────────────────
    pub bomb_fall_speed: f32,
    pub bomb_start_height: f32,

    // ── Power control ───────────────────────────────────────────────────────
    pub power_min: f32,
    pub power_max: f32,

    // ── Debris ──────────────────────────────────────────────────────────────
    pub fragment_count: usize,

    // ── Smoke pool ──────────────────────────────────────────────────────────
    pub smoke_particle_count: usize,
    pub smoke_max_age: f32,

    // ── Pedestrians ─────────────────────────────────────────────────────────
    pub pedestrian_count: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            city_size: CITY_SIZE,
            building_max_height: BUILDING_MAX_HEIGHT,
            building_spacing: BUILDING_SPACING,
            road_width: ROAD_WIDTH,
            blast_radius: BLAST_RADIUS,
            blast_force: BLAST_FORCE,
            bomb_fall_speed: BOMB_FALL_SPEED,
            bomb_start_height: BOMB_START_HEIGHT,
            power_min: POWER_FACTOR_MIN,
            power_max: POWER_FACTOR_MAX,
            fragment_count: FRAGMENT_COUNT,
            smoke_particle_count: SMOKE_PARTICLE_COUNT,
            smoke_max_age: SMOKE_MAX_AGE,
            pedestrian_count: PEDESTRIAN_COUNT,
        }
    }
}

impl SimConfig {
    /// Half-size of the generated city footprint.
    pub fn city_half_size(&self) -> f32 {
        self.city_size / 2.0
    }

    pub fn load(path: &str) -> Result<Self, SimError> {
        let text = std::fs::read_to_string(path).map_err(|e| SimError::ConfigLoad {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        toml::from_str(&text).map_err(|e| SimError::ConfigLoad {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    /// Load from `path`, falling back to defaults when the file is absent or
    /// broken. Absence is the normal case and stays quiet; a broken file warns.
    pub fn load_or_default(path: &str) -> Self {
        if !std::path::Path::new(path).exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => {
                info!("Loaded simulation config from {}", path);
                config
            }
            Err(err) => {
                warn!("{}", err);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let config = SimConfig::default();
        assert_eq!(config.blast_radius, BLAST_RADIUS);
        assert_eq!(config.blast_force, BLAST_FORCE);
        assert_eq!(config.fragment_count, FRAGMENT_COUNT);
        assert_eq!(config.smoke_particle_count, SMOKE_PARTICLE_COUNT);
        assert_eq!(config.power_min, POWER_FACTOR_MIN);
        assert_eq!(config.power_max, POWER_FACTOR_MAX);
    }

    #[test]
    fn partial_toml_overrides_only_named_keys() {
        let config: SimConfig = toml::from_str("blast_radius = 20.0").unwrap();
        assert_eq!(config.blast_radius, 20.0);
        assert_eq!(config.blast_force, BLAST_FORCE);
        assert_eq!(config.pedestrian_count, PEDESTRIAN_COUNT);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = SimConfig::load_or_default("does/not/exist.toml");
        assert_eq!(config.city_size, CITY_SIZE);
    }
}
