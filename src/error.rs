//! Simulation error types.
//!
//! Nothing in the core is allowed to halt the frame loop: every variant here
//! describes a degradation (missing audio device, thinner pedestrian
//! population, config fallback), not a fatal condition. Callers log the error
//! and continue with reduced fidelity.

use std::fmt;

#[derive(Debug)]
pub enum SimError {
    /// No audio output device could be opened at startup. The audio engine is
    /// disabled for the rest of the run and every audio call becomes a no-op.
    AudioUnavailable {
        reason: String,
    },

    /// Pedestrian placement ran out of attempts before reaching the requested
    /// population. The city keeps the smaller population.
    PlacementExhausted {
        placed: usize,
        requested: usize,
    },

    /// The optional config file existed but could not be read or parsed.
    /// Compiled defaults are used instead.
    ConfigLoad {
        path: String,
        reason: String,
    },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::AudioUnavailable { reason } => {
                write!(f, "audio output unavailable, sound disabled: {}", reason)
            }
            SimError::PlacementExhausted { placed, requested } => write!(
                f,
                "pedestrian placement exhausted: placed {} of {} requested",
                placed, requested
            ),
            SimError::ConfigLoad { path, reason } => {
                write!(f, "failed to load config '{}': {}", path, reason)
            }
        }
    }
}

impl std::error::Error for SimError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_counts_for_placement_exhaustion() {
        let err = SimError::PlacementExhausted {
            placed: 97,
            requested: 140,
        };
        let msg = err.to_string();
        assert!(msg.contains("97"));
        assert!(msg.contains("140"));
    }

    #[test]
    fn display_mentions_path_for_config_load() {
        let err = SimError::ConfigLoad {
            path: "assets/sim.toml".into(),
            reason: "bad toml".into(),
        };
        assert!(err.to_string().contains("assets/sim.toml"));
    }
}
