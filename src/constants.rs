// Base tuning constants. Most of the gameplay-relevant values are mirrored in
// SimConfig (src/config.rs) so they can be overridden from assets/sim.toml;
// the values here are the authoritative defaults.

// ===== CITY GENERATION =====

pub const CITY_SIZE: f32 = 100.0;
pub const BUILDING_MAX_HEIGHT: f32 = 15.0;
pub const BUILDING_MIN_HEIGHT: f32 = 2.5;
pub const BUILDING_SPACING: f32 = 2.5;
pub const ROAD_WIDTH: f32 = 1.5;
pub const BUILDING_SKIP_CHANCE: f32 = 0.07; // Fraction of grid slots left empty
pub const BUILDING_HEIGHT_BIAS: f32 = 1.8;  // pow(rand, bias) skews the skyline low

// ===== BOMB BALLISTICS =====

pub const BOMB_FALL_SPEED: f32 = 90.0;
pub const BOMB_START_HEIGHT: f32 = 160.0;
pub const DETONATION_HEIGHT: f32 = 0.0; // Ground impact

// ===== BLAST =====

pub const BLAST_RADIUS: f32 = 38.0;
pub const BLAST_FORCE: f32 = 85.0;
pub const DAMAGE_FALLOFF_EXPONENT: f32 = 1.5; // Soft-edge probability curve shape
pub const DAMAGE_OVERKILL: f32 = 1.8;         // Probability multiplier before the 1.0 clamp

// ===== POWER SCALING =====

pub const POWER_FACTOR_MIN: f32 = 0.2;
pub const POWER_FACTOR_MAX: f32 = 2.2;
pub const POWER_CONTROL_STEP: f32 = 0.05;   // Normalized control increment per key press
pub const SHAKE_POWER_CAP: f32 = 1.5;       // Caps keep runaway power settings watchable
pub const FLASH_POWER_CAP: f32 = 2.0;
pub const VOLUME_POWER_CAP: f32 = 1.5;

// ===== FRAGMENT PHYSICS =====

pub const GRAVITY: f32 = 9.8;
pub const FRAGMENT_COUNT: usize = 12;           // Fragments per destroyed building
pub const FRAGMENT_GRAVITY_SCALE: f32 = 1.5;    // Exaggerated fall for snappier debris
pub const FRAGMENT_RESTITUTION: f32 = 0.3;
pub const FRAGMENT_GROUND_DAMPING: f32 = 0.8;   // Horizontal velocity kept per bounce
pub const FRAGMENT_ANGULAR_DAMPING: f32 = 0.7;
pub const FRAGMENT_SPIN_RANGE: f32 = 15.0;      // Angular velocity per axis, rad/s
pub const FRAGMENT_SETTLE_THRESHOLD_SQ: f32 = 0.1;
pub const FRAGMENT_REST_MIN: f32 = 8.0;         // Settled fragments linger this long
pub const FRAGMENT_REST_MAX: f32 = 13.0;
pub const FRAGMENT_MAX_AGE: f32 = 20.0;
pub const FRAGMENT_KILL_DEPTH: f32 = -20.0;
pub const FRAGMENT_BOUNDS_SCALE: f32 = 1.2;     // Horizontal expiry at city half-size x this

// ===== SHARED EXPLOSION EFFECTS =====
// Sizes are ratios of the effective blast radius; durations are fixed.

pub const FIREBALL_SIZE_RATIO: f32 = 0.6;
pub const FIREBALL_DURATION: f32 = 0.8;
pub const SHOCKWAVE_SIZE_RATIO: f32 = 1.5;
pub const SHOCKWAVE_DURATION: f32 = 1.2;
pub const SHOCKWAVE_THICKNESS: f32 = 1.5;
pub const GROUND_SCAR_SIZE_RATIO: f32 = 0.8;
pub const GROUND_SCAR_DURATION: f32 = 30.0;
pub const SMOKE_COLUMN_HEIGHT_RATIO: f32 = 3.5;
pub const SMOKE_COLUMN_TOP_RADIUS_RATIO: f32 = 1.2;
pub const SMOKE_COLUMN_DURATION: f32 = 15.0;
pub const SMOKE_COLUMN_SPIN: f32 = 0.05; // Slow continuous y rotation, rad/s

// ===== SMOKE PARTICLE POOL =====

pub const SMOKE_PARTICLE_COUNT: usize = 7000;
pub const SMOKE_MAX_AGE: f32 = 8.0;
pub const SMOKE_SPREAD_RATIO: f32 = 0.8;      // Of effective blast radius
pub const SMOKE_RISE_RATIO: f32 = 0.9;
pub const SMOKE_PARKING_DEPTH: f32 = -1000.0; // Dead slots sit here until reuse

// ===== CAMERA SHAKE =====

pub const MAX_SHAKE_INTENSITY: f32 = 0.25;
pub const SHAKE_DURATION: f32 = 0.7;

// ===== SCREEN FLASH =====

pub const BASE_DIRECTIONAL_INTENSITY: f32 = 0.75;
pub const BASE_AMBIENT_INTENSITY: f32 = 0.45;
pub const FLASH_DIRECTIONAL_INTENSITY: f32 = 6.0;
pub const FLASH_AMBIENT_INTENSITY: f32 = 1.2;
pub const FLASH_HOLD_SECS: f32 = 0.13;     // Deferred restore fires after this
pub const FLASH_RECOVERY_SECS: f32 = 2.0;  // Quadratic ease-out back to base

// ===== PEDESTRIANS =====

pub const PEDESTRIAN_COUNT: usize = 140;
pub const PEDESTRIAN_SPEED_MIN: f32 = 0.8;
pub const PEDESTRIAN_SPEED_MAX: f32 = 2.2;
pub const PEDESTRIAN_TURN_PROBABILITY: f32 = 0.005; // Per-frame random re-heading
pub const PEDESTRIAN_BOUNDARY_SCALE: f32 = 0.9;     // Soft bound at city half-size x this
pub const PEDESTRIAN_CLEARANCE: f32 = 0.6;          // Margin around building footprints
pub const PEDESTRIAN_PLACEMENT_ATTEMPTS: usize = 25;
pub const LIMB_SWING_AMPLITUDE: f32 = 0.6;          // Radians about the pivot
pub const GAIT_FREQUENCY: f32 = 2.6;                // Cycle rate per unit of walk speed

// ===== AUDIO =====

pub const AUDIO_SAMPLE_RATE: u32 = 44100;
pub const MASTER_EXPLOSION_GAIN: f32 = 0.75;
pub const FALLING_SOUND_SECS: f32 = 4.0;
pub const FALLING_SWEEP_SECS: f32 = 3.5;   // Pitch drop 1300 -> 250 Hz over this window
pub const EXPLOSION_SOUND_SECS: f32 = 4.5;

// ===== SPATIAL GRID =====

pub const GRID_CELL_SIZE: f32 = 10.0;
pub const GRID_SIZE: i32 = 32; // Cells per side, covers +/-160 around the origin

// ===== FRAME DRIVER =====

pub const MAX_FRAME_DT: f32 = 0.05; // Delta clamp against long pauses
