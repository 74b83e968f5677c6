// Shared explosion effect timelines, camera shake, screen flash and the
// deferred task queue.
//
// The four blast effects (fireball, shockwave, ground scar, smoke column) are
// singletons reused across detonations: re-triggering resets the elapsed
// timer to zero and overwrites the stored magnitude, so overlapping blasts
// restart the shared effect at the newest parameters instead of queueing.
// `trigger`/`advance` are the only mutators of effect state; scale, opacity
// and color are pure functions of normalized life.
use bevy::prelude::*;
use rand::Rng;
use std::f32::consts::FRAC_PI_2;

use crate::constants::*;
use crate::types::sim_dt;

// ===== EFFECT TIMELINE =====

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EffectKind {
    Fireball,
    Shockwave,
    GroundScar,
    SmokeColumn,
}

pub const EFFECT_KINDS: [EffectKind; 4] = [
    EffectKind::Fireball,
    EffectKind::Shockwave,
    EffectKind::GroundScar,
    EffectKind::SmokeColumn,
];

#[derive(Clone, Copy)]
pub struct EffectState {
    pub visible: bool,
    /// Elapsed seconds since the last trigger; `f32::INFINITY` when dead.
    pub timer: f32,
    pub duration: f32,
    /// Power-scaled max size (or height for the smoke column), captured at
    /// the most recent detonation.
    pub magnitude: f32,
    /// Radial scale factor for the smoke column; 1.0 for the other kinds.
    pub radial: f32,
    pub origin: Vec3,
    /// Accumulated y rotation (smoke column only).
    pub spin: f32,
}

impl EffectState {
    fn dead(duration: f32) -> Self {
        Self {
            visible: false,
            timer: f32::INFINITY,
            duration,
            magnitude: 0.0,
            radial: 1.0,
            origin: Vec3::ZERO,
            spin: 0.0,
        }
    }

    /// Normalized life in [0, 1].
    pub fn life(&self) -> f32 {
        (self.timer / self.duration).min(1.0)
    }
}

#[derive(Resource)]
pub struct EffectPool {
    states: [EffectState; 4],
}

impl Default for EffectPool {
    fn default() -> Self {
        Self {
            states: [
                EffectState::dead(FIREBALL_DURATION),
                EffectState::dead(SHOCKWAVE_DURATION),
                EffectState::dead(GROUND_SCAR_DURATION),
                EffectState::dead(SMOKE_COLUMN_DURATION),
            ],
        }
    }
}

fn kind_index(kind: EffectKind) -> usize {
    match kind {
        EffectKind::Fireball => 0,
        EffectKind::Shockwave => 1,
        EffectKind::GroundScar => 2,
        EffectKind::SmokeColumn => 3,
    }
}

impl EffectPool {
    pub fn state(&self, kind: EffectKind) -> &EffectState {
        &self.states[kind_index(kind)]
    }

    /// Restart an effect at `origin` with a new magnitude. Overwrites any
    /// in-flight lifecycle of the same effect.
    pub fn trigger(&mut self, kind: EffectKind, origin: Vec3, magnitude: f32) {
        self.trigger_scaled(kind, origin, magnitude, 1.0);
    }

    /// As `trigger`, with an explicit radial factor (smoke column width).
    pub fn trigger_scaled(&mut self, kind: EffectKind, origin: Vec3, magnitude: f32, radial: f32) {
        let state = &mut self.states[kind_index(kind)];
        state.visible = true;
        state.timer = 0.0;
        state.magnitude = magnitude;
        state.radial = radial;
        state.origin = origin;
        state.spin = 0.0;
    }

    pub fn advance(&mut self, kind: EffectKind, dt: f32) {
        let state = &mut self.states[kind_index(kind)];
        if !state.visible || state.timer >= state.duration {
            return;
        }
        state.timer += dt;
        if kind == EffectKind::SmokeColumn {
            state.spin += dt * SMOKE_COLUMN_SPIN;
        }
        if state.life() >= 1.0 {
            state.visible = false;
        }
    }

    pub fn advance_all(&mut self, dt: f32) {
        for kind in EFFECT_KINDS {
            self.advance(kind, dt);
        }
    }
}

// ===== EFFECT CURVES =====

pub fn fireball_scale(life: f32, max_size: f32) -> f32 {
    0.1 + life * life * max_size
}

pub fn fireball_opacity(life: f32) -> f32 {
    (1.0 - life * 1.2).max(0.0)
}

/// Yellow-white at birth, cooling toward orange-red.
pub fn fireball_color(life: f32) -> Color {
    let hue = 0.1 * (1.0 - life) * 360.0;
    let lightness = 0.5 + 0.4 * (1.0 - life);
    Color::hsl(hue, 1.0, lightness)
}

pub fn shockwave_scale(life: f32, max_size: f32) -> f32 {
    life * max_size
}

pub fn shockwave_opacity(life: f32) -> f32 {
    (0.6 - life * 0.7).max(0.0)
}

pub fn ground_scar_opacity(life: f32) -> f32 {
    (0.75 * (1.0 - life)).max(0.0)
}

pub fn smoke_column_height_scale(life: f32) -> f32 {
    ((life * 1.1).min(1.0) * FRAC_PI_2).sin() * 1.2 + 0.1
}

pub fn smoke_column_width_scale(life: f32, radial: f32) -> f32 {
    (0.1 + life * 0.9) * radial
}

pub fn smoke_column_opacity(timer: f32, life: f32) -> f32 {
    let fade_in = (timer * 1.5).min(1.0);
    let fade_out = (1.0 - life * 0.8).max(0.0);
    fade_in * fade_out * 0.7
}

// ===== CAMERA SHAKE =====

#[derive(Resource, Default)]
pub struct CameraShake {
    pub intensity: f32,
    pub timer: f32,
    pub active: bool,
}

impl CameraShake {
    pub fn trigger(&mut self, intensity: f32) {
        self.active = true;
        self.intensity = intensity;
        self.timer = 0.0;
    }

    pub fn advance(&mut self, dt: f32) {
        if !self.active {
            return;
        }
        self.timer += dt;
        if self.timer >= SHAKE_DURATION {
            self.active = false;
        }
    }

    /// Linearly decaying intensity for the current frame.
    pub fn current_intensity(&self) -> f32 {
        if !self.active {
            return 0.0;
        }
        self.intensity * (1.0 - self.timer / SHAKE_DURATION)
    }

    /// Random positional offset for the camera this frame.
    pub fn offset(&self, rng: &mut impl Rng) -> Vec3 {
        let intensity = self.current_intensity();
        if intensity <= 0.0 {
            return Vec3::ZERO;
        }
        Vec3::new(
            (rng.gen::<f32>() - 0.5) * 2.0 * intensity,
            (rng.gen::<f32>() - 0.5) * 2.0 * intensity,
            (rng.gen::<f32>() - 0.5) * 2.0 * intensity,
        )
    }
}

// ===== SCREEN FLASH =====

enum FlashPhase {
    Idle,
    /// Holding peak intensity until the deferred restore task fires.
    Hold,
    Recover {
        elapsed: f32,
        from: (f32, f32),
    },
}

/// Light intensity state driven by detonations. The presentation layer maps
/// these to the actual scene lights; re-triggering mid-recovery overwrites
/// (last write wins).
#[derive(Resource)]
pub struct LightFlash {
    pub directional: f32,
    pub ambient: f32,
    phase: FlashPhase,
}

impl Default for LightFlash {
    fn default() -> Self {
        Self {
            directional: BASE_DIRECTIONAL_INTENSITY,
            ambient: BASE_AMBIENT_INTENSITY,
            phase: FlashPhase::Idle,
        }
    }
}

impl LightFlash {
    pub fn trigger(&mut self, scale: f32) {
        self.directional = FLASH_DIRECTIONAL_INTENSITY * scale;
        self.ambient = FLASH_AMBIENT_INTENSITY * scale;
        self.phase = FlashPhase::Hold;
    }

    /// Start easing back to base intensities from wherever we are now.
    /// Fired by the deferred restore task; tolerates the simulation having
    /// moved on since it was scheduled.
    pub fn begin_recovery(&mut self) {
        self.phase = FlashPhase::Recover {
            elapsed: 0.0,
            from: (self.directional, self.ambient),
        };
    }

    pub fn advance(&mut self, dt: f32) {
        if let FlashPhase::Recover { elapsed, from } = &mut self.phase {
            *elapsed += dt;
            let t = (*elapsed / FLASH_RECOVERY_SECS).min(1.0);
            let ease = 1.0 - (1.0 - t) * (1.0 - t); // quadratic out
            self.directional = from.0 + (BASE_DIRECTIONAL_INTENSITY - from.0) * ease;
            self.ambient = from.1 + (BASE_AMBIENT_INTENSITY - from.1) * ease;
            if t >= 1.0 {
                self.phase = FlashPhase::Idle;
            }
        }
    }
}

// ===== DEFERRED TASKS =====

/// Fire-and-forget side effects scheduled against simulated time instead of
/// wall-clock timers, drained once per frame by the frame driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeferredAction {
    RestoreLighting,
    ReleaseVoice(u64),
}

pub struct DelayedTask {
    pub remaining: f32,
    pub action: DeferredAction,
}

#[derive(Resource, Default)]
pub struct DelayedTasks {
    queue: Vec<DelayedTask>,
}

impl DelayedTasks {
    pub fn schedule(&mut self, delay: f32, action: DeferredAction) {
        self.queue.push(DelayedTask {
            remaining: delay,
            action,
        });
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Tick all timers by `dt` and return the actions that came due.
    pub fn drain_due(&mut self, dt: f32) -> Vec<DeferredAction> {
        let mut due = Vec::new();
        self.queue.retain_mut(|task| {
            task.remaining -= dt;
            if task.remaining <= 0.0 {
                due.push(task.action);
                false
            } else {
                true
            }
        });
        due
    }
}

// ===== SYSTEMS =====

pub fn drain_delayed_tasks(
    time: Res<Time>,
    mut tasks: ResMut<DelayedTasks>,
    mut flash: ResMut<LightFlash>,
    mut audio: ResMut<crate::audio::AudioEngine>,
) {
    for action in tasks.drain_due(sim_dt(&time)) {
        match action {
            DeferredAction::RestoreLighting => flash.begin_recovery(),
            DeferredAction::ReleaseVoice(id) => audio.release_voice(id),
        }
    }
}

pub fn advance_light_flash(time: Res<Time>, mut flash: ResMut<LightFlash>) {
    flash.advance(sim_dt(&time));
}

pub fn advance_camera_shake(time: Res<Time>, mut shake: ResMut<CameraShake>) {
    shake.advance(sim_dt(&time));
}

pub fn advance_effect_timelines(time: Res<Time>, mut pool: ResMut<EffectPool>) {
    pool.advance_all(sim_dt(&time));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effects_start_dead() {
        let pool = EffectPool::default();
        for kind in EFFECT_KINDS {
            let state = pool.state(kind);
            assert!(!state.visible);
            assert!(state.timer.is_infinite());
        }
    }

    #[test]
    fn trigger_resets_timer_and_magnitude() {
        let mut pool = EffectPool::default();
        pool.trigger(EffectKind::Fireball, Vec3::ZERO, 22.8);
        pool.advance(EffectKind::Fireball, 0.4);
        assert!(pool.state(EffectKind::Fireball).timer > 0.0);

        // A second detonation mid-lifecycle restarts the shared effect at
        // the new parameters: one lifecycle, never two.
        pool.trigger(EffectKind::Fireball, Vec3::new(5.0, 0.0, 0.0), 50.0);
        let state = pool.state(EffectKind::Fireball);
        assert_eq!(state.timer, 0.0);
        assert_eq!(state.magnitude, 50.0);
        assert_eq!(state.origin, Vec3::new(5.0, 0.0, 0.0));
        assert!(state.visible);
    }

    #[test]
    fn effect_hides_when_life_completes() {
        let mut pool = EffectPool::default();
        pool.trigger(EffectKind::Shockwave, Vec3::ZERO, 57.0);
        pool.advance(EffectKind::Shockwave, SHOCKWAVE_DURATION + 0.1);
        assert!(!pool.state(EffectKind::Shockwave).visible);
    }

    #[test]
    fn dead_effects_do_not_advance() {
        let mut pool = EffectPool::default();
        pool.advance_all(1.0);
        assert!(pool.state(EffectKind::GroundScar).timer.is_infinite());
    }

    #[test]
    fn fireball_curve_endpoints() {
        assert!((fireball_scale(0.0, 22.8) - 0.1).abs() < 1e-6);
        assert!((fireball_scale(1.0, 22.8) - 22.9).abs() < 1e-4);
        assert!((fireball_opacity(0.0) - 1.0).abs() < 1e-6);
        assert_eq!(fireball_opacity(1.0), 0.0);
    }

    #[test]
    fn shockwave_expands_linearly_and_fades() {
        assert_eq!(shockwave_scale(0.5, 60.0), 30.0);
        assert!((shockwave_opacity(0.0) - 0.6).abs() < 1e-6);
        assert_eq!(shockwave_opacity(1.0), 0.0);
    }

    #[test]
    fn smoke_column_height_eases_in() {
        let early = smoke_column_height_scale(0.1);
        let late = smoke_column_height_scale(0.9);
        assert!(early < late);
        // Half-sine tops out at 1.3 once life*1.1 saturates.
        assert!((smoke_column_height_scale(1.0) - 1.3).abs() < 1e-5);
    }

    #[test]
    fn smoke_column_opacity_fades_in_then_out() {
        let just_born = smoke_column_opacity(0.1, 0.1 / SMOKE_COLUMN_DURATION);
        let settled = smoke_column_opacity(1.0, 1.0 / SMOKE_COLUMN_DURATION);
        assert!(just_born < settled);
        assert!(smoke_column_opacity(SMOKE_COLUMN_DURATION, 1.0) < 0.15);
    }

    #[test]
    fn shake_decays_linearly_and_expires() {
        let mut shake = CameraShake::default();
        shake.trigger(0.25);
        assert_eq!(shake.current_intensity(), 0.25);
        shake.advance(SHAKE_DURATION / 2.0);
        assert!((shake.current_intensity() - 0.125).abs() < 1e-6);
        shake.advance(SHAKE_DURATION);
        assert!(!shake.active);
        assert_eq!(shake.current_intensity(), 0.0);
    }

    #[test]
    fn flash_recovers_to_base_intensities() {
        let mut flash = LightFlash::default();
        flash.trigger(2.0);
        assert_eq!(flash.directional, FLASH_DIRECTIONAL_INTENSITY * 2.0);

        // Holding: nothing changes until recovery begins.
        flash.advance(1.0);
        assert_eq!(flash.directional, FLASH_DIRECTIONAL_INTENSITY * 2.0);

        flash.begin_recovery();
        flash.advance(FLASH_RECOVERY_SECS + 0.1);
        assert!((flash.directional - BASE_DIRECTIONAL_INTENSITY).abs() < 1e-4);
        assert!((flash.ambient - BASE_AMBIENT_INTENSITY).abs() < 1e-4);
    }

    #[test]
    fn retrigger_during_recovery_wins() {
        let mut flash = LightFlash::default();
        flash.trigger(1.0);
        flash.begin_recovery();
        flash.advance(0.5);
        flash.trigger(1.5);
        assert_eq!(flash.directional, FLASH_DIRECTIONAL_INTENSITY * 1.5);
        // Still holding: the old recovery must not keep running.
        flash.advance(5.0);
        assert_eq!(flash.directional, FLASH_DIRECTIONAL_INTENSITY * 1.5);
    }

    #[test]
    fn delayed_tasks_fire_once_at_their_deadline() {
        let mut tasks = DelayedTasks::default();
        tasks.schedule(0.13, DeferredAction::RestoreLighting);
        tasks.schedule(4.5, DeferredAction::ReleaseVoice(7));

        assert!(tasks.drain_due(0.1).is_empty());
        let due = tasks.drain_due(0.05);
        assert_eq!(due, vec![DeferredAction::RestoreLighting]);
        assert_eq!(tasks.pending(), 1);

        let due = tasks.drain_due(10.0);
        assert_eq!(due, vec![DeferredAction::ReleaseVoice(7)]);
        assert_eq!(tasks.pending(), 0);
    }

    #[test]
    fn fireball_color_cools_toward_red() {
        // Hue decreases with life; compare via linear rgb: late-life color
        // should carry relatively less green than the newborn one.
        let early = fireball_color(0.0).to_linear();
        let late = fireball_color(0.95).to_linear();
        assert!(late.green < early.green);
    }

    #[test]
    fn smoke_column_spins_while_alive() {
        let mut pool = EffectPool::default();
        pool.trigger_scaled(EffectKind::SmokeColumn, Vec3::ZERO, 133.0, 1.0);
        pool.advance(EffectKind::SmokeColumn, 1.0);
        let spin = pool.state(EffectKind::SmokeColumn).spin;
        assert!((spin - SMOKE_COLUMN_SPIN).abs() < 1e-6);
    }

    #[test]
    fn column_width_uses_radial_factor() {
        let narrow = smoke_column_width_scale(0.5, 1.0);
        let wide = smoke_column_width_scale(0.5, 2.2);
        assert!((wide / narrow - 2.2).abs() < 1e-5);
    }

    #[test]
    fn curves_stay_finite_over_life() {
        for i in 0..=10 {
            let life = i as f32 / 10.0;
            assert!(fireball_scale(life, 22.8).is_finite());
            assert!(shockwave_opacity(life) >= 0.0);
            assert!(ground_scar_opacity(life) >= 0.0);
            assert!(smoke_column_height_scale(life) > 0.0);
        }
    }
}
