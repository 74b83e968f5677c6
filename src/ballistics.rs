// Bomb launch, ballistic fall and detonation resolution.
//
// Launch captures the power factor selected at that moment and starts the
// per-bomb falling voice. The fall system moves every active bomb down at a
// constant speed and writes a DetonationEvent on impact; the detonation
// system resolves those events in the same frame, before the effect
// timelines advance, so a blast is visible starting on its impact frame.
use bevy::prelude::*;
use rand::Rng;
use std::collections::HashSet;

use crate::audio::AudioEngine;
use crate::config::SimConfig;
use crate::constants::*;
use crate::effects::{CameraShake, DeferredAction, DelayedTasks, EffectKind, EffectPool, LightFlash};
use crate::fragments::build_fragments;
use crate::particles::SmokePool;
use crate::power::{flash_scale, shake_scale, volume_scale, PowerSetting};
use crate::types::*;

/// Probability policy for the soft-edged kill zone. The default curve is
/// `min(1, (1 - d/r)^exponent * overkill)`: near-certain destruction at the
/// core, rare at the rim.
#[derive(Resource, Clone, Copy)]
pub enum BlastFalloff {
    SoftEdge { exponent: f32, overkill: f32 },
    HardEdge,
}

impl Default for BlastFalloff {
    fn default() -> Self {
        BlastFalloff::SoftEdge {
            exponent: DAMAGE_FALLOFF_EXPONENT,
            overkill: DAMAGE_OVERKILL,
        }
    }
}

impl BlastFalloff {
    pub fn destruction_probability(&self, distance: f32, radius: f32) -> f32 {
        if distance >= radius {
            return 0.0;
        }
        match *self {
            BlastFalloff::SoftEdge { exponent, overkill } => {
                let damage_factor = (1.0 - distance / radius).powf(exponent);
                (damage_factor * overkill).min(1.0)
            }
            BlastFalloff::HardEdge => 1.0,
        }
    }
}

/// Consume launch requests: reject without a target, otherwise spawn a bomb
/// above the target carrying the current power factor and its whistle voice.
pub fn launch_system(
    mut requests: EventReader<LaunchRequest>,
    mut commands: Commands,
    mut target: ResMut<TargetState>,
    power: Res<PowerSetting>,
    config: Res<SimConfig>,
    mut status: ResMut<SimStatus>,
    mut audio: ResMut<AudioEngine>,
) {
    for _ in requests.read() {
        let Some(target_pos) = target.position.take() else {
            status.message = "No target set - pick a point first".to_string();
            continue;
        };

        let power_factor = power.factor(&config);
        let voice = audio.start_falling_voice();

        commands.spawn((
            ActiveBomb {
                target: target_pos,
                power_factor,
                voice,
            },
            Transform::from_xyz(target_pos.x, config.bomb_start_height, target_pos.z),
        ));

        status.message = format!("Attack launched at {:.1}x power", power_factor);
        info!(
            "Bomb away: target {:?}, power factor {:.2}",
            target_pos, power_factor
        );
    }
}

/// Constant-speed descent. Crossing the detonation altitude removes the bomb,
/// stops its whistle and hands the blast to the detonation system.
pub fn bomb_fall_system(
    mut commands: Commands,
    time: Res<Time>,
    config: Res<SimConfig>,
    mut bombs: Query<(Entity, &mut Transform, &ActiveBomb)>,
    mut detonations: EventWriter<DetonationEvent>,
    mut audio: ResMut<AudioEngine>,
) {
    let dt = sim_dt(&time);

    for (entity, mut transform, bomb) in bombs.iter_mut() {
        transform.translation.y -= config.bomb_fall_speed * dt;

        if transform.translation.y <= DETONATION_HEIGHT {
            let position = Vec3::new(transform.translation.x, 0.0, transform.translation.z);
            detonations.write(DetonationEvent {
                position,
                power_factor: bomb.power_factor,
            });
            if let Some(voice) = bomb.voice {
                audio.stop_voice(voice);
            }
            commands.entity(entity).despawn();
        }
    }
}

/// The central blast algorithm. Every magnitude is the base constant times
/// the bomb's captured power factor; multiple detonations in one frame run
/// independently.
pub fn detonation_system(
    mut commands: Commands,
    mut events: EventReader<DetonationEvent>,
    config: Res<SimConfig>,
    falloff: Res<BlastFalloff>,
    mut grid: ResMut<SpatialGrid>,
    mut effect_pool: ResMut<EffectPool>,
    mut shake: ResMut<CameraShake>,
    mut flash: ResMut<LightFlash>,
    mut tasks: ResMut<DelayedTasks>,
    mut smoke: ResMut<SmokePool>,
    mut audio: ResMut<AudioEngine>,
    mut status: ResMut<SimStatus>,
    mut stats: ResMut<SimStats>,
    buildings: Query<(Entity, &Transform, &Building)>,
    pedestrians: Query<(Entity, &Transform), With<Pedestrian>>,
) {
    let mut rng = rand::thread_rng();
    // Guards against double-processing when several blasts resolve in the
    // same frame: command-based despawns have not applied yet, so the queries
    // still yield already-destroyed entities.
    let mut destroyed: HashSet<Entity> = HashSet::new();
    let mut killed: HashSet<Entity> = HashSet::new();

    for event in events.read() {
        let power = event.power_factor;
        let blast_pos = event.position;

        let radius = config.blast_radius * power;
        let force = config.blast_force * power;

        status.message = "IMPACT!".to_string();
        stats.detonations += 1;

        shake.trigger(MAX_SHAKE_INTENSITY * shake_scale(power));
        flash.trigger(flash_scale(power));
        tasks.schedule(FLASH_HOLD_SECS, DeferredAction::RestoreLighting);

        if let Some(voice) = audio.play_explosion(volume_scale(power)) {
            tasks.schedule(EXPLOSION_SOUND_SECS, DeferredAction::ReleaseVoice(voice));
        }

        // Restart the shared effect meshes at this blast's magnitudes.
        effect_pool.trigger(EffectKind::Fireball, blast_pos, radius * FIREBALL_SIZE_RATIO);
        effect_pool.trigger(EffectKind::Shockwave, blast_pos, radius * SHOCKWAVE_SIZE_RATIO);
        effect_pool.trigger(
            EffectKind::GroundScar,
            blast_pos,
            radius * GROUND_SCAR_SIZE_RATIO,
        );
        effect_pool.trigger_scaled(
            EffectKind::SmokeColumn,
            blast_pos,
            radius * SMOKE_COLUMN_HEIGHT_RATIO,
            power,
        );

        smoke.spawn(
            blast_pos,
            radius * SMOKE_SPREAD_RATIO,
            radius * SMOKE_RISE_RATIO,
        );

        // Building damage pass: probabilistic kill with soft edges.
        let mut fractured = 0;
        for entity in grid.nearby_in_radius(blast_pos, radius) {
            if destroyed.contains(&entity) {
                continue;
            }
            let Ok((_, transform, building)) = buildings.get(entity) else {
                continue;
            };

            let distance = horizontal_distance(transform.translation, blast_pos);
            if distance >= radius {
                continue;
            }
            if rng.gen::<f32>() >= falloff.destruction_probability(distance, radius) {
                continue;
            }

            for (fragment, fragment_transform) in build_fragments(
                &mut rng,
                transform.translation,
                building,
                blast_pos,
                force,
                radius,
                config.fragment_count,
            ) {
                commands.spawn((fragment, fragment_transform));
            }

            grid.remove(entity, transform.translation);
            commands.entity(entity).despawn();
            destroyed.insert(entity);
            fractured += 1;
        }

        // Pedestrian casualty pass: binary kill inside the radius.
        let mut casualties = 0;
        for (entity, transform) in pedestrians.iter() {
            if killed.contains(&entity) {
                continue;
            }
            if horizontal_distance(transform.translation, blast_pos) <= radius {
                commands.entity(entity).despawn();
                killed.insert(entity);
                casualties += 1;
            }
        }

        info!(
            "Detonation at {:?}: power {:.2}, radius {:.1}, {} buildings down, {} casualties",
            blast_pos, power, radius, fractured, casualties
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_edge_is_certain_at_the_core() {
        let falloff = BlastFalloff::default();
        // damage_factor -> 1, times 1.8, clamped to 1.
        assert_eq!(falloff.destruction_probability(0.0, 38.0), 1.0);
        assert!(falloff.destruction_probability(1.0, 38.0) >= 0.9);
    }

    #[test]
    fn soft_edge_is_zero_at_and_beyond_the_rim() {
        let falloff = BlastFalloff::default();
        assert_eq!(falloff.destruction_probability(38.0, 38.0), 0.0);
        assert_eq!(falloff.destruction_probability(100.0, 38.0), 0.0);
    }

    #[test]
    fn soft_edge_probability_decreases_with_distance() {
        let falloff = BlastFalloff::default();
        let mut last = f32::MAX;
        for step in 0..20 {
            let distance = 38.0 * (step as f32 + 1.0) / 21.0;
            let probability = falloff.destruction_probability(distance, 38.0);
            assert!(probability <= last);
            last = probability;
        }
    }

    #[test]
    fn near_core_zone_stays_above_ninety_percent() {
        let falloff = BlastFalloff::default();
        // Everything strictly inside 0.1 x radius.
        for step in 0..10 {
            let distance = 0.1 * 38.0 * step as f32 / 10.0;
            assert!(falloff.destruction_probability(distance, 38.0) >= 0.9);
        }
    }

    #[test]
    fn hard_edge_is_a_step_function() {
        let falloff = BlastFalloff::HardEdge;
        assert_eq!(falloff.destruction_probability(37.9, 38.0), 1.0);
        assert_eq!(falloff.destruction_probability(38.0, 38.0), 0.0);
    }

    #[test]
    fn effective_radius_scales_monotonically_with_power() {
        let config = SimConfig::default();
        let mut last = 0.0;
        for step in 1..=10 {
            let power = config.power_min
                + (config.power_max - config.power_min) * step as f32 / 10.0;
            let radius = config.blast_radius * power;
            let force = config.blast_force * power;
            assert!(radius > last);
            assert!(force > config.blast_force * last / config.blast_radius);
            last = radius;
        }
    }
}
