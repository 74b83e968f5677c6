// City bombardment simulation.
//
// `SimulationPlugin` is the headless core: city generation, targeting state,
// bomb ballistics, detonation resolution, fragment and pedestrian motion,
// the shared effect timelines, the smoke pool and the procedural audio
// engine, all driven in a fixed per-frame order. `PresentationPlugin` layers
// input, camera and rendering on top; tests run the core alone.

pub mod audio;
pub mod ballistics;
pub mod camera;
pub mod city;
pub mod config;
pub mod constants;
pub mod effects;
pub mod error;
pub mod fragments;
pub mod input;
pub mod particles;
pub mod pedestrians;
pub mod power;
pub mod presentation;
pub mod setup;
pub mod types;

use bevy::prelude::*;

use audio::AudioEngine;
use ballistics::{bomb_fall_system, detonation_system, launch_system, BlastFalloff};
use city::generate_city;
use config::{SimConfig, CONFIG_PATH};
use effects::{
    advance_camera_shake, advance_effect_timelines, advance_light_flash, drain_delayed_tasks,
    CameraShake, DelayedTasks, EffectPool, LightFlash,
};
use fragments::fragment_physics_system;
use particles::{integrate_smoke_pool, SmokePool};
use pedestrians::{pedestrian_limb_system, pedestrian_wander_system, spawn_pedestrians};
use power::PowerSetting;
use types::*;

/// Label for the core frame chain; presentation orders itself around it.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimulationSet;

pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        let config = SimConfig::load_or_default(CONFIG_PATH);
        let (audio, device) = AudioEngine::init();

        app.insert_resource(SmokePool::new(
            config.smoke_particle_count,
            config.smoke_max_age,
        ));
        app.insert_resource(config);
        app.insert_resource(audio);
        if let Some(device) = device {
            app.insert_non_send_resource(device);
        }

        app.init_resource::<Time>()
            .init_resource::<TargetState>()
            .init_resource::<SimStatus>()
            .init_resource::<SimStats>()
            .init_resource::<PowerSetting>()
            .init_resource::<SpatialGrid>()
            .init_resource::<BlastFalloff>()
            .init_resource::<EffectPool>()
            .init_resource::<CameraShake>()
            .init_resource::<LightFlash>()
            .init_resource::<DelayedTasks>()
            .add_event::<LaunchRequest>()
            .add_event::<DetonationEvent>()
            .add_systems(Startup, (generate_city, spawn_pedestrians).chain())
            // Strict per-frame order: deferred tasks and tweens first, then
            // ballistics (which may detonate synchronously), then the effect
            // timelines, then the independent movers. A detonation is fully
            // resolved before its effects advance, so it is visible starting
            // the same frame.
            .add_systems(
                Update,
                (
                    drain_delayed_tasks,
                    advance_light_flash,
                    advance_camera_shake,
                    launch_system,
                    bomb_fall_system,
                    detonation_system,
                    advance_effect_timelines,
                    fragment_physics_system,
                    pedestrian_wander_system,
                    pedestrian_limb_system,
                    integrate_smoke_pool,
                    update_sim_counters,
                )
                    .chain()
                    .in_set(SimulationSet),
            );
    }
}

pub struct PresentationPlugin;

impl Plugin for PresentationPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup::setup_scene)
            .add_systems(
                Update,
                (
                    input::targeting_system,
                    input::launch_control_system,
                    camera::orbit_camera_system,
                )
                    .before(SimulationSet),
            )
            .add_systems(
                Update,
                (
                    camera::apply_camera_shake,
                    presentation::attach_building_visuals,
                    presentation::attach_fragment_visuals,
                    presentation::attach_bomb_visuals,
                    presentation::attach_pedestrian_visuals,
                    presentation::sync_target_marker,
                    presentation::sync_effect_visuals,
                    presentation::sync_smoke_sprites,
                    presentation::apply_light_flash,
                    presentation::update_status_text,
                    presentation::update_info_text,
                )
                    .after(SimulationSet),
            );
    }
}
