// Visual sync: attach meshes to newly spawned simulation entities and mirror
// the per-frame simulation state (effect pool, smoke pool, light flash,
// target, status) onto the scene. Runs after the core chain each frame.
use bevy::prelude::*;
use rand::Rng;

use crate::config::SimConfig;
use crate::effects::{
    fireball_color, fireball_opacity, fireball_scale, ground_scar_opacity, shockwave_opacity,
    shockwave_scale, smoke_column_height_scale, smoke_column_opacity, smoke_column_width_scale,
    EffectKind, EffectPool, LightFlash,
};
use crate::particles::SmokePool;
use crate::power::PowerSetting;
use crate::setup::*;
use crate::types::*;

use crate::constants::{BASE_AMBIENT_INTENSITY, BASE_DIRECTIONAL_INTENSITY};

/// Presentation mapping from flash intensity units to light units.
const LUX_PER_INTENSITY: f32 = 10000.0 / BASE_DIRECTIONAL_INTENSITY;
const AMBIENT_PER_INTENSITY: f32 = 300.0 / BASE_AMBIENT_INTENSITY;

// ===== ATTACH SYSTEMS =====

pub fn attach_building_visuals(
    mut commands: Commands,
    assets: Res<VisualAssets>,
    mut buildings: Query<(Entity, &Building, &mut Transform), Added<Building>>,
) {
    let mut rng = rand::thread_rng();
    for (entity, building, mut transform) in buildings.iter_mut() {
        transform.scale = building.size;
        let material = assets.building_materials
            [rng.gen_range(0..assets.building_materials.len())]
        .clone();
        commands
            .entity(entity)
            .insert((Mesh3d(assets.unit_cube.clone()), MeshMaterial3d(material)));
    }
}

pub fn attach_fragment_visuals(
    mut commands: Commands,
    assets: Res<VisualAssets>,
    mut fragments: Query<(Entity, &Fragment, &mut Transform), Added<Fragment>>,
) {
    let mut rng = rand::thread_rng();
    for (entity, fragment, mut transform) in fragments.iter_mut() {
        transform.scale = fragment.size;
        let material = assets.building_materials
            [rng.gen_range(0..assets.building_materials.len())]
        .clone();
        commands
            .entity(entity)
            .insert((Mesh3d(assets.unit_cube.clone()), MeshMaterial3d(material)));
    }
}

pub fn attach_bomb_visuals(
    mut commands: Commands,
    assets: Res<VisualAssets>,
    bombs: Query<Entity, Added<ActiveBomb>>,
) {
    for entity in bombs.iter() {
        commands.entity(entity).insert((
            Mesh3d(assets.bomb_mesh.clone()),
            MeshMaterial3d(assets.bomb_material.clone()),
        ));
    }
}

pub fn attach_pedestrian_visuals(
    mut commands: Commands,
    assets: Res<VisualAssets>,
    pedestrians: Query<Entity, Added<Pedestrian>>,
    pivots: Query<Entity, Added<LimbPivot>>,
) {
    let mut rng = rand::thread_rng();

    for entity in pedestrians.iter() {
        let clothing = assets.clothing_materials
            [rng.gen_range(0..assets.clothing_materials.len())]
        .clone();
        let torso = commands
            .spawn((
                Mesh3d(assets.torso_mesh.clone()),
                MeshMaterial3d(clothing),
                Transform::from_xyz(0.0, 1.05, 0.0),
            ))
            .id();
        let head = commands
            .spawn((
                Mesh3d(assets.head_mesh.clone()),
                MeshMaterial3d(assets.skin_material.clone()),
                Transform::from_xyz(0.0, 1.45, 0.0),
            ))
            .id();
        commands.entity(entity).add_children(&[torso, head]);
    }

    // Limb geometry hangs below its pivot so the swing reads as a joint.
    for entity in pivots.iter() {
        let clothing = assets.clothing_materials
            [rng.gen_range(0..assets.clothing_materials.len())]
        .clone();
        let limb = commands
            .spawn((
                Mesh3d(assets.limb_mesh.clone()),
                MeshMaterial3d(clothing),
                Transform::from_xyz(0.0, -0.25, 0.0).with_scale(Vec3::new(0.9, 1.0, 0.9)),
            ))
            .id();
        commands.entity(entity).add_children(&[limb]);
    }
}

// ===== PER-FRAME SYNC =====

pub fn sync_target_marker(
    target: Res<TargetState>,
    mut marker: Query<(&mut Transform, &mut Visibility), With<TargetMarkerVisual>>,
) {
    let Ok((mut transform, mut visibility)) = marker.single_mut() else {
        return;
    };
    match target.position {
        Some(position) => {
            transform.translation = Vec3::new(position.x, 0.05, position.z);
            *visibility = Visibility::Visible;
        }
        None => *visibility = Visibility::Hidden,
    }
}

#[allow(clippy::type_complexity)]
pub fn sync_effect_visuals(
    pool: Res<EffectPool>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut fireball: Query<
        (
            &mut Transform,
            &mut Visibility,
            &MeshMaterial3d<StandardMaterial>,
        ),
        (
            With<FireballVisual>,
            Without<ShockwaveVisual>,
            Without<GroundScarVisual>,
            Without<SmokeColumnVisual>,
        ),
    >,
    mut shockwave: Query<
        (
            &mut Transform,
            &mut Visibility,
            &MeshMaterial3d<StandardMaterial>,
        ),
        (
            With<ShockwaveVisual>,
            Without<FireballVisual>,
            Without<GroundScarVisual>,
            Without<SmokeColumnVisual>,
        ),
    >,
    mut scar: Query<
        (
            &mut Transform,
            &mut Visibility,
            &MeshMaterial3d<StandardMaterial>,
        ),
        (
            With<GroundScarVisual>,
            Without<FireballVisual>,
            Without<ShockwaveVisual>,
            Without<SmokeColumnVisual>,
        ),
    >,
    mut column: Query<
        (
            &mut Transform,
            &mut Visibility,
            &MeshMaterial3d<StandardMaterial>,
            &SmokeColumnVisual,
        ),
        (
            Without<FireballVisual>,
            Without<ShockwaveVisual>,
            Without<GroundScarVisual>,
        ),
    >,
) {
    if let Ok((mut transform, mut visibility, material)) = fireball.single_mut() {
        let state = pool.state(EffectKind::Fireball);
        if state.visible {
            let life = state.life();
            *visibility = Visibility::Visible;
            transform.translation = state.origin;
            transform.scale = Vec3::splat(fireball_scale(life, state.magnitude));
            if let Some(mat) = materials.get_mut(&material.0) {
                mat.base_color = fireball_color(life).with_alpha(fireball_opacity(life));
            }
        } else {
            *visibility = Visibility::Hidden;
        }
    }

    if let Ok((mut transform, mut visibility, material)) = shockwave.single_mut() {
        let state = pool.state(EffectKind::Shockwave);
        if state.visible {
            let life = state.life();
            *visibility = Visibility::Visible;
            transform.translation = Vec3::new(state.origin.x, 0.1, state.origin.z);
            let scale = shockwave_scale(life, state.magnitude).max(0.1);
            transform.scale = Vec3::new(scale, scale, 1.0);
            if let Some(mat) = materials.get_mut(&material.0) {
                mat.base_color = mat.base_color.with_alpha(shockwave_opacity(life));
            }
        } else {
            *visibility = Visibility::Hidden;
        }
    }

    if let Ok((mut transform, mut visibility, material)) = scar.single_mut() {
        let state = pool.state(EffectKind::GroundScar);
        if state.visible {
            *visibility = Visibility::Visible;
            transform.translation = Vec3::new(state.origin.x, 0.01, state.origin.z);
            transform.scale = Vec3::new(state.magnitude, state.magnitude, 1.0);
            if let Some(mat) = materials.get_mut(&material.0) {
                mat.base_color = mat.base_color.with_alpha(ground_scar_opacity(state.life()));
            }
        } else {
            *visibility = Visibility::Hidden;
        }
    }

    if let Ok((mut transform, mut visibility, material, visual)) = column.single_mut() {
        let state = pool.state(EffectKind::SmokeColumn);
        if state.visible {
            let life = state.life();
            *visibility = Visibility::Visible;
            let height_scale =
                smoke_column_height_scale(life) * state.magnitude / visual.mesh_height;
            let width_scale = smoke_column_width_scale(life, state.radial);
            transform.translation = Vec3::new(
                state.origin.x,
                height_scale * visual.mesh_height / 2.0,
                state.origin.z,
            );
            transform.scale = Vec3::new(width_scale, height_scale, width_scale);
            transform.rotation = Quat::from_rotation_y(state.spin);
            if let Some(mat) = materials.get_mut(&material.0) {
                mat.base_color = mat
                    .base_color
                    .with_alpha(smoke_column_opacity(state.timer, life));
            }
        } else {
            *visibility = Visibility::Hidden;
        }
    }
}

pub fn sync_smoke_sprites(
    pool: Res<SmokePool>,
    mut sprites: Query<(&SmokeSprite, &mut Transform, &mut Visibility)>,
) {
    for (sprite, mut transform, mut visibility) in sprites.iter_mut() {
        if pool.is_live(sprite.0) {
            let (position, size, opacity) = pool.slot(sprite.0);
            transform.translation = position;
            // Opacity folds into scale; the sprite material alpha is fixed.
            transform.scale = Vec3::splat((size * (0.4 + opacity)).max(0.01));
            *visibility = Visibility::Visible;
        } else {
            *visibility = Visibility::Hidden;
        }
    }
}

pub fn apply_light_flash(
    flash: Res<LightFlash>,
    mut lights: Query<&mut DirectionalLight>,
    mut ambient: ResMut<AmbientLight>,
) {
    if let Ok(mut light) = lights.single_mut() {
        light.illuminance = flash.directional * LUX_PER_INTENSITY;
    }
    ambient.brightness = flash.ambient * AMBIENT_PER_INTENSITY;
}

pub fn update_status_text(
    status: Res<SimStatus>,
    mut text_query: Query<&mut Text, With<StatusText>>,
) {
    if let Ok(mut text) = text_query.single_mut() {
        **text = format!("Status: {}", status.message);
    }
}

pub fn update_info_text(
    stats: Res<SimStats>,
    power: Res<PowerSetting>,
    config: Res<SimConfig>,
    mut text_query: Query<&mut Text, With<InfoText>>,
) {
    if let Ok(mut text) = text_query.single_mut() {
        **text = format!(
            "Power: {:.2}x\nBuildings: {} | Pedestrians: {}\nFragments: {} | Particles: {}",
            power.factor(&config),
            stats.buildings_standing,
            stats.pedestrians_alive,
            stats.fragments_active,
            stats.active_particles,
        );
    }
}
