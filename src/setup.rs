// Scene setup: ground, lights, camera, UI, target marker, the shared effect
// meshes and the smoke sprite pool. Everything here is presentation; the
// simulation runs headless without it.
use bevy::asset::RenderAssetUsages;
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use rand::Rng;
use std::f32::consts::FRAC_PI_2;

use crate::camera::OrbitCamera;
use crate::config::SimConfig;
use crate::constants::*;
use crate::particles::SmokePool;

// ===== MARKER COMPONENTS =====

#[derive(Component)]
pub struct StatusText;

#[derive(Component)]
pub struct InfoText;

#[derive(Component)]
pub struct TargetMarkerVisual;

#[derive(Component)]
pub struct FireballVisual;

#[derive(Component)]
pub struct ShockwaveVisual;

#[derive(Component)]
pub struct GroundScarVisual;

/// The column mesh is built at base (power 1.0) height; sync divides the
/// stored magnitude back out through this.
#[derive(Component)]
pub struct SmokeColumnVisual {
    pub mesh_height: f32,
}

/// Index of the pool slot this sprite renders.
#[derive(Component)]
pub struct SmokeSprite(pub usize);

// ===== SHARED VISUAL ASSETS =====

#[derive(Resource)]
pub struct VisualAssets {
    pub unit_cube: Handle<Mesh>,
    pub building_materials: Vec<Handle<StandardMaterial>>,
    pub bomb_mesh: Handle<Mesh>,
    pub bomb_material: Handle<StandardMaterial>,
    pub torso_mesh: Handle<Mesh>,
    pub head_mesh: Handle<Mesh>,
    pub limb_mesh: Handle<Mesh>,
    pub clothing_materials: Vec<Handle<StandardMaterial>>,
    pub skin_material: Handle<StandardMaterial>,
}

/// Speckled asphalt texture, generated instead of loaded.
fn create_ground_texture() -> Image {
    let size = 128u32;
    let mut rng = rand::thread_rng();
    let mut data = vec![0u8; (size * size * 4) as usize];

    for pixel in data.chunks_exact_mut(4) {
        pixel.copy_from_slice(&[0x40, 0x40, 0x40, 0xFF]);
    }
    for _ in 0..600 {
        let x = rng.gen_range(0..size);
        let y = rng.gen_range(0..size);
        let c = rng.gen_range(25u8..65u8);
        let index = ((y * size + x) * 4) as usize;
        data[index] = c;
        data[index + 1] = c;
        data[index + 2] = c;
    }

    Image::new(
        Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        data,
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::RENDER_WORLD,
    )
}

pub fn setup_scene(
    mut commands: Commands,
    config: Res<SimConfig>,
    smoke: Res<SmokePool>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut images: ResMut<Assets<Image>>,
) {
    let mut rng = rand::thread_rng();
    let city_size = config.city_size;

    // Ground plane.
    let ground_texture = images.add(create_ground_texture());
    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(city_size * 1.5, city_size * 1.5))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color_texture: Some(ground_texture),
            perceptual_roughness: 0.85,
            metallic: 0.05,
            ..default()
        })),
        Transform::from_xyz(0.0, -0.05, 0.0),
    ));

    // Sun + ambient. The flash sync drives these intensities every frame.
    commands.spawn((
        DirectionalLight {
            illuminance: 10000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(city_size * 0.6, city_size * 1.1, city_size * 0.5)
            .looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 300.0,
        affects_lightmapped_meshes: false,
    });

    // Orbit camera.
    let focus_point = Vec3::ZERO;
    commands.spawn((
        Camera3d::default(),
        Camera::default(),
        Transform::from_xyz(city_size * 0.6, city_size * 0.4, city_size * 0.6)
            .looking_at(focus_point, Vec3::Y),
        OrbitCamera {
            focus_point,
            yaw: 0.78,
            pitch: -0.45,
            distance: city_size * 0.85,
        },
    ));

    // Target marker ring, hidden until a pick happens.
    commands.spawn((
        Mesh3d(meshes.add(Annulus::new(0.8, 1.0))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgba(1.0, 0.0, 0.0, 0.7),
            unlit: true,
            alpha_mode: AlphaMode::Blend,
            cull_mode: None,
            double_sided: true,
            ..default()
        })),
        Transform::from_xyz(0.0, 0.05, 0.0).with_rotation(Quat::from_rotation_x(-FRAC_PI_2)),
        Visibility::Hidden,
        TargetMarkerVisual,
    ));

    // Shared effect meshes, reused across detonations.
    commands.spawn((
        Mesh3d(meshes.add(Sphere::new(1.0))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgba(1.0, 1.0, 0.67, 0.95),
            unlit: true,
            alpha_mode: AlphaMode::Blend,
            ..default()
        })),
        Transform::default(),
        Visibility::Hidden,
        FireballVisual,
    ));

    commands.spawn((
        Mesh3d(meshes.add(Annulus::new(1.0, 1.0 + SHOCKWAVE_THICKNESS))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgba(1.0, 1.0, 1.0, 0.4),
            unlit: true,
            alpha_mode: AlphaMode::Blend,
            cull_mode: None,
            double_sided: true,
            ..default()
        })),
        Transform::from_xyz(0.0, 0.1, 0.0).with_rotation(Quat::from_rotation_x(-FRAC_PI_2)),
        Visibility::Hidden,
        ShockwaveVisual,
    ));

    commands.spawn((
        Mesh3d(meshes.add(Circle::new(1.0))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgba(0.1, 0.1, 0.1, 0.75),
            unlit: true,
            alpha_mode: AlphaMode::Blend,
            ..default()
        })),
        Transform::from_xyz(0.0, 0.01, 0.0).with_rotation(Quat::from_rotation_x(-FRAC_PI_2)),
        Visibility::Hidden,
        GroundScarVisual,
    ));

    let column_height = config.blast_radius * SMOKE_COLUMN_HEIGHT_RATIO;
    commands.spawn((
        Mesh3d(meshes.add(ConicalFrustum {
            radius_top: config.blast_radius * SMOKE_COLUMN_TOP_RADIUS_RATIO,
            radius_bottom: config.blast_radius * 0.5,
            height: column_height,
        })),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgba(0.45, 0.42, 0.38, 0.8),
            perceptual_roughness: 0.9,
            metallic: 0.0,
            alpha_mode: AlphaMode::Blend,
            cull_mode: None,
            double_sided: true,
            ..default()
        })),
        Transform::default(),
        Visibility::Hidden,
        SmokeColumnVisual {
            mesh_height: column_height,
        },
    ));

    // Smoke sprites, one per pool slot, parked below the scene.
    let sprite_mesh = meshes.add(Sphere::new(0.5).mesh().uv(8, 6));
    let sprite_material = materials.add(StandardMaterial {
        base_color: Color::srgba(0.63, 0.57, 0.51, 0.35),
        unlit: true,
        alpha_mode: AlphaMode::Blend,
        ..default()
    });
    for i in 0..smoke.capacity() {
        commands.spawn((
            Mesh3d(sprite_mesh.clone()),
            MeshMaterial3d(sprite_material.clone()),
            Transform::from_xyz(0.0, SMOKE_PARKING_DEPTH, 0.0),
            Visibility::Hidden,
            SmokeSprite(i),
        ));
    }

    // Shared meshes/materials for simulation entities spawned later.
    let unit_cube = meshes.add(Cuboid::new(1.0, 1.0, 1.0));
    let building_materials = (0..12)
        .map(|_| {
            let tint = 0.45 + rng.gen::<f32>() * 0.25;
            let blue_shift = rng.gen::<f32>() * 0.08;
            materials.add(StandardMaterial {
                base_color: Color::srgb(tint, tint + blue_shift * 0.4, tint + blue_shift),
                perceptual_roughness: 0.7,
                metallic: 0.25,
                ..default()
            })
        })
        .collect();

    let clothing_materials = (0..8)
        .map(|_| {
            materials.add(StandardMaterial {
                base_color: Color::hsl(rng.gen_range(0.0..360.0), 0.45, 0.45),
                perceptual_roughness: 0.8,
                ..default()
            })
        })
        .collect();

    commands.insert_resource(VisualAssets {
        unit_cube,
        building_materials,
        bomb_mesh: meshes.add(Capsule3d::new(0.25, 1.2)),
        bomb_material: materials.add(StandardMaterial {
            base_color: Color::srgb(0.23, 0.23, 0.23),
            metallic: 0.9,
            perceptual_roughness: 0.25,
            ..default()
        }),
        torso_mesh: meshes.add(Cuboid::new(0.34, 0.5, 0.2)),
        head_mesh: meshes.add(Sphere::new(0.11)),
        limb_mesh: meshes.add(Cuboid::new(0.1, 0.5, 0.1)),
        clothing_materials,
        skin_material: materials.add(StandardMaterial {
            base_color: Color::srgb(0.85, 0.65, 0.5),
            perceptual_roughness: 0.7,
            ..default()
        }),
    });

    // UI: status line and counters.
    commands.spawn((
        Text::new("Status: Set a target"),
        TextFont {
            font_size: 20.0,
            ..default()
        },
        TextColor(Color::srgb(1.0, 0.8, 0.0)),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(10.0),
            left: Val::Px(10.0),
            ..default()
        },
        StatusText,
    ));
    commands.spawn((
        Text::new("--"),
        TextFont {
            font_size: 16.0,
            ..default()
        },
        TextColor(Color::srgb(0.8, 0.8, 0.8)),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(10.0),
            right: Val::Px(10.0),
            ..default()
        },
        InfoText,
    ));
}
