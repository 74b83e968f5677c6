// Orbit camera rig and camera shake application.
use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use rand::Rng;

use crate::effects::CameraShake;

const CAMERA_PAN_SPEED: f32 = 40.0;
const CAMERA_ZOOM_SPEED: f32 = 8.0;
const CAMERA_MIN_DISTANCE: f32 = 10.0;
const CAMERA_MAX_DISTANCE: f32 = 150.0;
const CAMERA_ROTATION_SPEED: f32 = 0.005;

#[derive(Component)]
pub struct OrbitCamera {
    pub focus_point: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
}

/// Middle-drag rotates, WASD pans, scroll zooms; the camera orbits its focus
/// point. Left click stays free for target picking.
pub fn orbit_camera_system(
    time: Res<Time>,
    keyboard: Res<ButtonInput<KeyCode>>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    mut scroll_events: EventReader<MouseWheel>,
    mut mouse_motion_events: EventReader<MouseMotion>,
    mut camera_query: Query<(&mut Transform, &mut OrbitCamera)>,
) {
    let Ok((mut transform, mut camera)) = camera_query.single_mut() else {
        return;
    };
    let dt = time.delta_secs();

    if mouse_button.pressed(MouseButton::Middle) {
        for motion in mouse_motion_events.read() {
            camera.yaw -= motion.delta.x * CAMERA_ROTATION_SPEED;
            camera.pitch = (camera.pitch - motion.delta.y * CAMERA_ROTATION_SPEED)
                .clamp(-1.5, -0.05);
        }
    } else {
        // Drop accumulated motion while not dragging.
        mouse_motion_events.clear();
    }

    let mut movement = Vec3::ZERO;
    if keyboard.pressed(KeyCode::KeyW) {
        movement.z -= 1.0;
    }
    if keyboard.pressed(KeyCode::KeyS) {
        movement.z += 1.0;
    }
    if keyboard.pressed(KeyCode::KeyA) {
        movement.x -= 1.0;
    }
    if keyboard.pressed(KeyCode::KeyD) {
        movement.x += 1.0;
    }
    if movement.length() > 0.0 {
        movement = movement.normalize() * CAMERA_PAN_SPEED * dt;
        let yaw_rotation = Mat3::from_rotation_y(camera.yaw);
        camera.focus_point += yaw_rotation * movement;
    }

    for scroll in scroll_events.read() {
        let zoom_delta = match scroll.unit {
            MouseScrollUnit::Line => scroll.y * CAMERA_ZOOM_SPEED,
            MouseScrollUnit::Pixel => scroll.y * CAMERA_ZOOM_SPEED * 0.1,
        };
        camera.distance =
            (camera.distance - zoom_delta).clamp(CAMERA_MIN_DISTANCE, CAMERA_MAX_DISTANCE);
    }

    let rotation = Quat::from_euler(EulerRot::YXZ, camera.yaw, camera.pitch, 0.0);
    let offset = rotation * Vec3::new(0.0, 0.0, camera.distance);
    transform.translation = camera.focus_point + offset;
    transform.rotation = rotation;
}

/// Add the shake offset after the rig has positioned the camera.
pub fn apply_camera_shake(
    shake: Res<CameraShake>,
    mut camera_query: Query<&mut Transform, With<OrbitCamera>>,
) {
    if shake.current_intensity() <= 0.0 {
        return;
    }
    let Ok(mut transform) = camera_query.single_mut() else {
        return;
    };
    let mut rng = rand::thread_rng();
    transform.translation += shake.offset(&mut rng);
}
