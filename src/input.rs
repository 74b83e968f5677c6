// Input surface: target picking against the ground plane, the launch
// trigger, and the bomb power control.
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::camera::OrbitCamera;
use crate::config::SimConfig;
use crate::constants::*;
use crate::power::PowerSetting;
use crate::types::{LaunchRequest, SimStatus, TargetState};

/// Convert a screen cursor position to a world position on the ground plane
/// (y = 0). Targets can only be picked on the ground, never on geometry.
pub fn screen_to_ground(
    cursor_pos: Vec2,
    camera: &Camera,
    camera_transform: &GlobalTransform,
) -> Option<Vec3> {
    let ray = camera.viewport_to_world(camera_transform, cursor_pos).ok()?;

    if ray.direction.y.abs() < 0.0001 {
        // Parallel to the ground, no intersection.
        return None;
    }

    let t = -ray.origin.y / ray.direction.y;
    if t > 0.0 {
        Some(ray.origin + *ray.direction * t)
    } else {
        None
    }
}

/// Left click picks the impact point.
pub fn targeting_system(
    mouse_button: Res<ButtonInput<MouseButton>>,
    window_query: Query<&Window, With<PrimaryWindow>>,
    camera_query: Query<(&Camera, &GlobalTransform), With<OrbitCamera>>,
    mut target: ResMut<TargetState>,
    mut status: ResMut<SimStatus>,
) {
    if !mouse_button.just_pressed(MouseButton::Left) {
        return;
    }
    let Ok(window) = window_query.single() else {
        return;
    };
    let Ok((camera, camera_transform)) = camera_query.single() else {
        return;
    };
    let Some(cursor_pos) = window.cursor_position() else {
        return;
    };

    if let Some(world_pos) = screen_to_ground(cursor_pos, camera, camera_transform) {
        target.position = Some(world_pos);
        status.message = "Target set - ready to launch".to_string();
        info!("Target set at {:?}", world_pos);
    }
}

/// Space launches at the current target; up/down arrows tune the power.
pub fn launch_control_system(
    keyboard: Res<ButtonInput<KeyCode>>,
    config: Res<SimConfig>,
    mut power: ResMut<PowerSetting>,
    mut status: ResMut<SimStatus>,
    mut launches: EventWriter<LaunchRequest>,
) {
    if keyboard.just_pressed(KeyCode::Space) {
        launches.write(LaunchRequest);
    }

    let mut delta = 0.0;
    if keyboard.just_pressed(KeyCode::ArrowUp) {
        delta += POWER_CONTROL_STEP;
    }
    if keyboard.just_pressed(KeyCode::ArrowDown) {
        delta -= POWER_CONTROL_STEP;
    }
    if delta != 0.0 {
        power.adjust(delta);
        status.message = format!("Bomb power {:.2}x", power.factor(&config));
    }
}
