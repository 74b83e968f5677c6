// Building fracture and debris physics.
//
// A destroyed building breaks into a fixed number of box fragments launched
// radially away from the blast. Fragments tumble with uncoupled angular
// velocity, bounce off the ground with restitution and damping, and are
// removed after settling for a randomized rest period or on hard expiry
// (absolute age, below ground, out of bounds).
use bevy::prelude::*;
use rand::Rng;

use crate::config::SimConfig;
use crate::constants::*;
use crate::types::{sim_dt, Building, Fragment};

/// Build the fragment set for a destroyed building. Pure construction: the
/// caller spawns the returned bundles (and despawns the building).
pub fn build_fragments(
    rng: &mut impl Rng,
    building_pos: Vec3,
    building: &Building,
    blast_center: Vec3,
    force: f32,
    radius: f32,
    count: usize,
) -> Vec<(Fragment, Transform)> {
    let size = building.size;
    let mut fragments = Vec::with_capacity(count);

    for _ in 0..count {
        let frag_size = Vec3::new(
            size.x / rng.gen_range(2.0..4.5),
            size.y / rng.gen_range(3.0..6.5),
            size.z / rng.gen_range(2.0..4.5),
        );

        let mut position = building_pos
            + Vec3::new(
                (rng.gen::<f32>() - 0.5) * size.x * 0.9,
                (rng.gen::<f32>() - 0.5) * size.y * 0.9,
                (rng.gen::<f32>() - 0.5) * size.z * 0.9,
            );
        position.y = position.y.max(frag_size.y / 2.0 + 0.01);

        let direction = (position - blast_center).normalize_or_zero();
        let distance = position.distance(blast_center);
        let force_falloff = (1.0 - distance / radius).max(0.0);
        let magnitude = force * force_falloff * rng.gen_range(0.6..1.4);
        let mut velocity = direction * magnitude;
        velocity.y += rng.gen::<f32>() * force * force_falloff * 0.4;

        let angular_velocity = Vec3::new(
            rng.gen_range(-FRAGMENT_SPIN_RANGE..FRAGMENT_SPIN_RANGE),
            rng.gen_range(-FRAGMENT_SPIN_RANGE..FRAGMENT_SPIN_RANGE),
            rng.gen_range(-FRAGMENT_SPIN_RANGE..FRAGMENT_SPIN_RANGE),
        );

        fragments.push((
            Fragment {
                velocity,
                angular_velocity,
                size: frag_size,
                half_height: frag_size.y / 2.0,
                age: 0.0,
                rest_age: None,
                rest_duration: rng.gen_range(FRAGMENT_REST_MIN..FRAGMENT_REST_MAX),
            },
            Transform::from_translation(position),
        ));
    }

    fragments
}

/// One integration step for a single fragment. Returns true while the
/// fragment should stay alive.
pub fn integrate_fragment(
    fragment: &mut Fragment,
    transform: &mut Transform,
    dt: f32,
    horizontal_bound: f32,
) -> bool {
    fragment.age += dt;

    fragment.velocity.y -= GRAVITY * dt * FRAGMENT_GRAVITY_SCALE;
    transform.translation += fragment.velocity * dt;

    let spin = Quat::from_euler(
        EulerRot::XYZ,
        fragment.angular_velocity.x * dt,
        fragment.angular_velocity.y * dt,
        fragment.angular_velocity.z * dt,
    );
    transform.rotation = spin * transform.rotation;

    // Ground bounce: clamp, invert vertical at 30%, bleed off the rest.
    if transform.translation.y < fragment.half_height {
        transform.translation.y = fragment.half_height;
        fragment.velocity.y *= -FRAGMENT_RESTITUTION;
        fragment.velocity.x *= FRAGMENT_GROUND_DAMPING;
        fragment.velocity.z *= FRAGMENT_GROUND_DAMPING;
        fragment.angular_velocity *= FRAGMENT_ANGULAR_DAMPING;

        if fragment.velocity.length_squared() < FRAGMENT_SETTLE_THRESHOLD_SQ {
            fragment.velocity = Vec3::ZERO;
            fragment.angular_velocity = Vec3::ZERO;
            let rest_age = *fragment.rest_age.get_or_insert(fragment.age);
            if fragment.age - rest_age > fragment.rest_duration {
                return false;
            }
        }
    }

    // Hard expiries, independent of settling.
    if fragment.age > FRAGMENT_MAX_AGE
        || transform.translation.y < FRAGMENT_KILL_DEPTH
        || transform.translation.x.abs() > horizontal_bound
        || transform.translation.z.abs() > horizontal_bound
    {
        return false;
    }

    true
}

pub fn fragment_physics_system(
    mut commands: Commands,
    time: Res<Time>,
    config: Res<SimConfig>,
    mut fragments: Query<(Entity, &mut Transform, &mut Fragment)>,
) {
    let dt = sim_dt(&time);
    if dt <= 0.0 {
        return;
    }
    let bound = config.city_size * FRAGMENT_BOUNDS_SCALE;

    for (entity, mut transform, mut fragment) in fragments.iter_mut() {
        if !integrate_fragment(&mut fragment, &mut transform, dt, bound) {
            commands.entity(entity).despawn();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;

    fn test_building() -> Building {
        Building::new(Vec3::new(3.0, 12.0, 2.5))
    }

    #[test]
    fn fracture_produces_exactly_the_configured_count() {
        let mut rng = thread_rng();
        let building = test_building();
        let fragments = build_fragments(
            &mut rng,
            Vec3::new(5.0, 6.0, 5.0),
            &building,
            Vec3::ZERO,
            85.0,
            38.0,
            FRAGMENT_COUNT,
        );
        assert_eq!(fragments.len(), FRAGMENT_COUNT);
    }

    #[test]
    fn fragment_dimensions_are_positive_and_smaller_than_parent() {
        let mut rng = thread_rng();
        let building = test_building();
        for (fragment, _) in build_fragments(
            &mut rng,
            Vec3::new(0.0, 6.0, 0.0),
            &building,
            Vec3::new(10.0, 0.0, 0.0),
            85.0,
            38.0,
            FRAGMENT_COUNT,
        ) {
            assert!(fragment.size.x > 0.0 && fragment.size.x < building.size.x);
            assert!(fragment.size.y > 0.0 && fragment.size.y < building.size.y);
            assert!(fragment.size.z > 0.0 && fragment.size.z < building.size.z);
        }
    }

    #[test]
    fn fragments_spawn_above_their_ground_level() {
        let mut rng = thread_rng();
        let building = test_building();
        for (fragment, transform) in build_fragments(
            &mut rng,
            Vec3::new(0.0, 6.0, 0.0),
            &building,
            Vec3::ZERO,
            85.0,
            38.0,
            64,
        ) {
            assert!(transform.translation.y >= fragment.half_height);
        }
    }

    #[test]
    fn out_of_radius_fragments_get_no_launch_force() {
        let mut rng = thread_rng();
        let building = test_building();
        // Blast far outside the falloff radius: falloff clamps to zero.
        for (fragment, _) in build_fragments(
            &mut rng,
            Vec3::new(200.0, 6.0, 0.0),
            &building,
            Vec3::ZERO,
            85.0,
            38.0,
            FRAGMENT_COUNT,
        ) {
            assert_eq!(fragment.velocity, Vec3::ZERO);
        }
    }

    #[test]
    fn vertical_velocity_strictly_decreases_until_ground_contact() {
        let mut fragment = Fragment {
            velocity: Vec3::new(2.0, 5.0, 0.0),
            angular_velocity: Vec3::ZERO,
            size: Vec3::splat(1.0),
            half_height: 0.5,
            age: 0.0,
            rest_age: None,
            rest_duration: 10.0,
        };
        let mut transform = Transform::from_xyz(0.0, 30.0, 0.0);

        let mut last_vy = fragment.velocity.y;
        for _ in 0..20 {
            integrate_fragment(&mut fragment, &mut transform, 0.016, 120.0);
            if transform.translation.y <= fragment.half_height {
                break;
            }
            assert!(fragment.velocity.y < last_vy);
            last_vy = fragment.velocity.y;
        }
    }

    #[test]
    fn ground_bounce_flips_vertical_velocity_at_thirty_percent() {
        let mut fragment = Fragment {
            velocity: Vec3::new(0.0, -10.0, 0.0),
            angular_velocity: Vec3::ZERO,
            size: Vec3::splat(1.0),
            half_height: 0.5,
            age: 0.0,
            rest_age: None,
            rest_duration: 10.0,
        };
        let mut transform = Transform::from_xyz(0.0, 0.51, 0.0);

        let dt = 0.016;
        let pre_contact = fragment.velocity.y - GRAVITY * dt * FRAGMENT_GRAVITY_SCALE;
        integrate_fragment(&mut fragment, &mut transform, dt, 120.0);

        assert_eq!(transform.translation.y, fragment.half_height);
        assert!(fragment.velocity.y > 0.0, "bounce must flip the sign");
        assert!(
            (fragment.velocity.y - pre_contact.abs() * FRAGMENT_RESTITUTION).abs() < 1e-4,
            "bounce magnitude must be 30% of pre-contact"
        );
    }

    #[test]
    fn settled_fragment_expires_after_its_rest_duration() {
        let mut fragment = Fragment {
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            size: Vec3::splat(1.0),
            half_height: 0.5,
            age: 0.0,
            rest_age: None,
            rest_duration: 1.0,
        };
        let mut transform = Transform::from_xyz(0.0, 0.5, 0.0);

        let mut alive = true;
        let mut steps = 0;
        while alive && steps < 200 {
            alive = integrate_fragment(&mut fragment, &mut transform, 0.05, 120.0);
            steps += 1;
        }
        assert!(!alive, "settled fragment should expire");
        assert!(fragment.age > fragment.rest_duration);
        assert!(fragment.age < FRAGMENT_MAX_AGE);
    }

    #[test]
    fn hard_expiries_remove_runaway_fragments() {
        // Absolute age.
        let mut old = Fragment {
            velocity: Vec3::new(0.0, 5.0, 0.0),
            angular_velocity: Vec3::ZERO,
            size: Vec3::splat(1.0),
            half_height: 0.5,
            age: FRAGMENT_MAX_AGE,
            rest_age: None,
            rest_duration: 10.0,
        };
        let mut transform = Transform::from_xyz(0.0, 50.0, 0.0);
        assert!(!integrate_fragment(&mut old, &mut transform, 0.016, 120.0));

        // Out of bounds horizontally.
        let mut runaway = Fragment {
            velocity: Vec3::new(500.0, 0.0, 0.0),
            angular_velocity: Vec3::ZERO,
            size: Vec3::splat(1.0),
            half_height: 0.5,
            age: 0.0,
            rest_age: None,
            rest_duration: 10.0,
        };
        let mut transform = Transform::from_xyz(119.0, 50.0, 0.0);
        assert!(!integrate_fragment(&mut runaway, &mut transform, 0.016, 120.0));
    }
}
