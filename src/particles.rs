// Smoke/dust particle pool.
//
// Fixed capacity, structure-of-arrays, zero allocation during simulation.
// A slot whose age reaches max_age is "dead": its opacity is zeroed and it is
// parked far below the scene until the next spawn request reinitializes it.
// Spawn requests claim at most half the pool per call; when fewer dead slots
// exist the spawn is partial, never an error.
use bevy::prelude::*;
use rand::Rng;
use rayon::prelude::*;
use std::f32::consts::{PI, TAU};

use crate::constants::*;
use crate::types::{sim_dt, SimStats};

#[derive(Resource)]
pub struct SmokePool {
    positions: Vec<Vec3>,
    velocities: Vec<Vec3>,
    ages: Vec<f32>,
    sizes: Vec<f32>,
    opacities: Vec<f32>,
    max_age: f32,
    live: usize,
}

impl SmokePool {
    pub fn new(capacity: usize, max_age: f32) -> Self {
        Self {
            positions: vec![Vec3::new(0.0, SMOKE_PARKING_DEPTH, 0.0); capacity],
            velocities: vec![Vec3::ZERO; capacity],
            ages: vec![max_age; capacity],
            sizes: vec![1.0; capacity],
            opacities: vec![0.0; capacity],
            max_age,
            live: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.positions.len()
    }

    /// Slots whose age is still below max_age.
    pub fn live(&self) -> usize {
        self.live
    }

    pub fn is_live(&self, index: usize) -> bool {
        self.ages[index] < self.max_age
    }

    /// Position, size and opacity of a slot, for the render sync.
    pub fn slot(&self, index: usize) -> (Vec3, f32, f32) {
        (
            self.positions[index],
            self.sizes[index],
            self.opacities[index],
        )
    }

    #[cfg(test)]
    pub fn ages(&self) -> &[f32] {
        &self.ages
    }

    /// Advance every live slot: integrate position, apply per-axis drag and
    /// lateral turbulence, run the size/opacity lifecycle, park slots that
    /// age out.
    pub fn integrate(&mut self, dt: f32) {
        let max_age = self.max_age;
        self.positions
            .par_iter_mut()
            .zip(self.velocities.par_iter_mut())
            .zip(self.ages.par_iter_mut())
            .zip(self.sizes.par_iter_mut())
            .zip(self.opacities.par_iter_mut())
            .for_each(|((((position, velocity), age), size), opacity)| {
                if *age >= max_age {
                    return;
                }
                *age += dt;
                if *age >= max_age {
                    // Dead: park out of view, keep the slot for reuse.
                    *opacity = 0.0;
                    position.y = SMOKE_PARKING_DEPTH;
                    return;
                }

                let age_ratio = *age / max_age;
                *position += *velocity * dt;

                // Horizontal drag is stronger than vertical so plumes keep
                // rising while they mushroom out.
                velocity.x *= 1.0 - dt * 0.35;
                velocity.y *= 1.0 - dt * 0.15;
                velocity.z *= 1.0 - dt * 0.35;

                let mut rng = rand::thread_rng();
                velocity.x += (rng.gen::<f32>() - 0.5) * dt * 6.0;
                velocity.z += (rng.gen::<f32>() - 0.5) * dt * 6.0;

                *size = 1.0 + (age_ratio * PI).sin() * 3.5;
                let fade_in = (*age * 2.5).min(1.0);
                let fade_out = (1.0 - age_ratio * 1.1).max(0.0);
                *opacity = fade_in * fade_out * 0.65;
            });

        self.live = self.ages.iter().filter(|a| **a < max_age).count();
    }

    /// Reinitialize dead slots as fresh particles at the blast origin.
    /// Claims at most half the pool; returns how many were actually spawned.
    pub fn spawn(&mut self, origin: Vec3, spread: f32, rise_speed: f32) -> usize {
        let budget = self.capacity() / 2;
        let mut rng = rand::thread_rng();
        let mut spawned = 0;

        for i in 0..self.capacity() {
            if spawned >= budget {
                break;
            }
            if self.ages[i] < self.max_age {
                continue;
            }

            // Uniform solid angle: theta uniform, phi via inverse cosine.
            let theta = rng.gen::<f32>() * TAU;
            let phi = (rng.gen::<f32>() * 2.0 - 1.0).acos();
            let radius = rng.gen::<f32>() * spread * 0.35;
            let (sin_phi, cos_phi) = phi.sin_cos();
            let (sin_theta, cos_theta) = theta.sin_cos();

            self.positions[i] = origin
                + Vec3::new(
                    radius * sin_phi * cos_theta,
                    radius * cos_phi * 0.6,
                    radius * sin_phi * sin_theta,
                );

            let speed = (0.6 + rng.gen::<f32>() * 0.4) * rise_speed;
            let up_factor = 0.75 + rng.gen::<f32>() * 0.5;
            let out_factor = 1.0 - up_factor * 0.7;
            self.velocities[i] = Vec3::new(
                sin_phi * cos_theta * speed * out_factor,
                cos_phi * speed * up_factor + rng.gen::<f32>() * 0.25 * speed,
                sin_phi * sin_theta * speed * out_factor,
            );

            self.ages[i] = 0.0;
            self.sizes[i] = 1.0 + rng.gen::<f32>() * 0.5;
            self.opacities[i] = 0.0; // fades in
            spawned += 1;
        }

        self.live = self.ages.iter().filter(|a| **a < self.max_age).count();
        spawned
    }
}

pub fn integrate_smoke_pool(
    time: Res<Time>,
    mut pool: ResMut<SmokePool>,
    mut stats: ResMut<SimStats>,
) {
    pool.integrate(sim_dt(&time));
    stats.active_particles = pool.live();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_starts_fully_dead_and_parked() {
        let pool = SmokePool::new(100, SMOKE_MAX_AGE);
        assert_eq!(pool.capacity(), 100);
        assert_eq!(pool.live(), 0);
        for i in 0..pool.capacity() {
            assert!(!pool.is_live(i));
            assert_eq!(pool.slot(i).0.y, SMOKE_PARKING_DEPTH);
        }
    }

    #[test]
    fn spawn_claims_at_most_half_the_pool() {
        let mut pool = SmokePool::new(100, SMOKE_MAX_AGE);
        let spawned = pool.spawn(Vec3::ZERO, 30.0, 34.0);
        assert_eq!(spawned, 50);
        assert_eq!(pool.live(), 50);
    }

    #[test]
    fn spawn_is_partial_when_few_slots_are_dead() {
        let mut pool = SmokePool::new(100, SMOKE_MAX_AGE);
        pool.spawn(Vec3::ZERO, 30.0, 34.0);
        // 50 live, 50 dead; the second request wants 50 but only finds 50,
        // the third finds none at all.
        let second = pool.spawn(Vec3::ZERO, 30.0, 34.0);
        assert_eq!(second, 50);
        let third = pool.spawn(Vec3::ZERO, 30.0, 34.0);
        assert_eq!(third, 0);
        assert_eq!(pool.live(), 100);
    }

    #[test]
    fn spawn_only_touches_dead_slots() {
        let mut pool = SmokePool::new(10, SMOKE_MAX_AGE);
        pool.spawn(Vec3::ZERO, 10.0, 10.0);
        pool.integrate(1.0);
        let aged: Vec<f32> = pool.ages().to_vec();

        pool.spawn(Vec3::new(50.0, 0.0, 0.0), 10.0, 10.0);
        for (i, age) in pool.ages().iter().enumerate() {
            if aged[i] < SMOKE_MAX_AGE {
                // Live slot kept its accumulated age: it was not respawned.
                assert_eq!(*age, aged[i]);
            }
        }
    }

    #[test]
    fn capacity_is_invariant_across_lifecycles() {
        let mut pool = SmokePool::new(64, 1.0);
        pool.spawn(Vec3::ZERO, 5.0, 5.0);
        for _ in 0..40 {
            pool.integrate(0.05);
        }
        assert_eq!(pool.capacity(), 64);
        assert_eq!(pool.live() + pool.ages().iter().filter(|a| **a >= 1.0).count(), 64);
    }

    #[test]
    fn aged_out_particles_are_parked_and_invisible() {
        let mut pool = SmokePool::new(8, 1.0);
        pool.spawn(Vec3::new(0.0, 5.0, 0.0), 2.0, 2.0);
        for _ in 0..30 {
            pool.integrate(0.05);
        }
        assert_eq!(pool.live(), 0);
        for i in 0..pool.capacity() {
            let (position, _, opacity) = pool.slot(i);
            assert_eq!(opacity, 0.0);
            assert_eq!(position.y, SMOKE_PARKING_DEPTH);
        }
    }

    #[test]
    fn fresh_particles_fade_in_from_zero_opacity() {
        let mut pool = SmokePool::new(8, SMOKE_MAX_AGE);
        pool.spawn(Vec3::ZERO, 10.0, 10.0);
        for i in 0..pool.capacity() {
            let (_, size, opacity) = pool.slot(i);
            assert!((1.0..=1.5).contains(&size));
            assert_eq!(opacity, 0.0);
        }
        pool.integrate(0.1);
        let any_visible = (0..pool.capacity()).any(|i| pool.slot(i).2 > 0.0);
        assert!(any_visible, "opacity should rise after the first frames");
    }

    #[test]
    fn spawned_particles_cluster_near_the_origin() {
        let mut pool = SmokePool::new(32, SMOKE_MAX_AGE);
        let origin = Vec3::new(10.0, 0.0, -20.0);
        let spread = 30.0;
        pool.spawn(origin, spread, 34.0);
        for i in 0..pool.capacity() {
            let offset = pool.slot(i).0 - origin;
            assert!(offset.length() <= spread * 0.35 + 1e-3);
        }
    }
}
