// Core components, events and resources shared across the simulation.
use bevy::prelude::*;

use crate::constants::*;

// ===== COMPONENTS =====

/// A standing building. Position lives in the `Transform` (center at half
/// height); proximity tests use the 2D center and `bounding_radius`.
#[derive(Component)]
pub struct Building {
    /// Full extents: width, height, depth.
    pub size: Vec3,
    /// Horizontal bounding radius derived from the footprint.
    pub bounding_radius: f32,
}

impl Building {
    pub fn new(size: Vec3) -> Self {
        let bounding_radius = (size.x * size.x + size.z * size.z).sqrt() * 0.5;
        Self {
            size,
            bounding_radius,
        }
    }
}

/// Debris box spawned from a destroyed building.
#[derive(Component)]
pub struct Fragment {
    pub velocity: Vec3,
    /// Per-axis spin rate, rad/s. Tumbling only, not coupled to the velocity.
    pub angular_velocity: Vec3,
    pub size: Vec3,
    pub half_height: f32,
    pub age: f32,
    /// Age at which the fragment settled, once velocity decayed after ground
    /// contact. Removal follows after `rest_duration`.
    pub rest_age: Option<f32>,
    pub rest_duration: f32,
}

/// A bomb in flight. Each bomb captures the power factor selected at launch;
/// changing the control mid-flight does not affect it.
#[derive(Component)]
pub struct ActiveBomb {
    pub target: Vec3,
    pub power_factor: f32,
    /// Handle to the in-flight whistle voice, stopped early on detonation.
    pub voice: Option<u64>,
}

/// Direct structural references to a pedestrian's limb pivots, captured at
/// spawn time. No name-based traversal happens at animation time.
pub struct PedestrianLimbs {
    pub left_arm: Entity,
    pub right_arm: Entity,
    pub left_leg: Entity,
    pub right_leg: Entity,
}

#[derive(Component)]
pub struct Pedestrian {
    pub velocity: Vec3,
    pub speed: f32,
    /// Per-pedestrian phase offset so gaits don't sync up.
    pub gait_offset: f32,
    pub limbs: PedestrianLimbs,
}

/// Marker for limb pivot entities (children of a pedestrian).
#[derive(Component)]
pub struct LimbPivot;

// ===== EVENTS =====

/// Fired by the input surface (or tests) to request a launch at the current
/// target. Rejected with a status message when no target is set.
#[derive(Event)]
pub struct LaunchRequest;

/// A bomb reached detonation altitude this frame. Resolution happens in the
/// same frame, before the effect timelines advance.
#[derive(Event)]
pub struct DetonationEvent {
    pub position: Vec3,
    pub power_factor: f32,
}

// ===== RESOURCES =====

/// The currently picked ground target, if any. Consumed by a launch.
#[derive(Resource, Default)]
pub struct TargetState {
    pub position: Option<Vec3>,
}

/// Human-readable state string pushed by the core, rendered by the UI layer.
#[derive(Resource)]
pub struct SimStatus {
    pub message: String,
}

impl Default for SimStatus {
    fn default() -> Self {
        Self {
            message: "Set a target".to_string(),
        }
    }
}

/// Numeric counters for the UI sink.
#[derive(Resource, Default)]
pub struct SimStats {
    pub active_particles: usize,
    pub pedestrians_alive: usize,
    pub buildings_standing: usize,
    pub fragments_active: usize,
    pub detonations: u32,
}

/// Fixed cell grid over the city for radius queries against buildings.
/// Buildings are inserted once at generation and removed transactionally when
/// destroyed; query range is derived from the requested radius.
#[derive(Resource)]
pub struct SpatialGrid {
    cells: Vec<Vec<Entity>>,
    cell_size: f32,
    size: i32,
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialGrid {
    pub fn new() -> Self {
        let size = GRID_SIZE;
        Self {
            cells: vec![Vec::new(); (size * size) as usize],
            cell_size: GRID_CELL_SIZE,
            size,
        }
    }

    fn world_to_grid(&self, pos: Vec3) -> (i32, i32) {
        let half = self.size as f32 * self.cell_size * 0.5;
        let x = ((pos.x + half) / self.cell_size) as i32;
        let z = ((pos.z + half) / self.cell_size) as i32;
        (x.clamp(0, self.size - 1), z.clamp(0, self.size - 1))
    }

    fn cell_index(&self, x: i32, z: i32) -> usize {
        (x * self.size + z) as usize
    }

    pub fn insert(&mut self, entity: Entity, pos: Vec3) {
        let (x, z) = self.world_to_grid(pos);
        let index = self.cell_index(x, z);
        self.cells[index].push(entity);
    }

    pub fn remove(&mut self, entity: Entity, pos: Vec3) {
        let (x, z) = self.world_to_grid(pos);
        let index = self.cell_index(x, z);
        self.cells[index].retain(|&e| e != entity);
    }

    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }

    /// Entities in every cell overlapping a circle of `radius` around `pos`.
    /// Coarse by one cell on each side; callers still do the exact distance
    /// test.
    pub fn nearby_in_radius(&self, pos: Vec3, radius: f32) -> Vec<Entity> {
        let (center_x, center_z) = self.world_to_grid(pos);
        let range = (radius / self.cell_size).ceil() as i32 + 1;
        let mut nearby = Vec::new();

        for dx in -range..=range {
            for dz in -range..=range {
                let x = center_x + dx;
                let z = center_z + dz;
                if x >= 0 && x < self.size && z >= 0 && z < self.size {
                    nearby.extend(&self.cells[self.cell_index(x, z)]);
                }
            }
        }
        nearby
    }
}

// ===== HELPERS =====

/// Frame delta clamped against long pauses (tab backgrounding, debugger).
#[inline]
pub fn sim_dt(time: &Time) -> f32 {
    time.delta_secs().min(MAX_FRAME_DT)
}

/// Horizontal (2D) distance between two points.
#[inline]
pub fn horizontal_distance(a: Vec3, b: Vec3) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    (dx * dx + dz * dz).sqrt()
}

// ===== SYSTEMS =====

/// Refresh the UI counters after the frame's mutations have been applied.
pub fn update_sim_counters(
    mut stats: ResMut<SimStats>,
    buildings: Query<(), With<Building>>,
    fragments: Query<(), With<Fragment>>,
    pedestrians: Query<(), With<Pedestrian>>,
) {
    stats.buildings_standing = buildings.iter().count();
    stats.fragments_active = fragments.iter().count();
    stats.pedestrians_alive = pedestrians.iter().count();
}
