// Procedural city generation.
//
// Buildings are laid out on a jittered grid with road gaps, randomized
// footprints and a height distribution biased toward low-rise (pow skew),
// then registered in the spatial grid. Generation runs once at startup; the
// city resets to a fresh layout on every process start.
use bevy::prelude::*;
use rand::Rng;

use crate::config::SimConfig;
use crate::constants::*;
use crate::types::{Building, SimStats, SpatialGrid};

pub fn generate_city(
    mut commands: Commands,
    config: Res<SimConfig>,
    mut grid: ResMut<SpatialGrid>,
    mut stats: ResMut<SimStats>,
) {
    let mut rng = rand::thread_rng();
    let half = config.city_half_size();
    let spacing = config.building_spacing;
    let road = config.road_width;
    let mut count = 0;

    let mut x = -half;
    while x < half {
        let mut z = -half;
        while z < half {
            if rng.gen::<f32>() > 1.0 - BUILDING_SKIP_CHANCE {
                z += spacing + road + rng.gen::<f32>() * spacing * 0.7;
                continue;
            }

            let width = rng.gen::<f32>() * (spacing * 0.8) + spacing * 0.5;
            let depth = rng.gen::<f32>() * (spacing * 0.8) + spacing * 0.5;
            let height = rng.gen::<f32>().powf(BUILDING_HEIGHT_BIAS) * config.building_max_height
                + BUILDING_MIN_HEIGHT;

            let position = Vec3::new(
                x + (rng.gen::<f32>() - 0.5) * road * 0.4,
                height / 2.0,
                z + (rng.gen::<f32>() - 0.5) * road * 0.4,
            );

            let entity = commands
                .spawn((
                    Building::new(Vec3::new(width, height, depth)),
                    Transform::from_translation(position),
                ))
                .id();
            grid.insert(entity, position);
            count += 1;

            z += spacing + road + rng.gen::<f32>() * spacing * 0.7;
        }
        x += spacing + road + rng.gen::<f32>() * spacing * 0.7;
    }

    stats.buildings_standing = count;
    info!("Generated city: {} buildings", count);
}

/// True when `position` keeps at least `margin` clearance from every building
/// footprint in `footprints` (center, full size). Used by pedestrian
/// placement.
pub fn position_clear_of_buildings(
    position: Vec3,
    margin: f32,
    footprints: &[(Vec3, Vec3)],
) -> bool {
    for (center, size) in footprints {
        let dx = (position.x - center.x).abs();
        let dz = (position.z - center.z).abs();
        if dx < size.x / 2.0 + margin && dz < size.z / 2.0 + margin {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clearance_rejects_points_inside_a_footprint() {
        let footprints = vec![(Vec3::new(0.0, 5.0, 0.0), Vec3::new(4.0, 10.0, 4.0))];
        assert!(!position_clear_of_buildings(
            Vec3::ZERO,
            PEDESTRIAN_CLEARANCE,
            &footprints
        ));
    }

    #[test]
    fn clearance_rejects_points_within_the_margin() {
        let footprints = vec![(Vec3::new(0.0, 5.0, 0.0), Vec3::new(4.0, 10.0, 4.0))];
        // Just outside the wall but inside the clearance band.
        let position = Vec3::new(2.0 + PEDESTRIAN_CLEARANCE * 0.5, 0.0, 0.0);
        assert!(!position_clear_of_buildings(
            position,
            PEDESTRIAN_CLEARANCE,
            &footprints
        ));
    }

    #[test]
    fn clearance_accepts_open_street_points() {
        let footprints = vec![
            (Vec3::new(0.0, 5.0, 0.0), Vec3::new(4.0, 10.0, 4.0)),
            (Vec3::new(10.0, 5.0, 10.0), Vec3::new(3.0, 8.0, 3.0)),
        ];
        assert!(position_clear_of_buildings(
            Vec3::new(5.5, 0.0, 0.0),
            PEDESTRIAN_CLEARANCE,
            &footprints
        ));
    }

    #[test]
    fn empty_city_is_always_clear() {
        assert!(position_clear_of_buildings(Vec3::ZERO, 1.0, &[]));
    }
}
