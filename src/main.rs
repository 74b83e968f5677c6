use bevy::prelude::*;

use citybomber::{PresentationPlugin, SimulationPlugin};

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "City Bomber".to_string(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins((SimulationPlugin, PresentationPlugin))
        .run();
}
