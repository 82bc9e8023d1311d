use bevy::prelude::*;
use rand::Rng;

use crate::driver::{ActiveSim, HeadlessMode, ViewConfig};

#[derive(Component)]
pub struct MainCamera;

/// The simulation owns the follow/lerp/shake math; this plugin only maps
/// its camera state onto the Bevy transform. Simulation space is y-down
/// with the origin at the level's top-left, so the sync negates y.
pub struct SnareCameraPlugin;

impl Plugin for SnareCameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_camera)
            .add_systems(Update, sync_camera);
    }
}

fn spawn_camera(mut commands: Commands, headless: Res<HeadlessMode>) {
    if headless.0 {
        return;
    }
    commands.spawn((MainCamera, Camera2d, Transform::from_xyz(0.0, 0.0, 100.0)));
}

fn base_translation(cam_x: f32, cam_y: f32, view: &ViewConfig) -> Vec2 {
    Vec2::new(cam_x + view.width / 2.0, -(cam_y + view.height / 2.0))
}

fn sync_camera(
    active: Res<ActiveSim>,
    view: Res<ViewConfig>,
    mut query: Query<&mut Transform, With<MainCamera>>,
) {
    let Ok(mut transform) = query.get_single_mut() else {
        return;
    };
    let Some(sim) = active.0.as_ref() else {
        return;
    };
    let cam = &sim.effects.camera;
    let base = base_translation(cam.x, cam.y, &view);
    // Draw-time jitter; the magnitude itself decays inside the sim.
    let mut rng = rand::thread_rng();
    let jitter = Vec2::new(
        (rng.gen::<f32>() - 0.5) * cam.shake,
        (rng.gen::<f32>() - 0.5) * cam.shake,
    );
    transform.translation.x = base.x + jitter.x;
    transform.translation.y = base.y - jitter.y;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_mode_spawns_no_camera() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(HeadlessMode(true))
            .insert_resource(ActiveSim::default())
            .insert_resource(ViewConfig::default())
            .add_plugins(SnareCameraPlugin);
        app.update();
        let count = app
            .world_mut()
            .query::<&MainCamera>()
            .iter(app.world())
            .len();
        assert_eq!(count, 0);
    }

    #[test]
    fn translation_flips_the_y_axis() {
        let view = ViewConfig {
            width: 1280.0,
            height: 720.0,
            reduced_motion: false,
        };
        let base = base_translation(100.0, 40.0, &view);
        assert_eq!(base.x, 100.0 + 640.0);
        assert_eq!(base.y, -(40.0 + 360.0));
    }
}
