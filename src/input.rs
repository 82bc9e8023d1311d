use bevy::prelude::*;

use crate::sim::InputState;

/// Decoded intent for the current frame. The fixed-step driver samples
/// `held` once per tick; the phase machine uses the edge flags. Scenario
/// playback writes this resource directly instead of the keyboard system.
#[derive(Resource, Default, Clone, Copy)]
pub struct InputSnapshot {
    pub held: InputState,
    pub jump_edge: bool,
    pub restart_edge: bool,
    pub debug_edge: bool,
}

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(InputSnapshot::default()).add_systems(
            PreUpdate,
            keyboard_to_snapshot.run_if(resource_exists::<ButtonInput<KeyCode>>),
        );
    }
}

/// Translate keyboard state to the typed snapshot. A/D and the arrows
/// move, Space/W/Up jump, ShiftLeft is the (currently unused) dash, R
/// restarts, F3 toggles the debug overlay.
fn keyboard_to_snapshot(keyboard: Res<ButtonInput<KeyCode>>, mut snapshot: ResMut<InputSnapshot>) {
    let jump_held = keyboard.pressed(KeyCode::Space)
        || keyboard.pressed(KeyCode::KeyW)
        || keyboard.pressed(KeyCode::ArrowUp);
    snapshot.held = InputState {
        left: keyboard.pressed(KeyCode::KeyA) || keyboard.pressed(KeyCode::ArrowLeft),
        right: keyboard.pressed(KeyCode::KeyD) || keyboard.pressed(KeyCode::ArrowRight),
        jump: jump_held,
        dash: keyboard.pressed(KeyCode::ShiftLeft),
    };
    snapshot.jump_edge = keyboard.just_pressed(KeyCode::Space)
        || keyboard.just_pressed(KeyCode::KeyW)
        || keyboard.just_pressed(KeyCode::ArrowUp);
    snapshot.restart_edge = keyboard.just_pressed(KeyCode::KeyR);
    snapshot.debug_edge = keyboard.just_pressed(KeyCode::F3);
}
