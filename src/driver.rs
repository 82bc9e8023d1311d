use bevy::prelude::*;

use crate::events::GameEventBus;
use crate::level::LevelLibrary;
use crate::sim::{InputState, SimEvent, Simulation};

/// Window/view parameters the simulation needs at load time. Populated from
/// the startup config before the app runs.
#[derive(Resource, Clone)]
pub struct ViewConfig {
    pub width: f32,
    pub height: f32,
    pub reduced_motion: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
            reduced_motion: false,
        }
    }
}

/// Set once at startup from `--headless`; render-side systems bail out
/// when it is on.
#[derive(Resource, Default, Clone, Copy)]
pub struct HeadlessMode(pub bool);

/// The live simulation, when a level is loaded. `None` outside an attempt.
#[derive(Resource, Default)]
pub struct ActiveSim(pub Option<Simulation>);

pub struct DriverPlugin;

impl Plugin for DriverPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ActiveSim>()
            .init_resource::<ViewConfig>()
            .add_systems(
                FixedUpdate,
                advance_simulation.run_if(crate::game_runtime::gameplay_active),
            );
    }
}

/// One fixed tick: sample held input, step the world, forward whatever the
/// sim produced onto the bus. Gated off outside the Playing phase, so a
/// paused or finished attempt never consumes accumulated fixed-clock time.
fn advance_simulation(
    mut active: ResMut<ActiveSim>,
    input: Res<crate::input::InputSnapshot>,
    mut bus: ResMut<GameEventBus>,
) {
    let Some(sim) = active.0.as_mut() else {
        return;
    };
    step_once(sim, &input.held, &mut bus);
}

pub fn step_once(sim: &mut Simulation, input: &InputState, bus: &mut GameEventBus) {
    sim.step(input);
    for event in sim.take_events() {
        let payload = match event {
            SimEvent::Died | SimEvent::DeathNotified | SimEvent::Won => {
                serde_json::json!({ "level": sim.level.id })
            }
            _ => serde_json::json!({}),
        };
        bus.emit(event_name(event), payload);
    }
}

pub fn event_name(event: SimEvent) -> &'static str {
    match event {
        SimEvent::Jumped => "jumped",
        SimEvent::KeyCollected => "key_collected",
        SimEvent::ButtonPressed => "button_pressed",
        SimEvent::SpringBounced => "spring_bounced",
        SimEvent::Crumbled => "crumbled",
        SimEvent::Shot => "shot",
        SimEvent::Died => "died",
        SimEvent::DeathNotified => "death_notified",
        SimEvent::Won => "level_won",
    }
}

/// Builds a fresh attempt at the library level with the given index.
/// Returns `None` (after a warning) when the index is out of range.
pub fn load_level(library: &LevelLibrary, index: usize, view: &ViewConfig) -> Option<Simulation> {
    let Some(data) = library.by_index(index) else {
        warn!("[Snare] no level at index {}", index);
        return None;
    };
    let mut sim = Simulation::new(data.clone(), view.width, view.height);
    sim.reduced_motion = view.reduced_motion;
    info!("[Snare] loaded level {} '{}'", data.id, data.name);
    Some(sim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{EntityDef, KindTag, LevelData, Point};

    fn door_at_spawn() -> LevelData {
        LevelData {
            id: 9,
            name: "driver fixture".to_string(),
            width: 800.0,
            height: 600.0,
            spawn: Point { x: 80.0, y: 520.0 },
            entities: vec![
                EntityDef::new("floor", KindTag::Wall, 0.0, 560.0, 800.0, 40.0),
                EntityDef::new("exit", KindTag::Door, 80.0, 480.0, 40.0, 80.0),
            ],
            hint: None,
            time_limit: None,
        }
    }

    #[test]
    fn stepping_forwards_sim_events_onto_the_bus() {
        let mut sim = Simulation::new(door_at_spawn(), 1280.0, 720.0);
        let mut bus = GameEventBus::default();
        step_once(&mut sim, &InputState::default(), &mut bus);
        let names: Vec<_> = bus.recent.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"level_won"));
        let won = bus.recent.iter().find(|e| e.name == "level_won").unwrap();
        assert_eq!(won.data.get("level").and_then(|v| v.as_u64()), Some(9));
    }

    #[test]
    fn load_level_respects_library_order() {
        let library = LevelLibrary::new(vec![door_at_spawn()]);
        let view = ViewConfig::default();
        assert!(load_level(&library, 0, &view).is_some());
        assert!(load_level(&library, 1, &view).is_none());
    }
}
