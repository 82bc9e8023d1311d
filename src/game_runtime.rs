use bevy::prelude::*;

use crate::driver::{load_level, ActiveSim, ViewConfig};
use crate::events::GameEventBus;
use crate::input::InputSnapshot;
use crate::level::LevelLibrary;

/// Pause between the death notification and the automatic reload.
const RESPAWN_DELAY: f32 = 0.6;
/// Celebration window after a win before the next level loads.
const TRANSITION_DELAY: f32 = 1.5;

/// Outer flow of the program. The simulation only advances in `Playing`;
/// every other phase leaves the fixed-step systems gated off, so no
/// accumulated clock time is ever replayed into a paused world.
#[derive(States, Default, Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum GamePhase {
    #[default]
    Attract,
    Playing,
    Respawn,
    Transition,
}

/// Where the player is in the campaign, and how much it has cost them.
#[derive(Resource, Default, Clone, Copy)]
pub struct Progress {
    pub level_index: usize,
    pub deaths: u32,
}

/// Countdown driving the Respawn and Transition phases.
#[derive(Resource, Default)]
struct PhaseDelay(f32);

/// Cursor into the event bus so phase logic sees each event exactly once.
#[derive(Resource, Default)]
struct PhaseEventCursor {
    last_frame: u64,
    processed_in_frame: usize,
}

/// Run condition for everything that should only happen mid-attempt.
pub fn gameplay_active(state: Option<Res<State<GamePhase>>>) -> bool {
    state
        .map(|s| *s.get() == GamePhase::Playing)
        .unwrap_or(false)
}

pub struct GamePhasePlugin;

impl Plugin for GamePhasePlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<GamePhase>()
            .init_resource::<Progress>()
            .init_resource::<PhaseDelay>()
            .init_resource::<PhaseEventCursor>()
            .add_systems(
                Update,
                (
                    attract_start.run_if(in_state(GamePhase::Attract)),
                    watch_attempt.run_if(in_state(GamePhase::Playing)),
                    respawn_tick.run_if(in_state(GamePhase::Respawn)),
                    transition_tick.run_if(in_state(GamePhase::Transition)),
                ),
            );
    }
}

fn attract_start(
    input: Res<InputSnapshot>,
    library: Res<LevelLibrary>,
    view: Res<ViewConfig>,
    progress: Res<Progress>,
    mut active: ResMut<ActiveSim>,
    mut next: ResMut<NextState<GamePhase>>,
) {
    if !input.jump_edge {
        return;
    }
    if let Some(sim) = load_level(&library, progress.level_index, &view) {
        active.0 = Some(sim);
        next.set(GamePhase::Playing);
    }
}

/// Reacts to the attempt's terminal events and to the manual restart key.
fn watch_attempt(
    bus: Res<GameEventBus>,
    mut cursor: ResMut<PhaseEventCursor>,
    input: Res<InputSnapshot>,
    mut active: ResMut<ActiveSim>,
    mut progress: ResMut<Progress>,
    mut delay: ResMut<PhaseDelay>,
    mut next: ResMut<NextState<GamePhase>>,
) {
    if input.restart_edge {
        if let Some(sim) = active.0.as_mut() {
            sim.restart();
            progress.deaths += 1;
        }
    }

    let mut count_in_frame = 0usize;
    for ev in bus.recent.iter() {
        if ev.frame < cursor.last_frame {
            continue;
        }
        if ev.frame == cursor.last_frame {
            count_in_frame = count_in_frame.saturating_add(1);
            if count_in_frame <= cursor.processed_in_frame {
                continue;
            }
        } else {
            count_in_frame = 1;
        }

        match ev.name.as_str() {
            "death_notified" => {
                progress.deaths += 1;
                delay.0 = RESPAWN_DELAY;
                next.set(GamePhase::Respawn);
            }
            "level_won" => {
                delay.0 = TRANSITION_DELAY;
                next.set(GamePhase::Transition);
            }
            _ => {}
        }

        cursor.last_frame = ev.frame;
        cursor.processed_in_frame = count_in_frame;
    }
}

fn respawn_tick(
    time: Res<Time>,
    mut delay: ResMut<PhaseDelay>,
    mut active: ResMut<ActiveSim>,
    mut next: ResMut<NextState<GamePhase>>,
) {
    delay.0 -= time.delta_secs();
    if delay.0 > 0.0 {
        return;
    }
    if let Some(sim) = active.0.as_mut() {
        sim.restart();
    }
    next.set(GamePhase::Playing);
}

fn transition_tick(
    time: Res<Time>,
    mut delay: ResMut<PhaseDelay>,
    library: Res<LevelLibrary>,
    view: Res<ViewConfig>,
    mut progress: ResMut<Progress>,
    mut active: ResMut<ActiveSim>,
    mut next: ResMut<NextState<GamePhase>>,
) {
    delay.0 -= time.delta_secs();
    if delay.0 > 0.0 {
        return;
    }
    let next_index = progress.level_index + 1;
    if next_index < library.len() {
        progress.level_index = next_index;
        if let Some(sim) = load_level(&library, next_index, &view) {
            active.0 = Some(sim);
            next.set(GamePhase::Playing);
            return;
        }
    }
    info!(
        "[Snare] campaign complete after {} deaths; back to the start",
        progress.deaths
    );
    progress.level_index = 0;
    active.0 = None;
    next.set(GamePhase::Attract);
}
