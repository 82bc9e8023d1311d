//! Broadcast log connecting the simulation to the shell.
//!
//! The sim core never touches Bevy directly; the driver digests its
//! `SimEvent`s into named entries here, and the shell sides (audio, phase
//! flow) read them through their own cursors. Nothing pops: the bus trims
//! its own tail, so a reader that runs late misses sound cues, not
//! correctness.

use std::collections::VecDeque;

use bevy::prelude::*;

/// Backlog cap. A busy tick emits single-digit counts, so this holds
/// several seconds of history for the slowest reader.
const EVENT_BACKLOG: usize = 500;
/// Overflow warnings repeat at most once per this many fixed frames.
const DROP_WARN_INTERVAL: u64 = 60;

/// A named simulation fact with a JSON payload, stamped with the fixed
/// frame it landed on.
#[derive(Clone, Debug)]
pub struct GameEvent {
    pub name: String,
    pub data: serde_json::Value,
    pub frame: u64,
}

#[derive(Resource)]
pub struct GameEventBus {
    pub recent: VecDeque<GameEvent>,
    /// Current fixed frame. Starts at 1 so zero-initialized cursors see
    /// the very first tick's events.
    pub frame: u64,
    pub dropped: u64,
    warned_at: u64,
}

impl Default for GameEventBus {
    fn default() -> Self {
        Self {
            recent: VecDeque::with_capacity(64),
            frame: 1,
            dropped: 0,
            warned_at: 0,
        }
    }
}

impl GameEventBus {
    pub fn emit(&mut self, name: impl Into<String>, data: serde_json::Value) {
        self.recent.push_back(GameEvent {
            name: name.into(),
            data,
            frame: self.frame,
        });
        if self.recent.len() > EVENT_BACKLOG {
            self.recent.pop_front();
            self.dropped += 1;
            if self.dropped == 1 || self.frame.saturating_sub(self.warned_at) >= DROP_WARN_INTERVAL
            {
                self.warned_at = self.frame;
                warn!(
                    "[Snare events] backlog full ({} dropped so far)",
                    self.dropped
                );
            }
        }
    }

    /// Everything that landed after `frame`, oldest first.
    pub fn since(&self, frame: u64) -> impl Iterator<Item = &GameEvent> {
        self.recent.iter().filter(move |ev| ev.frame > frame)
    }
}

pub struct GameEventsPlugin;

impl Plugin for GameEventsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GameEventBus>().add_systems(
            FixedUpdate,
            advance_event_clock.run_if(crate::game_runtime::gameplay_active),
        );
    }
}

/// The bus frame advances with the sim tick, so event timestamps line up
/// with simulation time even across pauses.
fn advance_event_clock(mut bus: ResMut<GameEventBus>) {
    bus.frame += 1;
}
