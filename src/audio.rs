use std::collections::HashMap;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::events::GameEventBus;

const MAX_CUE_LOG: usize = 256;

/// One synthesized SFX voice: a single oscillator sweep. There is no
/// playback pipeline behind this; the cue log is the observable output,
/// which is exactly what the tests and the scenario runner consume.
#[derive(Clone, Serialize, Deserialize)]
pub struct CueDef {
    pub wave: String,
    pub start_hz: f32,
    pub end_hz: f32,
    pub duration: f32,
    pub gain: f32,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct CuePlay {
    pub frame: u64,
    pub name: String,
    pub volume: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
}

/// The four built-in voices plus an event-name trigger map. Gameplay never
/// calls `play` directly; it emits bus events and the trigger map decides
/// what sounds.
#[derive(Resource)]
pub struct AudioCues {
    pub cues: HashMap<String, CueDef>,
    pub triggers: HashMap<String, String>,
    pub muted: bool,
    pub volume: f32,
    pub recent: Vec<CuePlay>,
}

fn cue(wave: &str, start_hz: f32, end_hz: f32, duration: f32, gain: f32) -> CueDef {
    CueDef {
        wave: wave.to_string(),
        start_hz,
        end_hz,
        duration,
        gain,
    }
}

impl Default for AudioCues {
    fn default() -> Self {
        let mut cues = HashMap::new();
        cues.insert("jump".to_string(), cue("square", 150.0, 300.0, 0.1, 0.1));
        cues.insert("die".to_string(), cue("sawtooth", 200.0, 50.0, 0.3, 0.2));
        // Rising A-major arpeggio; the triad lives in the renderer of
        // whatever backend eventually plays these.
        cues.insert("win".to_string(), cue("sine", 440.0, 659.0, 0.9, 0.1));
        cues.insert("crumble".to_string(), cue("triangle", 100.0, 50.0, 0.1, 0.1));

        let mut triggers = HashMap::new();
        for name in [
            "jumped",
            "key_collected",
            "button_pressed",
            "spring_bounced",
        ] {
            triggers.insert(name.to_string(), "jump".to_string());
        }
        triggers.insert("crumbled".to_string(), "crumble".to_string());
        triggers.insert("died".to_string(), "die".to_string());
        triggers.insert("level_won".to_string(), "win".to_string());

        Self {
            cues,
            triggers,
            muted: false,
            volume: 1.0,
            recent: Vec::new(),
        }
    }
}

impl AudioCues {
    pub fn play(
        &mut self,
        name: &str,
        frame: u64,
        trigger: Option<String>,
    ) -> Result<(), String> {
        let Some(def) = self.cues.get(name) else {
            return Err(format!("Unknown cue: {name}"));
        };
        if self.muted {
            return Ok(());
        }
        let volume = def.gain * self.volume;
        self.recent.push(CuePlay {
            frame,
            name: name.to_string(),
            volume,
            trigger,
        });
        if self.recent.len() > MAX_CUE_LOG {
            let excess = self.recent.len() - MAX_CUE_LOG;
            self.recent.drain(0..excess);
        }
        Ok(())
    }

    pub fn set_volume(&mut self, value: f32) {
        self.volume = value.clamp(0.0, 2.0);
    }
}

#[derive(Resource, Default)]
struct AudioEventCursor {
    last_frame: u64,
}

pub struct AudioPlugin;

impl Plugin for AudioPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(AudioCues::default())
            .insert_resource(AudioEventCursor::default())
            .add_systems(Update, auto_cue_from_events);
    }
}

fn auto_cue_from_events(
    mut audio: ResMut<AudioCues>,
    bus: Res<GameEventBus>,
    mut cursor: ResMut<AudioEventCursor>,
) {
    let mut newest = cursor.last_frame;
    for ev in bus.since(cursor.last_frame) {
        newest = newest.max(ev.frame);
        if let Some(mapped) = audio.triggers.get(ev.name.as_str()).cloned() {
            let _ = audio.play(&mapped, ev.frame, Some(ev.name.clone()));
        }
    }
    cursor.last_frame = newest;
}
