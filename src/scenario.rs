//! Headless scripted attempts: a serde request in, a serde report out.
//!
//! This is the seam `--scenario` and the integration tests share. No
//! window, no app, no schedule; the core is stepped directly until the
//! attempt wins, dies, stalls, or runs out of ticks.

use serde::{Deserialize, Serialize};

use crate::driver::{event_name, ViewConfig};
use crate::level::{LevelData, LevelLibrary};
use crate::sim::{InputState, SimStatus, Simulation};

/// Trace entries compared by the stall check. With a dense trace this is
/// five seconds of nothing before the run is cut short.
const STUCK_WINDOW: usize = 600;

fn default_max_ticks() -> u32 {
    120 * 30
}

fn default_record_interval() -> u32 {
    1
}

/// Which level the script runs: the name of a library level, or a full
/// inline definition for fixtures that exist only in one test.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(untagged)]
pub enum ScenarioLevel {
    Builtin(String),
    Inline(Box<LevelData>),
}

/// Held-input keyframe. The state given here applies from `tick` until
/// the next keyframe replaces it; an all-false entry releases everything.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default)]
#[serde(default)]
pub struct ScenarioInput {
    pub tick: u32,
    pub left: bool,
    pub right: bool,
    pub jump: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ScenarioRequest {
    pub level: ScenarioLevel,
    #[serde(default)]
    pub inputs: Vec<ScenarioInput>,
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u32,
    /// Trace sampling stride in ticks; 0 disables the trace entirely
    /// (and with it the stall check).
    #[serde(default = "default_record_interval")]
    pub record_interval: u32,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
pub struct TracePoint {
    pub tick: u32,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub grounded: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ScenarioEvent {
    pub tick: u32,
    pub name: String,
}

/// `outcome` is one of `"won"`, `"died"`, `"stuck"`, `"timeout"`.
/// `player` is the state after the final tick, whatever the trace stride.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ScenarioReport {
    pub outcome: String,
    pub ticks: u32,
    pub events: Vec<ScenarioEvent>,
    pub trace: Vec<TracePoint>,
    pub player: TracePoint,
}

/// Runs one scripted attempt to its terminal status or the tick cap.
pub fn run_scenario(request: &ScenarioRequest) -> Result<ScenarioReport, String> {
    let data = resolve_level(&request.level)?;
    let view = ViewConfig::default();
    let mut sim = Simulation::new(data, view.width, view.height);

    let mut script: Vec<&ScenarioInput> = request.inputs.iter().collect();
    script.sort_by_key(|key| key.tick);

    let mut held = InputState::default();
    let mut next_key = 0;
    let mut outcome = "timeout";
    let mut ticks = 0u32;
    let mut events = Vec::new();
    let mut trace: Vec<TracePoint> = Vec::new();

    for tick in 0..request.max_ticks {
        while next_key < script.len() && script[next_key].tick <= tick {
            let key = script[next_key];
            held = InputState {
                left: key.left,
                right: key.right,
                jump: key.jump,
                dash: false,
            };
            next_key += 1;
        }

        sim.step(&held);
        ticks = tick + 1;

        for event in sim.take_events() {
            events.push(ScenarioEvent {
                tick,
                name: event_name(event).to_string(),
            });
        }

        if request.record_interval > 0 && tick % request.record_interval == 0 {
            trace.push(trace_point(tick, &sim));
        }

        match sim.status {
            SimStatus::Won => {
                outcome = "won";
                break;
            }
            SimStatus::Dead => {
                outcome = "died";
                break;
            }
            SimStatus::Playing => {}
        }

        if stalled(&trace) {
            outcome = "stuck";
            break;
        }
    }

    // The final tick always lands in the trace, whatever the stride.
    if request.record_interval > 0 && ticks > 0 {
        let last = ticks - 1;
        if trace.last().map(|point| point.tick) != Some(last) {
            trace.push(trace_point(last, &sim));
        }
    }

    let player = trace_point(ticks.saturating_sub(1), &sim);
    Ok(ScenarioReport {
        outcome: outcome.to_string(),
        ticks,
        events,
        trace,
        player,
    })
}

fn resolve_level(level: &ScenarioLevel) -> Result<LevelData, String> {
    match level {
        ScenarioLevel::Builtin(name) => {
            let library = LevelLibrary::builtin();
            library
                .by_name(name)
                .cloned()
                .ok_or_else(|| format!("unknown level {:?}", name))
        }
        ScenarioLevel::Inline(data) => Ok((**data).clone()),
    }
}

fn trace_point(tick: u32, sim: &Simulation) -> TracePoint {
    TracePoint {
        tick,
        x: sim.player.x,
        y: sim.player.y,
        vx: sim.player.vx,
        vy: sim.player.vy,
        grounded: sim.player.grounded,
    }
}

/// A traced position that has not moved a pixel across the whole window
/// is going nowhere; scripts that park the player get cut short.
fn stalled(trace: &[TracePoint]) -> bool {
    if trace.len() <= STUCK_WINDOW {
        return false;
    }
    let now = &trace[trace.len() - 1];
    let then = &trace[trace.len() - 1 - STUCK_WINDOW];
    (now.x - then.x).abs() < 1.0 && (now.y - then.y).abs() < 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{EntityDef, KindTag, Point};
    use crate::player::MOVE_SPEED;

    fn open_floor() -> LevelData {
        LevelData {
            id: 90,
            name: "runway".to_string(),
            width: 4000.0,
            height: 600.0,
            spawn: Point { x: 80.0, y: 360.0 },
            entities: vec![EntityDef::new(
                "floor",
                KindTag::Wall,
                0.0,
                400.0,
                4000.0,
                40.0,
            )],
            hint: None,
            time_limit: None,
        }
    }

    fn inline(data: LevelData) -> ScenarioLevel {
        ScenarioLevel::Inline(Box::new(data))
    }

    fn hold_right() -> Vec<ScenarioInput> {
        vec![ScenarioInput {
            tick: 0,
            right: true,
            ..Default::default()
        }]
    }

    #[test]
    fn holding_right_on_open_floor_approaches_top_speed() {
        let report = run_scenario(&ScenarioRequest {
            level: inline(open_floor()),
            inputs: hold_right(),
            max_ticks: 120,
            record_interval: 1,
        })
        .unwrap();

        assert_eq!(report.outcome, "timeout");
        assert_eq!(report.ticks, 120);
        assert!(report.player.vx >= MOVE_SPEED - 1.0);
        assert!(report.player.vx <= MOVE_SPEED);
        for pair in report.trace.windows(2) {
            assert!(pair[1].x >= pair[0].x, "x must advance monotonically");
        }
        assert!(report.player.x > 300.0);
    }

    #[test]
    fn a_script_can_walk_into_the_exit() {
        let mut data = open_floor();
        data.entities.push(EntityDef::new(
            "exit",
            KindTag::Door,
            600.0,
            320.0,
            40.0,
            80.0,
        ));
        let report = run_scenario(&ScenarioRequest {
            level: inline(data),
            inputs: hold_right(),
            max_ticks: 1200,
            record_interval: 4,
        })
        .unwrap();

        assert_eq!(report.outcome, "won");
        assert!(report.ticks < 1200);
        assert!(report.events.iter().any(|e| e.name == "level_won"));
        assert_eq!(
            report.trace.last().map(|point| point.tick),
            Some(report.ticks - 1)
        );
    }

    #[test]
    fn later_keyframes_replace_the_held_state() {
        let mut inputs = hold_right();
        inputs.push(ScenarioInput {
            tick: 60,
            ..Default::default()
        });
        let report = run_scenario(&ScenarioRequest {
            level: inline(open_floor()),
            inputs,
            max_ticks: 240,
            record_interval: 1,
        })
        .unwrap();

        assert_eq!(report.outcome, "timeout");
        assert!(report.player.vx.abs() < 1.0, "friction must bleed the run off");
        let coasting = &report.trace[120..];
        let first = coasting.first().map(|p| p.x).unwrap_or(0.0);
        let last = coasting.last().map(|p| p.x).unwrap_or(0.0);
        assert!(last - first < 8.0, "released player must stop drifting");
    }

    #[test]
    fn a_scripted_death_ends_the_run() {
        let mut data = open_floor();
        data.entities.push(EntityDef::new(
            "trap",
            KindTag::Spike,
            400.0,
            360.0,
            40.0,
            40.0,
        ));
        let report = run_scenario(&ScenarioRequest {
            level: inline(data),
            inputs: hold_right(),
            max_ticks: 2400,
            record_interval: 1,
        })
        .unwrap();

        assert_eq!(report.outcome, "died");
        let died = report
            .events
            .iter()
            .find(|e| e.name == "died")
            .map(|e| e.tick);
        let notified = report
            .events
            .iter()
            .find(|e| e.name == "death_notified")
            .map(|e| e.tick);
        let (Some(died), Some(notified)) = (died, notified) else {
            panic!("missing death events: {:?}", report.events);
        };
        assert_eq!(report.ticks, notified + 1, "the run ends with the notice");
        let gap = notified - died;
        assert!((90..=100).contains(&gap), "notify lag was {} ticks", gap);
    }

    #[test]
    fn a_parked_script_is_cut_short_as_stuck() {
        let report = run_scenario(&ScenarioRequest {
            level: inline(open_floor()),
            inputs: Vec::new(),
            max_ticks: 1200,
            record_interval: 1,
        })
        .unwrap();

        assert_eq!(report.outcome, "stuck");
        assert!(report.ticks > STUCK_WINDOW as u32);
        assert!(report.ticks < 700);
    }

    #[test]
    fn unknown_builtin_names_are_rejected() {
        let request = ScenarioRequest {
            level: ScenarioLevel::Builtin("no such level".to_string()),
            inputs: Vec::new(),
            max_ticks: 10,
            record_interval: 1,
        };
        let err = run_scenario(&request).unwrap_err();
        assert!(err.contains("unknown level"));
    }

    #[test]
    fn requests_accept_both_level_forms() {
        let by_name: ScenarioRequest = serde_json::from_str(
            r#"{ "level": "runway", "inputs": [{ "tick": 0, "right": true }] }"#,
        )
        .unwrap();
        assert!(matches!(by_name.level, ScenarioLevel::Builtin(_)));
        assert_eq!(by_name.max_ticks, default_max_ticks());
        assert!(by_name.inputs[0].right && !by_name.inputs[0].left);

        let inline: ScenarioRequest = serde_json::from_str(
            r#"{ "level": { "id": 1, "name": "box", "width": 800.0, "height": 600.0,
                 "spawn": { "x": 80.0, "y": 360.0 }, "entities": [] } }"#,
        )
        .unwrap();
        assert!(matches!(inline.level, ScenarioLevel::Inline(_)));
    }
}
