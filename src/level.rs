use std::collections::HashMap;
use std::fs;
use std::path::Path;

use bevy::log::warn;
use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::entity::{
    Axis, CollectorState, Direction, Entity, EntityId, EntityKind, FallState, GuardState,
    TriggerMode,
};
use crate::rect::Rect;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Authoring tag for an entity kind. The runtime payload is built from this
/// plus the def's optional tuning fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindTag {
    Wall,
    GlassWall,
    IllusionWall,
    OneWayPlatform,
    Spike,
    FakeDoor,
    Key,
    Door,
    WinFake,
    TrollBlock,
    FragileBlock,
    ToggleWall,
    TimedDoor,
    Button,
    MovingPlatform,
    Crusher,
    Roamer,
    FallingBlock,
    Pendulum,
    Spinner,
    RotatingSaw,
    DoomWall,
    FallingSpike,
    Spring,
    Chaser,
    Guard,
    Collector,
    Builder,
    Shooter,
    HomingLauncher,
    RhythmSpike,
    ElectricField,
    LaserBeam,
    Text,
}

fn default_true() -> bool {
    true
}

/// One entity as authored in level data. Unset tuning fields fall back to
/// per-kind defaults when the level is instantiated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityDef {
    #[serde(default)]
    pub id: String,
    pub kind: KindTag,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub speed: Option<f32>,
    #[serde(default)]
    pub range: Option<f32>,
    #[serde(default)]
    pub accel: Option<f32>,
    #[serde(default)]
    pub axis: Option<Axis>,
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default)]
    pub toggle_time: Option<f32>,
    #[serde(default)]
    pub initial_delay: Option<f32>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub trigger_mode: Option<TriggerMode>,
    #[serde(default)]
    pub detect_range: Option<f32>,
    #[serde(default)]
    pub text: Option<String>,
}

impl EntityDef {
    pub fn new(id: &str, kind: KindTag, x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            id: id.to_string(),
            kind,
            x,
            y,
            w,
            h,
            visible: true,
            speed: None,
            range: None,
            accel: None,
            axis: None,
            direction: None,
            toggle_time: None,
            initial_delay: None,
            link: None,
            trigger_mode: None,
            detect_range: None,
            text: None,
        }
    }
}

/// A level template. Read-only once loaded; every attempt instantiates a
/// fresh snapshot from it so runtime mutation never leaks back.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LevelData {
    pub id: u32,
    pub name: String,
    pub width: f32,
    pub height: f32,
    pub spawn: Point,
    pub entities: Vec<EntityDef>,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub time_limit: Option<f32>,
}

/// The live, mutable world of one level attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelSnapshot {
    pub id: u32,
    pub name: String,
    pub width: f32,
    pub height: f32,
    pub spawn_x: f32,
    pub spawn_y: f32,
    pub time_limit: Option<f32>,
    pub hint: Option<String>,
    pub entities: Vec<Entity>,
}

impl LevelSnapshot {
    /// Instantiates the template: interns string ids, resolves button links,
    /// captures oscillator origins from the placed rects, and fills per-kind
    /// defaults. Deterministic, so reloading yields an identical snapshot.
    pub fn from_data(data: &LevelData) -> Self {
        let mut by_name: HashMap<&str, EntityId> = HashMap::new();
        for (index, def) in data.entities.iter().enumerate() {
            let id = EntityId(index as u32);
            if !def.id.is_empty() && by_name.insert(def.id.as_str(), id).is_some() {
                warn!("[Snare] level {}: duplicate entity id '{}'", data.id, def.id);
            }
        }

        let entities = data
            .entities
            .iter()
            .enumerate()
            .map(|(index, def)| {
                let mut ent = Entity::new(
                    EntityId(index as u32),
                    Rect::new(def.x, def.y, def.w, def.h),
                    build_kind(data.id, def, &by_name),
                );
                ent.visible = def.visible;
                ent
            })
            .collect();

        Self {
            id: data.id,
            name: data.name.clone(),
            width: data.width,
            height: data.height,
            spawn_x: data.spawn.x,
            spawn_y: data.spawn.y,
            time_limit: data.time_limit,
            hint: data.hint.clone(),
            entities,
        }
    }

    /// True if any key is still collectable. Doors stay locked while this
    /// holds and the player has no key.
    pub fn has_active_key(&self) -> bool {
        self.entities.iter().any(|e| e.is_key() && e.active)
    }
}

fn build_kind(level_id: u32, def: &EntityDef, by_name: &HashMap<&str, EntityId>) -> EntityKind {
    match def.kind {
        KindTag::Wall => EntityKind::Wall,
        KindTag::GlassWall => EntityKind::GlassWall,
        KindTag::IllusionWall => EntityKind::IllusionWall,
        KindTag::OneWayPlatform => EntityKind::OneWayPlatform,
        KindTag::Spike => EntityKind::Spike,
        KindTag::FakeDoor => EntityKind::FakeDoor,
        KindTag::Key => EntityKind::Key,
        KindTag::Door => EntityKind::Door,
        KindTag::WinFake => EntityKind::WinFake {
            speed: def.speed.unwrap_or(200.0),
        },
        KindTag::TrollBlock => EntityKind::TrollBlock {
            armed: false,
            fuse: 0.0,
        },
        KindTag::FragileBlock => EntityKind::FragileBlock {
            built: false,
            age: 0.0,
            cracked: false,
        },
        KindTag::ToggleWall => EntityKind::ToggleWall,
        KindTag::TimedDoor => EntityKind::TimedDoor { reopen: 0.0 },
        KindTag::Button => {
            let link = match def.link.as_deref() {
                None => None,
                Some(name) => {
                    let target = by_name.get(name).copied();
                    if target.is_none() {
                        warn!(
                            "[Snare] level {}: button '{}' links to unknown entity '{}'",
                            level_id, def.id, name
                        );
                    }
                    target
                }
            };
            EntityKind::Button {
                mode: def.trigger_mode.unwrap_or(TriggerMode::Hold),
                link,
                pressed: false,
            }
        }
        KindTag::MovingPlatform => EntityKind::MovingPlatform {
            origin_x: def.x,
            origin_y: def.y,
            axis: def.axis.unwrap_or(Axis::X),
            speed: def.speed.unwrap_or(2.0),
            range: def.range.unwrap_or(100.0),
        },
        KindTag::Crusher => EntityKind::Crusher {
            origin_y: def.y,
            speed: def.speed.unwrap_or(200.0),
            range: def.range.unwrap_or(200.0),
        },
        KindTag::Roamer => EntityKind::Roamer {
            origin_x: def.x,
            speed: def.speed.unwrap_or(100.0),
            range: def.range.unwrap_or(100.0),
        },
        KindTag::FallingBlock => EntityKind::FallingBlock {
            rest_y: def.y,
            state: FallState::Idle,
        },
        KindTag::Pendulum => EntityKind::Pendulum {
            speed: def.speed.unwrap_or(3.0),
            angle: 0.0,
        },
        KindTag::Spinner => EntityKind::Spinner {
            speed: def.speed.unwrap_or(3.0),
            angle: 0.0,
        },
        KindTag::RotatingSaw => EntityKind::RotatingSaw {
            speed: def.speed.unwrap_or(3.0),
            angle: 0.0,
        },
        KindTag::DoomWall => EntityKind::DoomWall {
            speed: def.speed.unwrap_or(100.0),
            accel: def.accel.unwrap_or(0.0),
        },
        KindTag::FallingSpike => EntityKind::FallingSpike {
            dropping: false,
            vy: 0.0,
        },
        KindTag::Spring => EntityKind::Spring { compression: 0.0 },
        KindTag::Chaser => EntityKind::Chaser {
            detect: def.detect_range.unwrap_or(300.0),
            speed: def.speed.unwrap_or(80.0),
        },
        KindTag::Guard => EntityKind::Guard {
            origin_x: def.x,
            speed: def.speed.unwrap_or(100.0),
            range: def.range.unwrap_or(0.0),
            state: GuardState::Patrol,
        },
        KindTag::Collector => EntityKind::Collector {
            speed: def.speed.unwrap_or(150.0),
            state: CollectorState::Chase,
            has_item: false,
        },
        KindTag::Builder => EntityKind::Builder {
            interval: def.toggle_time.unwrap_or(2.0),
            timer: 0.0,
        },
        // For shooter kinds the authored speed doubles as the fire cooldown.
        KindTag::Shooter => EntityKind::Shooter {
            cooldown: def.speed.unwrap_or(2.0),
            timer: 0.0,
            dir: def.direction,
        },
        KindTag::HomingLauncher => EntityKind::HomingLauncher {
            cooldown: def.speed.unwrap_or(2.0),
            timer: 0.0,
            dir: def.direction,
        },
        KindTag::RhythmSpike => EntityKind::RhythmSpike {
            period: def.toggle_time.unwrap_or(2.0),
            offset: def.initial_delay.unwrap_or(0.0),
            on: false,
        },
        KindTag::ElectricField => EntityKind::ElectricField {
            period: def.toggle_time.unwrap_or(0.0),
            offset: def.initial_delay.unwrap_or(0.0),
            on: false,
        },
        KindTag::LaserBeam => EntityKind::LaserBeam {
            period: def.toggle_time.unwrap_or(0.0),
            offset: def.initial_delay.unwrap_or(0.0),
            on: false,
        },
        KindTag::Text => EntityKind::Text {
            label: def.text.clone().unwrap_or_default(),
        },
    }
}

/// Ordered set of playable levels: the built-in campaign plus any JSON
/// levels picked up from a directory at startup.
#[derive(Resource)]
pub struct LevelLibrary {
    levels: Vec<LevelData>,
}

impl LevelLibrary {
    pub fn new(levels: Vec<LevelData>) -> Self {
        Self { levels }
    }

    pub fn builtin() -> Self {
        Self::new(crate::levels::builtin_levels())
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn by_index(&self, index: usize) -> Option<&LevelData> {
        self.levels.get(index)
    }

    pub fn by_id(&self, id: u32) -> Option<&LevelData> {
        self.levels.iter().find(|l| l.id == id)
    }

    pub fn by_name(&self, name: &str) -> Option<&LevelData> {
        self.levels.iter().find(|l| l.name == name)
    }

    /// Appends every parseable `*.json` level under `dir`. Bad files are
    /// skipped with a warning; returns the number added.
    pub fn load_dir(&mut self, dir: &Path) -> usize {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("[Snare] could not read level dir {}: {}", dir.display(), err);
                return 0;
            }
        };
        let mut added = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let raw = match fs::read_to_string(&path) {
                Ok(raw) => raw,
                Err(err) => {
                    warn!("[Snare] skipping {}: {}", path.display(), err);
                    continue;
                }
            };
            match serde_json::from_str::<LevelData>(&raw) {
                Ok(level) => {
                    self.levels.push(level);
                    added += 1;
                }
                Err(err) => warn!("[Snare] skipping {}: {}", path.display(), err),
            }
        }
        self.levels.sort_by_key(|l| l.id);
        added
    }
}
