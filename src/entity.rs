use serde::{Deserialize, Serialize};

use crate::rect::Rect;

/// Stable identity of an entity within one level attempt. String ids from
/// level data are interned at load; runtime spawns mint fresh ones from the
/// simulation's counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntityId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

/// How a button latches. Only `Once` changes behavior: the trigger stays
/// set after the player steps off.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerMode {
    Hold,
    Toggle,
    Once,
}

/// Falling block ("thwomp") cycle. One-directional except the explicit
/// return leg: Idle -> PreAttack -> Attack -> Cooldown -> Return -> Idle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FallState {
    Idle,
    PreAttack { t: f32 },
    Attack { vy: f32 },
    Cooldown { t: f32 },
    Return,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardState {
    Patrol,
    Attack,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectorState {
    Chase,
    Flee,
}

/// Per-kind payload. Each variant carries only the tuning and mutable state
/// its behavior needs; motion origins are captured from the placed rect at
/// instantiation so oscillators never feed back off their own output.
#[derive(Clone, Debug, PartialEq)]
pub enum EntityKind {
    Wall,
    GlassWall,
    /// Drawn like a wall, never solid. The deception is the point.
    IllusionWall,
    OneWayPlatform,
    Spike,
    FakeDoor,
    Key,
    Door,
    /// Looks like the exit, runs away when approached.
    WinFake { speed: f32 },
    TrollBlock { armed: bool, fuse: f32 },
    FragileBlock { built: bool, age: f32, cracked: bool },
    ToggleWall,
    TimedDoor { reopen: f32 },
    Button {
        mode: TriggerMode,
        link: Option<EntityId>,
        pressed: bool,
    },
    MovingPlatform {
        origin_x: f32,
        origin_y: f32,
        axis: Axis,
        speed: f32,
        range: f32,
    },
    Crusher { origin_y: f32, speed: f32, range: f32 },
    Roamer { origin_x: f32, speed: f32, range: f32 },
    FallingBlock { rest_y: f32, state: FallState },
    Pendulum { speed: f32, angle: f32 },
    Spinner { speed: f32, angle: f32 },
    RotatingSaw { speed: f32, angle: f32 },
    DoomWall { speed: f32, accel: f32 },
    FallingSpike { dropping: bool, vy: f32 },
    Spring { compression: f32 },
    Chaser { detect: f32, speed: f32 },
    Guard {
        origin_x: f32,
        speed: f32,
        range: f32,
        state: GuardState,
    },
    Collector {
        speed: f32,
        state: CollectorState,
        has_item: bool,
    },
    Builder { interval: f32, timer: f32 },
    Shooter {
        cooldown: f32,
        timer: f32,
        dir: Option<Direction>,
    },
    HomingLauncher {
        cooldown: f32,
        timer: f32,
        dir: Option<Direction>,
    },
    RhythmSpike { period: f32, offset: f32, on: bool },
    ElectricField { period: f32, offset: f32, on: bool },
    LaserBeam { period: f32, offset: f32, on: bool },
    /// Render-only level furniture: hints, taunts, lies.
    Text { label: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub rect: Rect,
    pub active: bool,
    pub visible: bool,
    pub kind: EntityKind,
}

impl Entity {
    pub fn new(id: EntityId, rect: Rect, kind: EntityKind) -> Self {
        Self {
            id,
            rect,
            active: true,
            visible: true,
            kind,
        }
    }

    /// A fragile block minted by a builder monster. Ages out on its own.
    pub fn built_block(id: EntityId, x: f32, y: f32, size: f32) -> Self {
        Self::new(
            id,
            Rect::new(x, y, size, size),
            EntityKind::FragileBlock {
                built: true,
                age: 0.0,
                cracked: false,
            },
        )
    }

    /// Whether the collision resolver blocks the player on this entity.
    /// Solidity is a per-kind rule, not a flag: toggle walls and timed doors
    /// block only while visible, monsters and swinging/rolling hazards never
    /// block, and one-way platforms are special-cased by the resolver.
    pub fn is_solid(&self) -> bool {
        if !self.active {
            return false;
        }
        match self.kind {
            EntityKind::ToggleWall | EntityKind::TimedDoor { .. } => self.visible,
            EntityKind::Wall
            | EntityKind::GlassWall
            | EntityKind::TrollBlock { .. }
            | EntityKind::FragileBlock { .. }
            | EntityKind::FallingBlock { .. }
            | EntityKind::MovingPlatform { .. }
            | EntityKind::Crusher { .. }
            | EntityKind::Shooter { .. } => true,
            _ => false,
        }
    }

    pub fn is_key(&self) -> bool {
        matches!(self.kind, EntityKind::Key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ent(kind: EntityKind) -> Entity {
        Entity::new(EntityId(1), Rect::new(0.0, 0.0, 40.0, 40.0), kind)
    }

    #[test]
    fn inactive_entities_are_never_solid() {
        let mut wall = ent(EntityKind::Wall);
        assert!(wall.is_solid());
        wall.active = false;
        assert!(!wall.is_solid());
    }

    #[test]
    fn toggle_wall_solidity_follows_visibility() {
        let mut wall = ent(EntityKind::ToggleWall);
        assert!(wall.is_solid());
        wall.visible = false;
        assert!(!wall.is_solid());
    }

    #[test]
    fn timed_door_solidity_follows_visibility() {
        let mut door = ent(EntityKind::TimedDoor { reopen: 0.0 });
        assert!(door.is_solid());
        door.visible = false;
        assert!(!door.is_solid());
    }

    #[test]
    fn monsters_and_swinging_hazards_never_block() {
        for kind in [
            EntityKind::Chaser {
                detect: 300.0,
                speed: 80.0,
            },
            EntityKind::Guard {
                origin_x: 0.0,
                speed: 100.0,
                range: 120.0,
                state: GuardState::Patrol,
            },
            EntityKind::Collector {
                speed: 150.0,
                state: CollectorState::Chase,
                has_item: false,
            },
            EntityKind::Builder {
                interval: 2.0,
                timer: 0.0,
            },
            EntityKind::Pendulum {
                speed: 3.0,
                angle: 0.0,
            },
            EntityKind::DoomWall {
                speed: 100.0,
                accel: 0.0,
            },
            EntityKind::OneWayPlatform,
            EntityKind::IllusionWall,
            EntityKind::Spring { compression: 0.0 },
        ] {
            assert!(!ent(kind).is_solid());
        }
    }

    #[test]
    fn plain_blockers_are_solid() {
        for kind in [
            EntityKind::Wall,
            EntityKind::GlassWall,
            EntityKind::TrollBlock {
                armed: false,
                fuse: 0.0,
            },
            EntityKind::FragileBlock {
                built: false,
                age: 0.0,
                cracked: false,
            },
            EntityKind::FallingBlock {
                rest_y: 0.0,
                state: FallState::Idle,
            },
            EntityKind::Shooter {
                cooldown: 2.0,
                timer: 0.0,
                dir: Some(Direction::Left),
            },
        ] {
            assert!(ent(kind).is_solid());
        }
    }
}
