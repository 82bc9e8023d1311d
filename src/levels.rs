//! The built-in campaign. Authored in code so the binary always has
//! something to play; extra levels can be dropped in as JSON next to it.
//!
//! Geometry convention: 40 px tiles, y grows downward, floors usually at
//! y = 560 in a 600-tall world. Every level is winnable; not every level
//! is honest about how.

use crate::entity::{Direction, TriggerMode};
use crate::level::{EntityDef, KindTag, LevelData, Point};

pub fn builtin_levels() -> Vec<LevelData> {
    vec![
        trust_issues(),
        mechanisms(),
        moving_parts(),
        outrun(),
        company(),
        crossfire(),
    ]
}

/// Short bounding walls at both ends, tall enough that a jump cannot
/// clear them.
fn side_walls(width: f32) -> [EntityDef; 2] {
    [
        EntityDef::new("wall-l", KindTag::Wall, 0.0, 400.0, 40.0, 160.0),
        EntityDef::new("wall-r", KindTag::Wall, width - 40.0, 400.0, 40.0, 160.0),
    ]
}

fn text(id: &str, x: f32, y: f32, w: f32, label: &str) -> EntityDef {
    EntityDef {
        text: Some(label.to_string()),
        ..EntityDef::new(id, KindTag::Text, x, y, w, 30.0)
    }
}

fn trust_issues() -> LevelData {
    let width = 1600.0;
    let mut entities = vec![
        EntityDef::new("floor-a", KindTag::Wall, 0.0, 560.0, 520.0, 40.0),
        EntityDef::new("pit-spikes", KindTag::Spike, 520.0, 580.0, 160.0, 20.0),
        EntityDef::new("floor-b", KindTag::Wall, 680.0, 560.0, 920.0, 40.0),
        text("ts-1", 80.0, 440.0, 220.0, "arrows move. space jumps."),
        // The polite route over the spikes on floor-b crumbles underfoot.
        EntityDef::new("ledge-spikes", KindTag::Spike, 760.0, 540.0, 120.0, 20.0),
        EntityDef::new("troll-bridge", KindTag::TrollBlock, 760.0, 460.0, 120.0, 20.0),
        EntityDef::new("fake-exit", KindTag::FakeDoor, 1080.0, 480.0, 40.0, 80.0),
        text("ts-2", 1040.0, 420.0, 160.0, "exit here!"),
        EntityDef::new("illusion", KindTag::IllusionWall, 1240.0, 400.0, 40.0, 160.0),
        EntityDef::new("key-1", KindTag::Key, 1340.0, 500.0, 25.0, 25.0),
        EntityDef::new("exit", KindTag::Door, 1480.0, 480.0, 40.0, 80.0),
    ];
    entities.extend(side_walls(width));
    LevelData {
        id: 1,
        name: "trust issues".to_string(),
        width,
        height: 600.0,
        spawn: Point { x: 80.0, y: 520.0 },
        entities,
        hint: Some("that first door lies.".to_string()),
        time_limit: None,
    }
}

fn mechanisms() -> LevelData {
    let width = 1760.0;
    let mut entities = vec![
        EntityDef::new("floor", KindTag::Wall, 0.0, 560.0, width, 40.0),
        EntityDef::new("spring-1", KindTag::Spring, 320.0, 520.0, 40.0, 40.0),
        text("ts-1", 280.0, 440.0, 120.0, "boing."),
        EntityDef::new("glass-1", KindTag::GlassWall, 400.0, 400.0, 40.0, 160.0),
        EntityDef::new("oneway-1", KindTag::OneWayPlatform, 480.0, 440.0, 160.0, 12.0),
        EntityDef {
            link: Some("tdoor-1".to_string()),
            ..EntityDef::new("btn-1", KindTag::Button, 700.0, 540.0, 40.0, 20.0)
        },
        text("ts-2", 660.0, 460.0, 220.0, "hold it down. or don't."),
        EntityDef::new("tdoor-1", KindTag::TimedDoor, 820.0, 440.0, 40.0, 120.0),
        EntityDef {
            link: Some("toggle-1".to_string()),
            trigger_mode: Some(TriggerMode::Toggle),
            ..EntityDef::new("btn-2", KindTag::Button, 920.0, 540.0, 40.0, 20.0)
        },
        EntityDef::new("toggle-1", KindTag::ToggleWall, 1000.0, 440.0, 40.0, 120.0),
        EntityDef::new("under-spikes", KindTag::Spike, 1100.0, 540.0, 240.0, 20.0),
        EntityDef::new("fragile-1", KindTag::FragileBlock, 1120.0, 460.0, 80.0, 20.0),
        EntityDef::new("troll-ledge", KindTag::TrollBlock, 1260.0, 460.0, 80.0, 20.0),
        EntityDef::new("key-2", KindTag::Key, 1400.0, 380.0, 25.0, 25.0),
        EntityDef::new("exit", KindTag::Door, 1640.0, 480.0, 40.0, 80.0),
    ];
    entities.extend(side_walls(width));
    LevelData {
        id: 2,
        name: "mechanisms".to_string(),
        width,
        height: 600.0,
        spawn: Point { x: 80.0, y: 520.0 },
        entities,
        hint: Some("springs beat walls.".to_string()),
        time_limit: None,
    }
}

fn moving_parts() -> LevelData {
    let width = 2000.0;
    let mut entities = vec![
        EntityDef::new("floor-a", KindTag::Wall, 0.0, 560.0, 400.0, 40.0),
        EntityDef::new("floor-b", KindTag::Wall, 560.0, 560.0, 480.0, 40.0),
        EntityDef {
            speed: Some(200.0),
            range: Some(200.0),
            ..EntityDef::new("crusher-1", KindTag::Crusher, 600.0, 260.0, 80.0, 80.0)
        },
        EntityDef {
            range: Some(160.0),
            ..EntityDef::new("roamer-1", KindTag::Roamer, 760.0, 520.0, 30.0, 30.0)
        },
        EntityDef::new("fall-1", KindTag::FallingBlock, 880.0, 420.0, 80.0, 40.0),
        // Sweeps the 1040..1400 gap; time the hop on and off.
        EntityDef {
            range: Some(240.0),
            ..EntityDef::new("lift-1", KindTag::MovingPlatform, 1160.0, 480.0, 120.0, 20.0)
        },
        EntityDef::new("floor-c", KindTag::Wall, 1400.0, 560.0, 600.0, 40.0),
        EntityDef::new("spin-1", KindTag::Spinner, 1400.0, 480.0, 80.0, 80.0),
        EntityDef::new("pend-1", KindTag::Pendulum, 1560.0, 240.0, 10.0, 300.0),
        EntityDef::new("saw-1", KindTag::RotatingSaw, 1760.0, 520.0, 80.0, 80.0),
        EntityDef::new("exit", KindTag::Door, 1920.0, 480.0, 40.0, 80.0),
    ];
    entities.extend(side_walls(width));
    LevelData {
        id: 3,
        name: "moving parts".to_string(),
        width,
        height: 600.0,
        spawn: Point { x: 80.0, y: 520.0 },
        entities,
        hint: Some("ride the lift. respect the blades.".to_string()),
        time_limit: None,
    }
}

fn outrun() -> LevelData {
    let width = 2400.0;
    let mut entities = vec![
        EntityDef::new("floor-a", KindTag::Wall, 0.0, 560.0, 2000.0, 40.0),
        EntityDef::new("troll-floor", KindTag::TrollBlock, 2000.0, 560.0, 120.0, 40.0),
        EntityDef::new("floor-b", KindTag::Wall, 2120.0, 560.0, 280.0, 40.0),
        EntityDef {
            speed: Some(100.0),
            accel: Some(3.0),
            ..EntityDef::new("doom-1", KindTag::DoomWall, -200.0, 0.0, 80.0, 560.0)
        },
        EntityDef {
            toggle_time: Some(1.0),
            ..EntityDef::new("rs-1", KindTag::RhythmSpike, 500.0, 520.0, 40.0, 40.0)
        },
        EntityDef {
            toggle_time: Some(1.0),
            initial_delay: Some(0.5),
            ..EntityDef::new("rs-2", KindTag::RhythmSpike, 700.0, 520.0, 40.0, 40.0)
        },
        EntityDef {
            toggle_time: Some(1.0),
            initial_delay: Some(1.0),
            ..EntityDef::new("rs-3", KindTag::RhythmSpike, 900.0, 520.0, 40.0, 40.0)
        },
        EntityDef {
            toggle_time: Some(1.5),
            ..EntityDef::new("efield-1", KindTag::ElectricField, 1100.0, 440.0, 40.0, 120.0)
        },
        EntityDef {
            toggle_time: Some(2.0),
            initial_delay: Some(1.0),
            ..EntityDef::new("laser-1", KindTag::LaserBeam, 1300.0, 500.0, 300.0, 8.0)
        },
        EntityDef::new("fspike-1", KindTag::FallingSpike, 1700.0, 80.0, 30.0, 30.0),
        EntityDef::new("fspike-2", KindTag::FallingSpike, 1800.0, 80.0, 30.0, 30.0),
        EntityDef::new("exit", KindTag::Door, 2280.0, 480.0, 40.0, 80.0),
    ];
    entities.extend(side_walls(width));
    LevelData {
        id: 4,
        name: "outrun".to_string(),
        width,
        height: 600.0,
        spawn: Point { x: 80.0, y: 520.0 },
        entities,
        hint: Some("don't stop.".to_string()),
        time_limit: Some(40.0),
    }
}

fn company() -> LevelData {
    let width = 2000.0;
    let mut entities = vec![
        EntityDef::new("floor", KindTag::Wall, 0.0, 560.0, width, 40.0),
        EntityDef::new("spring-5", KindTag::Spring, 160.0, 520.0, 40.0, 40.0),
        EntityDef::new("perch", KindTag::Wall, 240.0, 440.0, 120.0, 20.0),
        EntityDef::new("exit", KindTag::Door, 280.0, 360.0, 40.0, 80.0),
        EntityDef {
            toggle_time: Some(3.0),
            ..EntityDef::new("builder-1", KindTag::Builder, 600.0, 160.0, 40.0, 40.0)
        },
        EntityDef {
            speed: Some(90.0),
            ..EntityDef::new("chaser-1", KindTag::Chaser, 900.0, 200.0, 30.0, 30.0)
        },
        EntityDef {
            range: Some(200.0),
            ..EntityDef::new("guard-1", KindTag::Guard, 1200.0, 516.0, 30.0, 44.0)
        },
        EntityDef::new("key-5", KindTag::Key, 1500.0, 500.0, 25.0, 25.0),
        EntityDef::new("thief-1", KindTag::Collector, 1700.0, 520.0, 30.0, 30.0),
        text("ts-1", 1750.0, 420.0, 120.0, "exit ->"),
        EntityDef::new("winfake-1", KindTag::WinFake, 1840.0, 480.0, 40.0, 80.0),
    ];
    entities.extend(side_walls(width));
    LevelData {
        id: 5,
        name: "company".to_string(),
        width,
        height: 600.0,
        spawn: Point { x: 80.0, y: 520.0 },
        entities,
        hint: Some("the thief wants your key more than you do.".to_string()),
        time_limit: None,
    }
}

fn crossfire() -> LevelData {
    let width = 2400.0;
    let mut entities = vec![
        EntityDef::new("floor", KindTag::Wall, 0.0, 560.0, width, 40.0),
        EntityDef::new("cover-1", KindTag::Wall, 380.0, 480.0, 40.0, 80.0),
        EntityDef {
            speed: Some(1.5),
            direction: Some(Direction::Left),
            ..EntityDef::new("shooter-1", KindTag::Shooter, 500.0, 480.0, 40.0, 40.0)
        },
        EntityDef {
            speed: Some(2.5),
            ..EntityDef::new("homing-1", KindTag::HomingLauncher, 1000.0, 160.0, 40.0, 40.0)
        },
        EntityDef::new("frag-step", KindTag::FragileBlock, 1120.0, 480.0, 80.0, 20.0),
        EntityDef::new("glass-2", KindTag::GlassWall, 1200.0, 400.0, 40.0, 160.0),
        EntityDef {
            speed: Some(260.0),
            range: Some(200.0),
            ..EntityDef::new("crusher-2", KindTag::Crusher, 1400.0, 260.0, 80.0, 80.0)
        },
        EntityDef {
            trigger_mode: Some(TriggerMode::Once),
            link: Some("tdoor-2".to_string()),
            ..EntityDef::new("btn-3", KindTag::Button, 1700.0, 540.0, 40.0, 20.0)
        },
        EntityDef::new("tdoor-2", KindTag::TimedDoor, 1800.0, 440.0, 40.0, 120.0),
        EntityDef {
            toggle_time: Some(1.0),
            ..EntityDef::new("laser-2", KindTag::LaserBeam, 2000.0, 300.0, 8.0, 260.0)
        },
        EntityDef::new("exit", KindTag::Door, 2280.0, 480.0, 40.0, 80.0),
    ];
    entities.extend(side_walls(width));
    LevelData {
        id: 6,
        name: "crossfire".to_string(),
        width,
        height: 600.0,
        spawn: Point { x: 80.0, y: 520.0 },
        entities,
        hint: Some("almost over.".to_string()),
        time_limit: Some(60.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::LevelSnapshot;
    use crate::sim::TILE;

    #[test]
    fn campaign_ids_are_sequential_and_unique() {
        let levels = builtin_levels();
        assert!(!levels.is_empty());
        for (i, level) in levels.iter().enumerate() {
            assert_eq!(level.id, i as u32 + 1, "{}", level.name);
        }
    }

    #[test]
    fn every_level_instantiates_without_dangling_links() {
        for data in builtin_levels() {
            let snapshot = LevelSnapshot::from_data(&data);
            assert_eq!(snapshot.entities.len(), data.entities.len());
            for def in &data.entities {
                if let Some(link) = &def.link {
                    assert!(
                        data.entities.iter().any(|d| &d.id == link),
                        "level {}: '{}' links to missing '{}'",
                        data.name,
                        def.id,
                        link
                    );
                }
            }
        }
    }

    #[test]
    fn every_level_has_a_real_exit_inside_bounds() {
        for data in builtin_levels() {
            let snapshot = LevelSnapshot::from_data(&data);
            let door = snapshot
                .entities
                .iter()
                .find(|e| matches!(e.kind, crate::entity::EntityKind::Door));
            let door = door.unwrap_or_else(|| panic!("level {} has no exit", data.name));
            assert!(door.rect.x >= 0.0 && door.rect.x + door.rect.w <= data.width);
            assert!(door.rect.y >= 0.0 && door.rect.y + door.rect.h <= data.height);
        }
    }

    #[test]
    fn spawn_tile_is_clear_of_solids_and_hazards() {
        use crate::rect::Rect;
        for data in builtin_levels() {
            let snapshot = LevelSnapshot::from_data(&data);
            let spawn = Rect::new(data.spawn.x, data.spawn.y, TILE, TILE);
            for entity in &snapshot.entities {
                if entity.is_solid() {
                    assert!(
                        !spawn.overlaps(&entity.rect),
                        "level {}: spawn inside solid '{:?}'",
                        data.name,
                        entity.id
                    );
                }
            }
        }
    }
}
