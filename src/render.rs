use std::collections::HashMap;

use bevy::prelude::*;

use crate::driver::ActiveSim;
use crate::entity::{Entity as LevelEntity, EntityKind};
use crate::effects::ParticleHue;
use crate::game_runtime::{GamePhase, Progress};
use crate::projectile::{Projectile, PROJECTILE_SIZE};

/// Sprite mirror of the simulation. Level entities get one flat-color quad
/// each, reconciled by entity id every frame; projectiles and particles go
/// through grow-only sprite pools. Not added to the app in headless mode.
pub struct RenderPlugin;

impl Plugin for RenderPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SpritePools>()
            .init_resource::<RenderedLevel>()
            .add_systems(Startup, spawn_hud)
            .add_systems(
                Update,
                (
                    sync_level_sprites,
                    sync_player_sprite,
                    sync_projectile_sprites,
                    sync_particle_sprites,
                    sync_hud,
                )
                    .chain(),
            );
    }
}

/// Canvas color behind everything, used by the shell for `ClearColor`.
pub fn background_color() -> Color {
    hex(0xFACC15)
}

fn hex(rgb: u32) -> Color {
    Color::srgb_u8(
        ((rgb >> 16) & 0xFF) as u8,
        ((rgb >> 8) & 0xFF) as u8,
        (rgb & 0xFF) as u8,
    )
}

#[derive(Component)]
struct EntitySprite(u32);

#[derive(Component)]
struct EntityLabel(u32);

#[derive(Component)]
struct PlayerSprite;

#[derive(Component)]
struct ProjectileSprite;

#[derive(Component)]
struct ParticleSprite;

#[derive(Component, Clone, Copy, PartialEq, Eq)]
enum HudItem {
    Level,
    Deaths,
    Timer,
    Banner,
}

/// Pool entities are spawned on demand and hidden when idle, never despawned.
#[derive(Resource, Default)]
struct SpritePools {
    projectiles: Vec<Entity>,
    particles: Vec<Entity>,
}

/// Level id the current sprite set was built for. A mismatch tears the set
/// down so ids from the previous level cannot alias into the new one.
#[derive(Resource, Default)]
struct RenderedLevel(Option<u32>);

/// Flat color per kind, straight from the game's palette. `None` means the
/// entity draws nothing this frame. The exit, the fake exit and the runaway
/// exit share one look on purpose, locked or not.
fn entity_color(ent: &LevelEntity, door_locked: bool) -> Option<Color> {
    if !ent.visible {
        // A toggled-off wall stays as a faint ghost so the player can plan.
        return match ent.kind {
            EntityKind::ToggleWall => Some(hex(0x1E293B).with_alpha(0.2)),
            _ => None,
        };
    }
    if !ent.active {
        return None;
    }
    let color = match &ent.kind {
        EntityKind::Wall
        | EntityKind::IllusionWall
        | EntityKind::TrollBlock { .. }
        | EntityKind::MovingPlatform { .. } => hex(0x404040),
        EntityKind::GlassWall => Color::srgba(1.0, 1.0, 1.0, 0.3),
        EntityKind::OneWayPlatform => hex(0x475569),
        EntityKind::Spike | EntityKind::FallingSpike { .. } => hex(0xEF4444),
        EntityKind::RhythmSpike { on, .. } => {
            if *on {
                hex(0x991B1B)
            } else {
                hex(0x404040)
            }
        }
        EntityKind::ElectricField { on, .. } => {
            if *on {
                hex(0x3B82F6)
            } else {
                return None;
            }
        }
        EntityKind::LaserBeam { on, .. } => {
            if *on {
                hex(0xEF4444)
            } else {
                return None;
            }
        }
        EntityKind::Door | EntityKind::FakeDoor | EntityKind::WinFake { .. } => {
            if door_locked {
                hex(0x991B1B)
            } else {
                hex(0xEF4444)
            }
        }
        EntityKind::Key => hex(0xF59E0B),
        EntityKind::Button { pressed, .. } => {
            if *pressed {
                hex(0x22C55E)
            } else {
                hex(0xDC2626)
            }
        }
        EntityKind::Spring { .. } => hex(0x94A3B8),
        EntityKind::TimedDoor { .. } => hex(0x60A5FA),
        EntityKind::ToggleWall => hex(0x1E293B),
        EntityKind::FragileBlock { built, cracked, .. } => {
            if *built || *cracked {
                hex(0xA8A29E)
            } else {
                hex(0x78716C)
            }
        }
        EntityKind::Crusher { .. } | EntityKind::FallingBlock { .. } => hex(0x262626),
        EntityKind::Shooter { .. } | EntityKind::HomingLauncher { .. } => hex(0x525252),
        EntityKind::Pendulum { .. } => hex(0x999999),
        EntityKind::Spinner { .. } | EntityKind::RotatingSaw { .. } => hex(0xD4D4D8),
        EntityKind::DoomWall { .. } => hex(0x000000),
        EntityKind::Roamer { .. } => hex(0x8B0000),
        EntityKind::Chaser { .. } => hex(0x7C3AED),
        EntityKind::Guard { .. } => hex(0x1E40AF),
        EntityKind::Collector { .. } => hex(0xCA8A04),
        EntityKind::Builder { .. } => hex(0xEA580C),
        // Labels render as Text2d, not quads.
        EntityKind::Text { .. } => return None,
    };
    Some(color)
}

/// Simulation space is y-down with the origin at the level's top-left;
/// everything negates y on the way into a transform. Z follows the entity
/// list order so overlaps resolve the way the level author stacked them.
fn entity_transform(ent: &LevelEntity, index: usize, time: f32) -> Transform {
    let z = 1.0 + index as f32 * 0.01;
    match &ent.kind {
        // The quad is the blade; the pivot stays where the rect was placed
        // and the arm length rides in the rect height.
        EntityKind::Pendulum { angle, .. } => {
            let bx = ent.rect.x + angle.sin() * ent.rect.h;
            let by = ent.rect.y + angle.cos() * ent.rect.h;
            Transform::from_xyz(bx, -by, z)
        }
        EntityKind::Key => Transform::from_xyz(
            ent.rect.center_x(),
            -(ent.rect.center_y() + (time * 4.0).sin() * 5.0),
            z,
        ),
        EntityKind::Spinner { angle, .. } | EntityKind::RotatingSaw { angle, .. } => {
            Transform::from_xyz(ent.rect.center_x(), -ent.rect.center_y(), z)
                .with_rotation(Quat::from_rotation_z(-angle))
        }
        _ => Transform::from_xyz(ent.rect.center_x(), -ent.rect.center_y(), z),
    }
}

fn entity_sprite_size(ent: &LevelEntity) -> Vec2 {
    match ent.kind {
        EntityKind::Pendulum { .. } => Vec2::splat(40.0),
        EntityKind::Key => Vec2::splat(20.0),
        _ => Vec2::new(ent.rect.w, ent.rect.h),
    }
}

fn particle_color(hue: ParticleHue, life: f32) -> Color {
    let base = match hue {
        ParticleHue::Dust => hex(0xA3A3A3),
        ParticleHue::Blood => hex(0xEF4444),
        ParticleHue::Sparkle => hex(0xF59E0B),
        ParticleHue::Confetti => hex(0x22C55E),
        ParticleHue::Spark => hex(0x60A5FA),
        ParticleHue::Rubble => hex(0x78716C),
    };
    base.with_alpha(life.clamp(0.0, 1.0))
}

fn projectile_color(shot: &Projectile) -> Color {
    if shot.homing {
        hex(0xDC2626)
    } else {
        hex(0x171717)
    }
}

fn projectile_transform(shot: &Projectile) -> Transform {
    Transform::from_xyz(
        shot.x + PROJECTILE_SIZE / 2.0,
        -(shot.y + PROJECTILE_SIZE / 2.0),
        12.0,
    )
}

fn door_locked(sim: &crate::sim::Simulation) -> bool {
    !sim.player.has_key && sim.level.entities.iter().any(|e| e.is_key() && e.active)
}

#[allow(clippy::type_complexity)]
fn sync_level_sprites(
    mut commands: Commands,
    active: Res<ActiveSim>,
    mut rendered: ResMut<RenderedLevel>,
    mut sprites: Query<(
        Entity,
        &EntitySprite,
        &mut Sprite,
        &mut Transform,
        &mut Visibility,
    )>,
    labels: Query<(Entity, &EntityLabel)>,
) {
    let Some(sim) = active.0.as_ref() else {
        if rendered.0.take().is_some() {
            for (id, ..) in sprites.iter() {
                commands.entity(id).despawn();
            }
            for (id, _) in labels.iter() {
                commands.entity(id).despawn();
            }
        }
        return;
    };

    if rendered.0 != Some(sim.level.id) {
        for (id, ..) in sprites.iter() {
            commands.entity(id).despawn();
        }
        for (id, _) in labels.iter() {
            commands.entity(id).despawn();
        }
        rendered.0 = Some(sim.level.id);
        spawn_level_sprites(&mut commands, sim);
        return;
    }

    let locked = door_locked(sim);
    let mut live: HashMap<u32, usize> = HashMap::new();
    for (index, ent) in sim.level.entities.iter().enumerate() {
        if !matches!(ent.kind, EntityKind::Text { .. }) {
            live.insert(ent.id.0, index);
        }
    }

    for (id, tag, mut sprite, mut transform, mut visibility) in sprites.iter_mut() {
        match live.remove(&tag.0) {
            Some(index) => {
                let ent = &sim.level.entities[index];
                match entity_color(ent, locked) {
                    Some(color) => {
                        sprite.color = color;
                        *transform = entity_transform(ent, index, sim.time);
                        *visibility = Visibility::Inherited;
                    }
                    None => *visibility = Visibility::Hidden,
                }
            }
            // Stale id, usually a built block from the attempt before a restart.
            None => commands.entity(id).despawn(),
        }
    }

    // Whatever is left in the map was staged into the level mid-attempt.
    for (_, index) in live {
        let ent = &sim.level.entities[index];
        spawn_entity_sprite(&mut commands, ent, index, locked, sim.time);
    }
}

fn spawn_level_sprites(commands: &mut Commands, sim: &crate::sim::Simulation) {
    let locked = door_locked(sim);
    for (index, ent) in sim.level.entities.iter().enumerate() {
        if let EntityKind::Text { label } = &ent.kind {
            commands.spawn((
                EntityLabel(ent.id.0),
                Text2d::new(label.clone()),
                TextFont {
                    font_size: 24.0,
                    ..default()
                },
                TextColor(Color::WHITE),
                Transform::from_xyz(ent.rect.x, -ent.rect.y, 16.0),
            ));
        } else {
            spawn_entity_sprite(commands, ent, index, locked, sim.time);
        }
    }
}

fn spawn_entity_sprite(
    commands: &mut Commands,
    ent: &LevelEntity,
    index: usize,
    locked: bool,
    time: f32,
) {
    let visual = entity_color(ent, locked);
    commands.spawn((
        EntitySprite(ent.id.0),
        Sprite::from_color(visual.unwrap_or(Color::NONE), entity_sprite_size(ent)),
        entity_transform(ent, index, time),
        if visual.is_some() {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        },
    ));
}

/// The visual quad is 24x24 against the 24x28 hitbox, scaled by the sim's
/// squash state. It stays on screen through the death pop and disappears
/// once the player is fully dead.
fn sync_player_sprite(
    mut commands: Commands,
    active: Res<ActiveSim>,
    mut quad: Query<(&mut Transform, &mut Visibility), With<PlayerSprite>>,
) {
    let Ok((mut transform, mut visibility)) = quad.get_single_mut() else {
        if active.0.is_some() {
            commands.spawn((
                PlayerSprite,
                Sprite::from_color(hex(0x000000), Vec2::splat(24.0)),
                Transform::from_xyz(0.0, 0.0, 10.0),
                Visibility::Hidden,
            ));
        }
        return;
    };
    let Some(sim) = active.0.as_ref() else {
        *visibility = Visibility::Hidden;
        return;
    };
    let p = &sim.player;
    if p.is_dead {
        *visibility = Visibility::Hidden;
        return;
    }
    *visibility = Visibility::Inherited;
    transform.translation.x = p.x + p.w / 2.0;
    transform.translation.y = -(p.y + p.h / 2.0);
    transform.scale = Vec3::new(p.scale_x, p.scale_y, 1.0);
}

fn sync_projectile_sprites(
    mut commands: Commands,
    active: Res<ActiveSim>,
    mut pools: ResMut<SpritePools>,
    mut sprites: Query<
        (&mut Sprite, &mut Transform, &mut Visibility),
        With<ProjectileSprite>,
    >,
) {
    let shots: &[Projectile] = match active.0.as_ref() {
        Some(sim) => &sim.projectiles,
        None => &[],
    };

    while pools.projectiles.len() < shots.len() {
        let shot = &shots[pools.projectiles.len()];
        let id = commands
            .spawn((
                ProjectileSprite,
                Sprite::from_color(projectile_color(shot), Vec2::splat(PROJECTILE_SIZE)),
                projectile_transform(shot),
            ))
            .id();
        pools.projectiles.push(id);
    }

    for (slot, id) in pools.projectiles.iter().enumerate() {
        // Entities spawned above are not visible to the query until next frame.
        let Ok((mut sprite, mut transform, mut visibility)) = sprites.get_mut(*id) else {
            continue;
        };
        match shots.get(slot) {
            Some(shot) => {
                sprite.color = projectile_color(shot);
                *transform = projectile_transform(shot);
                *visibility = Visibility::Inherited;
            }
            None => *visibility = Visibility::Hidden,
        }
    }
}

fn sync_particle_sprites(
    mut commands: Commands,
    active: Res<ActiveSim>,
    mut pools: ResMut<SpritePools>,
    mut sprites: Query<
        (&mut Sprite, &mut Transform, &mut Visibility),
        With<ParticleSprite>,
    >,
) {
    let particles = match active.0.as_ref() {
        Some(sim) => sim.effects.particles.as_slice(),
        None => &[],
    };

    while pools.particles.len() < particles.len() {
        let p = &particles[pools.particles.len()];
        let id = commands
            .spawn((
                ParticleSprite,
                Sprite::from_color(particle_color(p.hue, p.life), Vec2::splat(p.size)),
                Transform::from_xyz(p.x, -p.y, 14.0),
            ))
            .id();
        pools.particles.push(id);
    }

    for (slot, id) in pools.particles.iter().enumerate() {
        let Ok((mut sprite, mut transform, mut visibility)) = sprites.get_mut(*id) else {
            continue;
        };
        match particles.get(slot) {
            Some(p) => {
                sprite.color = particle_color(p.hue, p.life);
                sprite.custom_size = Some(Vec2::splat(p.size));
                transform.translation.x = p.x;
                transform.translation.y = -p.y;
                *visibility = Visibility::Inherited;
            }
            None => *visibility = Visibility::Hidden,
        }
    }
}

fn spawn_hud(mut commands: Commands) {
    commands.spawn((
        HudItem::Level,
        Text::new(""),
        TextFont {
            font_size: 34.0,
            ..default()
        },
        TextColor(hex(0x000000)),
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(24.0),
            top: Val::Px(16.0),
            ..default()
        },
    ));
    commands.spawn((
        HudItem::Deaths,
        Text::new(""),
        TextFont {
            font_size: 20.0,
            ..default()
        },
        TextColor(hex(0xDC2626)),
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(24.0),
            top: Val::Px(56.0),
            ..default()
        },
    ));
    commands.spawn((
        HudItem::Timer,
        Text::new(""),
        TextFont {
            font_size: 40.0,
            ..default()
        },
        TextColor(Color::WHITE),
        TextLayout::new_with_justify(JustifyText::Center),
        Node {
            position_type: PositionType::Absolute,
            width: Val::Percent(100.0),
            top: Val::Px(20.0),
            ..default()
        },
    ));
    commands.spawn((
        HudItem::Banner,
        Text::new(""),
        TextFont {
            font_size: 56.0,
            ..default()
        },
        TextColor(hex(0x22C55E)),
        TextLayout::new_with_justify(JustifyText::Center),
        Node {
            position_type: PositionType::Absolute,
            width: Val::Percent(100.0),
            top: Val::Percent(40.0),
            ..default()
        },
    ));
}

#[allow(clippy::type_complexity)]
fn sync_hud(
    phase: Res<State<GamePhase>>,
    progress: Res<Progress>,
    active: Res<ActiveSim>,
    mut items: Query<(&HudItem, &mut Text, &mut TextColor, &mut Visibility)>,
) {
    let sim = active.0.as_ref();
    for (item, mut text, mut color, mut visibility) in items.iter_mut() {
        match item {
            HudItem::Level => match sim {
                Some(sim) => {
                    text.0 = format!("LEVEL {}", sim.level.id);
                    *visibility = Visibility::Inherited;
                }
                None => *visibility = Visibility::Hidden,
            },
            HudItem::Deaths => match sim {
                Some(_) => {
                    text.0 = format!("DEATHS: {}", progress.deaths);
                    *visibility = Visibility::Inherited;
                }
                None => *visibility = Visibility::Hidden,
            },
            HudItem::Timer => match sim.and_then(|s| s.time_left) {
                Some(left) => {
                    text.0 = format!("{left:.2}");
                    // Final five seconds flash red on a half-second beat.
                    color.0 = if left < 5.0 && (left * 10.0) % 2.0 > 1.0 {
                        hex(0xEF4444)
                    } else {
                        Color::WHITE
                    };
                    *visibility = Visibility::Inherited;
                }
                None => *visibility = Visibility::Hidden,
            },
            HudItem::Banner => match phase.get() {
                GamePhase::Attract => {
                    text.0 = "SNARE\nPRESS JUMP".to_string();
                    color.0 = hex(0x000000);
                    *visibility = Visibility::Inherited;
                }
                GamePhase::Transition => {
                    text.0 = "NICE!".to_string();
                    color.0 = hex(0x22C55E);
                    *visibility = Visibility::Inherited;
                }
                GamePhase::Playing | GamePhase::Respawn => *visibility = Visibility::Hidden,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{EntityDef, KindTag, LevelData, Point};
    use crate::sim::Simulation;

    fn mirror_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.init_state::<GamePhase>();
        app.insert_resource(Progress::default())
            .insert_resource(ActiveSim::default())
            .add_plugins(RenderPlugin);
        app
    }

    fn level_with(entities: Vec<EntityDef>) -> Simulation {
        let data = LevelData {
            id: 1,
            name: "mirror".into(),
            width: 800.0,
            height: 600.0,
            spawn: Point { x: 80.0, y: 360.0 },
            entities,
            hint: None,
            time_limit: None,
        };
        Simulation::new(data, 800.0, 600.0)
    }

    fn count<C: Component>(app: &mut App) -> usize {
        app.world_mut().query::<&C>().iter(app.world()).len()
    }

    #[test]
    fn level_sprites_spawn_for_everything_but_text() {
        let mut app = mirror_app();
        let sim = level_with(vec![
            EntityDef::new("floor", KindTag::Wall, 0.0, 560.0, 800.0, 40.0),
            EntityDef::new("exit", KindTag::Door, 700.0, 480.0, 40.0, 80.0),
            EntityDef {
                text: Some("exit here!".into()),
                ..EntityDef::new("taunt", KindTag::Text, 400.0, 200.0, 0.0, 0.0)
            },
        ]);
        app.world_mut().resource_mut::<ActiveSim>().0 = Some(sim);
        app.update();
        app.update();
        assert_eq!(count::<EntitySprite>(&mut app), 2);
        assert_eq!(count::<EntityLabel>(&mut app), 1);

        // Dropping the sim tears the mirror down.
        app.world_mut().resource_mut::<ActiveSim>().0 = None;
        app.update();
        app.update();
        assert_eq!(count::<EntitySprite>(&mut app), 0);
        assert_eq!(count::<EntityLabel>(&mut app), 0);
    }

    #[test]
    fn collected_key_goes_hidden() {
        let mut app = mirror_app();
        let sim = level_with(vec![EntityDef::new("k", KindTag::Key, 400.0, 300.0, 30.0, 30.0)]);
        app.world_mut().resource_mut::<ActiveSim>().0 = Some(sim);
        app.update();
        app.update();

        {
            let mut active = app.world_mut().resource_mut::<ActiveSim>();
            let sim = active.0.as_mut().unwrap();
            sim.level.entities[0].active = false;
            sim.level.entities[0].visible = false;
            sim.player.has_key = true;
        }
        app.update();

        let world = app.world_mut();
        let mut query = world.query::<(&EntitySprite, &Visibility)>();
        let (_, visibility) = query.single(world);
        assert_eq!(*visibility, Visibility::Hidden);
    }

    #[test]
    fn projectile_pool_grows_then_hides() {
        let mut app = mirror_app();
        let mut sim = level_with(vec![]);
        sim.projectiles.push(Projectile {
            x: 100.0,
            y: 100.0,
            vx: 400.0,
            vy: 0.0,
            homing: false,
        });
        sim.projectiles.push(Projectile {
            x: 200.0,
            y: 100.0,
            vx: 0.0,
            vy: 0.0,
            homing: true,
        });
        app.world_mut().resource_mut::<ActiveSim>().0 = Some(sim);
        app.update();
        app.update();
        assert_eq!(count::<ProjectileSprite>(&mut app), 2);

        app.world_mut()
            .resource_mut::<ActiveSim>()
            .0
            .as_mut()
            .unwrap()
            .projectiles
            .clear();
        app.update();

        let world = app.world_mut();
        let mut query = world.query::<(&ProjectileSprite, &Visibility)>();
        assert!(query
            .iter(world)
            .all(|(_, v)| *v == Visibility::Hidden));
    }

    #[test]
    fn door_family_shares_one_look() {
        let door = LevelEntity::new(
            crate::entity::EntityId(0),
            crate::rect::Rect::new(0.0, 0.0, 40.0, 80.0),
            EntityKind::Door,
        );
        let fake = LevelEntity::new(
            crate::entity::EntityId(1),
            crate::rect::Rect::new(0.0, 0.0, 40.0, 80.0),
            EntityKind::FakeDoor,
        );
        assert_eq!(entity_color(&door, true), entity_color(&fake, true));
        assert_eq!(entity_color(&door, false), entity_color(&fake, false));
        assert_ne!(entity_color(&door, true), entity_color(&door, false));
    }

    #[test]
    fn timed_hazards_disappear_in_their_off_phase() {
        let mut field = LevelEntity::new(
            crate::entity::EntityId(0),
            crate::rect::Rect::new(0.0, 0.0, 40.0, 120.0),
            EntityKind::ElectricField {
                period: 1.5,
                offset: 0.0,
                on: true,
            },
        );
        assert!(entity_color(&field, false).is_some());
        if let EntityKind::ElectricField { on, .. } = &mut field.kind {
            *on = false;
        }
        assert!(entity_color(&field, false).is_none());
    }

    #[test]
    fn hud_shows_the_timer_only_with_a_time_limit() {
        let mut app = mirror_app();
        let mut sim = level_with(vec![]);
        sim.time_left = Some(12.0);
        app.world_mut().resource_mut::<ActiveSim>().0 = Some(sim);
        app.update();
        app.update();

        let world = app.world_mut();
        let mut query = world.query::<(&HudItem, &Text, &Visibility)>();
        let mut saw_timer = false;
        for (item, text, visibility) in query.iter(world) {
            if *item == HudItem::Timer {
                saw_timer = true;
                assert_eq!(*visibility, Visibility::Inherited);
                assert_eq!(text.0, "12.00");
            }
        }
        assert!(saw_timer);

        app.world_mut()
            .resource_mut::<ActiveSim>()
            .0
            .as_mut()
            .unwrap()
            .time_left = None;
        app.update();
        let world = app.world_mut();
        let mut query = world.query::<(&HudItem, &Visibility)>();
        for (item, visibility) in query.iter(world) {
            if *item == HudItem::Timer {
                assert_eq!(*visibility, Visibility::Hidden);
            }
        }
    }
}
