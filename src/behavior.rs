use rand::rngs::SmallRng;

use crate::effects::{EffectsState, ParticleHue};
use crate::entity::{
    Axis, CollectorState, Entity, EntityKind, FallState, GuardState, TriggerMode,
};
use crate::player::{PlayerState, JUMP_FORCE};
use crate::projectile::{self, Projectile};
use crate::rect::{lerp, Rect};
use crate::sim::{SimEvent, GRAVITY, TILE};

/// Delay between a troll block being touched and it crumbling away.
pub const TROLL_FUSE: f32 = 0.15;
/// Builder-spawned blocks decay this long after creation.
pub const BUILT_BLOCK_LIFETIME: f32 = 5.0;
/// Spring launch relative to a normal jump.
pub const SPRING_BOOST: f32 = 1.5;
/// Seconds a timed door stays open once its button fires.
pub const TIMED_DOOR_REOPEN: f32 = 3.0;

/// What one behavior pass produced. Spawns are staged here and merged by
/// the caller at the end of the tick, so nothing collides against an
/// entity on the tick it was created.
pub struct BehaviorOutcome {
    pub killed: bool,
    pub projectiles: Vec<Projectile>,
    pub spawned: Vec<Entity>,
}

/// One behavior tick for every active entity, in level order. Movers
/// reposition off the elapsed-time oscillator, monsters steer, timed
/// hazards flip phase, and anything lethal checks the player. Builder
/// spawns are staged locally and appended after the pass.
///
/// Runs after the controller and before the sweep, so `player.grounded`
/// still reflects the previous tick's ground contact here.
pub fn update_entities(
    entities: &mut [Entity],
    player: &mut PlayerState,
    time: f32,
    dt: f32,
    effects: &mut EffectsState,
    events: &mut Vec<SimEvent>,
    rng: &mut SmallRng,
    next_id: &mut u32,
) -> BehaviorOutcome {
    let mut out = BehaviorOutcome {
        killed: false,
        projectiles: Vec::new(),
        spawned: Vec::new(),
    };

    for i in 0..entities.len() {
        if !entities[i].active {
            continue;
        }

        // These two need to reach across the entity list, so they go
        // through index-based helpers instead of the borrow below.
        if matches!(entities[i].kind, EntityKind::Collector { .. }) {
            out.killed |= update_collector(entities, i, player, dt, events);
            continue;
        }
        if matches!(entities[i].kind, EntityKind::Button { .. }) {
            update_button(entities, i, player, events);
            continue;
        }

        let ent = &mut entities[i];
        match &mut ent.kind {
            EntityKind::Roamer {
                origin_x,
                speed,
                range,
            } => {
                ent.rect.x = *origin_x + (time * (*speed / 50.0)).sin() * (*range / 2.0);
                if ent.rect.overlaps(&player.rect()) {
                    out.killed |= player.kill();
                }
            }
            EntityKind::Crusher {
                origin_y,
                speed,
                range,
            } => {
                ent.rect.y = *origin_y + (time * (*speed / 150.0)).sin().abs() * *range;
                // Lethal only from above; the top face is safe to stand on.
                if ent.rect.overlaps(&player.rect()) && player.y > ent.rect.y {
                    out.killed |= player.kill();
                }
            }
            EntityKind::WinFake { speed } => {
                if (player.x - ent.rect.x).abs() < 200.0 {
                    let away = if player.x < ent.rect.x { 1.0 } else { -1.0 };
                    ent.rect.x += *speed * dt * away;
                }
            }
            EntityKind::Pendulum { speed, angle } => {
                *angle = (time * *speed).sin() * 1.5;
                let len = ent.rect.h;
                let blade_x = ent.rect.x + angle.sin() * len;
                let blade_y = ent.rect.y + angle.cos() * len;
                let dx = player.center_x() - blade_x;
                let dy = player.center_y() - blade_y;
                if (dx * dx + dy * dy).sqrt() < 25.0 {
                    out.killed |= player.kill();
                }
            }
            EntityKind::Chaser { detect, speed } => {
                let dx = player.center_x() - ent.rect.center_x();
                let dy = player.center_y() - ent.rect.center_y();
                let dist = (dx * dx + dy * dy).sqrt();
                if dist < *detect && dist > 0.0 {
                    ent.rect.x += dx / dist * *speed * dt;
                    ent.rect.y += dy / dist * *speed * dt;
                    if ent.rect.overlaps(&player.rect()) {
                        out.killed |= player.kill();
                    }
                }
            }
            EntityKind::Guard {
                origin_x,
                speed,
                range,
                state,
            } => {
                match state {
                    GuardState::Patrol => {
                        if *range > 0.0 {
                            let phase = time * (*speed / 100.0);
                            ent.rect.x = *origin_x + phase.sin() * (*range / 2.0);
                            let facing_left = phase.cos() < 0.0;
                            let dx = player.x - ent.rect.x;
                            let dy = player.y - ent.rect.y;
                            let seen = dy.abs() < 50.0
                                && dx.abs() < 200.0
                                && ((facing_left && dx < 0.0) || (!facing_left && dx > 0.0));
                            if seen {
                                *state = GuardState::Attack;
                            }
                        }
                    }
                    // Once alerted there is no going back.
                    GuardState::Attack => {
                        let dx = player.x - ent.rect.x;
                        if dx != 0.0 {
                            ent.rect.x += dx.signum() * (*speed * 3.0) * dt;
                        }
                    }
                }
                if ent.rect.overlaps(&player.rect()) {
                    out.killed |= player.kill();
                }
            }
            EntityKind::Builder { interval, timer } => {
                *timer += dt;
                if *timer > *interval {
                    *timer = 0.0;
                    let id = crate::entity::EntityId(*next_id);
                    *next_id += 1;
                    out.spawned.push(Entity::built_block(
                        id,
                        ent.rect.x,
                        ent.rect.y + ent.rect.h,
                        TILE,
                    ));
                }
            }
            EntityKind::FragileBlock { built, age, .. } => {
                if *built {
                    *age += dt;
                    if *age > BUILT_BLOCK_LIFETIME {
                        ent.active = false;
                        ent.visible = false;
                        effects.burst(
                            rng,
                            ent.rect.center_x(),
                            ent.rect.center_y(),
                            ParticleHue::Rubble,
                            5,
                        );
                    }
                }
            }
            EntityKind::RhythmSpike { period, offset, on }
            | EntityKind::ElectricField { period, offset, on }
            | EntityKind::LaserBeam { period, offset, on } => {
                *on = if *period > 0.0 {
                    (time + *offset) % (*period * 2.0) < *period
                } else {
                    true
                };
                if *on && ent.rect.overlaps(&player.rect()) {
                    out.killed |= player.kill();
                }
            }
            EntityKind::DoomWall { speed, accel } => {
                *speed += *accel * dt;
                ent.rect.x += *speed * dt;
                let dist = (ent.rect.x - player.x).abs();
                if dist < 300.0 {
                    effects.camera.shake = effects.camera.shake.max((300.0 - dist) / 50.0);
                }
                if ent.rect.overlaps(&player.rect()) {
                    out.killed |= player.kill();
                }
            }
            EntityKind::FallingSpike { dropping, vy } => {
                if *dropping {
                    *vy += GRAVITY * dt;
                    ent.rect.y += *vy * dt;
                } else if (ent.rect.center_x() - player.center_x()).abs() < 30.0
                    && player.y > ent.rect.y
                {
                    *dropping = true;
                    *vy = 200.0;
                    effects.camera.shake = 2.0;
                }
                if ent.rect.overlaps(&player.rect()) {
                    out.killed |= player.kill();
                }
            }
            EntityKind::TrollBlock { armed, fuse } => {
                if *armed {
                    *fuse += dt;
                    if *fuse > TROLL_FUSE {
                        ent.active = false;
                        ent.visible = false;
                        events.push(SimEvent::Crumbled);
                        effects.burst(
                            rng,
                            ent.rect.center_x(),
                            ent.rect.center_y(),
                            ParticleHue::Rubble,
                            8,
                        );
                    }
                }
            }
            EntityKind::TimedDoor { reopen } => {
                if !ent.visible && *reopen > 0.0 {
                    *reopen -= dt;
                    if *reopen <= 0.0 {
                        ent.visible = true;
                        // Standing in the doorway when it slams is fatal.
                        if ent.rect.overlaps(&player.rect()) {
                            out.killed |= player.kill();
                        }
                    }
                }
            }
            EntityKind::Spring { compression } => {
                if *compression > 0.0 {
                    *compression -= dt;
                }
                let r = ent.rect;
                let foot_on_pad = player.x + player.w > r.x + 4.0
                    && player.x < r.x + r.w - 4.0
                    && player.y + player.h > r.y + 4.0
                    && player.y + player.h < r.y + r.h;
                if player.vy > 0.0 && foot_on_pad {
                    player.vy = JUMP_FORCE * SPRING_BOOST;
                    player.grounded = false;
                    *compression = 0.2;
                    events.push(SimEvent::SpringBounced);
                    effects.burst(rng, r.center_x(), r.y, ParticleHue::Sparkle, 5);
                }
            }
            EntityKind::Shooter {
                cooldown,
                timer,
                dir,
            } => {
                *timer += dt;
                if *timer > *cooldown {
                    *timer = 0.0;
                    out.projectiles
                        .push(projectile::spawn_from(&ent.rect, *dir, false, rng));
                    events.push(SimEvent::Shot);
                }
            }
            EntityKind::HomingLauncher {
                cooldown,
                timer,
                dir,
            } => {
                *timer += dt;
                if *timer > *cooldown {
                    *timer = 0.0;
                    out.projectiles
                        .push(projectile::spawn_from(&ent.rect, *dir, true, rng));
                    events.push(SimEvent::Shot);
                }
            }
            EntityKind::FallingBlock { rest_y, state } => {
                match state {
                    FallState::Idle => {
                        let over = (player.center_x() - ent.rect.center_x()).abs()
                            < ent.rect.w / 2.0 + 10.0;
                        if over && player.y > ent.rect.y && player.y < ent.rect.y + 300.0 {
                            *state = FallState::PreAttack { t: 0.0 };
                        }
                    }
                    FallState::PreAttack { t } => {
                        *t += dt;
                        if *t > 0.4 {
                            *state = FallState::Attack { vy: 0.0 };
                            events.push(SimEvent::Crumbled);
                        }
                    }
                    FallState::Attack { vy } => {
                        *vy += GRAVITY * 2.0 * dt;
                        ent.rect.y += *vy * dt;
                        if ent.rect.y > *rest_y + 200.0 {
                            *state = FallState::Cooldown { t: 0.0 };
                            effects.camera.shake = 5.0;
                            effects.burst(
                                rng,
                                ent.rect.center_x(),
                                ent.rect.bottom(),
                                ParticleHue::Dust,
                                10,
                            );
                        }
                    }
                    FallState::Cooldown { t } => {
                        *t += dt;
                        if *t > 1.0 {
                            *state = FallState::Return;
                        }
                    }
                    FallState::Return => {
                        ent.rect.y = lerp(ent.rect.y, *rest_y, dt * 2.0);
                        if (ent.rect.y - *rest_y).abs() < 1.0 {
                            ent.rect.y = *rest_y;
                            *state = FallState::Idle;
                        }
                    }
                }
                if ent.rect.overlaps(&player.rect()) {
                    out.killed |= player.kill();
                }
            }
            EntityKind::MovingPlatform {
                origin_x,
                origin_y,
                axis,
                speed,
                range,
            } => {
                let prev_x = ent.rect.x;
                let prev_y = ent.rect.y;
                let offset = (time * *speed).sin() * (*range / 2.0);
                match axis {
                    Axis::X => ent.rect.x = *origin_x + offset,
                    Axis::Y => ent.rect.y = *origin_y + offset,
                }
                // Carry a rider who was standing on the platform's previous
                // position. Grounded is last tick's verdict, which is the
                // tick the rider actually stood here.
                let rode = player.grounded
                    && player.x + player.w > prev_x
                    && player.x < prev_x + ent.rect.w
                    && ((player.y + player.h) - prev_y).abs() < 6.0;
                if rode {
                    player.x += ent.rect.x - prev_x;
                    player.y += ent.rect.y - prev_y;
                }
            }
            EntityKind::Spinner { speed, angle }
            | EntityKind::RotatingSaw { speed, angle } => {
                *angle += *speed * dt;
                let radius = ent.rect.w / 2.0;
                let dx = ent.rect.x + radius - player.center_x();
                let dy = ent.rect.y + radius - player.center_y();
                if (dx * dx + dy * dy).sqrt() < radius {
                    out.killed |= player.kill();
                }
            }
            // Buttons and collectors were handled above; the rest have no
            // behavior of their own.
            EntityKind::Wall
            | EntityKind::GlassWall
            | EntityKind::IllusionWall
            | EntityKind::OneWayPlatform
            | EntityKind::Spike
            | EntityKind::FakeDoor
            | EntityKind::Key
            | EntityKind::Door
            | EntityKind::ToggleWall
            | EntityKind::Text { .. }
            | EntityKind::Button { .. }
            | EntityKind::Collector { .. } => {}
        }
    }

    out
}

/// Collector pass: chase the nearest live key, steal it on contact, then
/// flee the player at a hurry. Lethal to touch in either mood.
fn update_collector(
    entities: &mut [Entity],
    i: usize,
    player: &mut PlayerState,
    dt: f32,
    events: &mut Vec<SimEvent>,
) -> bool {
    let (cx, cy) = (entities[i].rect.x, entities[i].rect.y);
    let (base_speed, state) = match entities[i].kind {
        EntityKind::Collector { speed, state, .. } => (speed, state),
        _ => return false,
    };
    let speed = if state == CollectorState::Flee {
        base_speed * 1.5
    } else {
        base_speed
    };

    match state {
        CollectorState::Chase => {
            let mut nearest: Option<(usize, f32)> = None;
            for (j, e) in entities.iter().enumerate() {
                if e.is_key() && e.active {
                    let dx = e.rect.x - cx;
                    let dy = e.rect.y - cy;
                    let d2 = dx * dx + dy * dy;
                    if nearest.map_or(true, |(_, best)| d2 < best) {
                        nearest = Some((j, d2));
                    }
                }
            }
            if let Some((j, _)) = nearest {
                let dx = entities[j].rect.x - cx;
                let dy = entities[j].rect.y - cy;
                let dist = (dx * dx + dy * dy).sqrt();
                if dist > 5.0 {
                    entities[i].rect.x += dx / dist * speed * dt;
                    entities[i].rect.y += dy / dist * speed * dt;
                }
                if entities[i].rect.overlaps(&entities[j].rect) {
                    entities[j].active = false;
                    entities[j].visible = false;
                    if let EntityKind::Collector {
                        state, has_item, ..
                    } = &mut entities[i].kind
                    {
                        *state = CollectorState::Flee;
                        *has_item = true;
                    }
                    events.push(SimEvent::Crumbled);
                }
            }
        }
        CollectorState::Flee => {
            let dx = cx - player.x;
            let dy = cy - player.y;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist > 0.0 {
                entities[i].rect.x += dx / dist * speed * dt;
                entities[i].rect.y += dy / dist * speed * dt;
            }
        }
    }

    if entities[i].rect.overlaps(&player.rect()) {
        return player.kill();
    }
    false
}

/// Button pass: pressure needs the player's foot band on the button's top
/// band while grounded. The link fires on the rising edge only; release
/// re-arms the button unless its mode is `Once`. Release never un-fires
/// the target.
fn update_button(entities: &mut [Entity], i: usize, player: &PlayerState, events: &mut Vec<SimEvent>) {
    let rect = entities[i].rect;
    let (mode, link, pressed) = match entities[i].kind {
        EntityKind::Button {
            mode,
            link,
            pressed,
        } => (mode, link, pressed),
        _ => return,
    };

    let pad = Rect::new(rect.x + 4.0, rect.y + rect.h - 10.0, rect.w - 8.0, 10.0);
    let foot = Rect::new(player.x, player.y + player.h - 4.0, player.w, 4.0);
    let down = pad.overlaps(&foot) && player.grounded;

    if down && !pressed {
        events.push(SimEvent::ButtonPressed);
        if let Some(target_id) = link {
            if let Some(j) = entities.iter().position(|e| e.id == target_id) {
                fire_link(&mut entities[j]);
            }
        }
        if let EntityKind::Button { pressed, .. } = &mut entities[i].kind {
            *pressed = true;
        }
    } else if !down && pressed && mode != TriggerMode::Once {
        if let EntityKind::Button { pressed, .. } = &mut entities[i].kind {
            *pressed = false;
        }
    }
}

fn fire_link(target: &mut Entity) {
    match &mut target.kind {
        EntityKind::TimedDoor { reopen } => {
            target.visible = false;
            *reopen = TIMED_DOOR_REOPEN;
        }
        EntityKind::ToggleWall => target.visible = !target.visible,
        EntityKind::FallingBlock { state, .. } => *state = FallState::Attack { vy: 0.0 },
        _ => {}
    }
}
