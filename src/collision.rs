use crate::entity::{Entity, EntityKind};
use crate::player::PlayerState;

/// Maximum displacement per sub-step. Splitting the tick's motion keeps a
/// terminal-velocity fall from tunneling through thin geometry.
pub const SUB_STEP: f32 = 8.0;

/// What the sweep ran into, for the simulation to turn into effects.
#[derive(Debug, Default, PartialEq)]
pub struct SweepOutcome {
    /// Centers of keys picked up this tick, one burst each.
    pub keys_collected: Vec<(f32, f32)>,
    /// A lethal trigger started the death sequence this tick.
    pub killed: bool,
    /// The player reached an unlocked exit this tick.
    pub won: bool,
}

enum StepHalt {
    Continue,
    Halt,
}

/// Moves the player through one tick's displacement, sub-stepped and
/// axis-separated. A death or win inside a sub-step freezes the remaining
/// sub-steps for the tick.
pub fn sweep_player(player: &mut PlayerState, entities: &mut [Entity], dt: f32) -> SweepOutcome {
    let mut out = SweepOutcome::default();
    // Grounded is a per-tick fact established by this sweep.
    player.grounded = false;
    let total_dx = player.vx * dt;
    let total_dy = player.vy * dt;
    let dist = (total_dx * total_dx + total_dy * total_dy).sqrt();
    let steps = ((dist / SUB_STEP).ceil() as usize).max(1);
    let dx = total_dx / steps as f32;
    let dy = total_dy / steps as f32;
    for _ in 0..steps {
        if let StepHalt::Halt = move_step(player, entities, dx, dy, &mut out) {
            break;
        }
    }
    out
}

fn move_step(
    player: &mut PlayerState,
    entities: &mut [Entity],
    dx: f32,
    dy: f32,
    out: &mut SweepOutcome,
) -> StepHalt {
    // Trigger pass, before the displacement: a hazard the previous sub-step
    // ended inside still counts.
    for i in 0..entities.len() {
        if !entities[i].active || !entities[i].visible {
            continue;
        }
        if !player.rect().overlaps(&entities[i].rect) {
            continue;
        }
        if matches!(entities[i].kind, EntityKind::Key) {
            let ent = &mut entities[i];
            ent.active = false;
            ent.visible = false;
            player.has_key = true;
            out.keys_collected
                .push((ent.rect.center_x(), ent.rect.center_y()));
        } else if matches!(entities[i].kind, EntityKind::Spike | EntityKind::FakeDoor) {
            out.killed |= player.kill();
            return StepHalt::Halt;
        } else if matches!(entities[i].kind, EntityKind::Door) {
            let locked = !player.has_key && entities.iter().any(|e| e.is_key() && e.active);
            if !locked {
                out.won = true;
                return StepHalt::Halt;
            }
        }
    }

    player.x += dx;
    for ent in entities.iter_mut() {
        if !ent.active || !ent.visible || !ent.is_solid() {
            continue;
        }
        if !player.rect().overlaps(&ent.rect) {
            continue;
        }
        if dx > 0.0 {
            player.x = ent.rect.x - player.w;
        } else if dx < 0.0 {
            player.x = ent.rect.right();
        }
        player.vx = 0.0;
        if let EntityKind::TrollBlock { armed, .. } = &mut ent.kind {
            *armed = true;
        }
    }

    player.y += dy;
    for ent in entities.iter_mut() {
        if !ent.active || !ent.visible {
            continue;
        }
        if matches!(ent.kind, EntityKind::OneWayPlatform) {
            // Blocks only downward motion that started above the platform
            // top, so the player can jump up through it but not snap onto
            // it from below or the side.
            if dy > 0.0 && player.rect().overlaps(&ent.rect) {
                let prev_bottom = player.y - dy + player.h;
                if prev_bottom <= ent.rect.y {
                    player.y = ent.rect.y - player.h;
                    player.vy = 0.0;
                    player.grounded = true;
                }
            }
            continue;
        }
        if !ent.is_solid() {
            continue;
        }
        if !player.rect().overlaps(&ent.rect) {
            continue;
        }
        if dy > 0.0 {
            player.y = ent.rect.y - player.h;
            player.vy = 0.0;
            player.grounded = true;
            if let EntityKind::FragileBlock { cracked, .. } = &mut ent.kind {
                *cracked = true;
            }
        } else if dy < 0.0 {
            player.y = ent.rect.bottom();
            player.vy = 0.0;
            player.scale_x = 1.1;
            player.scale_y = 0.9;
        }
        if let EntityKind::TrollBlock { armed, .. } = &mut ent.kind {
            *armed = true;
        }
    }

    StepHalt::Continue
}
