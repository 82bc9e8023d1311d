use rand::rngs::SmallRng;
use rand::Rng;

use crate::effects::{EffectsState, ParticleHue};
use crate::entity::{Direction, Entity};
use crate::player::PlayerState;
use crate::rect::Rect;

pub const PROJECTILE_SIZE: f32 = 10.0;
pub const STRAIGHT_SPEED: f32 = 400.0;
pub const HOMING_SPAWN_SPEED: f32 = 200.0;
/// Speed of the vector a homing shot blends toward each tick.
pub const HOMING_STEER_SPEED: f32 = 150.0;
/// Culled once this far outside the level bounds.
pub const BOUNDS_SLACK: f32 = 100.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projectile {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub homing: bool,
}

impl Projectile {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, PROJECTILE_SIZE, PROJECTILE_SIZE)
    }
}

/// Builds a projectile at the source's firing edge. A directed source fires
/// straight; a homing launcher without a direction fires on a random
/// heading and steers from there.
pub fn spawn_from(source: &Rect, dir: Option<Direction>, homing: bool, rng: &mut SmallRng) -> Projectile {
    let speed = if homing { HOMING_SPAWN_SPEED } else { STRAIGHT_SPEED };
    let mut vx = 0.0;
    let mut vy = 0.0;
    let mut x = source.center_x() - PROJECTILE_SIZE / 2.0;
    let mut y = source.center_y() - PROJECTILE_SIZE / 2.0;
    match dir {
        Some(Direction::Right) => {
            vx = speed;
            x = source.right();
        }
        Some(Direction::Left) => {
            vx = -speed;
            x = source.x - PROJECTILE_SIZE;
        }
        Some(Direction::Up) => {
            vy = -speed;
            y = source.y - PROJECTILE_SIZE;
        }
        Some(Direction::Down) => {
            vy = speed;
            y = source.bottom();
        }
        None => {
            if homing {
                let angle = rng.gen::<f32>() * std::f32::consts::TAU;
                vx = angle.cos() * 100.0;
                vy = angle.sin() * 100.0;
            }
        }
    }
    Projectile {
        x,
        y,
        vx,
        vy,
        homing,
    }
}

/// One tick for every live projectile: homing steer, integrate, then cull
/// on player hit (lethal), solid hit (spark), or leaving the bounds.
/// Returns true when a projectile started the death sequence.
pub fn update_projectiles(
    projectiles: &mut Vec<Projectile>,
    player: &mut PlayerState,
    entities: &[Entity],
    width: f32,
    height: f32,
    dt: f32,
    effects: &mut EffectsState,
    rng: &mut SmallRng,
) -> bool {
    let mut killed = false;
    let mut i = 0;
    while i < projectiles.len() {
        let p = &mut projectiles[i];
        if p.homing {
            let angle = (player.center_y() - p.y).atan2(player.center_x() - p.x);
            p.vx = p.vx * 0.95 + angle.cos() * HOMING_STEER_SPEED * 0.05;
            p.vy = p.vy * 0.95 + angle.sin() * HOMING_STEER_SPEED * 0.05;
        }
        p.x += p.vx * dt;
        p.y += p.vy * dt;

        let rect = p.rect();
        if rect.overlaps(&player.rect()) {
            killed |= player.kill();
            projectiles.swap_remove(i);
            continue;
        }
        let hit_solid = entities
            .iter()
            .any(|e| e.visible && e.is_solid() && rect.overlaps(&e.rect));
        if hit_solid {
            effects.burst(rng, rect.x, rect.y, ParticleHue::Spark, 3);
        }
        let out_of_bounds = rect.x < -BOUNDS_SLACK
            || rect.x > width + BOUNDS_SLACK
            || rect.y < -BOUNDS_SLACK
            || rect.y > height + BOUNDS_SLACK;
        if hit_solid || out_of_bounds {
            projectiles.swap_remove(i);
            continue;
        }
        i += 1;
    }
    killed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityId, EntityKind};
    use rand::SeedableRng;

    const DT: f32 = 1.0 / 120.0;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(5)
    }

    #[test]
    fn directed_spawn_leaves_from_the_firing_edge() {
        let source = Rect::new(100.0, 100.0, 40.0, 40.0);
        let mut rng = rng();
        let right = spawn_from(&source, Some(Direction::Right), false, &mut rng);
        assert_eq!(right.x, 140.0);
        assert_eq!(right.vx, STRAIGHT_SPEED);
        assert_eq!(right.vy, 0.0);

        let up = spawn_from(&source, Some(Direction::Up), false, &mut rng);
        assert_eq!(up.y, 100.0 - PROJECTILE_SIZE);
        assert_eq!(up.vy, -STRAIGHT_SPEED);
    }

    #[test]
    fn undirected_homing_spawn_picks_a_heading() {
        let source = Rect::new(0.0, 0.0, 40.0, 40.0);
        let mut rng = rng();
        let p = spawn_from(&source, None, true, &mut rng);
        let speed = (p.vx * p.vx + p.vy * p.vy).sqrt();
        assert!((speed - 100.0).abs() < 0.1);
    }

    #[test]
    fn straight_shots_never_curve() {
        let mut projectiles = vec![Projectile {
            x: 0.0,
            y: 0.0,
            vx: STRAIGHT_SPEED,
            vy: 0.0,
            homing: false,
        }];
        let mut player = PlayerState::at_spawn(400.0, 400.0);
        let mut fx = EffectsState::default();
        let mut rng = rng();
        for _ in 0..30 {
            update_projectiles(
                &mut projectiles,
                &mut player,
                &[],
                2000.0,
                2000.0,
                DT,
                &mut fx,
                &mut rng,
            );
        }
        assert_eq!(projectiles[0].vy, 0.0);
        assert!(projectiles[0].x > 0.0);
    }

    #[test]
    fn homing_shots_bend_toward_the_player() {
        let mut projectiles = vec![Projectile {
            x: 0.0,
            y: 0.0,
            vx: HOMING_SPAWN_SPEED,
            vy: 0.0,
            homing: true,
        }];
        // Player well below the projectile's path.
        let mut player = PlayerState::at_spawn(300.0, 600.0);
        let mut fx = EffectsState::default();
        let mut rng = rng();
        for _ in 0..60 {
            update_projectiles(
                &mut projectiles,
                &mut player,
                &[],
                2000.0,
                2000.0,
                DT,
                &mut fx,
                &mut rng,
            );
        }
        assert!(projectiles[0].vy > 0.0, "steering must pull downward");
    }

    #[test]
    fn player_hit_kills_and_removes() {
        let mut player = PlayerState::at_spawn(100.0, 100.0);
        let mut projectiles = vec![Projectile {
            x: player.center_x(),
            y: player.center_y(),
            vx: 0.0,
            vy: 0.0,
            homing: false,
        }];
        let mut fx = EffectsState::default();
        let mut rng = rng();
        let killed = update_projectiles(
            &mut projectiles,
            &mut player,
            &[],
            2000.0,
            2000.0,
            DT,
            &mut fx,
            &mut rng,
        );
        assert!(killed);
        assert!(player.dying());
        assert!(projectiles.is_empty());
    }

    #[test]
    fn solid_hit_sparks_and_removes() {
        let wall = Entity::new(
            EntityId(0),
            Rect::new(50.0, 0.0, 40.0, 200.0),
            EntityKind::Wall,
        );
        let mut player = PlayerState::at_spawn(900.0, 900.0);
        let mut projectiles = vec![Projectile {
            x: 45.0,
            y: 50.0,
            vx: STRAIGHT_SPEED,
            vy: 0.0,
            homing: false,
        }];
        let mut fx = EffectsState::default();
        let mut rng = rng();
        update_projectiles(
            &mut projectiles,
            &mut player,
            &[wall],
            2000.0,
            2000.0,
            DT,
            &mut fx,
            &mut rng,
        );
        assert!(projectiles.is_empty());
        assert_eq!(fx.particles.len(), 3);
        assert!(fx.particles.iter().all(|p| p.hue == ParticleHue::Spark));
    }

    #[test]
    fn leaving_the_bounds_culls() {
        let mut player = PlayerState::at_spawn(900.0, 900.0);
        let mut projectiles = vec![Projectile {
            x: 1995.0,
            y: 50.0,
            vx: 20000.0,
            vy: 0.0,
            homing: false,
        }];
        let mut fx = EffectsState::default();
        let mut rng = rng();
        update_projectiles(
            &mut projectiles,
            &mut player,
            &[],
            2000.0,
            2000.0,
            DT,
            &mut fx,
            &mut rng,
        );
        assert!(projectiles.is_empty());
    }
}
