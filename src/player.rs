use rand::rngs::SmallRng;
use rand::Rng;

use crate::rect::{lerp, Rect};
use crate::sim::{InputState, GRAVITY, TERMINAL_VELOCITY, TILE};

pub const PLAYER_W: f32 = 24.0;
pub const PLAYER_H: f32 = 28.0;
pub const MOVE_SPEED: f32 = 320.0;
pub const ACCELERATION: f32 = 2800.0;
pub const AIR_ACCEL_SCALE: f32 = 0.6;
/// Per-60Hz-frame decay factor; applied as `0.85^(dt*60)` so the feel is
/// framerate-independent.
pub const FRICTION: f32 = 0.85;
pub const JUMP_FORCE: f32 = -740.0;
pub const JUMP_BUFFER: f32 = 0.15;
pub const COYOTE_TIME: f32 = 0.08;
/// Inert window between a lethal touch and the death becoming final.
pub const DEATH_DELAY: f32 = 0.6;

#[derive(Clone, Debug, PartialEq)]
pub struct PlayerState {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub vx: f32,
    pub vy: f32,
    pub grounded: bool,
    pub facing_right: bool,
    pub has_key: bool,
    pub is_dead: bool,
    pub coyote: f32,
    pub jump_buffer: f32,
    pub death_timer: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub blink: f32,
}

impl PlayerState {
    /// Bottom-centered in the spawn tile.
    pub fn at_spawn(spawn_x: f32, spawn_y: f32) -> Self {
        Self {
            x: spawn_x + (TILE - PLAYER_W) / 2.0,
            y: spawn_y + (TILE - PLAYER_H),
            w: PLAYER_W,
            h: PLAYER_H,
            vx: 0.0,
            vy: 0.0,
            grounded: false,
            facing_right: true,
            has_key: false,
            is_dead: false,
            coyote: 0.0,
            jump_buffer: 0.0,
            death_timer: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            blink: 0.0,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.w / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.h / 2.0
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Starts the death sequence. Idempotent: a player already dead or
    /// already dying is left alone, so stacked hazards cannot re-kill.
    /// Returns whether the sequence started this call.
    pub fn kill(&mut self) -> bool {
        if self.is_dead || self.death_timer > 0.0 {
            return false;
        }
        self.death_timer = DEATH_DELAY;
        self.vx = 0.0;
        self.vy = 0.0;
        self.scale_x = 1.0;
        self.scale_y = 1.0;
        true
    }

    pub fn dying(&self) -> bool {
        self.death_timer > 0.0
    }

    /// One tick of intent: cosmetics, jump buffering, horizontal
    /// acceleration or friction, gravity, coyote upkeep, and the jump
    /// itself. Returns true when a jump fired. `grounded` survives until the
    /// collision sweep so entity behaviors (platform carry) can still read
    /// it; the sweep clears and re-establishes it.
    pub fn apply_controls(
        &mut self,
        input: &InputState,
        time: f32,
        dt: f32,
        rng: &mut SmallRng,
    ) -> bool {
        self.scale_x = lerp(self.scale_x, 1.0, dt * 15.0);
        self.scale_y = lerp(self.scale_y, 1.0, dt * 15.0);
        self.blink -= dt;
        if self.blink <= 0.0 && rng.gen::<f32>() < 0.01 {
            self.blink = 0.15;
        }

        if input.jump {
            self.jump_buffer = JUMP_BUFFER;
        } else if self.jump_buffer > 0.0 {
            self.jump_buffer -= dt;
        }

        let mut target = 0.0;
        if input.left {
            target = -MOVE_SPEED;
        }
        if input.right {
            target = MOVE_SPEED;
        }
        if target != 0.0 {
            let accel = if self.grounded {
                ACCELERATION
            } else {
                ACCELERATION * AIR_ACCEL_SCALE
            };
            if self.vx < target {
                self.vx = (self.vx + accel * dt).min(target);
            } else {
                self.vx = (self.vx - accel * dt).max(target);
            }
            self.facing_right = target > 0.0;
            if self.grounded {
                let cycle = (time * 20.0).sin();
                self.scale_y = 1.0 + cycle * 0.1;
                self.scale_x = 1.0 - cycle * 0.1;
            }
        } else {
            self.vx *= FRICTION.powf(dt * 60.0);
        }

        self.vy += GRAVITY * dt;
        if self.vy.abs() > TERMINAL_VELOCITY {
            self.vy = TERMINAL_VELOCITY * self.vy.signum();
        }

        if self.grounded {
            self.coyote = COYOTE_TIME;
        } else {
            self.coyote -= dt;
        }

        let jumped = self.jump_buffer > 0.0 && (self.grounded || self.coyote > 0.0);
        if jumped {
            self.vy = JUMP_FORCE;
            self.coyote = 0.0;
            self.jump_buffer = 0.0;
            self.grounded = false;
            self.scale_x = 0.7;
            self.scale_y = 1.3;
        }
        jumped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const DT: f32 = 1.0 / 120.0;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(7)
    }

    fn grounded_player() -> PlayerState {
        let mut p = PlayerState::at_spawn(80.0, 400.0);
        p.grounded = true;
        p
    }

    #[test]
    fn friction_decays_speed_without_reversing() {
        let mut p = grounded_player();
        p.vx = 250.0;
        let mut rng = rng();
        let idle = InputState::default();
        let mut prev = p.vx;
        for _ in 0..60 {
            p.grounded = true;
            p.apply_controls(&idle, 0.0, DT, &mut rng);
            assert!(p.vx >= 0.0, "friction must not reverse direction");
            assert!(p.vx < prev, "friction must strictly decay");
            prev = p.vx;
        }
        assert!(p.vx < 2.0);
    }

    #[test]
    fn acceleration_approaches_move_speed() {
        let mut p = grounded_player();
        let mut rng = rng();
        let right = InputState {
            right: true,
            ..Default::default()
        };
        for _ in 0..120 {
            p.grounded = true;
            p.apply_controls(&right, 0.0, DT, &mut rng);
            assert!(p.vx <= MOVE_SPEED);
        }
        assert!((p.vx - MOVE_SPEED).abs() < 1.0);
        assert!(p.facing_right);
    }

    #[test]
    fn air_acceleration_is_weaker() {
        let mut rng = rng();
        let right = InputState {
            right: true,
            ..Default::default()
        };
        let mut on_ground = grounded_player();
        on_ground.apply_controls(&right, 0.0, DT, &mut rng);
        let mut airborne = PlayerState::at_spawn(80.0, 400.0);
        airborne.apply_controls(&right, 0.0, DT, &mut rng);
        assert!(airborne.vx < on_ground.vx);
    }

    #[test]
    fn jump_requires_buffer_and_ground_or_coyote() {
        let mut rng = rng();
        let jump = InputState {
            jump: true,
            ..Default::default()
        };

        let mut p = grounded_player();
        assert!(p.apply_controls(&jump, 0.0, DT, &mut rng));
        assert_eq!(p.vy, JUMP_FORCE);
        assert_eq!(p.jump_buffer, 0.0);
        assert_eq!(p.coyote, 0.0);
        assert!(!p.grounded);

        // Airborne past the coyote window: buffered but not eligible.
        let mut p = PlayerState::at_spawn(80.0, 400.0);
        p.coyote = -1.0;
        assert!(!p.apply_controls(&jump, 0.0, DT, &mut rng));
        assert!(p.jump_buffer > 0.0);
    }

    #[test]
    fn coyote_window_allows_a_late_jump() {
        let mut rng = rng();
        let idle = InputState::default();
        let jump = InputState {
            jump: true,
            ..Default::default()
        };

        // One grounded tick charges the window, then the player walks off
        // the ledge (the sweep un-grounds them); a few ticks later the jump
        // must still fire.
        let mut p = grounded_player();
        p.apply_controls(&idle, 0.0, DT, &mut rng);
        p.grounded = false;
        for _ in 0..4 {
            p.apply_controls(&idle, 0.0, DT, &mut rng);
        }
        assert!(p.coyote > 0.0);
        assert!(p.apply_controls(&jump, 0.0, DT, &mut rng));

        // And once the window lapses it must not.
        let mut p = grounded_player();
        p.apply_controls(&idle, 0.0, DT, &mut rng);
        p.grounded = false;
        for _ in 0..12 {
            p.apply_controls(&idle, 0.0, DT, &mut rng);
        }
        assert!(p.coyote <= 0.0);
        assert!(!p.apply_controls(&jump, 0.0, DT, &mut rng));
    }

    #[test]
    fn buffered_jump_fires_on_landing_tick() {
        let mut rng = rng();
        let jump = InputState {
            jump: true,
            ..Default::default()
        };
        let mut p = PlayerState::at_spawn(80.0, 400.0);
        p.coyote = -1.0;
        assert!(!p.apply_controls(&jump, 0.0, DT, &mut rng));
        // The resolver grounds the player between ticks.
        p.grounded = true;
        assert!(p.apply_controls(&jump, 0.0, DT, &mut rng));
    }

    #[test]
    fn gravity_clamps_at_terminal_velocity() {
        let mut rng = rng();
        let idle = InputState::default();
        let mut p = PlayerState::at_spawn(80.0, 400.0);
        p.coyote = -1.0;
        for _ in 0..240 {
            p.apply_controls(&idle, 0.0, DT, &mut rng);
        }
        assert_eq!(p.vy, TERMINAL_VELOCITY);
    }

    #[test]
    fn kill_is_idempotent_while_dying() {
        let mut p = grounded_player();
        p.vx = 100.0;
        assert!(p.kill());
        assert_eq!(p.death_timer, DEATH_DELAY);
        assert_eq!(p.vx, 0.0);
        let timer = p.death_timer;
        assert!(!p.kill());
        assert_eq!(p.death_timer, timer);
        p.death_timer = 0.0;
        p.is_dead = true;
        assert!(!p.kill());
    }
}
