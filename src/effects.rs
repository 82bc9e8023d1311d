use rand::rngs::SmallRng;
use rand::Rng;

use crate::player::PlayerState;
use crate::sim::GRAVITY;

/// Default burst speed when an event doesn't specify one.
pub const BURST_SPEED: f32 = 400.0;
const CAMERA_MARGIN: f32 = 100.0;

/// Render color class of a particle; the presentation side maps these to
/// actual colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParticleHue {
    Dust,
    Blood,
    Sparkle,
    Confetti,
    Spark,
    Rubble,
}

#[derive(Clone, Copy, Debug)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// Seconds remaining; spawned at 1.0. Render uses it as alpha.
    pub life: f32,
    pub size: f32,
    pub hue: ParticleHue,
}

/// Camera follow state, advanced once per tick. The shell adds shake jitter
/// at draw time; the magnitude decays here.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraState {
    pub x: f32,
    pub y: f32,
    pub shake: f32,
}

impl CameraState {
    /// Follows the player's center with a velocity lead, clamped to the
    /// level bounds with a fixed margin, converging 10% per tick.
    pub fn follow(
        &mut self,
        player: &PlayerState,
        view_w: f32,
        view_h: f32,
        world_w: f32,
        world_h: f32,
    ) {
        let mut target_x = player.center_x() - view_w / 2.0 + player.vx * 0.3;
        let mut target_y = player.center_y() - view_h / 2.0 + player.vy * 0.1;
        target_x = target_x.clamp(-CAMERA_MARGIN, (world_w - view_w + CAMERA_MARGIN).max(-CAMERA_MARGIN));
        target_y = target_y.clamp(-CAMERA_MARGIN, (world_h - view_h + CAMERA_MARGIN).max(-CAMERA_MARGIN));
        self.x += (target_x - self.x) * 0.1;
        self.y += (target_y - self.y) * 0.1;
        if self.shake > 0.0 {
            self.shake *= 0.9;
        }
    }
}

/// Particle pool plus camera; owned by the simulation, no gameplay effect.
#[derive(Default)]
pub struct EffectsState {
    pub particles: Vec<Particle>,
    pub camera: CameraState,
}

impl EffectsState {
    pub fn reset(&mut self) {
        self.particles.clear();
        self.camera = CameraState::default();
    }

    pub fn burst(&mut self, rng: &mut SmallRng, x: f32, y: f32, hue: ParticleHue, count: usize) {
        self.burst_with_speed(rng, x, y, hue, count, BURST_SPEED);
    }

    pub fn burst_with_speed(
        &mut self,
        rng: &mut SmallRng,
        x: f32,
        y: f32,
        hue: ParticleHue,
        count: usize,
        speed: f32,
    ) {
        for _ in 0..count {
            self.particles.push(Particle {
                x,
                y,
                vx: (rng.gen::<f32>() - 0.5) * speed,
                vy: (rng.gen::<f32>() - 0.5) * speed,
                life: 1.0,
                size: rng.gen::<f32>() * 6.0 + 2.0,
                hue,
            });
        }
    }

    /// One tick of drift: half-gravity pull, geometric shrink, life decay.
    pub fn advance_particles(&mut self, dt: f32) {
        self.particles.retain_mut(|p| {
            p.x += p.vx * dt;
            p.y += p.vy * dt;
            p.vy += GRAVITY * 0.5 * dt;
            p.life -= dt;
            p.size *= 0.95;
            p.life > 0.0
        });
    }
}
