use bevy::prelude::Resource;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::behavior;
use crate::collision;
use crate::effects::{EffectsState, ParticleHue};
use crate::level::{LevelData, LevelSnapshot};
use crate::player::PlayerState;
use crate::projectile::{self, Projectile};

/// One simulation step of wall time. The driver drains whole ticks from an
/// accumulator, so every run of the engine sees the same step sequence
/// regardless of refresh rate.
pub const TICK: f32 = 1.0 / 120.0;
pub const TILE: f32 = 40.0;
pub const GRAVITY: f32 = 2400.0;
pub const TERMINAL_VELOCITY: f32 = 1200.0;
/// Falling this far below the level's bottom edge is fatal.
pub const FALL_MARGIN: f32 = 200.0;
/// Pause between the death landing and the shell hearing about it.
pub const DEATH_NOTIFY_DELAY: f32 = 0.8;

/// Currently-held intent, sampled once per tick. `dash` is decoded from
/// bindings but nothing consumes it yet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputState {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub dash: bool,
}

/// Discrete facts produced by a tick, drained by the shell for audio,
/// the event bus, and phase changes. `DeathNotified` and `Won` fire at
/// most once per attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimEvent {
    Jumped,
    KeyCollected,
    ButtonPressed,
    SpringBounced,
    Crumbled,
    Shot,
    Died,
    DeathNotified,
    Won,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimStatus {
    Playing,
    Won,
    Dead,
}

/// The whole live world of one level attempt. Owns the snapshot, the
/// player, projectiles, effects, and the attempt's RNG; everything here is
/// rebuilt from the template on restart.
#[derive(Resource)]
pub struct Simulation {
    template: LevelData,
    pub level: LevelSnapshot,
    pub player: PlayerState,
    pub projectiles: Vec<Projectile>,
    pub effects: EffectsState,
    pub status: SimStatus,
    /// Elapsed simulated seconds. Frozen while the death sequence runs.
    pub time: f32,
    pub time_left: Option<f32>,
    pub reduced_motion: bool,
    events: Vec<SimEvent>,
    view_w: f32,
    view_h: f32,
    notify_timer: f32,
    next_id: u32,
    rng: SmallRng,
}

impl Simulation {
    pub fn new(template: LevelData, view_w: f32, view_h: f32) -> Self {
        let level = LevelSnapshot::from_data(&template);
        let player = PlayerState::at_spawn(level.spawn_x, level.spawn_y);
        let next_id = level.entities.len() as u32;
        let rng = SmallRng::seed_from_u64(u64::from(level.id));
        let time_left = level.time_limit;
        Self {
            template,
            level,
            player,
            projectiles: Vec::new(),
            effects: EffectsState::default(),
            status: SimStatus::Playing,
            time: 0.0,
            time_left,
            reduced_motion: false,
            events: Vec::new(),
            view_w,
            view_h,
            notify_timer: 0.0,
            next_id,
            rng,
        }
    }

    /// Fresh attempt at the same level. Settings survive; nothing from the
    /// previous attempt does.
    pub fn restart(&mut self) {
        let mut fresh = Simulation::new(self.template.clone(), self.view_w, self.view_h);
        fresh.reduced_motion = self.reduced_motion;
        *self = fresh;
    }

    pub fn set_view(&mut self, w: f32, h: f32) {
        self.view_w = w;
        self.view_h = h;
    }

    pub fn take_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    /// Advances the world by exactly one tick. Effects always advance, even
    /// while the death sequence holds the rest of the world still.
    pub fn step(&mut self, input: &InputState) {
        self.step_world(input);
        self.effects.advance_particles(TICK);
        self.effects.camera.follow(
            &self.player,
            self.view_w,
            self.view_h,
            self.level.width,
            self.level.height,
        );
    }

    fn step_world(&mut self, input: &InputState) {
        if self.status != SimStatus::Playing {
            return;
        }

        if self.player.death_timer > 0.0 {
            self.player.death_timer -= TICK;
            if self.player.death_timer <= 0.0 {
                self.player.is_dead = true;
                self.events.push(SimEvent::Died);
                if !self.reduced_motion {
                    self.effects.camera.shake = 15.0;
                }
                self.effects.burst_with_speed(
                    &mut self.rng,
                    self.player.center_x(),
                    self.player.center_y(),
                    ParticleHue::Blood,
                    30,
                    600.0,
                );
                self.notify_timer = DEATH_NOTIFY_DELAY;
            }
            return;
        }
        if self.player.is_dead {
            self.notify_timer -= TICK;
            if self.notify_timer <= 0.0 {
                self.events.push(SimEvent::DeathNotified);
                self.status = SimStatus::Dead;
            }
            return;
        }

        self.time += TICK;
        if let Some(left) = self.time_left.as_mut() {
            *left -= TICK;
            if *left <= 0.0 {
                *left = 0.0;
                // The clock kill starts the sequence; this tick still runs.
                self.player.kill();
            }
        }

        let jumped = self
            .player
            .apply_controls(input, self.time, TICK, &mut self.rng);
        if jumped {
            self.events.push(SimEvent::Jumped);
            self.effects.burst_with_speed(
                &mut self.rng,
                self.player.center_x(),
                self.player.bottom(),
                ParticleHue::Dust,
                4,
                150.0,
            );
        }

        let mut behaved = behavior::update_entities(
            &mut self.level.entities,
            &mut self.player,
            self.time,
            TICK,
            &mut self.effects,
            &mut self.events,
            &mut self.rng,
            &mut self.next_id,
        );

        let swept = collision::sweep_player(&mut self.player, &mut self.level.entities, TICK);
        for &(x, y) in &swept.keys_collected {
            self.events.push(SimEvent::KeyCollected);
            self.effects
                .burst(&mut self.rng, x, y, ParticleHue::Sparkle, 10);
        }

        projectile::update_projectiles(
            &mut self.projectiles,
            &mut self.player,
            &self.level.entities,
            self.level.width,
            self.level.height,
            TICK,
            &mut self.effects,
            &mut self.rng,
        );

        if self.player.y > self.level.height + FALL_MARGIN {
            self.player.kill();
        }

        if swept.won {
            self.status = SimStatus::Won;
            self.events.push(SimEvent::Won);
            self.effects.burst(
                &mut self.rng,
                self.player.x,
                self.player.y,
                ParticleHue::Confetti,
                40,
            );
        }

        // End-of-tick merge: nothing collides against an entity or shot on
        // the tick it was staged.
        self.level.entities.append(&mut behaved.spawned);
        self.projectiles.append(&mut behaved.projectiles);
    }
}
