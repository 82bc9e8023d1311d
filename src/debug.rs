use bevy::gizmos::config::GizmoConfigStore;
use bevy::prelude::*;

use crate::driver::{ActiveSim, HeadlessMode, ViewConfig};
use crate::entity::{Entity as LevelEntity, EntityKind};
use crate::input::InputSnapshot;
use crate::projectile::PROJECTILE_SIZE;

/// F3 overlay: wireframe rects over the live collision state, which is not
/// always what the sprites admit to. Illusion walls and off-phase hazards
/// show up here exactly as the resolver sees them.
#[derive(Resource, Default)]
pub struct DebugOverlayConfig {
    pub show: bool,
}

pub struct DebugPlugin;

#[derive(Component)]
struct DebugOverlayText;

impl Plugin for DebugPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(DebugOverlayConfig::default())
            .add_systems(Startup, setup_debug_overlay_text)
            .add_systems(Update, (toggle_overlay, update_debug_overlay_text))
            .add_systems(
                Update,
                draw_debug_overlay.run_if(resource_exists::<GizmoConfigStore>),
            );
    }
}

fn setup_debug_overlay_text(mut commands: Commands, headless: Res<HeadlessMode>) {
    if headless.0 {
        return;
    }
    commands.spawn((
        Text::new(""),
        TextFont {
            font_size: 13.0,
            ..default()
        },
        TextColor(Color::srgba(0.95, 1.0, 0.98, 0.95)),
        Node {
            position_type: PositionType::Absolute,
            right: Val::Px(8.0),
            top: Val::Px(8.0),
            ..default()
        },
        Visibility::Hidden,
        DebugOverlayText,
    ));
}

fn toggle_overlay(input: Res<InputSnapshot>, mut config: ResMut<DebugOverlayConfig>) {
    if input.debug_edge {
        config.show = !config.show;
        info!(
            "[Snare] debug overlay {}",
            if config.show { "on" } else { "off" }
        );
    }
}

fn update_debug_overlay_text(
    config: Res<DebugOverlayConfig>,
    active: Res<ActiveSim>,
    mut query: Query<(&mut Text, &mut Visibility), With<DebugOverlayText>>,
) {
    let Ok((mut text, mut visibility)) = query.get_single_mut() else {
        return;
    };
    let Some(sim) = active.0.as_ref().filter(|_| config.show) else {
        *visibility = Visibility::Hidden;
        return;
    };
    *visibility = Visibility::Visible;
    text.0 = format!(
        "t: {:.2}\nentities: {}\nshots: {}\nparticles: {}\nplayer: {:.0},{:.0} v {:.0},{:.0}",
        sim.time,
        sim.level.entities.len(),
        sim.projectiles.len(),
        sim.effects.particles.len(),
        sim.player.x,
        sim.player.y,
        sim.player.vx,
        sim.player.vy,
    );
}

/// Lethal beats solid: a crusher is both, and red is the more useful answer.
fn overlay_color(ent: &LevelEntity) -> Color {
    let lethal = match ent.kind {
        EntityKind::Spike
        | EntityKind::FakeDoor
        | EntityKind::FallingSpike { .. }
        | EntityKind::Crusher { .. }
        | EntityKind::FallingBlock { .. }
        | EntityKind::Pendulum { .. }
        | EntityKind::Spinner { .. }
        | EntityKind::RotatingSaw { .. }
        | EntityKind::DoomWall { .. }
        | EntityKind::Roamer { .. }
        | EntityKind::Chaser { .. }
        | EntityKind::Guard { .. } => true,
        EntityKind::RhythmSpike { on, .. }
        | EntityKind::ElectricField { on, .. }
        | EntityKind::LaserBeam { on, .. } => on,
        _ => false,
    };
    if lethal {
        Color::srgba(1.0, 0.2, 0.15, 0.9)
    } else if ent.is_solid() {
        Color::srgba(0.15, 1.0, 0.2, 0.9)
    } else {
        Color::srgba(0.25, 0.55, 1.0, 0.85)
    }
}

fn draw_debug_overlay(
    config: Res<DebugOverlayConfig>,
    active: Res<ActiveSim>,
    view: Res<ViewConfig>,
    mut gizmos: Gizmos,
) {
    if !config.show {
        return;
    }
    let Some(sim) = active.0.as_ref() else {
        return;
    };

    for ent in &sim.level.entities {
        if !ent.active || matches!(ent.kind, EntityKind::Text { .. }) {
            continue;
        }
        gizmos.rect_2d(
            Vec2::new(ent.rect.center_x(), -ent.rect.center_y()),
            Vec2::new(ent.rect.w, ent.rect.h),
            overlay_color(ent),
        );
    }

    let p = &sim.player;
    gizmos.rect_2d(
        Vec2::new(p.x + p.w / 2.0, -(p.y + p.h / 2.0)),
        Vec2::new(p.w, p.h),
        Color::srgba(1.0, 0.9, 0.1, 0.95),
    );

    for shot in &sim.projectiles {
        gizmos.rect_2d(
            Vec2::new(
                shot.x + PROJECTILE_SIZE / 2.0,
                -(shot.y + PROJECTILE_SIZE / 2.0),
            ),
            Vec2::splat(PROJECTILE_SIZE),
            Color::srgba(1.0, 0.5, 0.1, 0.9),
        );
    }

    // Cross on the camera's view center, ahead of the player while moving.
    let cam = &sim.effects.camera;
    let center = Vec2::new(cam.x + view.width / 2.0, -(cam.y + view.height / 2.0));
    gizmos.line_2d(
        center - Vec2::new(12.0, 0.0),
        center + Vec2::new(12.0, 0.0),
        Color::srgba(0.0, 0.95, 1.0, 0.9),
    );
    gizmos.line_2d(
        center - Vec2::new(0.0, 12.0),
        center + Vec2::new(0.0, 12.0),
        Color::srgba(0.0, 0.95, 1.0, 0.9),
    );
}
