//! Bot lifecycle: brain снимается на смерти, новый — на респавне.
//!
//! Между смертью и респавном ничего не переносится, кроме самого entity:
//! personality генерируется заново, таймеры и цели обнуляются.

use bevy::prelude::*;

use crate::ai::components::{BotBrain, BotState};
use crate::ai::events::{ForcedRelocation, RelocationReason};
use crate::ai::stuck::choose_relocation;
use crate::components::{Actor, BotAgent, HeldAction, Health, MovementIntent, SpawnPoint};
use crate::config::BotTuning;
use crate::DeterministicRng;

/// Задержка респавна (секунды)
pub const RESPAWN_DELAY: f32 = 3.0;

/// Бот мёртв и ждёт респавна
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct AwaitingRespawn {
    pub remaining: f32,
}

/// Система: новый бот без brain → свежий brain из детерминированного RNG
///
/// Если brain вставлен при спавне вручную (тесты, фиксированный personality), не трогаем.
pub fn attach_bot_brains(
    mut commands: Commands,
    fresh: Query<(Entity, &Health), (With<BotAgent>, Without<BotState>, Without<AwaitingRespawn>)>,
    tuning: Res<BotTuning>,
    mut rng: ResMut<DeterministicRng>,
) {
    let mut entities: Vec<Entity> = fresh
        .iter()
        .filter(|(_, health)| health.is_alive())
        .map(|(entity, _)| entity)
        .collect();
    // Порядок query не гарантирован — RNG должен расходоваться детерминированно
    entities.sort();

    for entity in entities {
        commands
            .entity(entity)
            .insert(BotBrain::spawn(&mut rng.rng, tuning.perception.refresh_interval));
    }
}

/// Система: health == 0 → снять brain, очистить руки и intent
pub fn handle_bot_deaths(
    mut commands: Commands,
    mut bots: Query<
        (Entity, &Health, &mut HeldAction, &mut MovementIntent),
        (With<BotAgent>, With<BotState>),
    >,
) {
    for (entity, health, mut held, mut intent) in bots.iter_mut() {
        if health.is_alive() {
            continue;
        }
        held.clear();
        intent.clear();
        commands
            .entity(entity)
            .remove::<BotBrain>()
            .insert(AwaitingRespawn {
                remaining: RESPAWN_DELAY,
            });
        crate::log_info(&format!("💀 {} died, respawn in {:.1}s", entity, RESPAWN_DELAY));
    }
}

/// Система: отсчёт респавна → spawn point, полный health, свежий brain
pub fn respawn_bots(
    mut commands: Commands,
    mut waiting: Query<(Entity, &Transform, &mut AwaitingRespawn, &mut Health), With<BotAgent>>,
    spawn_points: Query<&Transform, With<SpawnPoint>>,
    actors: Query<(Entity, &Transform, &Health), (With<Actor>, Without<AwaitingRespawn>)>,
    tuning: Res<BotTuning>,
    mut rng: ResMut<DeterministicRng>,
    time: Res<Time<Fixed>>,
    mut relocations: EventWriter<ForcedRelocation>,
) {
    let delta = time.delta_secs();
    let spawns: Vec<Vec3> = spawn_points.iter().map(|t| t.translation).collect();

    for (entity, transform, mut awaiting, mut health) in waiting.iter_mut() {
        awaiting.remaining -= delta;
        if awaiting.remaining > 0.0 {
            continue;
        }

        let occupied: Vec<Vec3> = actors
            .iter()
            .filter(|(other, _, other_health)| *other != entity && other_health.is_alive())
            .map(|(_, t, _)| t.translation)
            .collect();
        let to = choose_relocation(
            &spawns,
            &occupied,
            transform.translation,
            &tuning.stuck,
            &mut rng.rng,
        );

        health.restore();
        relocations.write(ForcedRelocation {
            agent: entity,
            from: transform.translation,
            to,
            reason: RelocationReason::Respawn,
        });
        commands
            .entity(entity)
            .remove::<AwaitingRespawn>()
            .insert(BotBrain::spawn(&mut rng.rng, tuning.perception.refresh_interval));

        crate::log_info(&format!(
            "✨ {} respawned at ({:.1}, {:.1}, {:.1})",
            entity, to.x, to.y, to.z
        ));
    }
}
