//! FSM systems: timers, perception refresh, transition evaluation.

use bevy::prelude::*;

use crate::ai::components::{BotState, BotTimers, PersonalityProfile};
use crate::ai::events::StateTransition;
use crate::ai::navigation::{WorldProbe, WorldProbes};
use crate::ai::perception::{PerceptionCache, PerceptionCategory, SpatialRegistry, WorldRegistry};
use crate::ai::targeting::EnemyCandidate;
use crate::ai::transitions::{evaluate_transition, ObjectSighting, TransitionContext};
use crate::ai::traversal::{AidSighting, TraversalStrategy};
use crate::components::{BotAgent, HeldAction, Health, TraversalCooldown};
use crate::config::BotTuning;
use crate::DeterministicRng;

/// Что бот "видит" в этот tick: только live записи из кэша
pub struct Senses {
    pub enemies: Vec<EnemyCandidate>,
    pub goal_items: Vec<ObjectSighting>,
    pub resources: Vec<ObjectSighting>,
    pub aids: Vec<AidSighting>,
}

/// Перепроверка кэша + факты (distance, LOS) для правил
pub fn gather_senses(
    cache: &PerceptionCache,
    registry: &SpatialRegistry,
    probe: &dyn WorldProbe,
    position: Vec3,
    eye_height: f32,
) -> Senses {
    let eye = position + Vec3::Y * eye_height;

    let enemies = cache
        .live_entries(PerceptionCategory::Opponents, registry)
        .filter_map(|(entity, _)| {
            let actor = registry.actor(entity)?;
            Some(EnemyCandidate {
                entity,
                position: actor.position,
                velocity: actor.velocity,
                distance: position.distance(actor.position),
                health: actor.health,
                line_of_sight: probe.has_line_of_sight(eye, actor.position + Vec3::Y * eye_height),
            })
        })
        .collect();

    let sight = |category: PerceptionCategory| -> Vec<ObjectSighting> {
        cache
            .live_entries(category, registry)
            .map(|(entity, object)| ObjectSighting {
                entity,
                position: object,
                distance: position.distance(object),
                visible: probe.has_line_of_sight(eye, object + Vec3::Y * 0.5),
            })
            .collect()
    };
    let goal_items = sight(PerceptionCategory::GoalItems);
    let resources = sight(PerceptionCategory::Resources);

    let aids = cache
        .live_entries(PerceptionCategory::TraversalAids, registry)
        .filter_map(|(entity, _)| {
            let aid = registry.aid(entity)?;
            Some(AidSighting {
                entity,
                position: aid.position,
                kind: aid.kind,
                exit: aid.exit,
                distance: position.distance(aid.position),
            })
        })
        .collect();

    Senses {
        enemies,
        goal_items,
        resources,
        aids,
    }
}

/// Система: cooldown'ы held action + таймеры поведения
pub fn tick_bot_timers(
    mut held_actions: Query<&mut HeldAction>,
    mut timers: Query<&mut BotTimers>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();
    for mut held in held_actions.iter_mut() {
        held.tick(delta);
    }
    for mut timer in timers.iter_mut() {
        timer.tick(delta);
    }
}

/// Система: throttled refresh PerceptionCache (со своим phase offset на бота)
pub fn refresh_perception(
    mut bots: Query<(Entity, &Transform, &Health, &mut PerceptionCache), With<BotAgent>>,
    registry: SpatialRegistry,
    tuning: Res<BotTuning>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();
    let perception = &tuning.perception;

    for (entity, transform, health, mut cache) in bots.iter_mut() {
        if !health.is_alive() {
            continue;
        }
        if cache.advance(delta) {
            cache.refresh(
                &registry,
                entity,
                transform.translation,
                perception.scan_radius,
                perception.refresh_interval,
            );
        }
    }
}

/// Система: priority rules → новое BotState (+ trace event на смене)
pub fn evaluate_bot_states(
    mut bots: Query<
        (
            Entity,
            &Transform,
            &Health,
            &HeldAction,
            &PersonalityProfile,
            &PerceptionCache,
            &mut BotState,
            &mut BotTimers,
            Has<TraversalCooldown>,
        ),
        With<BotAgent>,
    >,
    registry: SpatialRegistry,
    probes: Res<WorldProbes>,
    traversal: Res<TraversalStrategy>,
    tuning: Res<BotTuning>,
    mut rng: ResMut<DeterministicRng>,
    time: Res<Time<Fixed>>,
    mut transitions: EventWriter<StateTransition>,
) {
    let delta = time.delta_secs();
    let probe = probes.probe();

    for (
        entity,
        transform,
        health,
        held,
        personality,
        cache,
        mut state,
        mut timers,
        traversal_cooldown,
    ) in bots.iter_mut()
    {
        if !health.is_alive() {
            continue;
        }
        let position = transform.translation;
        let senses = gather_senses(cache, &registry, probe, position, tuning.perception.eye_height);

        let ctx = TransitionContext {
            position,
            health: *health,
            action: held.spec(),
            personality,
            current: &state,
            retreat_cooldown: timers.retreat_cooldown,
            enemies: &senses.enemies,
            goal_items: &senses.goal_items,
            resources: &senses.resources,
            aids: &senses.aids,
            traversal_cooldown,
            delta,
        };
        let transition = evaluate_transition(&ctx, &tuning, traversal.get(), probe, &mut rng.rng);

        if transition.retreat_finished {
            timers.retreat_cooldown = tuning.retreat.cooldown;
        }

        let from = state.kind();
        let changed = from != transition.next.kind()
            || state.target_entity() != transition.next.target_entity();
        if changed {
            let event = StateTransition {
                agent: entity,
                from,
                to: transition.next.kind(),
                reason: transition.reason,
                target: transition.next.target(),
            };
            crate::log(&format!("🧠 {}", event));
            transitions.write(event);
            timers.state_elapsed = 0.0;
        }

        *state = transition.next;
    }
}
