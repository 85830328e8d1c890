//! Movement system: BotState → destination → steering → MovementIntent.

use bevy::prelude::*;

use crate::ai::combat::{attack_destination, predict_aim_point, CombatState};
use crate::ai::components::{BotState, PersonalityProfile, TargetRef};
use crate::ai::navigation::{compute_steering, NavigationFeedback, SteeringRequest, WorldProbes};
use crate::ai::perception::{PerceptionCategory, SpatialRegistry, WorldRegistry};
use crate::components::{BodyTraits, BodyVelocity, BotAgent, HeldAction, Health, MovementIntent};
use crate::config::BotTuning;
use crate::DeterministicRng;

/// Куда и как двигаться в этом состоянии
#[derive(Debug, Clone, Copy, Default)]
struct MovementGoal {
    destination: Option<Vec3>,
    face_toward: Option<Vec3>,
    speed_scale: f32,
    arrive_radius: f32,
}

/// Позиция объекта с liveness check; пропал — последняя известная
fn resolve(
    registry: &SpatialRegistry,
    category: PerceptionCategory,
    target: &TargetRef,
) -> Option<Vec3> {
    if registry.is_live(category, target.entity) {
        registry.position(target.entity)
    } else {
        None
    }
}

/// Система: steering для каждого живого бота
pub fn steer_bots(
    mut bots: Query<
        (
            Entity,
            &Transform,
            Option<&BodyVelocity>,
            &BodyTraits,
            &Health,
            &PersonalityProfile,
            &BotState,
            &HeldAction,
            &mut CombatState,
            &mut NavigationFeedback,
            &mut MovementIntent,
        ),
        With<BotAgent>,
    >,
    registry: SpatialRegistry,
    probes: Res<WorldProbes>,
    tuning: Res<BotTuning>,
    mut rng: ResMut<DeterministicRng>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();
    let probe = probes.probe();
    let nav = &tuning.navigation;
    let neighbor_radius_sq = (nav.separation_radius * 1.5).powi(2);

    for (
        entity,
        transform,
        velocity,
        traits,
        health,
        personality,
        state,
        held,
        mut combat,
        mut feedback,
        mut intent,
    ) in bots.iter_mut()
    {
        if !health.is_alive() {
            intent.clear();
            continue;
        }

        let position = transform.translation;
        let velocity = velocity.map(|v| v.linear).unwrap_or(Vec3::ZERO);

        let goal = match state {
            BotState::Explore { destination, .. } => MovementGoal {
                destination: *destination,
                face_toward: None,
                speed_scale: 0.6,
                arrive_radius: tuning.explore.arrive_radius,
            },
            BotState::Retreat { destination, via, .. } => {
                let aid = via.and_then(|aid| {
                    registry
                        .is_live(PerceptionCategory::TraversalAids, aid)
                        .then(|| registry.position(aid))
                        .flatten()
                });
                MovementGoal {
                    destination: Some(aid.unwrap_or(*destination)),
                    face_toward: None,
                    speed_scale: 1.0,
                    arrive_radius: if aid.is_some() { 0.2 } else { tuning.explore.arrive_radius },
                }
            }
            BotState::CollectGoalItem { item } => MovementGoal {
                destination: Some(
                    resolve(&registry, PerceptionCategory::GoalItems, item)
                        .unwrap_or(item.last_known),
                ),
                face_toward: None,
                speed_scale: 0.9,
                arrive_radius: 0.3,
            },
            BotState::CollectResource { item } => MovementGoal {
                destination: Some(
                    resolve(&registry, PerceptionCategory::Resources, item)
                        .unwrap_or(item.last_known),
                ),
                face_toward: None,
                speed_scale: 0.8,
                arrive_radius: 0.3,
            },
            BotState::Attack { target } => {
                let actor = registry
                    .is_live(PerceptionCategory::Opponents, target.entity)
                    .then(|| registry.actor(target.entity))
                    .flatten();
                let target_position = actor.map(|a| a.position).unwrap_or(target.last_known);
                let target_velocity = actor.map(|a| a.velocity).unwrap_or(Vec3::ZERO);

                let strafe = combat.update_strafe(delta, personality, &tuning.combat, &mut rng.rng);
                let (optimal, aim) = match held.spec() {
                    Some(spec) => (
                        spec.optimal_range,
                        predict_aim_point(
                            position,
                            target_position,
                            target_velocity,
                            spec,
                            personality,
                            &tuning.combat,
                        ),
                    ),
                    None => (tuning.ranges.engage * 0.5, target_position),
                };
                MovementGoal {
                    destination: Some(attack_destination(
                        position,
                        target_position,
                        optimal,
                        strafe,
                        tuning.combat.strafe_offset,
                    )),
                    face_toward: Some(aim),
                    speed_scale: 0.7,
                    arrive_radius: 0.5,
                }
            }
            BotState::Chase { target, via } => {
                let target_position = resolve(&registry, PerceptionCategory::Opponents, target)
                    .unwrap_or(target.last_known);
                let aid = via.and_then(|aid| {
                    registry
                        .is_live(PerceptionCategory::TraversalAids, aid)
                        .then(|| registry.position(aid))
                        .flatten()
                });
                MovementGoal {
                    destination: Some(aid.unwrap_or(target_position)),
                    face_toward: if aid.is_some() { None } else { Some(target_position) },
                    speed_scale: 1.0,
                    arrive_radius: if aid.is_some() { 0.2 } else { 0.5 },
                }
            }
            BotState::UseTraversal { aid } => MovementGoal {
                destination: Some(
                    resolve(&registry, PerceptionCategory::TraversalAids, aid)
                        .unwrap_or(aid.last_known),
                ),
                face_toward: None,
                speed_scale: 1.0,
                arrive_radius: 0.2,
            },
        };

        let neighbors: Vec<Vec3> = registry
            .living_actor_positions(entity)
            .into_iter()
            .map(|(_, other)| other)
            .filter(|other| other.distance_squared(position) <= neighbor_radius_sq)
            .collect();

        let request = SteeringRequest {
            position,
            forward: transform.forward().as_vec3(),
            velocity,
            destination: goal.destination,
            face_toward: goal.face_toward,
            speed_scale: goal.speed_scale,
            arrive_radius: goal.arrive_radius,
            neighbors: &neighbors,
        };
        let steering = compute_steering(&request, traits, personality, nav, probe);

        *feedback = NavigationFeedback {
            overhead_blocked: steering.overhead_blocked,
            edge_ahead: steering.edge_ahead,
        };
        *intent = steering.intent;
    }
}
