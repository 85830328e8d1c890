//! Stuck recovery system: наблюдает движение, переопределяет intent,
//! в крайнем случае запрашивает forced relocation.

use bevy::prelude::*;

use crate::ai::components::PersonalityProfile;
use crate::ai::events::{ForcedRelocation, RelocationReason};
use crate::ai::navigation::NavigationFeedback;
use crate::ai::stuck::{choose_relocation, MotionSample, RecoveryAction, StuckMonitor};
use crate::components::{
    flatten, Actor, BodyTraits, BodyVelocity, BotAgent, Health, MovementIntent, SpawnPoint,
};
use crate::config::BotTuning;
use crate::DeterministicRng;

/// Система: stuck monitor для каждого бота (после steering, до физики)
pub fn monitor_stuck_bots(
    mut bots: Query<
        (
            Entity,
            &Transform,
            Option<&BodyVelocity>,
            &BodyTraits,
            &Health,
            &PersonalityProfile,
            &NavigationFeedback,
            &mut StuckMonitor,
            &mut MovementIntent,
        ),
        With<BotAgent>,
    >,
    spawn_points: Query<&Transform, With<SpawnPoint>>,
    actors: Query<(Entity, &Transform, &Health), With<Actor>>,
    tuning: Res<BotTuning>,
    mut rng: ResMut<DeterministicRng>,
    time: Res<Time<Fixed>>,
    mut relocations: EventWriter<ForcedRelocation>,
) {
    let delta = time.delta_secs();

    for (
        entity,
        transform,
        velocity,
        traits,
        health,
        personality,
        feedback,
        mut monitor,
        mut intent,
    ) in bots.iter_mut()
    {
        if !health.is_alive() {
            continue;
        }

        let sample = MotionSample {
            position: transform.translation,
            speed: velocity.map(|v| v.horizontal_speed()).unwrap_or(0.0),
            intends_to_move: intent.is_moving(),
            beneath_overhead: feedback.overhead_blocked,
        };
        let was_stuck = monitor.is_stuck();
        let issued = monitor.observe(sample, delta, &tuning.stuck, &mut rng.rng);

        if !was_stuck && monitor.is_stuck() {
            crate::log(&format!(
                "🧱 {} stuck at ({:.1}, {:.1}, {:.1}), escalating recovery",
                entity, transform.translation.x, transform.translation.y, transform.translation.z
            ));
        }

        if issued == Some(RecoveryAction::Relocate) {
            let spawns: Vec<Vec3> = spawn_points.iter().map(|t| t.translation).collect();
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

            crate::log_info(&format!(
                "🌀 {} forced relocation after {:.1}s stuck → ({:.1}, {:.1}, {:.1})",
                entity,
                monitor.stuck_elapsed(),
                to.x,
                to.y,
                to.z
            ));
            relocations.write(ForcedRelocation {
                agent: entity,
                from: transform.translation,
                to,
                reason: RelocationReason::Stuck,
            });
            monitor.complete_relocation();
            intent.clear();
            continue;
        }

        let Some(maneuver) = monitor.active_maneuver() else {
            continue;
        };
        let newly_issued = issued.is_some();
        let forward = flatten(transform.forward().as_vec3()).normalize_or(Vec3::NEG_Z);

        match maneuver {
            RecoveryAction::ReverseBoost => {
                let base = if intent.is_moving() {
                    intent.force.normalize_or_zero()
                } else {
                    forward
                };
                intent.force = -base * traits.max_force * tuning.stuck.reverse_boost;
            }
            RecoveryAction::Jump => intent.jump = newly_issued,
            RecoveryAction::Mobility => intent.mobility = newly_issued,
            RecoveryAction::Torque { sign } => {
                let right = forward.cross(Vec3::Y);
                intent.yaw_rate = sign * tuning.navigation.turn_rate * personality.turn_rate();
                intent.force += right * sign * traits.max_force * 0.5;
            }
            RecoveryAction::Relocate => {}
        }
    }
}
