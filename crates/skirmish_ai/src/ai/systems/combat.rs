//! Combat system: Attack/Chase → CombatController → held action calls.

use bevy::prelude::*;

use crate::ai::combat::{decide_combat, CombatCommand, CombatInput, CombatState};
use crate::ai::components::{BotState, PersonalityProfile};
use crate::ai::events::{ActionTriggered, ChargeStarted};
use crate::ai::navigation::WorldProbes;
use crate::ai::perception::{PerceptionCategory, SpatialRegistry, WorldRegistry};
use crate::components::{BotAgent, HeldAction, Health};
use crate::config::BotTuning;
use crate::DeterministicRng;

/// Система: решение по held action для ботов в бою
pub fn drive_bot_combat(
    mut bots: Query<
        (
            Entity,
            &Transform,
            &Health,
            &PersonalityProfile,
            &BotState,
            &mut HeldAction,
            &mut CombatState,
        ),
        With<BotAgent>,
    >,
    registry: SpatialRegistry,
    probes: Res<WorldProbes>,
    tuning: Res<BotTuning>,
    mut rng: ResMut<DeterministicRng>,
    time: Res<Time<Fixed>>,
    mut triggered: EventWriter<ActionTriggered>,
    mut charges: EventWriter<ChargeStarted>,
) {
    let delta = time.delta_secs();
    let probe = probes.probe();
    let eye_height = tuning.perception.eye_height;

    for (entity, transform, health, personality, state, mut held, mut combat) in bots.iter_mut() {
        if !health.is_alive() || held.is_empty() {
            continue;
        }

        // Вне боя заряд не держим
        let Some(target) = state.hostile_target() else {
            if held.charge_elapsed().is_some() {
                held.cancel_charge();
            }
            continue;
        };

        // Liveness check прямо перед использованием позиции цели
        let actor = registry
            .is_live(PerceptionCategory::Opponents, target.entity)
            .then(|| registry.actor(target.entity))
            .flatten();
        let Some(actor) = actor else {
            if held.charge_elapsed().is_some() {
                held.cancel_charge();
            }
            continue;
        };

        let position = transform.translation;
        let eye = position + Vec3::Y * eye_height;
        let line_of_sight = probe.has_line_of_sight(eye, actor.position + Vec3::Y * eye_height);

        let input = CombatInput {
            position,
            forward: transform.forward().as_vec3(),
            held: &held,
            target_position: actor.position,
            target_velocity: actor.velocity,
            line_of_sight,
            personality,
        };
        let decision = decide_combat(&input, &mut combat, delta, &tuning, &mut rng.rng);

        match decision.command {
            CombatCommand::BeginCharge(window) => {
                held.begin_charge(window);
                if let Some(spec) = held.spec() {
                    crate::log(&format!(
                        "⚡ {} charging {} (max {:.2}s)",
                        entity,
                        spec.kind.as_str(),
                        window.max_duration()
                    ));
                    charges.write(ChargeStarted {
                        agent: entity,
                        kind: spec.kind,
                        max_duration: window.max_duration(),
                    });
                }
            }
            CombatCommand::Trigger => {
                if let Some(action) = held.trigger() {
                    crate::log(&format!(
                        "🔫 {} fired {} at {} (charge {:.2})",
                        entity,
                        action.spec.kind.as_str(),
                        target.entity,
                        action.charge
                    ));
                    if action.depleted {
                        crate::log(&format!("{} action depleted", entity));
                    }
                    triggered.write(ActionTriggered {
                        agent: entity,
                        target: Some(target.entity),
                        origin: eye,
                        aim_point: decision.aim_point + Vec3::Y * eye_height,
                        action,
                    });
                }
            }
            CombatCommand::CancelCharge => held.cancel_charge(),
            CombatCommand::ContinueCharge | CombatCommand::Hold => {}
        }
    }
}
