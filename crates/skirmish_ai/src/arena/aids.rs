//! Traversal aids (boost pad, jump rail, teleporter) и kill plane

use bevy::prelude::*;

use super::{TraversalUsed, KILL_PLANE_Y};
use crate::ai::events::{ForcedRelocation, RelocationReason};
use crate::components::{Actor, AidKind, Health, TraversalAid, TraversalCooldown};

/// Повторное использование aid тем же актором не раньше чем через (s)
pub const TRAVERSAL_REUSE_COOLDOWN: f32 = 1.5;
const AID_HEIGHT_TOLERANCE: f32 = 1.5;

/// Aid срабатывает, если актор стоит в его радиусе (горизонталь + допуск по высоте)
pub fn within_aid(aid: &TraversalAid, aid_position: Vec3, actor: Vec3) -> bool {
    let horizontal = Vec2::new(actor.x - aid_position.x, actor.z - aid_position.z).length();
    horizontal <= aid.radius && (actor.y - aid_position.y).abs() <= AID_HEIGHT_TOLERANCE
}

/// Система: активация aids → TraversalUsed (+ ForcedRelocation для телепорта)
pub fn activate_traversal_aids(
    mut commands: Commands,
    actors: Query<(Entity, &Transform, &Health), (With<Actor>, Without<TraversalCooldown>)>,
    aids: Query<(Entity, &Transform, &TraversalAid)>,
    mut used: EventWriter<TraversalUsed>,
    mut relocations: EventWriter<ForcedRelocation>,
) {
    let mut aid_list: Vec<_> = aids.iter().collect();
    aid_list.sort_by_key(|(entity, _, _)| *entity);

    let mut riders: Vec<_> = actors.iter().filter(|(_, _, health)| health.is_alive()).collect();
    riders.sort_by_key(|(entity, _, _)| *entity);

    for (agent, transform, _) in riders {
        let position = transform.translation;
        let Some((aid_entity, _, aid)) = aid_list
            .iter()
            .find(|(_, aid_transform, aid)| within_aid(aid, aid_transform.translation, position))
        else {
            continue;
        };

        let launch = match aid.kind {
            AidKind::BoostPad | AidKind::JumpRail => Some(aid.launch),
            AidKind::Teleporter => {
                relocations.write(ForcedRelocation {
                    agent,
                    from: position,
                    to: aid.exit,
                    reason: RelocationReason::Teleport,
                });
                None
            }
        };
        used.write(TraversalUsed {
            agent,
            aid: *aid_entity,
            kind: aid.kind,
            launch,
        });
        commands.entity(agent).insert(TraversalCooldown {
            remaining: TRAVERSAL_REUSE_COOLDOWN,
        });
        crate::log(&format!("🚀 {} used {:?} {}", agent, aid.kind, aid_entity));
    }
}

pub fn tick_traversal_cooldowns(
    mut commands: Commands,
    mut cooldowns: Query<(Entity, &mut TraversalCooldown)>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();
    for (entity, mut cooldown) in cooldowns.iter_mut() {
        cooldown.remaining -= delta;
        if cooldown.remaining <= 0.0 {
            commands.entity(entity).remove::<TraversalCooldown>();
        }
    }
}

/// Система: упал ниже kill plane → health 0 (дальше работает lifecycle)
pub fn apply_kill_plane(mut actors: Query<(Entity, &Transform, &mut Health), With<Actor>>) {
    for (entity, transform, mut health) in actors.iter_mut() {
        if transform.translation.y < KILL_PLANE_Y && health.is_alive() {
            health.current = 0;
            crate::log_info(&format!("🕳️ {} fell off the arena", entity));
        }
    }
}
