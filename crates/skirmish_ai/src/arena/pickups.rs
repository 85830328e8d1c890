//! Pickups: claim goal items / resources, респавн забранных

use bevy::prelude::*;

use super::{PickupClaimed, PickupKind};
use crate::components::{Actor, Claimed, GoalItem, HeldAction, Health, ResourcePickup};

/// Радиус подбора (m, горизонталь + небольшой допуск по высоте)
pub const CLAIM_RADIUS: f32 = 1.2;
const CLAIM_HEIGHT: f32 = 1.5;

pub const GOAL_ITEM_RESPAWN: f32 = 10.0;
pub const RESOURCE_RESPAWN: f32 = 8.0;

struct Claimant {
    entity: Entity,
    position: Vec3,
    can_equip: bool,
}

/// Ближайший живой актор в радиусе подбора (tie → меньший Entity)
fn nearest_claimant<'a>(
    claimants: &'a [Claimant],
    pickup: Vec3,
    eligible: impl Fn(&Claimant) -> bool,
) -> Option<&'a Claimant> {
    claimants
        .iter()
        .filter(|c| eligible(c))
        .filter(|c| (c.position.y - pickup.y).abs() <= CLAIM_HEIGHT)
        .map(|c| (c, Vec2::new(c.position.x - pickup.x, c.position.z - pickup.z).length()))
        .filter(|(_, distance)| *distance <= CLAIM_RADIUS)
        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.entity.cmp(&b.0.entity)))
        .map(|(c, _)| c)
}

/// Система: подбор pickup'ов (каждый pickup — максимум один claimant за тик)
pub fn claim_pickups(
    mut commands: Commands,
    mut actors: Query<(Entity, &Transform, &mut Health, Option<&mut HeldAction>), With<Actor>>,
    goal_items: Query<(Entity, &Transform, &GoalItem), Without<Claimed>>,
    resources: Query<(Entity, &Transform, &ResourcePickup), Without<Claimed>>,
    mut claimed: EventWriter<PickupClaimed>,
) {
    let mut claimants: Vec<Claimant> = actors
        .iter()
        .filter(|(_, _, health, _)| health.is_alive())
        .map(|(entity, transform, _, held)| Claimant {
            entity,
            position: transform.translation,
            can_equip: held.map(|h| h.is_empty()).unwrap_or(false),
        })
        .collect();
    claimants.sort_by_key(|c| c.entity);

    let mut items: Vec<_> = goal_items.iter().collect();
    items.sort_by_key(|(entity, _, _)| *entity);

    for (item, transform, goal) in items {
        let winner = nearest_claimant(&claimants, transform.translation, |c| c.can_equip);
        let Some(winner) = winner else {
            continue;
        };
        let winner = winner.entity;
        if let Ok((_, _, _, Some(mut held))) = actors.get_mut(winner) {
            held.equip(goal.action.clone());
        }
        if let Some(c) = claimants.iter_mut().find(|c| c.entity == winner) {
            c.can_equip = false;
        }
        commands.entity(item).insert(Claimed {
            respawn_in: GOAL_ITEM_RESPAWN,
        });
        claimed.write(PickupClaimed {
            agent: winner,
            pickup: item,
            kind: PickupKind::GoalItem(goal.action.kind),
        });
        crate::log(&format!("🎁 {} picked up {}", winner, goal.action.kind.as_str()));
    }

    let mut pickups: Vec<_> = resources.iter().collect();
    pickups.sort_by_key(|(entity, _, _)| *entity);

    for (pickup, transform, resource) in pickups {
        let Some(winner) = nearest_claimant(&claimants, transform.translation, |_| true) else {
            continue;
        };
        let winner = winner.entity;
        if let Ok((_, _, mut health, _)) = actors.get_mut(winner) {
            health.heal(resource.heal);
        }
        commands.entity(pickup).insert(Claimed {
            respawn_in: RESOURCE_RESPAWN,
        });
        claimed.write(PickupClaimed {
            agent: winner,
            pickup,
            kind: PickupKind::Resource { heal: resource.heal },
        });
        crate::log(&format!("💊 {} healed +{}", winner, resource.heal));
    }
}

/// Система: отсчёт Claimed → pickup снова доступен
pub fn respawn_claimed_pickups(
    mut commands: Commands,
    mut claimed: Query<(Entity, &mut Claimed)>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();
    for (entity, mut claim) in claimed.iter_mut() {
        claim.respawn_in -= delta;
        if claim.respawn_in <= 0.0 {
            commands.entity(entity).remove::<Claimed>();
        }
    }
}
