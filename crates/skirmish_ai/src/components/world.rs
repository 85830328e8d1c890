//! Arena objects: pickups, traversal aids, spawn points

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::equipment::ActionSpec;

/// Goal item: подбираемое действие (equippable)
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
#[require(Transform)]
pub struct GoalItem {
    pub action: ActionSpec,
}

/// Resource pickup: лечение
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
#[require(Transform)]
pub struct ResourcePickup {
    pub heal: u32,
}

impl Default for ResourcePickup {
    fn default() -> Self {
        Self { heal: 1 }
    }
}

/// Pickup уже забран; респавнится через `respawn_in` секунд
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Claimed {
    pub respawn_in: f32,
}

/// Вид traversal aid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
pub enum AidKind {
    /// Горизонтальный разгон
    BoostPad,
    /// Подброс вверх на верхний ярус
    JumpRail,
    /// Мгновенный перенос в `exit`
    Teleporter,
}

/// Traversal aid на арене (boost pad, rail, teleporter)
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
#[require(Transform)]
pub struct TraversalAid {
    pub kind: AidKind,
    /// Куда aid доставляет актора (для оценки полезности)
    pub exit: Vec3,
    /// Скорость, сообщаемая актору (boost pad / rail)
    pub launch: Vec3,
    /// Радиус срабатывания (m)
    pub radius: f32,
}

/// Точка респавна/relocation
/// Агент недавно использовал traversal aid (reuse cooldown)
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct TraversalCooldown {
    pub remaining: f32,
}

#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
#[require(Transform)]
pub struct SpawnPoint;
