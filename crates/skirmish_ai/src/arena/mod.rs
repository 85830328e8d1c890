//! Headless arena collaborator
//!
//! Всё, что контроллер бота только запрашивает, а не делает сам:
//! - geometry: WorldProbe (ground/ray/LOS) поверх solid боксов
//! - pickups: claim goal items / resources, респавн pickup'ов
//! - actions: резолв ActionTriggered → DamageDealt
//! - aids: boost pads / rails / teleporters, kill plane
//! - spawn / demo: helpers для сборки арены и ботов

use bevy::prelude::*;

pub mod actions;
pub mod aids;
pub mod demo;
pub mod geometry;
pub mod pickups;
pub mod spawn;

pub use geometry::{ArenaGeometry, Block};
pub use spawn::{spawn_aid, spawn_bot, spawn_goal_item, spawn_resource, spawn_spawn_point};

use crate::ai::navigation::WorldProbes;
use crate::ai::BotSystems;
use crate::components::{ActionKind, AidKind};
use crate::physics::PhysicsSystems;

/// Ниже этой высоты актор погибает
pub const KILL_PLANE_Y: f32 = -20.0;

/// Системы арены (после AI и физики)
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArenaSystems;

/// Урон нанесён
#[derive(Event, Debug, Clone)]
pub struct DamageDealt {
    pub attacker: Entity,
    pub target: Entity,
    pub amount: u32,
    pub kind: ActionKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PickupKind {
    GoalItem(ActionKind),
    Resource { heal: u32 },
}

/// Pickup забран актором
#[derive(Event, Debug, Clone)]
pub struct PickupClaimed {
    pub agent: Entity,
    pub pickup: Entity,
    pub kind: PickupKind,
}

/// Актор активировал traversal aid
///
/// `launch` применяет физика (headless или Rapier bridge) на следующем тике.
#[derive(Event, Debug, Clone)]
pub struct TraversalUsed {
    pub agent: Entity,
    pub aid: Entity,
    pub kind: AidKind,
    pub launch: Option<Vec3>,
}

/// Arena Plugin: геометрия + правила арены
#[derive(Default)]
pub struct ArenaPlugin {
    pub geometry: ArenaGeometry,
}

impl ArenaPlugin {
    pub fn new(geometry: ArenaGeometry) -> Self {
        Self { geometry }
    }
}

impl Plugin for ArenaPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(WorldProbes::new(self.geometry.clone()))
            .add_event::<DamageDealt>()
            .add_event::<PickupClaimed>()
            .add_event::<TraversalUsed>()
            .add_systems(
                FixedUpdate,
                (
                    actions::resolve_triggered_actions,
                    pickups::claim_pickups,
                    pickups::respawn_claimed_pickups,
                    aids::activate_traversal_aids,
                    aids::tick_traversal_cooldowns,
                    aids::apply_kill_plane,
                )
                    .chain()
                    .in_set(ArenaSystems)
                    .after(BotSystems)
                    .after(PhysicsSystems),
            );
    }
}
