//! Spawn helpers для арены и ботов

use bevy::prelude::*;

use crate::components::{
    ActionSpec, Actor, AidKind, BotAgent, GoalItem, HeldAction, ResourcePickup, SpawnPoint,
    TraversalAid,
};
use crate::physics::KinematicController;

/// Spawn бота: Actor + BotAgent (+ required movement/equipment), headless kinematic body
///
/// Brain навешивается AI на первом тике (детерминированный RNG).
pub fn spawn_bot(
    commands: &mut Commands,
    position: Vec3,
    team_id: u64,
    action: Option<ActionSpec>,
) -> Entity {
    let held = action.map(HeldAction::equipped).unwrap_or_default();
    commands
        .spawn((
            Transform::from_translation(position),
            Actor::new(team_id),
            BotAgent,
            held,
            KinematicController::default(),
        ))
        .id()
}

pub fn spawn_goal_item(commands: &mut Commands, position: Vec3, action: ActionSpec) -> Entity {
    commands
        .spawn((Transform::from_translation(position), GoalItem { action }))
        .id()
}

pub fn spawn_resource(commands: &mut Commands, position: Vec3, heal: u32) -> Entity {
    commands
        .spawn((Transform::from_translation(position), ResourcePickup { heal }))
        .id()
}

pub fn spawn_spawn_point(commands: &mut Commands, position: Vec3) -> Entity {
    commands
        .spawn((Transform::from_translation(position), SpawnPoint))
        .id()
}

/// Traversal aid. Для телепорта `launch` игнорируется.
pub fn spawn_aid(
    commands: &mut Commands,
    position: Vec3,
    kind: AidKind,
    exit: Vec3,
    launch: Vec3,
) -> Entity {
    commands
        .spawn((
            Transform::from_translation(position),
            TraversalAid {
                kind,
                exit,
                launch,
                radius: 1.0,
            },
        ))
        .id()
}
