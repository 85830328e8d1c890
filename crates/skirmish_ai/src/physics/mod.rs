//! Physics collaborator
//!
//! AI пишет MovementIntent и ForcedRelocation; позицию двигает только физика.
//! Два backend'а с одинаковым контрактом:
//! - HeadlessPhysicsPlugin: собственный kinematic integrator (тесты, headless матчи)
//! - RapierBridgePlugin: интеграция через bevy_rapier3d

use bevy::prelude::*;

pub mod movement;
pub mod rapier;

pub use movement::{step_body, KinematicController, STEP_HEIGHT};
pub use rapier::{spawn_rapier_body, RapierBody, RapierBridgePlugin};

use crate::ai::BotSystems;

/// Системы физики (после AI, до арены)
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhysicsSystems;

/// Headless physics plugin
///
/// Порядок: relocations → launches → integrate (после BotSystems).
pub struct HeadlessPhysicsPlugin;

impl Plugin for HeadlessPhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<KinematicController>().add_systems(
            FixedUpdate,
            (
                movement::apply_relocations,
                movement::apply_aid_launches,
                movement::integrate_bodies,
            )
                .chain()
                .in_set(PhysicsSystems)
                .after(BotSystems),
        );
    }
}
