//! Rapier bridge: те же MovementIntent / ForcedRelocation / TraversalUsed,
//! но интеграцию делает Rapier (dynamic capsule).
//!
//! Host добавляет `RapierPhysicsPlugin::<NoUserData>::default().in_fixed_schedule()`
//! вместе с `RapierBridgePlugin` вместо `HeadlessPhysicsPlugin`.

use bevy::prelude::*;
use bevy_rapier3d::plugin::PhysicsSet;
use bevy_rapier3d::prelude::*;

use super::PhysicsSystems;
use crate::ai::events::ForcedRelocation;
use crate::ai::BotSystems;
use crate::arena::TraversalUsed;
use crate::components::{flatten, BodyTraits, BodyVelocity, MovementIntent};

/// Капсула бота: радиус из BodyTraits, полувысота цилиндра
const CAPSULE_HALF_HEIGHT: f32 = 0.5;
/// Вертикальная скорость, ниже которой считаем тело стоящим (для прыжка)
const GROUNDED_VERTICAL_SPEED: f32 = 0.1;

/// Marker: тело интегрирует Rapier
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct RapierBody;

/// Навесить Rapier тело на существующего актора
///
/// Позиция актора — ступни, поэтому коллайдер висит на child со сдвигом вверх.
pub fn spawn_rapier_body(commands: &mut Commands, entity: Entity, traits: &BodyTraits) {
    let center = CAPSULE_HALF_HEIGHT + traits.radius;
    commands
        .entity(entity)
        .insert((
            RapierBody,
            RigidBody::Dynamic,
            Velocity::default(),
            ExternalForce::default(),
            ExternalImpulse::default(),
            AdditionalMassProperties::Mass(traits.mass),
            LockedAxes::ROTATION_LOCKED_X | LockedAxes::ROTATION_LOCKED_Z,
        ))
        .with_children(|parent| {
            parent.spawn((
                Transform::from_xyz(0.0, center, 0.0),
                Collider::capsule_y(CAPSULE_HALF_HEIGHT, traits.radius),
            ));
        });
}

/// Система: Rapier velocity → BodyVelocity (до AI)
pub fn pull_rapier_velocity(mut bodies: Query<(&Velocity, &mut BodyVelocity), With<RapierBody>>) {
    for (velocity, mut body) in bodies.iter_mut() {
        body.linear = velocity.linvel;
    }
}

/// Система: MovementIntent → ExternalForce / impulse / angvel
pub fn push_intents_to_rapier(
    mut bodies: Query<
        (
            &MovementIntent,
            &BodyTraits,
            &Transform,
            &mut Velocity,
            &mut ExternalForce,
            &mut ExternalImpulse,
        ),
        With<RapierBody>,
    >,
) {
    for (intent, traits, transform, mut velocity, mut force, mut impulse) in bodies.iter_mut() {
        let mut push = flatten(intent.force).clamp_length_max(traits.max_force);

        // Cap скорости: не разгонять дальше max_speed
        let horizontal = flatten(velocity.linvel);
        if horizontal.length() >= traits.max_speed {
            let along = horizontal.normalize_or_zero();
            push -= along * push.dot(along).max(0.0);
        }
        force.force = push;

        velocity.angvel = Vec3::Y * intent.yaw_rate;

        let standing = velocity.linvel.y.abs() < GROUNDED_VERTICAL_SPEED;
        if intent.jump && standing {
            impulse.impulse += Vec3::Y * traits.jump_speed * traits.mass;
        }
        if intent.mobility && standing {
            let forward = flatten(transform.forward().as_vec3()).normalize_or_zero();
            impulse.impulse += forward * traits.max_speed * traits.mass;
        }
    }
}

/// Система: ForcedRelocation → телепорт Rapier тела
pub fn apply_relocations_to_rapier(
    mut relocations: EventReader<ForcedRelocation>,
    mut bodies: Query<(&mut Transform, &mut Velocity, &mut BodyVelocity), With<RapierBody>>,
) {
    for event in relocations.read() {
        if let Ok((mut transform, mut velocity, mut body)) = bodies.get_mut(event.agent) {
            transform.translation = event.to;
            *velocity = Velocity::zero();
            body.linear = Vec3::ZERO;
        }
    }
}

/// Система: launch от aid → добавить к скорости Rapier тела
pub fn apply_launches_to_rapier(
    mut used: EventReader<TraversalUsed>,
    mut bodies: Query<&mut Velocity, With<RapierBody>>,
) {
    for event in used.read() {
        let Some(launch) = event.launch else {
            continue;
        };
        if let Ok(mut velocity) = bodies.get_mut(event.agent) {
            velocity.linvel = flatten(velocity.linvel) + launch;
        }
    }
}

/// Rapier bridge plugin (альтернатива HeadlessPhysicsPlugin)
pub struct RapierBridgePlugin;

impl Plugin for RapierBridgePlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<RapierBody>()
            .add_systems(FixedUpdate, pull_rapier_velocity.before(BotSystems))
            .add_systems(
                FixedUpdate,
                (apply_relocations_to_rapier, apply_launches_to_rapier, push_intents_to_rapier)
                    .chain()
                    .in_set(PhysicsSystems)
                    .after(BotSystems)
                    .before(PhysicsSet::SyncBackend), // До rapier physics step
            );
    }
}
