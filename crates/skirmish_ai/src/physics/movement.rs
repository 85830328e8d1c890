//! Headless kinematic integrator
//!
//! Интегрирует MovementIntent → BodyVelocity → Transform без Rapier:
//! - сила/масса, трение на земле, cap скорости
//! - gravity + jump + dash (mobility)
//! - скольжение вдоль стен, подъём на низкие ступени, snap к полу
//! - yaw_rate → поворот
//!
//! Геометрию спрашиваем через WorldProbe (тот же, что видит AI).
//! Детерминизм: fixed timestep 60Hz, без случайности.

use bevy::prelude::*;

use crate::ai::events::ForcedRelocation;
use crate::ai::navigation::{WorldProbe, WorldProbes};
use super::rapier::RapierBody;
use crate::arena::TraversalUsed;
use crate::components::{flatten, BodyTraits, BodyVelocity, Health, MovementIntent};

/// Высота ступени, на которую тело заходит без прыжка (m)
pub const STEP_HEIGHT: f32 = 0.35;
/// Snap к полу при спуске (m)
const GROUND_SNAP: f32 = 0.3;
/// Трение на земле / в воздухе (1/s)
const GROUND_DRAG: f32 = 4.0;
const AIR_DRAG: f32 = 0.2;
/// Множитель max_speed для dash
const DASH_SPEED_MULTIPLIER: f32 = 1.5;
/// Высота головы для проверки потолка (m)
const HEAD_HEIGHT: f32 = 1.8;

/// Kinematic контроллер компонент
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct KinematicController {
    /// Сила гравитации (m/s²)
    pub gravity: f32,
    /// На земле ли тело
    pub grounded: bool,
}

impl Default for KinematicController {
    fn default() -> Self {
        Self {
            gravity: -9.81, // Earth gravity
            grounded: false,
        }
    }
}

/// Один шаг интеграции тела (чистая функция, удобно тестировать)
pub fn step_body(
    position: Vec3,
    velocity: Vec3,
    forward: Vec3,
    intent: &MovementIntent,
    traits: &BodyTraits,
    controller: &mut KinematicController,
    probe: &dyn WorldProbe,
    delta: f32,
) -> (Vec3, Vec3) {
    let mut horizontal = flatten(velocity);
    let mut vertical = velocity.y;

    // Сила → ускорение (сила ограничена max_force)
    let force = flatten(intent.force).clamp_length_max(traits.max_force);
    horizontal += force / traits.mass.max(1e-3) * delta;

    let drag = if controller.grounded { GROUND_DRAG } else { AIR_DRAG };
    horizontal *= (1.0 - drag * delta).max(0.0);

    if controller.grounded {
        // Cap только на земле: boost pad разгоняет выше max_speed в полёте
        horizontal = horizontal.clamp_length_max(traits.max_speed);

        if intent.mobility {
            let dash =
                flatten(forward).normalize_or_zero() * traits.max_speed * DASH_SPEED_MULTIPLIER;
            horizontal = horizontal.clamp_length_max(traits.max_speed) + dash;
        }
        if intent.jump {
            vertical = traits.jump_speed;
            controller.grounded = false;
        }
    }

    if !controller.grounded {
        vertical += controller.gravity * delta;
    }

    // Горизонталь: ray на высоте ступени, при ударе — скольжение вдоль стены
    let mut next = position;
    let step_origin = position + Vec3::Y * (STEP_HEIGHT + 0.05);
    let mut motion = horizontal * delta;
    for _ in 0..2 {
        let length = motion.length();
        if length <= 1e-6 {
            break;
        }
        let direction = motion / length;
        let reach = length + traits.radius;
        match probe.cast_ray(step_origin + (next - position), direction, reach) {
            Some(hit) => {
                let normal = flatten(hit.normal).normalize_or_zero();
                let allowed = (hit.distance - traits.radius).max(0.0);
                next += direction * allowed;
                let remaining = motion - direction * allowed;
                motion = remaining - normal * remaining.dot(normal);
                horizontal -= normal * horizontal.dot(normal).min(0.0);
            }
            None => {
                next += motion;
                motion = Vec3::ZERO;
            }
        }
    }

    // Потолок
    if vertical > 0.0 {
        let head = next + Vec3::Y * HEAD_HEIGHT;
        if probe.cast_ray(head, Vec3::Y, vertical * delta).is_some() {
            vertical = 0.0;
        }
    }

    next.y += vertical * delta;

    // Земля: ищем поверхность от (старая высота + ступень) вниз
    let top = position.y.max(next.y) + STEP_HEIGHT;
    let fall = (-vertical * delta).max(0.0);
    let reach = STEP_HEIGHT + GROUND_SNAP + fall + 0.05;
    let ground = probe.ground_below(Vec3::new(next.x, top, next.z), reach);
    let was_grounded = controller.grounded;
    controller.grounded = false;
    if let Some(height) = ground {
        let snaps = was_grounded && next.y - height <= GROUND_SNAP;
        if vertical <= 0.0 && (next.y <= height || snaps) {
            next.y = height;
            vertical = 0.0;
            controller.grounded = true;
        }
    }

    (next, Vec3::new(horizontal.x, vertical, horizontal.z))
}

/// Система: применить ForcedRelocation (stuck fallback, respawn, teleporter)
pub fn apply_relocations(
    mut relocations: EventReader<ForcedRelocation>,
    mut bodies: Query<(&mut Transform, &mut BodyVelocity, Option<&mut KinematicController>)>,
) {
    for event in relocations.read() {
        let Ok((mut transform, mut velocity, controller)) = bodies.get_mut(event.agent) else {
            continue;
        };
        transform.translation = event.to;
        velocity.linear = Vec3::ZERO;
        if let Some(mut controller) = controller {
            controller.grounded = false;
        }
    }
}

/// Система: launch от boost pad / jump rail
pub fn apply_aid_launches(
    mut used: EventReader<TraversalUsed>,
    mut bodies: Query<(&mut BodyVelocity, &mut KinematicController)>,
) {
    for event in used.read() {
        let Some(launch) = event.launch else {
            continue;
        };
        if let Ok((mut velocity, mut controller)) = bodies.get_mut(event.agent) {
            velocity.linear = flatten(velocity.linear) + launch;
            controller.grounded = launch.y <= 0.0 && controller.grounded;
        }
    }
}

/// Система интеграции тел (headless режим, без Rapier)
pub fn integrate_bodies(
    mut bodies: Query<
        (
            &mut Transform,
            &mut BodyVelocity,
            &mut KinematicController,
            &BodyTraits,
            Option<&MovementIntent>,
            Option<&Health>,
        ),
        Without<RapierBody>,
    >,
    probes: Res<WorldProbes>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();
    let probe = probes.probe();
    let idle = MovementIntent::default();

    for (mut transform, mut velocity, mut controller, traits, intent, health) in bodies.iter_mut() {
        let alive = health.map(|h| h.is_alive()).unwrap_or(true);
        // Мёртвые тела не управляются, но падают
        let intent = intent.filter(|_| alive).unwrap_or(&idle);

        let forward = transform.forward().as_vec3();
        let (next, linear) = step_body(
            transform.translation,
            velocity.linear,
            forward,
            intent,
            traits,
            &mut controller,
            probe,
            delta,
        );
        transform.translation = next;
        velocity.linear = linear;

        if intent.yaw_rate.abs() > f32::EPSILON {
            transform.rotate_y(intent.yaw_rate * delta);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaGeometry;

    const DT: f32 = 1.0 / 60.0;

    fn grounded() -> KinematicController {
        KinematicController {
            grounded: true,
            ..Default::default()
        }
    }

    fn push(force: Vec3) -> MovementIntent {
        MovementIntent {
            force,
            ..Default::default()
        }
    }

    #[test]
    fn test_gravity_logic() {
        let arena = ArenaGeometry::flat(20.0);
        let mut controller = KinematicController::default();
        let (position, velocity) = step_body(
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::ZERO,
            Vec3::NEG_Z,
            &MovementIntent::default(),
            &BodyTraits::default(),
            &mut controller,
            &arena,
            DT,
        );
        assert!(velocity.y < 0.0);
        assert!(position.y < 5.0);
        assert!(!controller.grounded);
    }

    #[test]
    fn test_force_accelerates_and_speed_is_capped() {
        let arena = ArenaGeometry::flat(100.0);
        let traits = BodyTraits::default();
        let mut controller = grounded();
        let mut position = Vec3::ZERO;
        let mut velocity = Vec3::ZERO;
        for _ in 0..300 {
            (position, velocity) = step_body(
                position,
                velocity,
                Vec3::NEG_Z,
                &push(Vec3::NEG_Z * traits.max_force),
                &traits,
                &mut controller,
                &arena,
                DT,
            );
        }
        assert!(position.z < -10.0);
        assert!(flatten(velocity).length() <= traits.max_speed + 1e-3);
        assert!(controller.grounded);
        assert_eq!(position.y, 0.0);
    }

    #[test]
    fn test_wall_stops_motion() {
        let arena = ArenaGeometry::flat(20.0)
            .with_block(Vec3::new(-5.0, 0.0, -3.2), Vec3::new(5.0, 3.0, -3.0));
        let traits = BodyTraits::default();
        let mut controller = grounded();
        let mut position = Vec3::ZERO;
        let mut velocity = Vec3::ZERO;
        for _ in 0..240 {
            (position, velocity) = step_body(
                position,
                velocity,
                Vec3::NEG_Z,
                &push(Vec3::NEG_Z * traits.max_force),
                &traits,
                &mut controller,
                &arena,
                DT,
            );
        }
        assert!(position.z > -3.0 + traits.radius - 0.05, "z = {}", position.z);
        assert!(velocity.z.abs() < 0.5);
    }

    #[test]
    fn test_jump_leaves_ground_and_lands() {
        let arena = ArenaGeometry::flat(20.0);
        let traits = BodyTraits::default();
        let mut controller = grounded();
        let jump = MovementIntent {
            jump: true,
            ..Default::default()
        };
        let (mut position, mut velocity) =
            step_body(
                Vec3::ZERO,
                Vec3::ZERO,
                Vec3::NEG_Z,
                &jump,
                &traits,
                &mut controller,
                &arena,
                DT,
            );
        assert!(!controller.grounded);
        assert!(position.y > 0.0);

        let mut peak: f32 = 0.0;
        for _ in 0..240 {
            (position, velocity) = step_body(
                position,
                velocity,
                Vec3::NEG_Z,
                &MovementIntent::default(),
                &traits,
                &mut controller,
                &arena,
                DT,
            );
            peak = peak.max(position.y);
        }
        assert!(peak > 1.0);
        assert!(controller.grounded);
        assert_eq!(position.y, 0.0);
    }

    #[test]
    fn test_walks_up_low_step() {
        let arena = ArenaGeometry::flat(20.0)
            .with_block(Vec3::new(-5.0, 0.0, -10.0), Vec3::new(5.0, 0.25, -2.0));
        let traits = BodyTraits::default();
        let mut controller = grounded();
        let mut position = Vec3::ZERO;
        let mut velocity = Vec3::ZERO;
        for _ in 0..180 {
            (position, velocity) = step_body(
                position,
                velocity,
                Vec3::NEG_Z,
                &push(Vec3::NEG_Z * traits.max_force),
                &traits,
                &mut controller,
                &arena,
                DT,
            );
        }
        assert!(position.z < -3.0);
        assert!((position.y - 0.25).abs() < 1e-4);
    }

    #[test]
    fn test_walks_off_edge_and_falls() {
        let arena = ArenaGeometry::default()
            .with_block(Vec3::new(-5.0, -1.0, -2.0), Vec3::new(5.0, 0.0, 5.0));
        let traits = BodyTraits::default();
        let mut controller = grounded();
        let mut position = Vec3::ZERO;
        let mut velocity = Vec3::ZERO;
        for _ in 0..120 {
            (position, velocity) = step_body(
                position,
                velocity,
                Vec3::NEG_Z,
                &push(Vec3::NEG_Z * traits.max_force),
                &traits,
                &mut controller,
                &arena,
                DT,
            );
        }
        assert!(!controller.grounded);
        assert!(position.y < -1.0);
    }
}
