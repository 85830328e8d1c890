//! NavigationController — reactive steering (без navmesh).
//!
//! Цель → direction → проверки edge/obstacle/overhead → separation → force.
//! Позиция агента = точка у ног; все probe высоты отсчитываются от неё.
//! Движение только через force/yaw_rate (`MovementIntent`), позицию
//! интегрирует физика.

use bevy::prelude::*;

use super::components::PersonalityProfile;
use crate::components::{flatten, BodyTraits, MovementIntent};
use crate::config::NavigationTuning;

/// Результат ray cast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeHit {
    pub distance: f32,
    pub point: Vec3,
    pub normal: Vec3,
}

/// Синхронные геометрические запросы к миру (bounded cost, inline в tick)
pub trait WorldProbe: Send + Sync {
    /// Высота поверхности под `point` (не выше point.y), если она в пределах `max_drop`
    fn ground_below(&self, point: Vec3, max_drop: f32) -> Option<f32>;

    /// Первое пересечение луча с твёрдой геометрией
    fn cast_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<ProbeHit>;

    fn has_line_of_sight(&self, from: Vec3, to: Vec3) -> bool {
        let offset = to - from;
        let distance = offset.length();
        if distance <= f32::EPSILON {
            return true;
        }
        self.cast_ray(from, offset / distance, distance).is_none()
    }
}

/// Бесконечный пол на y = 0 без препятствий (fallback, если арена не задана)
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenGround;

impl WorldProbe for OpenGround {
    fn ground_below(&self, point: Vec3, max_drop: f32) -> Option<f32> {
        (point.y >= 0.0 && point.y <= max_drop).then_some(0.0)
    }

    fn cast_ray(&self, _origin: Vec3, _direction: Vec3, _max_distance: f32) -> Option<ProbeHit> {
        None
    }
}

/// Raycast backend (host подменяет своим)
#[derive(Resource)]
pub struct WorldProbes(pub Box<dyn WorldProbe>);

impl WorldProbes {
    pub fn new(probe: impl WorldProbe + 'static) -> Self {
        Self(Box::new(probe))
    }

    pub fn probe(&self) -> &dyn WorldProbe {
        self.0.as_ref()
    }
}

impl Default for WorldProbes {
    fn default() -> Self {
        Self::new(OpenGround)
    }
}

/// Что navigation увидела на последнем tick (читает stuck monitor)
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct NavigationFeedback {
    pub overhead_blocked: bool,
    pub edge_ahead: bool,
}

/// Вход steering на один tick
#[derive(Debug, Clone, Copy)]
pub struct SteeringRequest<'a> {
    pub position: Vec3,
    pub forward: Vec3,
    pub velocity: Vec3,
    pub destination: Option<Vec3>,
    /// Куда смотреть (цель в бою); None — по направлению движения
    pub face_toward: Option<Vec3>,
    /// Доля max_force (retreat/chase быстрее, strafing медленнее)
    pub speed_scale: f32,
    pub arrive_radius: f32,
    /// Позиции других агентов поблизости
    pub neighbors: &'a [Vec3],
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Steering {
    pub intent: MovementIntent,
    /// Итоговое направление (до separation)
    pub heading: Vec3,
    pub edge_ahead: bool,
    pub overhead_blocked: bool,
    pub braking: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct HeadingCheck {
    edge: bool,
    obstacle: Option<ProbeHit>,
    overhead: bool,
}

/// Forward probe растёт со скоростью (с cap)
pub fn probe_length(speed: f32, tuning: &NavigationTuning) -> f32 {
    let multiplier =
        (1.0 + speed.max(0.0) * tuning.probe_speed_gain).min(tuning.probe_max_multiplier);
    tuning.probe_distance * multiplier
}

/// Signed угол forward → direction вокруг +Y (CCW сверху положительный)
pub fn signed_yaw(forward: Vec3, direction: Vec3) -> f32 {
    let f = flatten(forward).normalize_or_zero();
    let d = flatten(direction).normalize_or_zero();
    if f == Vec3::ZERO || d == Vec3::ZERO {
        return 0.0;
    }
    f.cross(d).y.atan2(f.dot(d))
}

/// P-регулятор поворота с ограничением угловой скорости
pub fn yaw_toward(forward: Vec3, direction: Vec3, max_rate: f32, gain: f32) -> f32 {
    (signed_yaw(forward, direction) * gain).clamp(-max_rate, max_rate)
}

/// Repulsion от соседей: сила растёт при сближении
pub fn separation(position: Vec3, neighbors: &[Vec3], radius: f32) -> Vec3 {
    if radius <= 0.0 {
        return Vec3::ZERO;
    }
    let mut push = Vec3::ZERO;
    for (index, other) in neighbors.iter().enumerate() {
        let away = flatten(position - *other);
        let distance = away.length();
        if distance >= radius {
            continue;
        }
        // Совпадающие позиции — разводим детерминированно по индексу
        let direction = if distance > 1e-4 {
            away / distance
        } else {
            Quat::from_rotation_y(index as f32 * 2.4) * Vec3::X
        };
        push += direction * (1.0 - distance / radius);
    }
    push
}

fn rotate_heading(heading: Vec3, degrees: f32) -> Vec3 {
    Quat::from_rotation_y(degrees.to_radians()) * heading
}

fn assess_heading(
    position: Vec3,
    heading: Vec3,
    probe_len: f32,
    tuning: &NavigationTuning,
    probe: &dyn WorldProbe,
) -> HeadingCheck {
    // Edge: есть ли пол впереди в пределах допустимого спуска
    let ahead = position + heading * probe_len;
    let edge = probe
        .ground_below(ahead + Vec3::Y * 0.5, tuning.max_step_drop + 0.5)
        .is_none();

    let obstacle = probe.cast_ray(
        position + Vec3::Y * tuning.obstacle_probe_height,
        heading,
        probe_len,
    );

    // Overhead: нижний луч свободен, а верхний (ниже роста) упирается
    let right = heading.cross(Vec3::Y).normalize_or_zero();
    let lowest = tuning
        .clearance_heights
        .iter()
        .copied()
        .fold(f32::INFINITY, f32::min);
    let mut overhead = false;
    for &offset in &tuning.clearance_offsets {
        let base = position + right * offset;
        let low_clear = probe
            .cast_ray(base + Vec3::Y * lowest, heading, probe_len)
            .is_none();
        if !low_clear {
            continue;
        }
        let high_blocked = tuning
            .clearance_heights
            .iter()
            .filter(|&&height| height > lowest && height < tuning.body_height)
            .any(|&height| probe.cast_ray(base + Vec3::Y * height, heading, probe_len).is_some());
        // Низкий потолок прямо над путём
        let ceiling = probe
            .cast_ray(
                base + heading * (probe_len * 0.5) + Vec3::Y * 0.1,
                Vec3::Y,
                tuning.body_height - 0.1,
            )
            .is_some();
        if high_blocked || ceiling {
            overhead = true;
            break;
        }
    }

    HeadingCheck {
        edge,
        obstacle,
        overhead,
    }
}

/// Deflection вдоль стены + отталкивание от неё
fn deflect(heading: Vec3, hit: &ProbeHit, probe_len: f32, to_goal: Vec3, weight: f32) -> Vec3 {
    let normal = flatten(hit.normal).normalize_or_zero();
    if normal == Vec3::ZERO {
        return heading;
    }
    let mut slide = heading - normal * heading.dot(normal);
    if slide.length_squared() < 0.01 {
        // Лоб в стену — выбираем сторону ближе к цели
        slide = Vec3::Y.cross(normal);
        if slide.dot(to_goal) < 0.0 {
            slide = -slide;
        }
    }
    let proximity = (1.0 - hit.distance / probe_len.max(1e-3)).clamp(0.0, 1.0);
    (slide.normalize_or_zero() + normal * weight * proximity).normalize_or_zero()
}

/// Destination → MovementIntent
pub fn compute_steering(
    request: &SteeringRequest,
    traits: &BodyTraits,
    personality: &PersonalityProfile,
    tuning: &NavigationTuning,
    probe: &dyn WorldProbe,
) -> Steering {
    let mut steering = Steering::default();
    let position = request.position;
    let planar_velocity = flatten(request.velocity);
    let probe_len = probe_length(planar_velocity.length(), tuning);

    // (a) направление к цели + arrival
    let (desired, arrival) = match request.destination {
        Some(destination) => {
            let to_goal = flatten(destination - position);
            let distance = to_goal.length();
            if distance <= request.arrive_radius {
                (Vec3::ZERO, 0.0)
            } else {
                let slow_zone = (request.arrive_radius * 2.0).max(1e-3);
                (to_goal / distance, (distance / slow_zone).clamp(0.0, 1.0))
            }
        }
        None => (Vec3::ZERO, 0.0),
    };

    let mut heading = desired;
    if desired != Vec3::ZERO {
        let check = assess_heading(position, desired, probe_len, tuning, probe);
        if check.edge || check.overhead {
            let alternative = tuning.fan_angles_deg.iter().find_map(|&angle| {
                let candidate = rotate_heading(desired, angle);
                let alt = assess_heading(position, candidate, probe_len, tuning, probe);
                (!alt.edge && !alt.overhead).then_some(candidate)
            });
            match alternative {
                Some(candidate) => heading = candidate,
                None if check.edge => {
                    steering.edge_ahead = true;
                    steering.braking = true;
                    heading = Vec3::ZERO;
                }
                None => steering.overhead_blocked = true,
            }
        }

        // (b) obstacle avoidance для выбранного направления
        if heading != Vec3::ZERO {
            if let Some(hit) = probe.cast_ray(
                position + Vec3::Y * tuning.obstacle_probe_height,
                heading,
                probe_len,
            ) {
                heading = deflect(heading, &hit, probe_len, desired, tuning.avoidance_weight);
            }
        }
    }
    steering.heading = heading;

    // (c) separation — minority weight против основного направления
    let push =
        separation(position, request.neighbors, tuning.separation_radius).clamp_length_max(1.0);
    let direction = if heading != Vec3::ZERO {
        (heading * (1.0 - tuning.separation_weight) + push * tuning.separation_weight)
            .normalize_or_zero()
    } else {
        push * tuning.separation_weight
    };

    let scale = request.speed_scale.clamp(0.0, 1.0);
    let mut force = if heading != Vec3::ZERO {
        direction * traits.max_force * scale * arrival
    } else {
        direction * traits.max_force * scale
    };

    if steering.braking {
        force = (-planar_velocity * traits.mass * tuning.brake_gain)
            .clamp_length_max(traits.max_force);
    }

    // Поворот: к цели боя, иначе по движению
    let face = request
        .face_toward
        .map(|target| flatten(target - position))
        .filter(|dir| dir.length_squared() > 1e-6)
        .or_else(|| (heading != Vec3::ZERO).then_some(heading));
    let yaw_rate = face
        .map(|dir| {
            yaw_toward(
                request.forward,
                dir,
                tuning.turn_rate * personality.turn_rate(),
                tuning.turn_gain,
            )
        })
        .unwrap_or(0.0);

    steering.intent = MovementIntent {
        force,
        yaw_rate,
        jump: false,
        mobility: false,
    };
    steering
}
