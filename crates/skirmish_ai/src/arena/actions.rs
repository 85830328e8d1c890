//! Action collaborator: резолв ActionTriggered → урон
//!
//! Цель сдвигается на время полёта projectile, промах меряется от линии
//! выстрела до сдвинутой цели. Area actions (rocket, shockwave) бьют всех
//! противников в радиусе точки взрыва и не требуют прямой видимости.

use bevy::prelude::*;

use super::DamageDealt;
use crate::ai::events::ActionTriggered;
use crate::ai::navigation::{WorldProbe, WorldProbes};
use crate::components::{ActionKind, ActionSpec, Actor, BodyVelocity, Health, TriggeredAction};
use crate::config::BotTuning;

/// Урон с учётом заряда: полный заряд удваивает
pub fn charged_damage(action: &TriggeredAction) -> u32 {
    (action.spec.damage as f32 * (1.0 + action.charge.clamp(0.0, 1.0))).round() as u32
}

/// Точка удара: ближайшая к цели точка на линии выстрела, но не дальше первой стены
fn impact_point(
    spec: &ActionSpec,
    origin: Vec3,
    aim_point: Vec3,
    target: Vec3,
    probe: &dyn WorldProbe,
) -> Option<Vec3> {
    let direction = (aim_point - origin).try_normalize()?;
    let along = (target - origin).dot(direction).clamp(0.0, spec.max_range);
    let point = origin + direction * along;
    match probe.cast_ray(origin, direction, along) {
        Some(hit) => Some(hit.point),
        None => Some(point),
    }
}

/// Попадает ли действие по цели, стоящей в `target` (уже с упреждением)
pub fn resolves_hit(
    action: &TriggeredAction,
    origin: Vec3,
    aim_point: Vec3,
    target: Vec3,
    probe: &dyn WorldProbe,
) -> bool {
    let spec = &action.spec;
    // Shockwave: радиальный удар вокруг себя
    if spec.kind == ActionKind::Shockwave {
        return origin.distance(target) <= spec.max_range;
    }
    if origin.distance(target) > spec.max_range + spec.hit_radius {
        return false;
    }
    let Some(impact) = impact_point(spec, origin, aim_point, target, probe) else {
        return false;
    };
    if impact.distance(target) > spec.hit_radius {
        return false;
    }
    spec.kind.is_area() || probe.has_line_of_sight(origin, target)
}

/// Система: ActionTriggered → DamageDealt (только по противникам)
pub fn resolve_triggered_actions(
    mut triggered: EventReader<ActionTriggered>,
    mut actors: Query<(Entity, &Actor, &Transform, Option<&BodyVelocity>, &mut Health)>,
    probes: Res<WorldProbes>,
    tuning: Res<BotTuning>,
    mut dealt: EventWriter<DamageDealt>,
) {
    let probe = probes.probe();
    let eye_height = tuning.perception.eye_height;

    for event in triggered.read() {
        let Ok((_, attacker, _, _, _)) = actors.get(event.agent) else {
            continue;
        };
        let attacker = attacker.clone();

        let mut candidates: Vec<(Entity, Vec3)> = actors
            .iter()
            .filter(|(entity, actor, _, _, health)| {
                health.is_alive()
                    && attacker.is_hostile_to(actor)
                    && (event.action.spec.kind.is_area() || Some(*entity) == event.target)
            })
            .map(|(entity, _, transform, velocity, _)| {
                let center = transform.translation + Vec3::Y * eye_height;
                let travel = event.action.spec.travel_time(event.origin.distance(center));
                let linear = velocity.map(|v| v.linear).unwrap_or(Vec3::ZERO);
                (entity, center + linear * travel)
            })
            .collect();
        candidates.sort_by_key(|(entity, _)| *entity);

        let amount = charged_damage(&event.action);
        for (target, predicted) in candidates {
            if !resolves_hit(&event.action, event.origin, event.aim_point, predicted, probe) {
                continue;
            }
            if let Ok((_, _, _, _, mut health)) = actors.get_mut(target) {
                health.take_damage(amount);
                crate::log(&format!(
                    "💥 {} hit {} with {} for {} (hp {}/{})",
                    event.agent,
                    target,
                    event.action.spec.kind.as_str(),
                    amount,
                    health.current,
                    health.max
                ));
            }
            dealt.write(DamageDealt {
                attacker: event.agent,
                target,
                amount,
                kind: event.action.spec.kind,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::navigation::OpenGround;
    use crate::arena::ArenaGeometry;

    fn fired(spec: ActionSpec, charge: f32) -> TriggeredAction {
        TriggeredAction {
            spec,
            charge,
            depleted: false,
        }
    }

    #[test]
    fn test_charge_doubles_damage_at_full() {
        assert_eq!(charged_damage(&fired(ActionSpec::railgun(), 0.0)), 1);
        assert_eq!(charged_damage(&fired(ActionSpec::railgun(), 1.0)), 2);
        assert_eq!(charged_damage(&fired(ActionSpec::rocket(), 0.0)), 2);
    }

    #[test]
    fn test_direct_shot_hits() {
        let origin = Vec3::new(0.0, 1.2, 0.0);
        let target = Vec3::new(0.0, 1.2, -10.0);
        let shot = fired(ActionSpec::blaster(), 0.0);
        assert!(resolves_hit(&shot, origin, target, target, &OpenGround));
    }

    #[test]
    fn test_wide_shot_misses() {
        let origin = Vec3::new(0.0, 1.2, 0.0);
        let target = Vec3::new(0.0, 1.2, -10.0);
        let aim = Vec3::new(5.0, 1.2, -10.0);
        let shot = fired(ActionSpec::blaster(), 0.0);
        assert!(!resolves_hit(&shot, origin, aim, target, &OpenGround));
    }

    #[test]
    fn test_out_of_range_misses() {
        let origin = Vec3::new(0.0, 1.2, 0.0);
        let target = Vec3::new(0.0, 1.2, -5.0);
        let swing = fired(ActionSpec::hammer(), 0.0);
        assert!(!resolves_hit(&swing, origin, target, target, &OpenGround));
    }

    #[test]
    fn test_wall_blocks_direct_shot_but_not_shockwave() {
        let arena = ArenaGeometry::flat(20.0)
            .with_block(Vec3::new(-2.0, 0.0, -2.2), Vec3::new(2.0, 3.0, -2.0));
        let origin = Vec3::new(0.0, 1.2, 0.0);
        let target = Vec3::new(0.0, 1.2, -4.0);

        assert!(!resolves_hit(&fired(ActionSpec::blaster(), 0.0), origin, target, target, &arena));
        assert!(resolves_hit(&fired(ActionSpec::shockwave(), 0.0), origin, target, target, &arena));
    }

    #[test]
    fn test_rocket_splash_hits_near_wall() {
        // Ракета взрывается о стену прямо перед целью
        let arena = ArenaGeometry::flat(20.0)
            .with_block(Vec3::new(-2.0, 0.0, -9.2), Vec3::new(2.0, 3.0, -9.0));
        let origin = Vec3::new(0.0, 1.2, 0.0);
        let target = Vec3::new(0.0, 1.2, -10.0);
        assert!(resolves_hit(&fired(ActionSpec::rocket(), 0.0), origin, target, target, &arena));
    }
}
