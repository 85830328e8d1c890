//! Priority-ordered transition rules StateMachine.
//!
//! Правила проверяются каждый tick сверху вниз, первое совпавшее побеждает:
//! 1. Retreat  2. CollectGoalItem  3. Attack  4. Chase  5. CollectResource
//! (hook: UseTraversal)  6. Explore.
//!
//! Вход — уже перепроверенные (live) списки объектов, поэтому потерянная
//! цель просто отсутствует в списке и оценка проваливается к следующему
//! правилу в этот же tick.

use bevy::prelude::*;
use rand::Rng;

use super::components::{BotState, BotStateKind, PersonalityProfile, TargetRef};
use super::navigation::WorldProbe;
use super::stuck::sample_band;
use super::targeting::{select_enemy, EnemyCandidate, ScoringContext};
use super::traversal::{AidSighting, ArenaTraversal, TraversalContext};
use crate::components::{flatten, ActionSpec, Health};
use crate::config::{BotTuning, ExploreTuning};

/// Pickup/goal объект, прошедший liveness check
#[derive(Debug, Clone, Copy)]
pub struct ObjectSighting {
    pub entity: Entity,
    pub position: Vec3,
    pub distance: f32,
    pub visible: bool,
}

/// Всё, что нужно правилам на один tick
#[derive(Debug, Clone, Copy)]
pub struct TransitionContext<'a> {
    pub position: Vec3,
    pub health: Health,
    pub action: Option<&'a ActionSpec>,
    pub personality: &'a PersonalityProfile,
    pub current: &'a BotState,
    pub retreat_cooldown: f32,
    pub enemies: &'a [EnemyCandidate],
    pub goal_items: &'a [ObjectSighting],
    pub resources: &'a [ObjectSighting],
    pub aids: &'a [AidSighting],
    pub traversal_cooldown: bool,
    pub delta: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: BotState,
    pub reason: &'static str,
    /// Retreat закончился в этот tick — запустить cooldown
    pub retreat_finished: bool,
}

impl Transition {
    fn new(next: BotState, reason: &'static str, retreat_finished: bool) -> Self {
        Self {
            next,
            reason,
            retreat_finished,
        }
    }
}

fn target_ref(entity: Entity, position: Vec3) -> TargetRef {
    TargetRef::new(entity, position)
}

fn find_enemy<'a>(enemies: &'a [EnemyCandidate], entity: Entity) -> Option<&'a EnemyCandidate> {
    enemies.iter().find(|candidate| candidate.entity == entity)
}

fn nearest_enemy(enemies: &[EnemyCandidate]) -> Option<&EnemyCandidate> {
    enemies
        .iter()
        .min_by(|a, b| a.distance.total_cmp(&b.distance).then_with(|| a.entity.cmp(&b.entity)))
}

/// Текущий объект (если ещё валиден и подходит), иначе ближайший подходящий
fn pick_object(
    sightings: &[ObjectSighting],
    current: Option<Entity>,
    qualifies: impl Fn(&ObjectSighting) -> bool,
) -> Option<ObjectSighting> {
    if let Some(current) = current {
        if let Some(sighting) = sightings.iter().find(|s| s.entity == current && qualifies(s)) {
            return Some(*sighting);
        }
    }
    sightings
        .iter()
        .filter(|s| qualifies(s))
        .min_by(|a, b| a.distance.total_cmp(&b.distance).then_with(|| a.entity.cmp(&b.entity)))
        .copied()
}

fn ask_hook(
    ctx: &TransitionContext,
    traversal: &dyn ArenaTraversal,
    state: BotStateKind,
    threat: Option<Vec3>,
    target: Option<Vec3>,
    destination: Option<Vec3>,
) -> Option<Entity> {
    if ctx.aids.is_empty() {
        return None;
    }
    traversal.choose_aid(&TraversalContext {
        position: ctx.position,
        state,
        threat,
        target,
        destination,
        aids: ctx.aids,
        cooldown_active: ctx.traversal_cooldown,
    })
}

/// Wander точка с полом под ней (до 6 попыток)
pub fn pick_wander_destination(
    position: Vec3,
    tuning: &ExploreTuning,
    probe: &dyn WorldProbe,
    rng: &mut impl Rng,
) -> Option<Vec3> {
    const ATTEMPTS: usize = 6;
    for _ in 0..ATTEMPTS {
        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let distance = sample_band(rng, tuning.wander_min, tuning.wander_max);
        let offset = Quat::from_rotation_y(angle) * Vec3::NEG_Z * distance;
        let candidate = position + offset;
        if let Some(height) = probe.ground_below(candidate + Vec3::Y * 2.0, 6.0) {
            return Some(Vec3::new(candidate.x, height, candidate.z));
        }
    }
    None
}

/// Точка отступления: от угрозы, с разбросом по caution
pub fn pick_retreat_destination(
    position: Vec3,
    threat: Option<Vec3>,
    personality: &PersonalityProfile,
    tuning: &BotTuning,
    probe: &dyn WorldProbe,
    rng: &mut impl Rng,
) -> Vec3 {
    let away = threat
        .and_then(|threat| flatten(position - threat).try_normalize())
        .unwrap_or_else(|| {
            Quat::from_rotation_y(rng.gen_range(0.0..std::f32::consts::TAU)) * Vec3::NEG_Z
        });
    let spread = personality.retreat_spread();
    let distance = personality.retreat_distance(tuning.retreat.distance);

    let mut fallback = position + away * distance;
    for attempt in 0..6 {
        // Первая попытка — в пределах spread, дальше расширяем
        let limit = spread + attempt as f32 * 0.25;
        let angle = if limit > 0.0 { rng.gen_range(-limit..=limit) } else { 0.0 };
        let heading = Quat::from_rotation_y(angle) * away;
        let candidate = position + heading * distance;
        if attempt == 0 {
            fallback = candidate;
        }
        if let Some(height) = probe.ground_below(candidate + Vec3::Y * 2.0, 6.0) {
            return Vec3::new(candidate.x, height, candidate.z);
        }
    }
    fallback
}

/// Один шаг StateMachine
pub fn evaluate_transition(
    ctx: &TransitionContext,
    tuning: &BotTuning,
    traversal: &dyn ArenaTraversal,
    probe: &dyn WorldProbe,
    rng: &mut impl Rng,
) -> Transition {
    let mut retreat_finished = false;

    // Активный Retreat держится до конца длительности
    if let BotState::Retreat {
        remaining,
        from,
        destination,
        via,
    } = ctx.current
    {
        let remaining = remaining - ctx.delta;
        if remaining > 0.0 {
            let from = from.map(|threat| match find_enemy(ctx.enemies, threat.entity) {
                Some(enemy) => target_ref(enemy.entity, enemy.position),
                None => threat,
            });
            let via = via
                .filter(|aid| !ctx.traversal_cooldown && ctx.aids.iter().any(|s| s.entity == *aid))
                .or_else(|| {
                    ask_hook(
                        ctx,
                        traversal,
                        BotStateKind::Retreat,
                        from.map(|threat| threat.last_known),
                        None,
                        Some(*destination),
                    )
                });
            return Transition::new(
                BotState::Retreat {
                    remaining,
                    from,
                    destination: *destination,
                    via,
                },
                "retreating",
                false,
            );
        }
        retreat_finished = true;
    }

    // 1. Retreat
    let cooldown_active = retreat_finished || ctx.retreat_cooldown > 0.0;
    let low_health = ctx.health.is_alive() && ctx.health.current <= tuning.retreat.low_health;
    if low_health && !cooldown_active {
        let own = ctx.health.current as f32;
        let weak_threat_nearby = ctx.enemies.iter().any(|enemy| {
            enemy.distance <= tuning.retreat.weak_threat_radius
                && (enemy.health.current as f32) <= own * tuning.retreat.much_weaker_ratio
        });
        if !weak_threat_nearby {
            let nearest = nearest_enemy(ctx.enemies);
            let threat = nearest.map(|enemy| enemy.position);
            let destination =
                pick_retreat_destination(ctx.position, threat, ctx.personality, tuning, probe, rng);
            let retreat = &tuning.retreat;
            let remaining = sample_band(rng, retreat.duration_min, retreat.duration_max);
            let via =
                ask_hook(ctx, traversal, BotStateKind::Retreat, threat, None, Some(destination));
            return Transition::new(
                BotState::Retreat {
                    remaining,
                    from: nearest.map(|enemy| target_ref(enemy.entity, enemy.position)),
                    destination,
                    via,
                },
                "low health",
                retreat_finished,
            );
        }
    }

    // 2. CollectGoalItem
    if ctx.action.is_none() {
        let current_item = match ctx.current {
            BotState::CollectGoalItem { item } => Some(item.entity),
            _ => None,
        };
        let detour = tuning.ranges.goal_detour_radius;
        let worth_detour = |s: &ObjectSighting| s.distance <= detour || s.visible;
        if let Some(item) = pick_object(ctx.goal_items, current_item, worth_detour) {
            return Transition::new(
                BotState::CollectGoalItem {
                    item: target_ref(item.entity, item.position),
                },
                "no action held, goal item in reach",
                retreat_finished,
            );
        }
    }

    // 3–4. Attack / Chase
    if let Some(action) = ctx.action {
        let current_hostile = ctx.current.hostile_target().map(|target| target.entity);

        // Hysteresis: из Attack выходим только за engage_exit
        if let BotState::Attack { target } = ctx.current {
            if let Some(enemy) = find_enemy(ctx.enemies, target.entity) {
                if enemy.distance <= tuning.ranges.engage_exit() {
                    return Transition::new(
                        BotState::Attack {
                            target: target_ref(enemy.entity, enemy.position),
                        },
                        "target within engagement band",
                        retreat_finished,
                    );
                }
            }
        }

        let scoring = ScoringContext {
            own_health: ctx.health,
            personality: ctx.personality,
            action: Some(action),
            current_target: current_hostile,
        };
        if let Some(best) = select_enemy(&scoring, ctx.enemies, tuning) {
            let enemy = best.candidate;
            if enemy.distance <= tuning.ranges.engage {
                return Transition::new(
                    BotState::Attack {
                        target: target_ref(enemy.entity, enemy.position),
                    },
                    "target in engagement range",
                    retreat_finished,
                );
            }

            let chase_limit = if current_hostile == Some(enemy.entity) {
                tuning.ranges.awareness_exit()
            } else {
                tuning.ranges.awareness
            };
            if enemy.distance <= chase_limit {
                let via = match ctx.current {
                    BotState::Chase { via: Some(aid), target }
                        if target.entity == enemy.entity
                            && !ctx.traversal_cooldown
                            && ctx.aids.iter().any(|s| s.entity == *aid) =>
                    {
                        Some(*aid)
                    }
                    _ => {
                        let toward = Some(enemy.position);
                        ask_hook(ctx, traversal, BotStateKind::Chase, None, toward, None)
                    }
                };
                return Transition::new(
                    BotState::Chase {
                        target: target_ref(enemy.entity, enemy.position),
                        via,
                    },
                    "target in awareness range",
                    retreat_finished,
                );
            }
        }
    }

    // 5. CollectResource
    let safety_radius = tuning.ranges.engage * tuning.ranges.resource_safety_multiple;
    let safe = ctx.enemies.iter().all(|enemy| enemy.distance > safety_radius);
    if safe {
        let current_item = match ctx.current {
            BotState::CollectResource { item } => Some(item.entity),
            _ => None,
        };
        if let Some(item) = pick_object(ctx.resources, current_item, |_| true) {
            return Transition::new(
                BotState::CollectResource {
                    item: target_ref(item.entity, item.position),
                },
                "resource available, no threat nearby",
                retreat_finished,
            );
        }
    }

    // Hook tier (между 5 и 6)
    let (wander_timer, wander_destination) = match ctx.current {
        BotState::Explore {
            wander_timer,
            destination,
        } => (*wander_timer - ctx.delta, *destination),
        _ => (0.0, None),
    };
    if let BotState::UseTraversal { aid } = ctx.current {
        if let Some(sighting) = ctx.aids.iter().find(|s| s.entity == aid.entity) {
            if !ctx.traversal_cooldown {
                return Transition::new(
                    BotState::UseTraversal {
                        aid: target_ref(sighting.entity, sighting.position),
                    },
                    "heading to traversal aid",
                    retreat_finished,
                );
            }
        }
    }
    let explore_aid =
        ask_hook(ctx, traversal, BotStateKind::Explore, None, None, wander_destination);
    if let Some(aid) = explore_aid {
        if let Some(sighting) = ctx.aids.iter().find(|s| s.entity == aid) {
            return Transition::new(
                BotState::UseTraversal {
                    aid: target_ref(sighting.entity, sighting.position),
                },
                "traversal aid advances exploration",
                retreat_finished,
            );
        }
    }

    // 6. Explore
    let arrive_radius = tuning.explore.arrive_radius;
    let arrived = wander_destination
        .is_some_and(|destination| flatten(destination - ctx.position).length() <= arrive_radius);
    if wander_timer > 0.0 && wander_destination.is_some() && !arrived {
        return Transition::new(
            BotState::Explore {
                wander_timer,
                destination: wander_destination,
            },
            "exploring",
            retreat_finished,
        );
    }

    let destination = pick_wander_destination(ctx.position, &tuning.explore, probe, rng);
    // Не нашли пол — повторим скоро
    let wander_timer = if destination.is_some() {
        tuning.explore.wander_interval
    } else {
        0.5
    };
    Transition::new(
        BotState::Explore {
            wander_timer,
            destination,
        },
        "no higher-priority rule matched",
        retreat_finished,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::components::Archetype;
    use crate::ai::navigation::OpenGround;
    use crate::ai::traversal::{AidAwareTraversal, NoTraversal};
    use crate::components::AidKind;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const DT: f32 = 1.0 / 60.0;

    /// Владеет данными, из которых собирается TransitionContext
    struct Scene {
        health: Health,
        action: Option<ActionSpec>,
        personality: PersonalityProfile,
        state: BotState,
        retreat_cooldown: f32,
        enemies: Vec<EnemyCandidate>,
        goal_items: Vec<ObjectSighting>,
        resources: Vec<ObjectSighting>,
        aids: Vec<AidSighting>,
    }

    impl Scene {
        fn new() -> Self {
            Self {
                health: Health::new(3),
                action: Some(ActionSpec::blaster()),
                personality: PersonalityProfile::new(0.5, 0.5, 1.0, 0.5, Archetype::Balanced),
                state: BotState::default(),
                retreat_cooldown: 0.0,
                enemies: Vec::new(),
                goal_items: Vec::new(),
                resources: Vec::new(),
                aids: Vec::new(),
            }
        }

        fn enemy(mut self, id: u32, distance: f32, hp: u32) -> Self {
            self.enemies.push(EnemyCandidate {
                entity: Entity::from_raw(id),
                position: Vec3::new(distance, 0.0, 0.0),
                velocity: Vec3::ZERO,
                distance,
                health: Health::with_current(3, hp),
                line_of_sight: true,
            });
            self
        }

        fn step_with(
            &mut self,
            traversal: &dyn ArenaTraversal,
            rng: &mut ChaCha8Rng,
        ) -> Transition {
            let ctx = TransitionContext {
                position: Vec3::ZERO,
                health: self.health,
                action: self.action.as_ref(),
                personality: &self.personality,
                current: &self.state,
                retreat_cooldown: self.retreat_cooldown,
                enemies: &self.enemies,
                goal_items: &self.goal_items,
                resources: &self.resources,
                aids: &self.aids,
                traversal_cooldown: false,
                delta: DT,
            };
            let transition =
                evaluate_transition(&ctx, &BotTuning::default(), traversal, &OpenGround, rng);
            self.state = transition.next.clone();
            transition
        }

        fn step(&mut self, rng: &mut ChaCha8Rng) -> Transition {
            self.step_with(&NoTraversal, rng)
        }

        fn move_enemy(&mut self, id: u32, distance: f32) {
            for enemy in &mut self.enemies {
                if enemy.entity == Entity::from_raw(id) {
                    enemy.distance = distance;
                    enemy.position = Vec3::new(distance, 0.0, 0.0);
                }
            }
        }
    }

    fn sighting(id: u32, distance: f32, visible: bool) -> ObjectSighting {
        ObjectSighting {
            entity: Entity::from_raw(id),
            position: Vec3::new(0.0, 0.0, distance),
            distance,
            visible,
        }
    }

    #[test]
    fn test_low_health_retreats_with_sampled_duration() {
        let tuning = BotTuning::default();
        let mut scene = Scene::new().enemy(1, 10.0, 3);
        scene.health = Health::with_current(3, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let transition = scene.step(&mut rng);
        match transition.next {
            BotState::Retreat {
                remaining,
                from,
                destination,
                ..
            } => {
                let band = &tuning.retreat;
                assert!(remaining >= band.duration_min && remaining <= band.duration_max);
                assert_eq!(from.map(|f| f.entity), Some(Entity::from_raw(1)));
                // Точка отступления — дальше от угрозы, чем мы
                assert!(destination.distance(Vec3::new(10.0, 0.0, 0.0)) > 10.0);
            }
            other => panic!("expected Retreat, got {other:?}"),
        }
        assert_eq!(transition.reason, "low health");
    }

    #[test]
    fn test_much_weaker_close_threat_disqualifies_retreat() {
        let mut scene = Scene::new().enemy(1, 3.0, 1);
        scene.health = Health::with_current(3, 2);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let transition = scene.step(&mut rng);
        assert_eq!(transition.next.kind(), BotStateKind::Attack);
    }

    #[test]
    fn test_retreat_cooldown_blocks_retreat() {
        let mut scene = Scene::new().enemy(1, 10.0, 3);
        scene.health = Health::with_current(3, 1);
        scene.retreat_cooldown = 2.0;
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        assert_eq!(scene.step(&mut rng).next.kind(), BotStateKind::Attack);
    }

    #[test]
    fn test_retreat_runs_its_duration_then_finishes() {
        let mut scene = Scene::new().enemy(1, 25.0, 3);
        scene.health = Health::with_current(3, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let BotState::Retreat { remaining, .. } = scene.step(&mut rng).next else {
            panic!("expected Retreat");
        };
        let mut steps = 0usize;
        let finished = loop {
            let transition = scene.step(&mut rng);
            steps += 1;
            if transition.next.kind() != BotStateKind::Retreat {
                break transition;
            }
            assert!(!transition.retreat_finished);
            assert!(steps < 1000, "retreat never ended");
        };

        // Закончился по таймеру → cooldown, без немедленного повторного входа
        let expected = remaining / DT;
        assert!((steps as f32 - expected).abs() <= 2.0, "steps {steps} expected {expected}");
        assert!(finished.retreat_finished);
        assert_eq!(finished.next.kind(), BotStateKind::Chase);
    }

    #[test]
    fn test_goal_item_collected_then_lost_falls_through_same_tick() {
        let mut scene = Scene::new();
        scene.action = None;
        scene.goal_items.push(sighting(5, 8.0, true));
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let transition = scene.step(&mut rng);
        assert_eq!(transition.next.kind(), BotStateKind::CollectGoalItem);
        assert_eq!(transition.next.target_entity(), Some(Entity::from_raw(5)));

        // Кто-то подобрал item
        scene.goal_items.clear();
        let transition = scene.step(&mut rng);
        assert_eq!(transition.next.kind(), BotStateKind::Explore);
    }

    #[test]
    fn test_goal_item_lost_falls_to_lower_rule() {
        let mut scene = Scene::new();
        scene.action = None;
        scene.goal_items.push(sighting(5, 8.0, true));
        scene.resources.push(sighting(6, 4.0, true));
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        assert_eq!(scene.step(&mut rng).next.kind(), BotStateKind::CollectGoalItem);
        scene.goal_items.clear();
        assert_eq!(scene.step(&mut rng).next.kind(), BotStateKind::CollectResource);
    }

    #[test]
    fn test_far_hidden_goal_item_ignored() {
        let mut scene = Scene::new();
        scene.action = None;
        scene.goal_items.push(sighting(5, 40.0, false));
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        assert_eq!(scene.step(&mut rng).next.kind(), BotStateKind::Explore);

        // Далеко, но видно — идём
        scene.goal_items[0].visible = true;
        assert_eq!(scene.step(&mut rng).next.kind(), BotStateKind::CollectGoalItem);
    }

    #[test]
    fn test_attack_chase_hysteresis_band() {
        let mut scene = Scene::new().enemy(1, 11.0, 3);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        assert_eq!(scene.step(&mut rng).next.kind(), BotStateKind::Attack);

        // Внутри band — остаёмся в Attack
        scene.move_enemy(1, 14.0);
        assert_eq!(scene.step(&mut rng).next.kind(), BotStateKind::Attack);

        // За exit — Chase
        scene.move_enemy(1, 14.5);
        assert_eq!(scene.step(&mut rng).next.kind(), BotStateKind::Chase);

        // Из Chase в Attack — только через enter threshold
        scene.move_enemy(1, 13.0);
        assert_eq!(scene.step(&mut rng).next.kind(), BotStateKind::Chase);
        scene.move_enemy(1, 12.0);
        assert_eq!(scene.step(&mut rng).next.kind(), BotStateKind::Attack);
    }

    #[test]
    fn test_chase_explore_hysteresis_band() {
        let mut scene = Scene::new().enemy(1, 29.0, 3);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        assert_eq!(scene.step(&mut rng).next.kind(), BotStateKind::Chase);
        scene.move_enemy(1, 35.0);
        assert_eq!(scene.step(&mut rng).next.kind(), BotStateKind::Chase);
        scene.move_enemy(1, 37.0);
        assert_eq!(scene.step(&mut rng).next.kind(), BotStateKind::Explore);

        // Обратно только через awareness
        scene.move_enemy(1, 32.0);
        assert_eq!(scene.step(&mut rng).next.kind(), BotStateKind::Explore);
    }

    #[test]
    fn test_no_action_means_no_combat() {
        let mut scene = Scene::new().enemy(1, 5.0, 3);
        scene.action = None;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(scene.step(&mut rng).next.kind(), BotStateKind::Explore);
    }

    #[test]
    fn test_resource_only_when_safe() {
        let mut scene = Scene::new().enemy(1, 40.0, 3);
        scene.resources.push(sighting(9, 5.0, true));
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(scene.step(&mut rng).next.kind(), BotStateKind::CollectResource);

        // Враг в 1.5 × engage, но без action → не Attack/Chase, и небезопасно
        scene.action = None;
        scene.move_enemy(1, 15.0);
        assert_eq!(scene.step(&mut rng).next.kind(), BotStateKind::Explore);
    }

    #[test]
    fn test_explore_keeps_destination_until_arrival() {
        let mut scene = Scene::new();
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        let BotState::Explore {
            destination: Some(first),
            wander_timer,
        } = scene.step(&mut rng).next
        else {
            panic!("expected Explore with destination");
        };
        assert_eq!(wander_timer, BotTuning::default().explore.wander_interval);

        let BotState::Explore { destination, .. } = scene.step(&mut rng).next else {
            panic!("expected Explore");
        };
        assert_eq!(destination, Some(first));
    }

    #[test]
    fn test_traversal_hook_claims_explore_tier() {
        let mut scene = Scene::new();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let BotState::Explore {
            destination: Some(destination),
            ..
        } = scene.step(&mut rng).next
        else {
            panic!("expected Explore");
        };

        // Телепорт рядом, exit почти у wander точки
        scene.aids.push(AidSighting {
            entity: Entity::from_raw(77),
            position: Vec3::new(1.0, 0.0, 0.0),
            kind: AidKind::Teleporter,
            exit: destination + Vec3::X * 0.5,
            distance: 1.0,
        });
        let hook = AidAwareTraversal {
            min_gain: 1.0,
            ..AidAwareTraversal::default()
        };
        let transition = scene.step_with(&hook, &mut rng);
        assert_eq!(transition.next.kind(), BotStateKind::UseTraversal);

        // С NoTraversal hook молчит — тот же tier остаётся за Explore
        let mut plain = Scene::new();
        plain.aids = scene.aids.clone();
        assert_eq!(plain.step(&mut rng).next.kind(), BotStateKind::Explore);
    }

    proptest! {
        #[test]
        fn prop_no_attack_chase_toggle_inside_band(
            distances in prop::collection::vec(6.0f32..14.39, 1..120),
            seed in any::<u64>(),
        ) {
            let mut scene = Scene::new().enemy(1, 11.5, 3);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            prop_assert_eq!(scene.step(&mut rng).next.kind(), BotStateKind::Attack);

            for distance in distances {
                scene.move_enemy(1, distance);
                let kind = scene.step(&mut rng).next.kind();
                prop_assert_eq!(kind, BotStateKind::Attack, "toggled at {}", distance);
            }
        }

        #[test]
        fn prop_low_health_enters_retreat(
            hp in 1u32..=2,
            threat_distance in 6.5f32..60.0,
            threat_hp in 1u32..=3,
            seed in any::<u64>(),
        ) {
            let mut scene = Scene::new().enemy(1, threat_distance, threat_hp);
            scene.health = Health::with_current(3, hp);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            prop_assert_eq!(scene.step(&mut rng).next.kind(), BotStateKind::Retreat);
        }

        #[test]
        fn prop_caution_narrows_retreat_heading(
            cautious in 0.85f32..=1.0,
            reckless in 0.0f32..0.3,
            seed in any::<u64>(),
        ) {
            let tuning = BotTuning::default();
            let threat = Vec3::new(10.0, 0.0, 0.0);
            let away = Vec3::NEG_X;
            let mut rng = ChaCha8Rng::seed_from_u64(seed);

            // Отклонение от направления "прочь от угрозы" по 32 броскам
            let mut deviations = |caution: f32| -> Vec<f32> {
                let personality =
                    PersonalityProfile::new(0.5, 0.5, 1.0, caution, Archetype::Balanced);
                (0..32)
                    .map(|_| {
                        let spot = pick_retreat_destination(
                            Vec3::ZERO,
                            Some(threat),
                            &personality,
                            &tuning,
                            &OpenGround,
                            &mut rng,
                        );
                        flatten(spot).angle_between(away)
                    })
                    .collect()
            };
            let tight = deviations(cautious);
            let wide = deviations(reckless);

            let tight_limit = PersonalityProfile::new(0.5, 0.5, 1.0, cautious, Archetype::Balanced)
                .retreat_spread();
            let tight_max = tight.iter().copied().fold(0.0f32, f32::max);
            let wide_max = wide.iter().copied().fold(0.0f32, f32::max);

            prop_assert!(
                tight_max <= tight_limit + 1e-2,
                "cautious spread {} > {}",
                tight_max,
                tight_limit
            );
            prop_assert!(
                wide_max > tight_limit,
                "reckless spread {} within cautious {}",
                wide_max,
                tight_limit
            );
        }
    }
}
