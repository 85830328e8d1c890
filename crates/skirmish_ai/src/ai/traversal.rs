//! Arena-specific traversal hook (boost pads, jump rails, teleporters).
//!
//! StateMachine зависит только от trait `ArenaTraversal`; реализация на
//! арену подкладывается ресурсом `TraversalStrategy` при сборке App.

use bevy::prelude::*;

use super::components::BotStateKind;
use crate::components::{flatten, AidKind};

/// Видимый aid (уже прошедший liveness check)
#[derive(Debug, Clone, Copy)]
pub struct AidSighting {
    pub entity: Entity,
    pub position: Vec3,
    pub kind: AidKind,
    pub exit: Vec3,
    pub distance: f32,
}

/// Ситуация бота для hook'а
#[derive(Debug, Clone, Copy)]
pub struct TraversalContext<'a> {
    pub position: Vec3,
    /// Tentative состояние после правил 1–5 (или Explore)
    pub state: BotStateKind,
    /// От кого отступаем (Retreat)
    pub threat: Option<Vec3>,
    /// Кого догоняем (Chase)
    pub target: Option<Vec3>,
    /// Wander точка (Explore)
    pub destination: Option<Vec3>,
    pub aids: &'a [AidSighting],
    /// Бот недавно пользовался aid (cooldown арены)
    pub cooldown_active: bool,
}

pub trait ArenaTraversal: Send + Sync {
    fn name(&self) -> &'static str;

    /// Aid, который продвигает текущую цель бота; None — идти пешком
    fn choose_aid(&self, ctx: &TraversalContext) -> Option<Entity>;
}

/// Арена без traversal механик
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTraversal;

impl ArenaTraversal for NoTraversal {
    fn name(&self) -> &'static str {
        "none"
    }

    fn choose_aid(&self, _ctx: &TraversalContext) -> Option<Entity> {
        None
    }
}

/// Оценивает exit каждого aid относительно цели состояния
#[derive(Debug, Clone, Copy)]
pub struct AidAwareTraversal {
    /// Не сворачиваем к aid дальше этого (m)
    pub max_detour: f32,
    /// Минимальный выигрыш, ради которого стоит сворачивать (m)
    pub min_gain: f32,
    /// Вес вертикального разрыва при погоне
    pub vertical_weight: f32,
}

impl Default for AidAwareTraversal {
    fn default() -> Self {
        Self {
            max_detour: 12.0,
            min_gain: 4.0,
            vertical_weight: 2.0,
        }
    }
}

impl AidAwareTraversal {
    fn gap(&self, from: Vec3, to: Vec3) -> f32 {
        flatten(to - from).length() + (to.y - from.y).abs() * self.vertical_weight
    }

    fn best_by(
        &self,
        ctx: &TraversalContext,
        gain: impl Fn(&AidSighting) -> f32,
    ) -> Option<Entity> {
        ctx.aids
            .iter()
            .filter(|aid| aid.distance <= self.max_detour)
            .map(|aid| (aid, gain(aid)))
            .filter(|(_, gain)| *gain >= self.min_gain)
            .max_by(|(a, ga), (b, gb)| ga.total_cmp(gb).then_with(|| b.entity.cmp(&a.entity)))
            .map(|(aid, _)| aid.entity)
    }
}

impl ArenaTraversal for AidAwareTraversal {
    fn name(&self) -> &'static str {
        "aid_aware"
    }

    fn choose_aid(&self, ctx: &TraversalContext) -> Option<Entity> {
        if ctx.cooldown_active {
            return None;
        }

        match ctx.state {
            // Retreat: exit, который дальше всего уводит от угрозы
            BotStateKind::Retreat => {
                let threat = ctx.threat?;
                let here = ctx.position.distance(threat);
                self.best_by(ctx, |aid| {
                    // Не бежим к угрозе, чтобы воспользоваться aid
                    if aid.position.distance(threat) < here * 0.5 {
                        return f32::NEG_INFINITY;
                    }
                    aid.exit.distance(threat) - here
                })
            }
            // Chase: exit, который сокращает разрыв (вертикаль весомее)
            BotStateKind::Chase => {
                let target = ctx.target?;
                let here = self.gap(ctx.position, target);
                self.best_by(ctx, |aid| here - (self.gap(aid.exit, target) + aid.distance * 0.5))
            }
            // Explore: ближайший aid, который ведёт туда, куда и так идём
            BotStateKind::Explore => {
                let destination = ctx.destination?;
                let here = ctx.position.distance(destination);
                ctx.aids
                    .iter()
                    .filter(|aid| aid.distance <= self.max_detour)
                    .filter(|aid| aid.exit.distance(destination) + self.min_gain < here)
                    .min_by(|a, b| {
                        a.distance
                            .total_cmp(&b.distance)
                            .then_with(|| a.entity.cmp(&b.entity))
                    })
                    .map(|aid| aid.entity)
            }
            _ => None,
        }
    }
}

/// Стратегия traversal для этой арены
#[derive(Resource)]
pub struct TraversalStrategy(pub Box<dyn ArenaTraversal>);

impl TraversalStrategy {
    pub fn new(strategy: impl ArenaTraversal + 'static) -> Self {
        Self(Box::new(strategy))
    }

    pub fn get(&self) -> &dyn ArenaTraversal {
        self.0.as_ref()
    }
}

impl Default for TraversalStrategy {
    fn default() -> Self {
        Self::new(NoTraversal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aid(id: u32, position: Vec3, exit: Vec3) -> AidSighting {
        AidSighting {
            entity: Entity::from_raw(id),
            position,
            kind: AidKind::Teleporter,
            exit,
            distance: position.length(),
        }
    }

    fn ctx<'a>(state: BotStateKind, aids: &'a [AidSighting]) -> TraversalContext<'a> {
        TraversalContext {
            position: Vec3::ZERO,
            state,
            threat: None,
            target: None,
            destination: None,
            aids,
            cooldown_active: false,
        }
    }

    #[test]
    fn test_no_traversal_never_uses_aids() {
        let aids = [aid(1, Vec3::X, Vec3::new(50.0, 0.0, 0.0))];
        let mut context = ctx(BotStateKind::Explore, &aids);
        context.destination = Some(Vec3::new(60.0, 0.0, 0.0));
        assert_eq!(NoTraversal.choose_aid(&context), None);
    }

    #[test]
    fn test_retreat_prefers_exit_away_from_threat() {
        let aids = [
            aid(1, Vec3::new(-3.0, 0.0, 0.0), Vec3::new(-30.0, 0.0, 0.0)),
            aid(2, Vec3::new(0.0, 0.0, 3.0), Vec3::new(-10.0, 0.0, 3.0)),
            // Exit прямо к угрозе
            aid(3, Vec3::new(0.0, 0.0, -3.0), Vec3::new(9.0, 0.0, 0.0)),
        ];
        let mut context = ctx(BotStateKind::Retreat, &aids);
        context.threat = Some(Vec3::new(10.0, 0.0, 0.0));

        assert_eq!(AidAwareTraversal::default().choose_aid(&context), Some(Entity::from_raw(1)));
    }

    #[test]
    fn test_chase_prefers_aid_to_elevated_target() {
        let aids = [
            // Jump rail на платформу цели
            aid(1, Vec3::new(2.0, 0.0, 0.0), Vec3::new(8.0, 6.0, 0.0)),
            aid(2, Vec3::new(0.0, 0.0, 4.0), Vec3::new(0.0, 0.0, 20.0)),
        ];
        let mut context = ctx(BotStateKind::Chase, &aids);
        context.target = Some(Vec3::new(10.0, 6.0, 0.0));

        assert_eq!(AidAwareTraversal::default().choose_aid(&context), Some(Entity::from_raw(1)));
    }

    #[test]
    fn test_cooldown_blocks_choice() {
        let aids = [aid(1, Vec3::X, Vec3::new(50.0, 0.0, 0.0))];
        let mut context = ctx(BotStateKind::Explore, &aids);
        context.destination = Some(Vec3::new(60.0, 0.0, 0.0));
        assert!(AidAwareTraversal::default().choose_aid(&context).is_some());

        context.cooldown_active = true;
        assert_eq!(AidAwareTraversal::default().choose_aid(&context), None);
    }

    #[test]
    fn test_explore_ignores_aid_leading_elsewhere() {
        let aids = [aid(1, Vec3::X, Vec3::new(-50.0, 0.0, 0.0))];
        let mut context = ctx(BotStateKind::Explore, &aids);
        context.destination = Some(Vec3::new(20.0, 0.0, 0.0));
        assert_eq!(AidAwareTraversal::default().choose_aid(&context), None);
    }
}
